use std::{error::Error, path::Path};

use clap::Parser;
use cot_sync::{
    config::SyncConfig,
    db::gsheets::ledger::LedgerSnapshot,
    positioning::{ascii_table, category_stats, positioning_points, Unit},
    sync::connect,
    utils::lib_http::build_client,
};
use log::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Show positions in btc or contracts
    #[arg(short, long, default_value = "contracts")]
    unit: Unit,
}

/// Print the latest positioning by trader category, compared with the
/// previous week.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if dotenvy::from_path(Path::new(&env_file)).is_ok() {
        info!("loaded {}", env_file);
    }

    let config = SyncConfig::from_env();
    let client = build_client(config.timeout)?;
    let ledger = connect(&config, &client)?;
    let snapshot = LedgerSnapshot::read(&ledger)?;
    let points = positioning_points(&snapshot);
    if points.len() < 2 {
        info!("Need at least two reports in the ledger, found {}", points.len());
        return Ok(());
    }

    let curr = &points[points.len() - 1];
    let prev = &points[points.len() - 2];
    println!("{} as of {} (previous {})", config.target_asset, curr.date, prev.date);
    println!(
        "Open interest: {:.0} {}",
        curr.open_interest * args.unit.scale(),
        args.unit
    );
    println!("{}", ascii_table(&category_stats(curr, prev), args.unit));

    Ok(())
}
