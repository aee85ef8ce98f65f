use std::{path::Path, process::ExitCode};

use clap::Parser;
use cot_sync::{
    config::SyncConfig,
    sync::{run_job, RunStatus},
};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Look for a newer report but don't write it to the ledger
    #[arg(long)]
    dry_run: bool,
}

/// Run this job on Friday evening and again on Saturday.  The CFTC publishes
/// the report Friday at 15:30[America/New_York], later after a holiday.
///
/// Prints a one line JSON status on stdout.  Exits with a non-zero code if the
/// ledger could not be read or written.
fn main() -> ExitCode {
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
    info!(
        "syncing '{}' into spreadsheet {}",
        config.target_asset, config.spreadsheet_id
    );
    let result = run_job(&config, args.dry_run);
    if let Err(e) = &result {
        error!("{}", e);
    }

    let status = RunStatus::from_result(&result);
    match serde_json::to_string(&status) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("failed to serialize the run status: {}", e),
    }
    ExitCode::from(status.exit_code)
}
