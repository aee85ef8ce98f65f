use jiff::{civil::Date, Zoned};
use log::{error, info};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::config::SyncConfig;
use crate::db::cftc::financial_lf::FinancialLfFeed;
use crate::db::cftc::fut_fin_archive::FutFinArchive;
use crate::db::cftc::report_row::ReportRow;
use crate::db::cftc::tiered_fetcher::{Pick, Tier, TieredFetcher};
use crate::db::gsheets::ledger::{Ledger, LedgerSnapshot};
use crate::db::gsheets::service_account::ServiceAccountKey;
use crate::db::gsheets::sheets_ledger::{SheetsLedger, SHEETS_API};
use crate::error::SyncError;

/// New rows go right under the header
pub const APPEND_POSITION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Append,
    UpToDate,
}

/// Append only a report strictly newer than what the ledger has.
pub fn decide(candidate_date: Option<Date>, last_date: Date) -> Decision {
    match candidate_date {
        Some(d) if d > last_date => Decision::Append,
        _ => Decision::UpToDate,
    }
}

/// Insert the row under the ledger's header, date rendered as `YYYY-MM-DD`.
pub fn append(ledger: &mut dyn Ledger, row: &ReportRow) -> Result<(), SyncError> {
    ledger.insert_row(&row.ledger_values(), APPEND_POSITION)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Appended { last_date: Date, row: ReportRow, source: String },
    /// A newer row was found but `dry_run` was set
    DryRun { last_date: Date, row: ReportRow, source: String },
    UpToDate { last_date: Date },
}

/// One line of JSON for whoever scheduled the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: u8,
}

impl RunStatus {
    pub fn from_result(result: &Result<SyncOutcome, SyncError>) -> RunStatus {
        let fmt = |d: &Date| Some(d.strftime("%Y-%m-%d").to_string());
        let empty = RunStatus {
            status: "",
            last_date: None,
            report_date: None,
            source: None,
            error: None,
            exit_code: 0,
        };
        match result {
            Ok(SyncOutcome::Appended {
                last_date,
                row,
                source,
            }) => RunStatus {
                status: "appended",
                last_date: fmt(last_date),
                report_date: fmt(&row.report_date()),
                source: Some(source.clone()),
                ..empty
            },
            Ok(SyncOutcome::DryRun {
                last_date,
                row,
                source,
            }) => RunStatus {
                status: "dry_run",
                last_date: fmt(last_date),
                report_date: fmt(&row.report_date()),
                source: Some(source.clone()),
                ..empty
            },
            Ok(SyncOutcome::UpToDate { last_date }) => RunStatus {
                status: "up_to_date",
                last_date: fmt(last_date),
                ..empty
            },
            Err(e) => RunStatus {
                status: "failed",
                error: Some(e.to_string()),
                exit_code: e.exit_code(),
                ..empty
            },
        }
    }
}

/// The primary feed first, then this year's archive.
pub fn cftc_fetcher(config: &SyncConfig, client: &Client, year: i16) -> TieredFetcher {
    TieredFetcher::new(vec![
        Tier {
            source: Box::new(FinancialLfFeed {
                client: client.clone(),
                url: config.primary_url.clone(),
            }),
            pick: Pick::First,
        },
        Tier {
            source: Box::new(FutFinArchive {
                client: client.clone(),
                url: config.archive_url_for(year),
            }),
            pick: Pick::Latest,
        },
    ])
}

/// Authorize with the service account key from the environment and open the
/// ledger worksheet.
pub fn connect(config: &SyncConfig, client: &Client) -> Result<SheetsLedger, SyncError> {
    let key = ServiceAccountKey::from_env(&config.credential_var)?;
    let token = key.access_token(client)?;
    SheetsLedger::open(
        client.clone(),
        SHEETS_API,
        token,
        &config.spreadsheet_id,
        &config.sheet_name,
    )
}

/// Read the ledger, look for a newer report, and insert it if there is one.
pub fn run(
    config: &SyncConfig,
    ledger: &mut dyn Ledger,
    fetcher: &TieredFetcher,
    dry_run: bool,
) -> Result<SyncOutcome, SyncError> {
    let snapshot = LedgerSnapshot::read(ledger)?;
    let last_date = snapshot.last_date;
    info!(
        "ledger has {} rows, last date {}",
        snapshot.records.len(),
        last_date
    );

    let candidate = fetcher.fetch(&config.target_asset, last_date);
    let decision = decide(candidate.as_ref().map(|c| c.row.report_date()), last_date);
    match (decision, candidate) {
        (Decision::Append, Some(c)) if dry_run => {
            info!(
                "dry run: would insert the {} report from {}",
                c.row.report_date(),
                c.source
            );
            Ok(SyncOutcome::DryRun {
                last_date,
                row: c.row,
                source: c.source,
            })
        }
        (Decision::Append, Some(c)) => {
            info!(
                "inserting the {} report from {}",
                c.row.report_date(),
                c.source
            );
            if let Err(e) = append(ledger, &c.row) {
                error!("{}", e);
                return Err(e);
            }
            info!("ledger updated");
            Ok(SyncOutcome::Appended {
                last_date,
                row: c.row,
                source: c.source,
            })
        }
        _ => {
            info!("ledger is up to date, nothing to insert");
            Ok(SyncOutcome::UpToDate { last_date })
        }
    }
}

/// The whole job: connect, then [run] against the CFTC feeds for the current
/// year.
pub fn run_job(config: &SyncConfig, dry_run: bool) -> Result<SyncOutcome, SyncError> {
    let client = crate::utils::lib_http::build_client(config.timeout)
        .map_err(|e| SyncError::Config(format!("http client: {}", e)))?;
    let mut ledger = connect(config, &client)?;
    let year = Zoned::now().year();
    let fetcher = cftc_fetcher(config, &client, year);
    run(config, &mut ledger, &fetcher, dry_run)
}
