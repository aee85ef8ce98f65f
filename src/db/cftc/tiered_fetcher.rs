use jiff::civil::Date;
use log::{info, warn};

use crate::db::cftc::report_row::ReportRow;
use crate::error::SyncError;

/// A place the TFF report can be downloaded from.
pub trait ReportSource {
    fn name(&self) -> &str;

    /// Rows for the `target` instrument, in the order the source lists them.
    fn fetch_rows(&self, target: &str) -> Result<Vec<ReportRow>, SyncError>;
}

/// Which of the matching rows a tier offers as its candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// The first matching row, for files with only the latest report
    First,
    /// The matching row with the latest report date, for history files
    Latest,
}

pub struct Tier {
    pub source: Box<dyn ReportSource>,
    pub pick: Pick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row: ReportRow,
    /// Name of the source the row came from
    pub source: String,
}

/// Try the tiers in order and stop at the first one with a row strictly
/// newer than the ledger.
pub struct TieredFetcher {
    pub tiers: Vec<Tier>,
}

impl TieredFetcher {
    pub fn new(tiers: Vec<Tier>) -> Self {
        TieredFetcher { tiers }
    }

    /// Errors inside a tier are logged and the next tier is tried.
    pub fn fetch(&self, target: &str, last_date: Date) -> Option<Candidate> {
        for tier in &self.tiers {
            let name = tier.source.name();
            let rows = match tier.source.fetch_rows(target) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            let Some(row) = pick(rows, tier.pick) else {
                info!("{}: no rows for '{}'", name, target);
                continue;
            };
            info!(
                "{}: found data for {} as of {}",
                name,
                target,
                row.report_date()
            );
            if row.report_date() > last_date {
                return Some(Candidate {
                    row,
                    source: name.to_string(),
                });
            }
            info!(
                "{}: report date {} is not after {}, stale",
                name,
                row.report_date(),
                last_date
            );
        }
        None
    }
}

fn pick(rows: Vec<ReportRow>, pick: Pick) -> Option<ReportRow> {
    match pick {
        Pick::First => rows.into_iter().next(),
        // keep the first of equal dates
        Pick::Latest => rows.into_iter().fold(None, |best, row| match best {
            Some(b) if b.report_date() >= row.report_date() => Some(b),
            _ => Some(row),
        }),
    }
}
