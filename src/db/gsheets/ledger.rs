use itertools::Itertools;
use jiff::civil::Date;

use crate::db::cftc::report_row::{parse_date, Cell, SENTINEL_DATE};
use crate::error::SyncError;

/// A worksheet where the weekly report rows are kept, most recent first,
/// under a header row.
pub trait Ledger {
    /// All non-empty rows of the worksheet, header row included, as text.
    fn read_rows(&self) -> Result<Vec<Vec<String>>, SyncError>;

    /// Insert `values` as a new row at the 1-based `position`, shifting the
    /// rows at and below it down.
    fn insert_row(&mut self, values: &[Cell], position: usize) -> Result<(), SyncError>;
}

/// One ledger row keyed by the header, in header order
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    pub cells: Vec<(String, String)>,
}

impl LedgerRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// What the ledger holds at the start of a run
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub records: Vec<LedgerRecord>,
    /// The first column with `date` in its name, if any
    pub date_column: Option<String>,
    pub last_date: Date,
}

impl LedgerSnapshot {
    pub fn read(ledger: &dyn Ledger) -> Result<LedgerSnapshot, SyncError> {
        let rows = ledger.read_rows()?;
        Ok(LedgerSnapshot::from_rows(rows))
    }

    /// The first row is the header.  Short rows are padded with empty text
    /// and blank rows are dropped.
    pub fn from_rows(rows: Vec<Vec<String>>) -> LedgerSnapshot {
        let mut rows = rows.into_iter();
        let header: Vec<String> = match rows.next() {
            Some(h) => h.into_iter().map(|x| x.trim().to_string()).collect(),
            None => Vec::new(),
        };
        let records: Vec<LedgerRecord> = rows
            .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
            .map(|row| LedgerRecord {
                cells: header
                    .iter()
                    .cloned()
                    .zip(row.into_iter().chain(std::iter::repeat(String::new())))
                    .collect(),
            })
            .collect();

        let date_column = if records.is_empty() {
            None
        } else {
            header
                .iter()
                .find(|h| h.to_lowercase().contains("date"))
                .cloned()
        };
        let last_date = date_column
            .as_deref()
            .and_then(|col| {
                records
                    .iter()
                    .filter_map(|r| r.get(col).and_then(parse_date))
                    .max()
            })
            .unwrap_or(SENTINEL_DATE);

        LedgerSnapshot {
            records,
            date_column,
            last_date,
        }
    }

    /// Records sorted by the date column, oldest first.  Records without a
    /// parseable date are left out.
    pub fn dated_records(&self) -> Vec<(Date, &LedgerRecord)> {
        let Some(col) = self.date_column.as_deref() else {
            return Vec::new();
        };
        self.records
            .iter()
            .filter_map(|r| r.get(col).and_then(parse_date).map(|d| (d, r)))
            .sorted_by_key(|(d, _)| *d)
            .collect()
    }
}
