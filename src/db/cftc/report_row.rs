use std::fmt;

use jiff::civil::{date, Date};
use log::warn;
use serde::Serialize;

use crate::config::{INSTRUMENT_COLUMN, REPORT_DATE_COLUMN};
use crate::error::SyncError;

/// Used as the ledger's last date when it holds no usable date
pub const SENTINEL_DATE: Date = date(1900, 1, 1);

/// One value of a report row.  Numeric text is stored as a number so it
/// lands in the ledger as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn infer(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Cell::Int(v);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Float(v),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A row of the TFF report for the target instrument.  Only [parse_report]
/// creates one, after the instrument name matched.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    instrument_name: String,
    report_date: Date,
    fields: Vec<(String, Cell)>,
}

impl ReportRow {
    pub fn instrument_name(&self) -> &str {
        &self.instrument_name
    }

    pub fn report_date(&self) -> Date {
        self.report_date
    }

    /// All columns in source order
    pub fn fields(&self) -> &[(String, Cell)] {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// Values in source order, ready to be written to the ledger.  The report
    /// date is rendered as `YYYY-MM-DD` text.
    pub fn ledger_values(&self) -> Vec<Cell> {
        self.fields
            .iter()
            .map(|(name, cell)| {
                if name == REPORT_DATE_COLUMN {
                    Cell::Text(self.report_date.strftime("%Y-%m-%d").to_string())
                } else {
                    cell.clone()
                }
            })
            .collect()
    }
}

/// Parse a date the way it shows up in the report or in the ledger.
/// Accepts `2024-05-07`, `2024-05-07 00:00:00`, `2024-05-07T00:00:00`,
/// `5/7/2024`, `2024/05/07` and the report's `As_of_Date_In_Form_YYMMDD`
/// shape `240507`.
pub fn parse_date(value: &str) -> Option<Date> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
        return Date::strptime("%y%m%d", s).ok();
    }
    let head = match s.find(|c: char| c == ' ' || c == 'T') {
        Some(i) => &s[..i],
        None => s,
    };
    if let Ok(d) = Date::strptime("%Y-%m-%d", head) {
        return Some(d);
    }
    let parts: Vec<&str> = head.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let nums: Vec<i16> = parts
        .iter()
        .map(|p| p.parse::<i16>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (year, month, day) = if parts[0].len() == 4 {
        (nums[0], nums[1], nums[2])
    } else {
        (nums[2], nums[0], nums[1])
    };
    let month = i8::try_from(month).ok()?;
    let day = i8::try_from(day).ok()?;
    Date::new(year, month, day).ok()
}

/// Parse a comma delimited TFF file with a header row and keep the rows for
/// the `target` instrument, in file order.
///
/// Column names and the instrument names are trimmed before matching.  A
/// missing column or a malformed record fails the whole file.  A matching row
/// with a bad date is skipped.
pub fn parse_report(
    source_name: &str,
    data: &[u8],
    target: &str,
) -> Result<Vec<ReportRow>, SyncError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);
    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| SyncError::parse(source_name, e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SyncError::parse(source_name, format!("missing column {}", name)))
    };
    let i_name = column(INSTRUMENT_COLUMN)?;
    let i_date = column(REPORT_DATE_COLUMN)?;
    let target = target.trim();

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record.map_err(|e| SyncError::parse(source_name, e))?;
        let name = record
            .get(i_name)
            .map(|v| String::from_utf8_lossy(v).trim().to_string())
            .unwrap_or_default();
        if name != target {
            continue;
        }
        let raw_date = record
            .get(i_date)
            .map(|v| String::from_utf8_lossy(v).to_string())
            .unwrap_or_default();
        let Some(report_date) = parse_date(&raw_date) else {
            warn!(
                "{}: skipping {} row with invalid report date '{}'",
                source_name, name, raw_date
            );
            continue;
        };

        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = if i == i_name {
                    Cell::Text(name.clone())
                } else {
                    let raw = record
                        .get(i)
                        .map(|v| String::from_utf8_lossy(v).to_string())
                        .unwrap_or_default();
                    Cell::infer(&raw)
                };
                (header.clone(), cell)
            })
            .collect();
        rows.push(ReportRow {
            instrument_name: name,
            report_date,
            fields,
        });
    }
    Ok(rows)
}
