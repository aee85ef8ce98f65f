use jiff::Timestamp;
use log::info;
use reqwest::blocking::Client;

use crate::db::cftc::report_row::{parse_report, ReportRow};
use crate::db::cftc::tiered_fetcher::ReportSource;
use crate::error::SyncError;
use crate::utils::lib_http::download_bytes;

/// The current week's TFF futures-only report, all financial markets in one
/// small text file.  Updated every Friday afternoon.
/// See https://www.cftc.gov/dea/futures/financial_lf.txt
pub struct FinancialLfFeed {
    pub client: Client,
    pub url: String,
}

impl ReportSource for FinancialLfFeed {
    fn name(&self) -> &str {
        "primary feed"
    }

    fn fetch_rows(&self, target: &str) -> Result<Vec<ReportRow>, SyncError> {
        // the CDN in front of cftc.gov serves stale copies without it
        let t = Timestamp::now().as_second().to_string();
        info!("downloading {}", self.url);
        let body = download_bytes(&self.client, &self.url, &[("t", t)])
            .map_err(|e| SyncError::fetch(self.name(), e))?;
        info!("downloaded {} bytes", body.len());
        parse_report(self.name(), &body, target)
    }
}
