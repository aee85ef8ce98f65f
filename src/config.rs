use std::{env, time::Duration};

pub const DEFAULT_SPREADSHEET_ID: &str = "1K4Hgbe7O93tUxrpI5Mpmmhgkg140kJ7wFpctBwvqdu4";
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub const DEFAULT_TARGET_ASSET: &str = "BITCOIN - CHICAGO MERCANTILE EXCHANGE";
pub const DEFAULT_PRIMARY_URL: &str = "https://www.cftc.gov/dea/futures/financial_lf.txt";
/// `{year}` is replaced with the calendar year of the run
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://www.cftc.gov/files/dea/history/fut_fin_txt_{year}.zip";

pub const CREDENTIAL_VAR: &str = "GCP_SERVICE_ACCOUNT_KEY";
pub const INSTRUMENT_COLUMN: &str = "Market_and_Exchange_Names";
pub const REPORT_DATE_COLUMN: &str = "Report_Date_as_YYYY-MM-DD";

/// Everything a sync run needs to know about where data comes from and
/// where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub target_asset: String,
    pub primary_url: String,
    pub archive_url: String,
    pub credential_var: String,
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            target_asset: DEFAULT_TARGET_ASSET.to_string(),
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            credential_var: CREDENTIAL_VAR.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Defaults, with any `COT_*` variable in the environment taking precedence.
    pub fn from_env() -> Self {
        let mut config = SyncConfig::default();
        let overrides = [
            ("COT_SPREADSHEET_ID", &mut config.spreadsheet_id),
            ("COT_SHEET_NAME", &mut config.sheet_name),
            ("COT_TARGET_ASSET", &mut config.target_asset),
            ("COT_PRIMARY_URL", &mut config.primary_url),
            ("COT_ARCHIVE_URL", &mut config.archive_url),
        ];
        for (var, field) in overrides {
            if let Ok(value) = env::var(var) {
                if !value.trim().is_empty() {
                    *field = value.trim().to_string();
                }
            }
        }
        config
    }

    /// Archive url for a given year
    pub fn archive_url_for(&self, year: i16) -> String {
        self.archive_url.replace("{year}", &year.to_string())
    }
}
