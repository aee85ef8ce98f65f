use log::{info, warn};
use reqwest::{blocking::Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::cftc::report_row::Cell;
use crate::db::gsheets::ledger::Ledger;
use crate::error::SyncError;

pub const SHEETS_API: &str = "https://sheets.googleapis.com";

/// A worksheet of a Google spreadsheet, accessed through the Sheets v4 REST
/// api with a bearer token.
pub struct SheetsLedger {
    client: Client,
    base_url: String,
    token: String,
    spreadsheet_id: String,
    pub spreadsheet_title: String,
    pub sheet_id: i64,
    pub sheet_title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsLedger {
    /// Open the spreadsheet and select the worksheet called `sheet_name`.  If
    /// there is no such worksheet, use the first one.
    ///
    /// Fails if the token is rejected or the spreadsheet is not shared with
    /// the service account.
    pub fn open(
        client: Client,
        base_url: &str,
        token: String,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<SheetsLedger, SyncError> {
        let mut ledger = SheetsLedger {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            spreadsheet_id: spreadsheet_id.to_string(),
            spreadsheet_title: String::new(),
            sheet_id: 0,
            sheet_title: String::new(),
        };
        let mut url = ledger.url(&[spreadsheet_id]).map_err(SyncError::Authorization)?;
        url.query_pairs_mut()
            .append_pair("fields", "properties.title,sheets.properties");
        let response = ledger
            .client
            .get(url)
            .bearer_auth(&ledger.token)
            .send()
            .map_err(|e| SyncError::Authorization(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Authorization(format!(
                "opening spreadsheet {} returned {}: {}",
                spreadsheet_id, status, body
            )));
        }
        let meta: SpreadsheetMeta = response
            .json()
            .map_err(|e| SyncError::Authorization(e.to_string()))?;

        let sheet = match meta.sheets.iter().find(|s| s.properties.title == sheet_name) {
            Some(s) => s,
            None => {
                warn!(
                    "worksheet '{}' not found, using the first worksheet",
                    sheet_name
                );
                meta.sheets.first().ok_or_else(|| {
                    SyncError::LedgerRead(format!("spreadsheet {} has no worksheets", spreadsheet_id))
                })?
            }
        };
        ledger.sheet_id = sheet.properties.sheet_id;
        ledger.sheet_title = sheet.properties.title.clone();
        ledger.spreadsheet_title = meta.properties.title;
        info!(
            "connected to spreadsheet '{}', worksheet '{}'",
            ledger.spreadsheet_title, ledger.sheet_title
        );
        Ok(ledger)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| format!("invalid base url {}", self.base_url))?
            .pop_if_empty()
            .push("v4")
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    /// A1 range of the whole worksheet
    fn sheet_range(&self) -> String {
        format!("'{}'", self.sheet_title.replace('\'', "''"))
    }
}

/// Body of a `batchUpdate` that inserts an empty row at `position` and fills
/// it with `values` in one atomic request.  Numbers go in as numbers, text
/// verbatim.
pub fn insert_row_request(sheet_id: i64, values: &[Cell], position: usize) -> Value {
    let start = position.saturating_sub(1);
    let cells: Vec<Value> = values
        .iter()
        .map(|cell| match cell {
            Cell::Int(v) => json!({"userEnteredValue": {"numberValue": v}}),
            Cell::Float(v) => json!({"userEnteredValue": {"numberValue": v}}),
            Cell::Text(s) => json!({"userEnteredValue": {"stringValue": s}}),
        })
        .collect();
    json!({
        "requests": [
            {
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1,
                    },
                    "inheritFromBefore": false,
                }
            },
            {
                "updateCells": {
                    "start": {"sheetId": sheet_id, "rowIndex": start, "columnIndex": 0},
                    "rows": [{"values": cells}],
                    "fields": "userEnteredValue",
                }
            }
        ]
    })
}

impl Ledger for SheetsLedger {
    fn read_rows(&self) -> Result<Vec<Vec<String>>, SyncError> {
        let mut url = self
            .url(&[self.spreadsheet_id.as_str(), "values", self.sheet_range().as_str()])
            .map_err(SyncError::LedgerRead)?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| SyncError::LedgerRead(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::LedgerRead(format!("{}: {}", status, body)));
        }
        let range: ValueRange = response
            .json()
            .map_err(|e| SyncError::LedgerRead(e.to_string()))?;
        let rows = range
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| match v {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }

    fn insert_row(&mut self, values: &[Cell], position: usize) -> Result<(), SyncError> {
        let url = self
            .url(&[format!("{}:batchUpdate", self.spreadsheet_id).as_str()])
            .map_err(SyncError::LedgerWrite)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&insert_row_request(self.sheet_id, values, position))
            .send()
            .map_err(|e| SyncError::LedgerWrite(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::LedgerWrite(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::error::Error;

    fn metadata() -> Value {
        json!({
            "properties": {"title": "COT Bitcoin"},
            "sheets": [
                {"properties": {"sheetId": 0, "title": "Summary", "index": 0}},
                {"properties": {"sheetId": 1234, "title": "Sheet1", "index": 1}}
            ]
        })
    }

    fn open(server: &MockServer, sheet_name: &str) -> Result<SheetsLedger, SyncError> {
        SheetsLedger::open(
            Client::new(),
            &server.base_url(),
            "ya29.token".to_string(),
            "abc",
            sheet_name,
        )
    }

    #[test]
    fn open_by_title() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v4/spreadsheets/abc")
                .header("authorization", "Bearer ya29.token");
            then.status(200).json_body(metadata());
        });
        let ledger = open(&server, "Sheet1")?;
        mock.assert();
        assert_eq!(ledger.sheet_id, 1234);
        assert_eq!(ledger.spreadsheet_title, "COT Bitcoin");
        Ok(())
    }

    #[test]
    fn missing_worksheet_falls_back_to_first() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        let ledger = open(&server, "Arkusz1")?;
        assert_eq!(ledger.sheet_title, "Summary");
        assert_eq!(ledger.sheet_id, 0);
        Ok(())
    }

    #[test]
    fn not_shared_with_the_service_account() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(403).json_body(json!({
                "error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}
            }));
        });
        assert!(matches!(
            open(&server, "Sheet1"),
            Err(SyncError::Authorization(_))
        ));
    }

    #[test]
    fn read_rows() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v4/spreadsheets/abc/values/'Sheet1'")
                .query_param("valueRenderOption", "FORMATTED_VALUE");
            then.status(200).json_body(json!({
                "range": "Sheet1!A1:Z3",
                "majorDimension": "ROWS",
                "values": [
                    ["Market_and_Exchange_Names", "Report_Date_as_YYYY-MM-DD", "Open_Interest_All"],
                    ["BITCOIN - CHICAGO MERCANTILE EXCHANGE", "2024-05-07", 23456],
                    ["BITCOIN - CHICAGO MERCANTILE EXCHANGE", "2024-04-30"]
                ]
            }));
        });
        let ledger = open(&server, "Sheet1")?;
        let rows = ledger.read_rows()?;
        mock.assert();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][2], "23456");
        assert_eq!(rows[2].len(), 2);
        Ok(())
    }

    #[test]
    fn read_denied() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc/values/'Sheet1'");
            then.status(403).json_body(json!({
                "error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}
            }));
        });
        let ledger = open(&server, "Sheet1")?;
        assert!(matches!(ledger.read_rows(), Err(SyncError::LedgerRead(_))));
        Ok(())
    }

    #[test]
    fn read_empty_sheet() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc/values/'Sheet1'");
            then.status(200)
                .json_body(json!({"range": "Sheet1!A1:Z1000", "majorDimension": "ROWS"}));
        });
        let ledger = open(&server, "Sheet1")?;
        assert!(ledger.read_rows()?.is_empty());
        Ok(())
    }

    #[test]
    fn insert_row() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v4/spreadsheets/abc:batchUpdate");
            then.status(200)
                .json_body(json!({"spreadsheetId": "abc", "replies": [{}, {}]}));
        });
        let mut ledger = open(&server, "Sheet1")?;
        ledger.insert_row(&[Cell::Text("2024-05-07".into()), Cell::Int(5)], 2)?;
        mock.assert();
        Ok(())
    }

    #[test]
    fn rejected_insert() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc");
            then.status(200).json_body(metadata());
        });
        server.mock(|when, then| {
            when.method(POST).path("/v4/spreadsheets/abc:batchUpdate");
            then.status(403).body("PERMISSION_DENIED");
        });
        let mut ledger = open(&server, "Sheet1")?;
        let res = ledger.insert_row(&[Cell::Int(5)], 2);
        assert!(matches!(res, Err(SyncError::LedgerWrite(_))));
        Ok(())
    }

    #[test]
    fn insert_request_body() {
        let body = insert_row_request(
            1234,
            &[
                Cell::Text("BITCOIN - CHICAGO MERCANTILE EXCHANGE".into()),
                Cell::Text("2024-05-07".into()),
                Cell::Int(23456),
                Cell::Float(12.5),
            ],
            2,
        );
        assert_eq!(
            body["requests"][0]["insertDimension"]["range"],
            json!({"sheetId": 1234, "dimension": "ROWS", "startIndex": 1, "endIndex": 2})
        );
        assert_eq!(body["requests"][1]["updateCells"]["start"]["rowIndex"], json!(1));
        assert_eq!(
            body["requests"][1]["updateCells"]["rows"][0]["values"],
            json!([
                {"userEnteredValue": {"stringValue": "BITCOIN - CHICAGO MERCANTILE EXCHANGE"}},
                {"userEnteredValue": {"stringValue": "2024-05-07"}},
                {"userEnteredValue": {"numberValue": 23456}},
                {"userEnteredValue": {"numberValue": 12.5}}
            ])
        );
    }
}
