use std::io::{Cursor, Read};

use log::info;
use reqwest::blocking::Client;

use crate::db::cftc::report_row::{parse_report, ReportRow};
use crate::db::cftc::tiered_fetcher::ReportSource;
use crate::error::SyncError;
use crate::utils::lib_http::download_bytes;

/// Yearly TFF futures-only history, a zip file with a single csv inside
/// (e.g. `FinFutYY.txt`).  The file for a new year only shows up some time
/// after the first January report.
/// See https://www.cftc.gov/files/dea/history/fut_fin_txt_2024.zip
pub struct FutFinArchive {
    pub client: Client,
    pub url: String,
}

impl FutFinArchive {
    /// Extract the content of the first file in the zip archive.
    pub fn unzip_single(&self, data: Vec<u8>) -> Result<Vec<u8>, SyncError> {
        let mut zip =
            zip::ZipArchive::new(Cursor::new(data)).map_err(|e| SyncError::parse(self.name(), e))?;
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).map_err(|e| SyncError::parse(self.name(), e))?;
            if file.is_dir() {
                continue;
            }
            info!(" -- extracting {}", file.name());
            let mut out = Vec::new();
            file.read_to_end(&mut out)
                .map_err(|e| SyncError::parse(self.name(), e))?;
            return Ok(out);
        }
        Err(SyncError::parse(self.name(), "archive is empty"))
    }
}

impl ReportSource for FutFinArchive {
    fn name(&self) -> &str {
        "archive"
    }

    fn fetch_rows(&self, target: &str) -> Result<Vec<ReportRow>, SyncError> {
        info!("downloading {}", self.url);
        let body = download_bytes(&self.client, &self.url, &[])
            .map_err(|e| SyncError::fetch(self.name(), e))?;
        info!("downloaded {} bytes", body.len());
        let data = self.unzip_single(body)?;
        parse_report(self.name(), &data, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cftc::report_row::tests::{sample_csv, TARGET};
    use crate::utils::lib_http::build_client;
    use httpmock::prelude::*;
    use jiff::civil::date;
    use std::{error::Error, io::Write, time::Duration};
    use zip::write::SimpleFileOptions;

    fn zip_bytes(name: &str, content: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default())?;
        writer.write_all(content.as_bytes())?;
        Ok(writer.finish()?.into_inner())
    }

    fn archive(server: &MockServer) -> Result<FutFinArchive, Box<dyn Error>> {
        Ok(FutFinArchive {
            client: build_client(Duration::from_secs(5))?,
            url: server.url("/files/dea/history/fut_fin_txt_2024.zip"),
        })
    }

    #[test]
    fn fetch_rows() -> Result<(), Box<dyn Error>> {
        let csv = sample_csv(&[
            (TARGET, "2024-05-14"),
            (TARGET, "2024-05-07"),
            ("EURO FX", "2024-05-14"),
        ]);
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/files/dea/history/fut_fin_txt_2024.zip");
            then.status(200).body(zip_bytes("FinFut24.txt", &csv).unwrap());
        });
        let rows = archive(&server)?.fetch_rows(TARGET)?;
        mock.assert();
        assert_eq!(
            rows.iter().map(|r| r.report_date()).collect::<Vec<_>>(),
            vec![date(2024, 5, 14), date(2024, 5, 7)]
        );
        Ok(())
    }

    #[test]
    fn not_published_yet() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/files/dea/history/fut_fin_txt_2024.zip");
            then.status(404);
        });
        let res = archive(&server)?.fetch_rows(TARGET);
        assert!(matches!(res, Err(SyncError::Fetch { .. })));
        Ok(())
    }

    #[test]
    fn not_a_zip_file() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/files/dea/history/fut_fin_txt_2024.zip");
            then.status(200).body("<html>maintenance</html>");
        });
        let res = archive(&server)?.fetch_rows(TARGET);
        assert!(matches!(res, Err(SyncError::Parse { .. })));
        Ok(())
    }
}
