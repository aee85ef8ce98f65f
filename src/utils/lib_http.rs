use std::time::Duration;

use reqwest::{
    blocking::Client,
    header::{UPGRADE_INSECURE_REQUESTS, USER_AGENT},
};

/// The CFTC site sits behind a bot filter that rejects the default reqwest agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Download the body of a url as raw bytes.  Any non-success status is an error.
///
/// `query` is appended to the url as is, e.g. a cache busting parameter.
pub fn download_bytes(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<Vec<u8>, String> {
    let response = client
        .get(url)
        .query(query)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(UPGRADE_INSECURE_REQUESTS, "1")
        .send()
        .map_err(|e| format!("request to {} failed: {}", url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {} for {}", status, url));
    }
    let body = response
        .bytes()
        .map_err(|e| format!("invalid body from {}: {}", url, e))?;
    Ok(body.to_vec())
}
