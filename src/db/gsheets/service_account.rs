use std::env;

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The JSON key file of a Google service account.  Only the fields needed to
/// get an access token are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Read the key from an environment variable holding the whole JSON file.
    pub fn from_env(var: &str) -> Result<ServiceAccountKey, SyncError> {
        let raw = env::var(var).map_err(|_| SyncError::MissingCredential(var.to_string()))?;
        ServiceAccountKey::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<ServiceAccountKey, SyncError> {
        serde_json::from_str(raw).map_err(|e| SyncError::InvalidCredential(e.to_string()))
    }

    /// A signed JWT asking for the spreadsheet and drive scopes, valid for an
    /// hour from `now` (unix seconds).
    pub fn assertion(&self, now: i64) -> Result<String, SyncError> {
        let claims = Claims {
            iss: self.client_email.clone(),
            scope: SCOPES.join(" "),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SyncError::InvalidCredential(format!("private key: {}", e)))?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| SyncError::InvalidCredential(e.to_string()))
    }

    /// Exchange a fresh assertion for a bearer token.
    pub fn access_token(&self, client: &Client) -> Result<String, SyncError> {
        let assertion = self.assertion(Timestamp::now().as_second())?;
        info!("requesting an access token for {}", self.client_email);
        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SyncError::Authorization(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Authorization(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|e| SyncError::Authorization(e.to_string()))?;
        Ok(token.access_token)
    }
}
