use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("environment variable {0} is not set")]
    MissingCredential(String),

    #[error("invalid service account credential: {0}")]
    InvalidCredential(String),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("failed to read the ledger: {0}")]
    LedgerRead(String),

    #[error("failed to write to the ledger: {0}")]
    LedgerWrite(String),

    #[error("{source_name}: fetch failed: {msg}")]
    Fetch { source_name: String, msg: String },

    #[error("{source_name}: parse failed: {msg}")]
    Parse { source_name: String, msg: String },
}

impl SyncError {
    pub fn fetch(source_name: &str, msg: impl ToString) -> Self {
        SyncError::Fetch {
            source_name: source_name.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn parse(source_name: &str, msg: impl ToString) -> Self {
        SyncError::Parse {
            source_name: source_name.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Process exit code for an error that ends the run.
    pub fn exit_code(&self) -> u8 {
        use SyncError::*;
        match self {
            Config(_) | MissingCredential(_) | InvalidCredential(_) => 2,
            Authorization(_) => 3,
            LedgerRead(_) => 4,
            LedgerWrite(_) => 5,
            Fetch { .. } | Parse { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(SyncError::MissingCredential("X".into()).exit_code(), 2);
        assert_eq!(SyncError::Authorization("denied".into()).exit_code(), 3);
        assert_eq!(SyncError::LedgerRead("timeout".into()).exit_code(), 4);
        assert_eq!(SyncError::LedgerWrite("403".into()).exit_code(), 5);
    }

    #[test]
    fn display_names_the_source() {
        let e = SyncError::fetch("archive", "HTTP 404");
        assert_eq!(e.to_string(), "archive: fetch failed: HTTP 404");
    }
}
