use thiserror::Error;

use crate::models::Provenance;

/// All errors that can occur in chapters-core.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport failure, timeout or non-2xx status from the remote source.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed JSON, tagged with the source it came from.
    #[error("Parse error in {origin} snapshot: {message}")]
    Parse { origin: Provenance, message: String },

    /// Local persistence failure. Never retried.
    #[error("Store fault: {0}")]
    StoreFault(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CatalogError {
    pub fn parse(origin: Provenance, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            origin,
            message: err.to_string(),
        }
    }

    /// Whether a sync should retry this kind from the bundled snapshot.
    /// Remote parse failures count as network failures; bundled ones do not.
    pub fn triggers_fallback(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Parse { origin, .. } => *origin == Provenance::Remote,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network(format!("request timed out: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Exit codes used by the `chapters` binary.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    StoreError = 4,
    NetworkError = 6,
}

impl From<&CatalogError> for ExitCode {
    fn from(e: &CatalogError) -> Self {
        match e {
            CatalogError::Network(_) => Self::NetworkError,
            CatalogError::StoreFault(_) | CatalogError::Io(_) => Self::StoreError,
            CatalogError::Config(_) | CatalogError::TomlParse(_) => Self::InvalidArgs,
            _ => Self::GeneralError,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_parse_triggers_fallback() {
        let err = CatalogError::parse(Provenance::Remote, "missing field `id`");
        assert!(err.triggers_fallback());
    }

    #[test]
    fn test_bundled_parse_is_terminal() {
        let err = CatalogError::parse(Provenance::Bundled, "expected value");
        assert!(!err.triggers_fallback());
        assert!(err.to_string().contains("bundled"));
    }

    #[test]
    fn test_store_fault_is_terminal() {
        let err = CatalogError::StoreFault(rusqlite::Error::InvalidQuery);
        assert!(!err.triggers_fallback());
        assert!(matches!(ExitCode::from(&err), ExitCode::StoreError));
    }
}
