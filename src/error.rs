use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnfDbusError {
    #[error("Malformed package identity: {0}")]
    MalformedIdentity(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Package engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("Daemon error: {0}")]
    Remote(String),
}

impl DnfDbusError {
    /// Failures raised while talking to the package engine or its cache.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            DnfDbusError::EngineUnavailable(_)
                | DnfDbusError::Io(_)
                | DnfDbusError::XmlParse(_)
                | DnfDbusError::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DnfDbusError>;
