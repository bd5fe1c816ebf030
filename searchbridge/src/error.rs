use crate::lifecycle::ValidationReport;
use thiserror::Error;

/// Failures raised below the application protocol: the request never got a
/// usable answer from the cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Naming convention violation for '{name}': {reason}")]
    NamingConvention { name: String, reason: String },

    #[error("Schema mismatch for index '{index}':\n{report}")]
    SchemaMismatch {
        index: String,
        report: ValidationReport,
    },

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Item rejected by the engine ({index}/{id}, status {status}): {error_type}: {reason}")]
    ItemFailure {
        index: String,
        id: String,
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("Engine error (status {status}): {error_type}: {reason}")]
    Engine {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("Index '{0}' was created concurrently")]
    ConcurrentCreationDetected(String),

    #[error("Index lifecycle error: {0}")]
    IndexLifecycle(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::NamingConvention { .. } => "naming_convention",
            Error::SchemaMismatch { .. } => "schema_mismatch",
            Error::Transport(TransportError::Connection(_)) => "connection",
            Error::Transport(TransportError::Timeout(_)) => "timeout",
            Error::Transport(TransportError::MalformedResponse(_)) => "malformed_response",
            Error::ItemFailure { .. } => "item_failure",
            Error::Engine { .. } => "engine",
            Error::ConcurrentCreationDetected(_) => "concurrent_creation",
            Error::IndexLifecycle(_) => "index_lifecycle",
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Toml(_) => "toml",
        }
    }

    /// Transport failures are the only kind a caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Copy of this error for each item of a batch that failed as a whole.
    pub(crate) fn duplicate(&self) -> Error {
        match self {
            Error::Configuration(m) => Error::Configuration(m.clone()),
            Error::NamingConvention { name, reason } => Error::naming(name.clone(), reason.clone()),
            Error::SchemaMismatch { index, report } => Error::SchemaMismatch {
                index: index.clone(),
                report: report.clone(),
            },
            Error::Transport(e) => Error::Transport(e.clone()),
            Error::ItemFailure {
                index,
                id,
                status,
                error_type,
                reason,
            } => Error::ItemFailure {
                index: index.clone(),
                id: id.clone(),
                status: *status,
                error_type: error_type.clone(),
                reason: reason.clone(),
            },
            Error::Engine {
                status,
                error_type,
                reason,
            } => Error::Engine {
                status: *status,
                error_type: error_type.clone(),
                reason: reason.clone(),
            },
            Error::ConcurrentCreationDetected(index) => {
                Error::ConcurrentCreationDetected(index.clone())
            }
            Error::IndexLifecycle(m) => Error::IndexLifecycle(m.clone()),
            Error::Cancelled => Error::Cancelled,
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::Json(e) => Error::Json(serde_json::Error::io(std::io::Error::other(e.to_string()))),
            Error::Yaml(_) | Error::Toml(_) => Error::Configuration(self.to_string()),
        }
    }

    pub(crate) fn naming(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NamingConvention {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(Error::Transport(TransportError::Timeout("30s".into())).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::ItemFailure {
            index: "book-000001".into(),
            id: "1".into(),
            status: 409,
            error_type: "version_conflict_engine_exception".into(),
            reason: "conflict".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_duplicate_keeps_kind() {
        let original = Error::Engine {
            status: 413,
            error_type: "request_entity_too_large".into(),
            reason: "too big".into(),
        };
        assert!(matches!(
            original.duplicate(),
            Error::Engine { status: 413, ref error_type, .. } if error_type == "request_entity_too_large"
        ));
        assert!(Error::Transport(TransportError::Timeout("1s".into()))
            .duplicate()
            .is_retryable());
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(
            Error::Transport(TransportError::Connection("refused".into())).error_type(),
            "connection"
        );
        assert_eq!(Error::Configuration("x".into()).error_type(), "configuration");
    }
}
