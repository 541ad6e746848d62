//! Error types for the FlashBlade share driver
//!
//! Every failure the orchestrator can observe is one of the variants below.
//! Array SDK faults ([`ApiFault`](crate::domain::array::ApiFault)) never
//! escape the driver directly: they are converted to [`Error::BackendFault`]
//! at the translation shim.

use thiserror::Error;

/// Unified error type for the driver
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Setup Errors
    // =========================================================================
    #[error("{0}")]
    BadConfiguration(String),

    #[error("Exception when logging into the array: {0}")]
    LoginFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Share Errors
    // =========================================================================
    #[error("Resource not found on FlashBlade: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Invalid share: {0}")]
    InvalidShare(String),

    #[error("Unsupported share protocol: {0}.")]
    UnsupportedProtocol(String),

    #[error("Invalid or unsupported share access level: {0}.")]
    InvalidAccessLevel(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("Caught exception from array: {0}")]
    BackendFault(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl Error {
    /// Build a not-found error for an array filesystem
    pub fn filesystem_not_found(name: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            kind: "FileSystem".into(),
            name: name.into(),
        }
    }

    /// Build a not-found error for an array filesystem snapshot
    pub fn snapshot_not_found(name: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            kind: "FileSystemSnapshot".into(),
            name: name.into(),
        }
    }

    /// Whether this error means the target resource is absent on the array
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }

    /// Check if the caller may retry the failed operation.
    ///
    /// The driver itself never retries; only array faults are worth a
    /// second attempt, everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendFault(_))
    }
}

/// Result type alias for the driver
pub type Result<T> = std::result::Result<T, Error>;

/// Turns a locator miss into `None` so mutation paths can treat an absent
/// resource as an already-satisfied end state.
pub trait OptionalResource<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalResource<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_retryable() {
        assert!(Error::BackendFault("timeout".into()).is_retryable());
        assert!(!Error::BadConfiguration("missing".into()).is_retryable());
        assert!(!Error::InvalidAccessLevel("rwx".into()).is_retryable());
        assert!(!Error::filesystem_not_found("share-1-manila").is_retryable());
    }

    #[test]
    fn test_optional_resource() {
        let missing: Result<u32> = Err(Error::snapshot_not_found("share-1-manila,snap"));
        assert_matches!(missing.optional(), Ok(None));

        let found: Result<u32> = Ok(7);
        assert_matches!(found.optional(), Ok(Some(7)));

        let fault: Result<u32> = Err(Error::BackendFault("boom".into()));
        assert_matches!(fault.optional(), Err(Error::BackendFault(_)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnsupportedProtocol("GLUSTERFS".into()).to_string(),
            "Unsupported share protocol: GLUSTERFS."
        );
        assert_eq!(
            Error::filesystem_not_found("share-a-manila").to_string(),
            "Resource not found on FlashBlade: FileSystem/share-a-manila"
        );
    }
}
