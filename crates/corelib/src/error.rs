//! Error types for the ring engine.

/// Result type alias for the ring engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by ring operations.
///
/// Every failing operation leaves the ring exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad weight, empty name, zero count or invalid configuration.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A target with this name is already on the ring.
    #[error("target already exists: {0}")]
    DuplicateTarget(String),

    /// No target with this name is on the ring.
    #[error("target not found: {0}")]
    NotFound(String),

    /// The ring has no targets, so nothing can be looked up.
    #[error("ring has no targets")]
    EmptyRing,

    /// A serialized ring is corrupt, truncated or from an unsupported version.
    #[error("invalid serialized ring: {0}")]
    InvalidFormat(String),

    /// Reading or writing a ring file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Copyable discriminant of [`Error`], for hosts that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    DuplicateTarget,
    NotFound,
    EmptyRing,
    InvalidFormat,
    Io,
}

impl ErrorKind {
    /// Numeric status code for hosts that report errors as return codes
    /// instead of exceptions. Success is `0`; every kind maps to a distinct
    /// negative value.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Io => -2,
            ErrorKind::InvalidParameter => -10,
            ErrorKind::DuplicateTarget => -11,
            ErrorKind::NotFound => -13,
            ErrorKind::EmptyRing => -14,
            ErrorKind::InvalidFormat => -15,
        }
    }
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::DuplicateTarget(_) => ErrorKind::DuplicateTarget,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::EmptyRing => ErrorKind::EmptyRing,
            Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_format(msg: impl Into<String>) -> Self {
        Error::InvalidFormat(msg.into())
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::EmptyRing.kind(), ErrorKind::EmptyRing);
        assert_eq!(
            Error::DuplicateTarget("a".into()).kind(),
            ErrorKind::DuplicateTarget
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(Error::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_status_codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidParameter,
            ErrorKind::DuplicateTarget,
            ErrorKind::NotFound,
            ErrorKind::EmptyRing,
            ErrorKind::InvalidFormat,
            ErrorKind::Io,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.code()).collect();
        assert!(codes.iter().all(|c| *c < 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::EmptyRing.to_string(), "ring has no targets");
        assert_eq!(
            Error::NotFound("cache-1".into()).to_string(),
            "target not found: cache-1"
        );
    }
}
