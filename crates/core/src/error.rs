use symdex_api::ResolutionFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error on index file: {0}")]
    Storage(#[from] std::io::Error),
    #[error("index file is corrupt: {0}")]
    Corrupt(String),
    #[error("index format mismatch (found {found:#x}, expected {expected:#x})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),
    #[error("linkage `{0}` is not registered")]
    UnknownLinkage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("allocation of {0} bytes exceeds the chunk size")]
    TooLarge(usize),
    #[error("writer lock poisoned")]
    Poisoned,
}

impl IndexError {
    /// Everything but a resolution failure invalidates the whole index.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IndexError::Resolution(_))
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        IndexError::Corrupt(message.into())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_resolution_is_recoverable() {
        let err: IndexError = ResolutionFailure::ProblemEntity("x".into()).into();
        assert!(!err.is_fatal());
        assert!(IndexError::corrupt("bad tag").is_fatal());
        assert!(IndexError::TooLarge(1 << 20).is_fatal());
    }
}
