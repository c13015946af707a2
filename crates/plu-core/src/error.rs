//! Error types for PLU Assistant Core

use std::path::PathBuf;

/// Core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Branch name not recognised
    #[error("unknown branch: '{0}'")]
    UnknownBranch(String),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading configuration
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_branch_display() {
        let err = CoreError::UnknownBranch("other".to_string());
        assert_eq!(err.to_string(), "unknown branch: 'other'");
    }
}
