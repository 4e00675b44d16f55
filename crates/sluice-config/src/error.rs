//! Error types for pipeline files.

use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors from loading, saving and building pipeline descriptions.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The pipeline file could not be read
    #[error("cannot read pipeline file '{path}': {source}")]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The pipeline file could not be written
    #[error("cannot write pipeline file '{path}': {source}")]
    Write {
        /// File that was written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The parent directory of a saved file could not be created
    #[error("cannot create directory '{path}': {source}")]
    CreateDir {
        /// Directory that was created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not a pipeline description
    #[error("invalid pipeline TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The description could not be turned into TOML
    #[error("cannot serialize pipeline: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The description parsed but does not describe a buildable pipeline
    #[error("invalid pipeline: {0}")]
    Invalid(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// The validation problem, if building failed on one.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid(err) => Some(err),
            _ => None,
        }
    }
}
