use std::{io, num::ParseFloatError};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("engine failure: {0}")]
    Engine(String),

    #[error("engine failure: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

/// A raw review line that could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed record {record:?}: expected 4 fields, found {found}")]
    FieldCount { record: String, found: usize },

    #[error("malformed record {record:?}: rating is not numeric")]
    Rating {
        record: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("malformed record {record:?}: rating is not a finite number")]
    NonFinite { record: String },
}
