use std::time::Duration;

use thiserror::Error;

use crate::statement::Field;

pub type Result<T> = std::result::Result<T, SedErr>;

/// Why a piece of text could not be turned into a substitution statement.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("statement must start with `s`")]
    NotSubstitution,

    #[error("`{0}` cannot be used as a separator")]
    InvalidSeparator(char),

    #[error("{0} field is missing its closing separator")]
    UnterminatedField(Field),

    #[error("unknown flag `{0}`")]
    UnknownFlag(char),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("substitution did not finish within {0:?}")]
    Timeout(Duration),

    #[error("replacement refers to unknown group `{0}`")]
    InvalidGroupReference(String),

    #[error("replacement has a dangling escape at the end")]
    TrailingBackslash,

    #[error("substitution worker failed: {0}")]
    WorkerFailed(String),
}

/// Failure reported by a [`crate::gateway::ChatGateway`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("event not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SedErr {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
}
