use std::error;
use std::io as std_io;

use thiserror::Error;

use crate::utils::env::VarError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A caller fed a transition that is not legal in the current configuration.
    #[error("transition `{action}` is not allowed at step {step}")]
    IllegalTransition { action: String, step: usize },

    /// No ranked transition has zero cost; the gold tree reaching the oracle is broken.
    #[error("no zero-cost transition is available at step {step}")]
    OracleExhausted { step: usize },

    #[error("no legal transition is defined in the vocabulary at step {step}")]
    NoLegalTransition { step: usize },

    #[error("tree could not be projectivized within {lifts} lifts")]
    Unprojectivizable { lifts: usize },

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("scorer returned {actual} scores for {expected} transitions")]
    ScoreDimension { expected: usize, actual: usize },

    #[error("scorer failed: {0}")]
    Scorer(Box<dyn error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] std_io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Env(#[from] VarError),
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn scorer<E>(error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error::Scorer(error.into())
    }

    /// Whether the error indicates a broken contract between the core and its caller,
    /// as opposed to bad input data.
    pub fn is_contract_violation(&self) -> bool {
        match *self {
            Error::IllegalTransition { .. }
            | Error::OracleExhausted { .. }
            | Error::InvalidOperation(_) => true,
            _ => false,
        }
    }
}
