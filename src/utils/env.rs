use std::env;
use std::error;
use std::ffi::{OsStr, OsString};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarError {
    #[error("environment variable not found")]
    NotPresent,
    #[error("environment variable was not valid unicode: {0:?}")]
    NotUnicode(OsString),
    #[error("environment variable could not be parsed: {0}")]
    Parse(Box<dyn error::Error + Send + Sync>),
}

/// Reads an environment variable and parses it into `T`.
pub fn var<K: AsRef<OsStr>, T: FromStr>(key: K) -> Result<T, VarError>
where
    <T as FromStr>::Err: Into<Box<dyn error::Error + Send + Sync>>,
{
    match env::var(key) {
        Ok(s) => s.trim().parse::<T>().map_err(|e| VarError::Parse(e.into())),
        Err(env::VarError::NotPresent) => Err(VarError::NotPresent),
        Err(env::VarError::NotUnicode(s)) => Err(VarError::NotUnicode(s)),
    }
}

/// Like `var`, but a missing variable is `Ok(None)`.
pub fn var_opt<K: AsRef<OsStr>, T: FromStr>(key: K) -> Result<Option<T>, VarError>
where
    <T as FromStr>::Err: Into<Box<dyn error::Error + Send + Sync>>,
{
    match var(key) {
        Ok(val) => Ok(Some(val)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e),
    }
}
