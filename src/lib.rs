#[macro_use]
extern crate slog;

#[macro_use]
pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod logging;
pub mod preprocessing;
pub mod syntax;
pub mod training;
pub mod utils;

pub use crate::error::{Error, Result};
