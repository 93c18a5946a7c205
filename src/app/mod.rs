pub use self::app::{App, Config, Context};
pub use self::main::CommonArgs;

mod app;
#[macro_use]
mod main;
pub mod prelude;
