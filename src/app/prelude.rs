pub use super::{App, CommonArgs, Config, Context};

pub use structopt::StructOpt;
