use structopt::StructOpt;

use crate::app::Config;
use crate::logging::Level;

/// Defines `fn main` for a command line tool: parses `$sopt` from the arguments, builds
/// the application from its `common` field and runs `$body` with a `Context`.
#[macro_export]
macro_rules! main {
    (|$args:ident: $sopt:ty, $ctx:ident: Context| $body:block; default) => {
        fn main() {
            let $args = <$sopt as $crate::app::prelude::StructOpt>::from_args();
            $crate::app::App::from_config($crate::app::Config::default())
                .main(move |$ctx: $crate::app::Context| $body)
                .run();
        }
    };
    (|$args:ident: $sopt:ty, $ctx:ident: Context| $body:block; @$field:ident) => {
        fn main() {
            let $args = <$sopt as $crate::app::prelude::StructOpt>::from_args();
            let config: $crate::app::Config = $args.$field.clone().into();
            $crate::app::App::from_config(config)
                .main(move |$ctx: $crate::app::Context| $body)
                .run();
        }
    };
    (|$args:ident: $sopt:ty, $ctx:ident: Context| $body:block) => {
        $crate::main!(|$args: $sopt, $ctx: Context| $body; @common);
    };
    (|$args:ident: $sopt:ty, $ctx:ident: Context| $body:expr) => {
        $crate::main!(|$args: $sopt, $ctx: Context| { $body });
    };
}

#[derive(StructOpt, Debug, Clone)]
pub struct CommonArgs {
    /// Activate debug mode
    #[structopt(short = "d", long = "debug")]
    pub debug: bool,

    /// Verbose mode (-v, -vv, etc.)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: u8,

    /// Directory for log files
    #[structopt(long = "logdir")]
    pub logdir: Option<String>,
}

impl From<CommonArgs> for Config {
    fn from(c: CommonArgs) -> Config {
        let mut config = Config::default();
        config.exit_on_finish = true;
        config.logging.verbosity = match (c.debug, c.verbose) {
            (true, _) => Level::Debug,
            (false, 0) => Level::Info,
            (false, 1) => Level::Debug,
            _ => Level::Trace,
        };
        if c.logdir.is_some() {
            config.logging.logdir = c.logdir;
            config.logging.mkdir = true;
        }
        config
    }
}
