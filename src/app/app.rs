use std::env;
use std::error::Error;
use std::fmt;
use std::mem;
use std::process;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use slog::Logger;

use crate::logging::{AppLogger, Config as LogConfig};

type MainResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug)]
struct AppError {
    code: i32,
    error: Box<dyn Error + Send + Sync>,
}

impl AppError {
    pub fn new<E>(code: i32, error: E) -> AppError
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        AppError {
            code,
            error: error.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (code: {})", self.error, self.code)
    }
}

/// What a command receives from the application: its logger and the identity of the run.
#[derive(Debug)]
pub struct Context {
    pub logger: Logger,
    pub accessid: String,
    pub accesstime: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub exit_on_finish: bool,
    pub logging: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exit_on_finish: false,
            logging: LogConfig::default(),
        }
    }
}

pub struct App {
    config: Config,
    main_fn: Option<Box<dyn FnMut(Context) -> MainResult>>,
    logger: Option<AppLogger>,
    context: Option<Context>,
}

impl App {
    pub fn new() -> Self {
        App::from_config(Config::default())
    }

    pub fn from_config<C: Into<Config>>(config: C) -> Self {
        App {
            config: config.into(),
            main_fn: None,
            logger: None,
            context: None,
        }
    }

    pub fn main<F>(mut self, f: F) -> Self
    where
        F: FnMut(Context) -> MainResult + 'static,
    {
        self.main_fn = Some(Box::new(f));
        self
    }

    /// Runs the main function and returns the exit code: `0` on success, `1` when the
    /// application could not start and `129` when the main function failed.
    pub fn run(mut self) -> i32 {
        let code = match self.initialize() {
            Ok(()) => self.exec(),
            Err(code) => code,
        };
        if let Some(ref mut logger) = self.logger {
            logger.set_exit_code(code);
        }
        self.finalize();
        if self.config.exit_on_finish {
            process::exit(code);
        }
        code
    }

    fn initialize(&mut self) -> Result<(), i32> {
        if self.main_fn.is_none() {
            eprintln!("`main` must be called before running");
            return Err(1);
        }
        match AppLogger::new(self.config.logging.clone()) {
            Ok(logger) => {
                self.context = Some(Context {
                    logger: logger.create(),
                    accessid: logger.stamp().accessid.clone(),
                    accesstime: logger.stamp().accesstime,
                });
                self.logger = Some(logger);
                Ok(())
            }
            Err(e) => {
                eprintln!("{}", e);
                Err(1)
            }
        }
    }

    fn exec(&mut self) -> i32 {
        let logger = match self.logger {
            Some(ref logger) => logger.create(),
            None => return 1,
        };
        debug!(logger, "args: {}", env::args().collect::<Vec<String>>().join(" "));
        debug!(logger, "{:?}", self.config);
        info!(logger, "*** [START] ***");
        let code = match self.process() {
            Ok(()) => 0,
            Err(e) => {
                error!(logger, "{}", e);
                128 + e.code()
            }
        };
        info!(logger, "application finished (code: {})", code);
        info!(logger, "*** [DONE] ***");
        code
    }

    fn process(&mut self) -> Result<(), AppError> {
        let main_fn = mem::replace(&mut self.main_fn, None);
        let context = mem::replace(&mut self.context, None);
        match (main_fn, context) {
            (Some(mut main_fn), Some(context)) => {
                (*main_fn)(context).map_err(|e| AppError::new(1, e))
            }
            _ => Err(AppError::new(1, "application is not initialized")),
        }
    }

    fn finalize(&mut self) {
        self.main_fn = None;
        self.context = None;
        self.logger = None;
        thread::sleep(Duration::from_millis(1));
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("logger", &self.logger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Level;

    fn quiet() -> Config {
        let mut config = Config::default();
        config.logging.verbosity = Level::Off;
        config
    }

    #[test]
    fn test_run_success() {
        let code = App::from_config(quiet())
            .main(|context| {
                assert_eq!(context.accessid.len(), 8);
                Ok(())
            })
            .run();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_run_failure() {
        let code = App::from_config(quiet())
            .main(|_| Err("broken input".into()))
            .run();
        assert_eq!(code, 129);
    }

    #[test]
    fn test_run_without_main() {
        assert_eq!(App::from_config(quiet()).run(), 1);
    }
}
