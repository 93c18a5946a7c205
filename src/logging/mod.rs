use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io as std_io;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
pub use slog::FilterLevel as Level;
use slog::{
    Discard, Drain, Duplicate, Fuse, Level as LogLevel, LevelFilter, Logger, OwnedKV,
    SendSyncRefUnwindSafeKV,
};
use slog_async::Async;
use slog_term::{CompactFormat, Decorator, FullFormat, PlainDecorator, TermDecorator};
use thiserror::Error;

pub use self::app::{AppLogger, RunStamp};

mod app;

#[derive(Debug)]
pub enum Stream {
    StdOut,
    StdErr,
    File(File),
    Null,
}

impl Stream {
    pub fn is_null(&self) -> bool {
        match *self {
            Stream::Null => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Full,
    Compact,
}

#[derive(Debug)]
pub struct LoggerBuilder {
    stream: Stream,
    level: Level,
    format: Format,
}

impl LoggerBuilder {
    pub fn new(stream: Stream) -> Self {
        LoggerBuilder {
            stream,
            level: Level::Debug,
            format: Format::Full,
        }
    }

    pub fn level(mut self, l: Level) -> Self {
        self.level = l;
        self
    }

    pub fn format(mut self, f: Format) -> Self {
        self.format = f;
        self
    }

    pub fn build<T>(self, values: OwnedKV<T>) -> Result<Logger, Error>
    where
        T: SendSyncRefUnwindSafeKV + 'static,
    {
        Ok(match self.build_drain()? {
            Some(drain) => Logger::root(drain.fuse(), values),
            None => Logger::root(Discard, values),
        })
    }

    pub fn build_with<T>(self, other: LoggerBuilder, values: OwnedKV<T>) -> Result<Logger, Error>
    where
        T: SendSyncRefUnwindSafeKV + 'static,
    {
        Ok(match (self.build_drain()?, other.build_drain()?) {
            (Some(d1), Some(d2)) => Logger::root(Duplicate::new(d1, d2).fuse(), values),
            (Some(d1), None) => Logger::root(d1.fuse(), values),
            (None, Some(d2)) => Logger::root(d2.fuse(), values),
            (None, None) => Logger::root(Discard, values),
        })
    }

    fn build_drain(&self) -> Result<Option<LevelFilter<Fuse<Async>>>, Error> {
        let level = match LogLevel::from_usize(self.level.as_usize()) {
            Some(level) => level,
            None => return Ok(None),
        };
        let drain = match self.stream {
            Stream::StdOut => {
                self.build_drain_from_decorator(TermDecorator::new().stdout().build(), level)
            }
            Stream::StdErr => {
                self.build_drain_from_decorator(TermDecorator::new().stderr().build(), level)
            }
            Stream::File(ref f) => {
                self.build_drain_from_decorator(PlainDecorator::new(f.try_clone()?), level)
            }
            Stream::Null => return Ok(None),
        };
        Ok(Some(drain))
    }

    fn build_drain_from_decorator<D: Decorator + Send + 'static>(
        &self,
        decorator: D,
        level: LogLevel,
    ) -> LevelFilter<Fuse<Async>> {
        let drain = match self.format {
            Format::Compact => {
                let drain = CompactFormat::new(decorator).use_local_timestamp().build();
                Async::new(drain.fuse()).build()
            }
            Format::Full => {
                let drain = FullFormat::new(decorator).use_local_timestamp().build();
                Async::new(drain.fuse()).build()
            }
        };
        LevelFilter::new(drain.fuse(), level)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error(transparent)]
    Io(#[from] std_io::Error),
}

/// Console and file logging settings. No file is written unless `logdir` is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub level: Level,
    pub verbosity: Level,
    pub logdir: Option<String>,
    pub mkdir: bool,
    pub filename: String,
    pub filemode: char,
    pub format: Format,
    pub use_stderr: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            level: Level::Debug,
            verbosity: Level::Info,
            logdir: None,
            mkdir: false,
            filename: "eagerdep-%Y%m%d.log".to_string(),
            filemode: 'a',
            format: Format::Full,
            use_stderr: true,
        }
    }
}

/// A logger that drops every record, for library calls made without one.
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}

pub fn create_logger<C: Into<Config>>(config: C) -> Result<Logger, Error> {
    create_logger_with_kv_and_time(config, o!(), &Local::now()).map(|(logger, _)| logger)
}

/// Builds the console logger and, when `logdir` is set, a file logger duplicating its
/// records. Returns the log file path alongside the logger.
pub fn create_logger_with_kv_and_time<C: Into<Config>, T, Tz: TimeZone>(
    config: C,
    values: OwnedKV<T>,
    datetime: &DateTime<Tz>,
) -> Result<(Logger, Option<PathBuf>), Error>
where
    T: SendSyncRefUnwindSafeKV + 'static,
    Tz::Offset: fmt::Display,
{
    let c = config.into();
    let (fstream, path) = match (c.level, c.logdir.as_ref()) {
        (Level::Off, _) | (_, None) => (Stream::Null, None),
        (_, Some(logdir)) => {
            let mut options = OpenOptions::new();
            options.create(true).write(true);
            let mut numbering = false;
            match c.filemode {
                'w' => {
                    options.truncate(true);
                }
                'a' => {
                    options.append(true);
                }
                'n' => {
                    options.truncate(true);
                    numbering = true;
                }
                mode => {
                    return Err(Error::InvalidOption(format!("unknown file mode `{}`", mode)));
                }
            }
            let path = resolve_filepath(logdir, &c.filename, datetime, c.mkdir, numbering)?;
            let file = options.open(&path)?;
            (Stream::File(file), Some(path))
        }
    };
    let vstream = if c.use_stderr {
        Stream::StdErr
    } else {
        Stream::StdOut
    };
    let logger = LoggerBuilder::new(vstream)
        .level(c.verbosity)
        .format(c.format)
        .build_with(
            LoggerBuilder::new(fstream).level(c.level).format(c.format),
            values,
        )?;
    Ok((logger, path))
}

fn resolve_filepath<P: AsRef<Path>, Tz: TimeZone>(
    dir: P,
    filename: &str,
    time: &DateTime<Tz>,
    mkdir: bool,
    numbering: bool,
) -> Result<PathBuf, Error>
where
    Tz::Offset: fmt::Display,
{
    let dir = dir.as_ref();
    if !dir.is_dir() {
        if mkdir {
            fs::create_dir_all(dir)?;
        } else {
            return Err(Error::InvalidOption(format!(
                "`{}` is not a directory",
                dir.display()
            )));
        }
    }
    if filename.contains(std::path::MAIN_SEPARATOR) {
        return Err(Error::InvalidOption(
            "filename must not contain the separator".to_string(),
        ));
    }
    let filename = Path::new(filename);
    let stem = filename
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidOption("invalid filename".to_string()))?;
    let stem = time.format(stem).to_string();
    let ext = filename
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| format!(".{}", s))
        .unwrap_or_default();

    if numbering {
        let mut number = 0;
        loop {
            let path = dir.join(format!("{}-{}{}", stem, number, ext));
            if !path.exists() {
                return Ok(path);
            }
            number += 1;
        }
    } else {
        Ok(dir.join(format!("{}{}", stem, ext)))
    }
}
