use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::prelude::*;
use slog::{Discard, Logger};

use super::{create_logger_with_kv_and_time, Config, Error};

/// Identity of one command line run.
#[derive(Clone, Debug)]
pub struct RunStamp {
    pub accessid: String,
    pub accesstime: DateTime<Local>,
}

impl RunStamp {
    pub fn now() -> Self {
        RunStamp {
            accessid: format!("{:08x}", rand::random::<u32>()),
            accesstime: Local::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        Local::now()
            .signed_duration_since(self.accesstime)
            .num_milliseconds() as f64
            * 1e-3
    }
}

/// The logger of a command line run. Every record carries the access id; the first and
/// the last record bracket the run, the last one with the exit code and elapsed time.
#[derive(Debug)]
pub struct AppLogger {
    inner: Logger,
    stamp: RunStamp,
    filepath: Option<PathBuf>,
    exit_code: Option<i32>,
}

impl AppLogger {
    pub fn new<C: Into<Config>>(config: C) -> Result<Self, Error> {
        let stamp = RunStamp::now();
        let (inner, filepath) = create_logger_with_kv_and_time(
            config,
            o!("accessid" => stamp.accessid.clone()),
            &stamp.accesstime,
        )?;
        info!(inner, "run started"; "accesstime" => stamp.accesstime.to_rfc3339());
        if let Some(ref path) = filepath {
            debug!(inner, "log file: {}", path.display());
        }
        Ok(AppLogger {
            inner,
            stamp,
            filepath,
            exit_code: None,
        })
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_ref().map(|p| p.as_path())
    }

    /// Exit code reported by the closing record.
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = Some(code);
    }

    pub fn create(&self) -> Logger {
        self.inner.new(o!())
    }

    fn close(&mut self) {
        info!(
            self.inner,
            "run finished";
            "code" => self.exit_code,
            "elapsed" => format!("{:.3}s", self.stamp.elapsed_secs())
        );
        // dropping the async drain flushes the pending records
        self.inner = Logger::root(Discard, o!());
        if let Some(ref path) = self.filepath {
            thread::sleep(Duration::from_millis(1));
            // a blank line separates runs appended to the same file
            let result = fs::OpenOptions::new()
                .append(true)
                .open(path)
                .and_then(|mut file| writeln!(file).and_then(|()| file.flush()));
            if let Err(e) = result {
                eprintln!("unable to close the log file: {}", e);
            }
        }
    }
}

impl Drop for AppLogger {
    fn drop(&mut self) {
        self.close();
    }
}
