//! Append-only `demo.log` shared by the whole process.
//!
//! Nothing is written until [`init`] succeeds; before that every call is a no-op,
//! so library code can log unconditionally.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use chrono::Utc;

const LOG_FILE: &str = "demo.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

struct DemoLog {
    path: PathBuf,
    file: Mutex<File>,
    min_level: Level,
}

static DEMO_LOG: OnceLock<DemoLog> = OnceLock::new();

/// Opens `<log_dir>/demo.log` for appending. When `log_dir` cannot be
/// written, `./logs` is tried instead. Returns the directory in use.
pub fn init(log_dir: PathBuf, min_level: Level) -> anyhow::Result<PathBuf> {
    let fallback = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("logs");
    let (dir, file) = match open_in(&log_dir) {
        Ok(file) => (log_dir, file),
        Err(_) if fallback != log_dir => {
            let file = open_in(&fallback).map_err(|err| {
                anyhow::anyhow!("unable to open demo log at {}: {err}", fallback.display())
            })?;
            eprintln!(
                "unable to write {LOG_FILE} at {}; falling back to {}",
                log_dir.display(),
                fallback.display()
            );
            (fallback, file)
        }
        Err(err) => anyhow::bail!("unable to open demo log at {}: {err}", log_dir.display()),
    };

    let log = DemoLog {
        path: dir.join(LOG_FILE),
        file: Mutex::new(file),
        min_level,
    };
    if DEMO_LOG.set(log).is_err() {
        anyhow::bail!("demo log already initialized");
    }
    Ok(dir)
}

fn open_in(dir: &Path) -> io::Result<File> {
    std::fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
}

/// Path of the active log file, once [`init`] has succeeded.
pub fn log_path() -> Option<&'static Path> {
    DEMO_LOG.get().map(|log| log.path.as_path())
}

pub fn enabled(level: Level) -> bool {
    DEMO_LOG.get().is_some_and(|log| level >= log.min_level)
}

pub fn log(level: Level, target: &str, message: impl fmt::Display) {
    let Some(log) = DEMO_LOG.get() else {
        return;
    };
    if level < log.min_level {
        return;
    }
    let Ok(mut file) = log.file.lock() else {
        return;
    };
    let _ = writeln!(
        file,
        "{} {level:<5} {target}: {message}",
        Utc::now().to_rfc3339()
    );
}

pub fn trace(target: &str, message: impl fmt::Display) {
    log(Level::Trace, target, message);
}

pub fn debug(target: &str, message: impl fmt::Display) {
    log(Level::Debug, target, message);
}

pub fn info(target: &str, message: impl fmt::Display) {
    log(Level::Info, target, message);
}

pub fn warn(target: &str, message: impl fmt::Display) {
    log(Level::Warn, target, message);
}

pub fn error(target: &str, message: impl fmt::Display) {
    log(Level::Error, target, message);
}
