//! Logging setup for LeadLens binaries.
//!
//! Two sinks: a size-rotated file under the LeadLens logs directory and stderr.
//! `RUST_LOG` overrides the default filter for both.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "leadlens=info,leadlens_security=info,leadlens_enrich=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for a LeadLens binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub log_dir: PathBuf,
    /// Mirror the file filter on stderr instead of only warnings.
    pub verbose: bool,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("Failed to create logs directory: {}", config.log_dir.display())
    })?;
    let file_writer = RollingWriter::open(&config.log_dir, config.app_name)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Append-only log file rotated by size: `app.log`, `app.log.1` .. `app.log.N`.
struct RollingFile {
    dir: PathBuf,
    stem: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            stem: sanitize_name(app_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            written: 0,
        };
        rolling.reopen()?;
        if rolling.written > rolling.max_size {
            rolling.rotate()?;
        }
        Ok(rolling)
    }

    fn path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.stem))
        } else {
            self.dir.join(format!("{}.log.{}", self.stem, index))
        }
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(0))?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let oldest = self.max_files - 1;
        if oldest > 0 {
            let dropped = self.path(oldest);
            if dropped.exists() {
                fs::remove_file(&dropped)?;
            }
            for index in (0..oldest).rev() {
                let src = self.path(index);
                if src.exists() {
                    fs::rename(&src, self.path(index + 1))?;
                }
            }
        } else {
            // Single-file mode: truncate in place.
            let _ = fs::remove_file(self.path(0));
        }

        self.reopen()
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Cloneable handle handed to `tracing_subscriber` as a `MakeWriter`.
#[derive(Clone)]
struct RollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl RollingWriter {
    fn open(dir: &Path, app_name: &str) -> io::Result<Self> {
        Self::with_limits(dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
    }

    fn with_limits(dir: &Path, app_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        let file = RollingFile::open(dir, app_name, max_files, max_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut RollingFile) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut guard)
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
