//! Process-wide rolling file logs.
//!
//! # Responsibility
//! - Start `flexi_logger` once per process with size-based rotation.
//! - Capture panics as single-line, length-capped log events.
//!
//! # Invariants
//! - Repeating `init_logging` with the same settings is a no-op.
//! - A second call with a different level or directory is rejected.
//! - Events carry ids and counts only, never goal, task or email text.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "goalstore";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    EmptyDirectory,
    CreateDirectory { dir: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with different settings.
    AlreadyActive { active: LogSettings, requested: LogSettings },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDirectory => f.write_str("log directory cannot be empty"),
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyActive { active, requested } => write!(
                f,
                "logging already active as {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Normalized level and absolute log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

impl LogSettings {
    /// Parses `level` and resolves a relative `dir` against the working
    /// directory.
    pub fn new(level: &str, dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        let level = parse_level(level)?;
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(LoggingError::EmptyDirectory);
        }
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| LoggingError::CreateDirectory {
                    dir: dir.to_path_buf(),
                    source,
                })?
                .join(dir)
        };
        Ok(Self { level, dir })
    }
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "level={} dir={}",
            self.level.as_str().to_ascii_lowercase(),
            self.dir.display()
        )
    }
}

/// Starts file logging; warnings and errors are also copied to stderr.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| start_logger(settings))?;
    if active.settings != *settings {
        return Err(LoggingError::AlreadyActive {
            active: active.settings.clone(),
            requested: settings.clone(),
        });
    }
    Ok(())
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDirectory {
        dir: settings.dir.clone(),
        source,
    })?;

    let spec = settings.level.as_str().to_ascii_lowercase();
    let handle = Logger::try_with_str(&spec)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(&settings.dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok version={} os={} {settings}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(LoggingError::UnknownLevel(other.to_string())),
    }
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            one_line(&payload, PANIC_PAYLOAD_MAX_CHARS)
        );
        previous(info);
    }));
}

/// Collapses line breaks and caps length, marking truncation with `...`.
fn one_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\r', '\n'], " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let mut capped: String = flattened.chars().take(max_chars).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, parse_level, LogSettings, LoggingError};
    use log::LevelFilter;

    #[test]
    fn parse_level_accepts_aliases_and_rejects_unknown() {
        assert_eq!(parse_level(" WARNING ").unwrap(), LevelFilter::Warn);
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::UnknownLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn relative_dir_resolves_to_absolute() {
        let settings = LogSettings::new("info", "logs").unwrap();
        assert!(settings.dir.is_absolute());
        assert!(settings.dir.ends_with("logs"));
        assert!(matches!(
            LogSettings::new("info", ""),
            Err(LoggingError::EmptyDirectory)
        ));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        assert_eq!(one_line("a\nb", 10), "a b");
        assert_eq!(one_line("abcdef", 3), "abc...");
    }

    #[test]
    fn init_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings::new("info", dir.path()).unwrap();

        init_logging(&settings).unwrap();
        init_logging(&settings).unwrap();

        let louder = LogSettings::new("debug", dir.path()).unwrap();
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::AlreadyActive { .. })
        ));
        assert_eq!(logging_status(), Some(settings));
    }
}
