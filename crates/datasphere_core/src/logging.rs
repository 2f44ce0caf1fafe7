//! Logging bootstrap and safety policy.
//!
//! # Responsibility
//! - Initialize the `log` backend exactly once per process for the selected
//!   environment mode.
//! - Provide request identifiers used to correlate storage events.
//!
//! # Invariants
//! - Logging init is idempotent for identical settings.
//! - Logging initialization must not panic.
//! - Re-initialization with different settings is rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

const LOG_FILE_BASENAME: &str = "datasphere";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    mode: LogMode,
    log_dir: Option<PathBuf>,
    _logger: Option<LoggerHandle>,
}

/// Deployment environment selecting log destination and verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    /// No backend is installed; every event is dropped.
    Disable,
    /// Colored detailed lines on stdout at `debug`.
    Local,
    /// Rotating files at `debug`.
    Dev,
    /// Rotating files at `info`.
    Prod,
}

impl LogMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Level spec passed to the backend.
    pub fn level(self) -> &'static str {
        match self {
            Self::Disable => "off",
            Self::Local | Self::Dev => "debug",
            Self::Prod => "info",
        }
    }

    /// Whether this mode writes to files and therefore needs a directory.
    pub fn writes_files(self) -> bool {
        matches!(self, Self::Dev | Self::Prod)
    }
}

impl Display for LogMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" | "test" => Ok(Self::Disable),
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(format!(
                "unsupported environment `{other}`; expected disable|local|dev|prod"
            )),
        }
    }
}

/// Initializes logging for `mode`.
///
/// `log_dir` is required for file-writing modes and ignored otherwise.
///
/// # Errors
/// - Returns an error when a file mode has no directory, or the directory is
///   empty, relative, or cannot be created.
/// - Returns an error when logging is already active with other settings.
/// - Returns an error when logger backend setup fails.
pub fn init_logging(mode: LogMode, log_dir: Option<&Path>) -> Result<(), String> {
    let normalized_dir = if mode.writes_files() {
        let dir = log_dir.ok_or_else(|| format!("log mode `{mode}` requires a log directory"))?;
        Some(normalize_log_dir(dir)?)
    } else {
        None
    };

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = start_backend(mode, normalized_dir.as_deref())?;
        if logger.is_some() {
            install_panic_hook_once();
        }

        info!(
            "event=app_start module=core status=ok platform={} build_mode={} version={}",
            std::env::consts::OS,
            build_mode(),
            env!("CARGO_PKG_VERSION")
        );
        info!("event=core_init module=core status=ok mode={mode}");

        Ok(LoggingState {
            mode,
            log_dir: normalized_dir.clone(),
            _logger: logger,
        })
    })?;

    if state.mode != mode {
        return Err(format!(
            "logging already initialized in mode `{}`; refusing to switch to `{mode}`",
            state.mode
        ));
    }
    if state.log_dir != normalized_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            display_dir(state.log_dir.as_deref()),
            display_dir(normalized_dir.as_deref())
        ));
    }

    Ok(())
}

/// Returns active logging mode and directory, or `None` before init.
pub fn logging_status() -> Option<(LogMode, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.mode, state.log_dir.clone()))
}

/// Generates a fresh request identifier for callers that have none.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn start_backend(mode: LogMode, log_dir: Option<&Path>) -> Result<Option<LoggerHandle>, String> {
    let level = mode.level();
    let logger = match (mode, log_dir) {
        (LogMode::Disable, _) => return Ok(None),
        (LogMode::Local, _) => Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level `{level}`: {err}"))?
            .log_to_stdout()
            .format_for_stdout(flexi_logger::colored_detailed_format),
        (LogMode::Dev | LogMode::Prod, Some(dir)) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;

            Logger::try_with_str(level)
                .map_err(|err| format!("invalid log level `{level}`: {err}"))?
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        (LogMode::Dev | LogMode::Prod, None) => {
            return Err(format!("log mode `{mode}` requires a log directory"))
        }
    };

    let handle = logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;
    Ok(Some(handle))
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    let text = log_dir.to_string_lossy();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn display_dir(dir: Option<&Path>) -> String {
    dir.map_or_else(|| "<none>".to_string(), |dir| dir.display().to_string())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payload may carry caller-controlled text (filenames); cap and flatten it.
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, new_request_id, normalize_log_dir, sanitize_message,
        LogMode,
    };
    use std::path::Path;

    #[test]
    fn log_mode_parses_known_values() {
        assert_eq!("PROD".parse::<LogMode>().unwrap(), LogMode::Prod);
        assert_eq!(" local ".parse::<LogMode>().unwrap(), LogMode::Local);
        assert_eq!("test".parse::<LogMode>().unwrap(), LogMode::Disable);
        let error = "staging".parse::<LogMode>().unwrap_err();
        assert!(error.contains("disable|local|dev|prod"));
    }

    #[test]
    fn file_modes_need_a_directory() {
        assert!(LogMode::Dev.writes_files());
        assert!(!LogMode::Local.writes_files());
        assert_eq!(LogMode::Prod.level(), "info");
        assert_eq!(LogMode::Dev.level(), "debug");
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error =
            normalize_log_dir(Path::new("logs/dev")).expect_err("relative paths must be rejected");
        assert!(error.contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(new_request_id(), new_request_id());
    }

    #[test]
    fn init_logging_is_idempotent_for_same_mode_and_rejects_conflicts() {
        init_logging(LogMode::Disable, None).expect("first init should succeed");
        init_logging(LogMode::Disable, None).expect("same mode should be idempotent");

        let error = init_logging(LogMode::Local, None).expect_err("mode conflict should fail");
        assert!(error.contains("refusing to switch"));

        let missing_dir =
            init_logging(LogMode::Prod, None).expect_err("file mode without dir should fail");
        assert!(missing_dir.contains("requires a log directory"));

        let (mode, dir) = logging_status().expect("logging should be active");
        assert_eq!(mode, LogMode::Disable);
        assert!(dir.is_none());
    }
}
