use std::path::PathBuf;

use crate::config::AppConfig;

pub const LOG_FILE_BASENAME: &str = "taskboard";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub spec: String,
    /// Mirror info and above to stderr as well as the file.
    pub echo_to_stderr: bool,
}

impl LogSettings {
    pub fn resolve(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dir: config.log_dir(),
            spec: log_spec(lookup),
            echo_to_stderr: cfg!(debug_assertions),
        }
    }
}

/// Picks the log spec: `TASKBOARD_LOG`, then `RUST_LOG`, then a build-dependent default.
pub fn log_spec(lookup: impl Fn(&str) -> Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,taskboard=debug"
    } else {
        "warn,taskboard=info"
    };
    ["TASKBOARD_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Starts the rotating file logger. Logging stops when the handle is dropped.
#[cfg(feature = "app")]
pub fn init_logging(
    settings: &LogSettings,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(&settings.dir)?;
    let echo = if settings.echo_to_stderr {
        Duplicate::Info
    } else {
        Duplicate::None
    };

    let handle = Logger::try_with_str(&settings.spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&settings.dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(echo)
        .start()?;

    log_panics();
    log::info!(
        "logging to dir={} spec={}",
        settings.dir.display(),
        settings.spec
    );
    Ok(handle)
}

#[cfg(feature = "app")]
fn log_panics() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let thread = std::thread::current();
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!(
            "panic thread={} at={location}: {}",
            thread.name().unwrap_or("<unnamed>"),
            panic_message(info.payload())
        );
        previous(info);
    }));
}

#[cfg(feature = "app")]
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
