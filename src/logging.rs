use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;
use crate::error::{Result, TrackerError};

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: "INFO".to_string(),
            file: Some(PathBuf::from("wallet_tracker.log")),
        }
    }
}

/// Log sink for one run. Nothing is installed globally: the run executes
/// under [`RunLogger::dispatch`] (see `WithSubscriber`) and logging stops
/// with it.
#[derive(Clone)]
pub struct RunLogger {
    dispatch: Dispatch,
}

impl RunLogger {
    /// stdout plus the configured log file (appended, no ANSI colours).
    pub fn new(settings: &LogSettings) -> Result<Self> {
        let filter = EnvFilter::try_new(settings.level.to_ascii_lowercase())
            .map_err(|e| TrackerError::Config(format!("invalid LOG_LEVEL '{}': {}", settings.level, e)))?;

        let dispatch = match &settings.file {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let subscriber = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::io::stdout.and(Mutex::new(file)))
                    .finish();
                Dispatch::new(subscriber)
            }
            None => {
                let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
                Dispatch::new(subscriber)
            }
        };
        Ok(RunLogger { dispatch })
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Runs `f` with this logger as the current default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_logs_go_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = RunLogger::new(&LogSettings {
            level: "DEBUG".to_string(),
            file: Some(path.clone()),
        })
        .unwrap();

        logger.in_scope(|| {
            tracing::debug!("scoped debug line");
            tracing::trace!("filtered trace line");
        });
        tracing::info!("outside the run");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("scoped debug line"));
        assert!(!text.contains("filtered trace line"));
        assert!(!text.contains("outside the run"));
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let settings = LogSettings {
            level: "wallet_tracker=loud".to_string(),
            file: None,
        };
        assert!(matches!(RunLogger::new(&settings), Err(TrackerError::Config(_))));
    }
}
