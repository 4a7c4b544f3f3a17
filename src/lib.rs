//! State store for a single-user task list: auth, tasks and theme slices,
//! hydrated from and written through to a key/value store.
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod theme;
pub mod weather;

pub use crate::config::AppConfig;
pub use crate::error::{CredentialError, StoreError, ValidationError};
pub use crate::events::{Slice, StateChange};
pub use crate::models::{
    Priority, Session, SortMode, Task, TaskDraft, TaskFilter, ThemePreferences, Weather,
};
pub use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use crate::store::{Action, RootState, Store, SubscriptionId};

/// Opens the file-backed store under `config.data_dir` and hydrates it.
pub fn open(config: &AppConfig) -> Result<Store<FileStore>, StorageError> {
    let storage = FileStore::new(config.data_dir.clone());
    storage.ensure_dirs()?;
    Ok(Store::open(storage))
}

/// A hydrated file-backed store with file logging running.
#[cfg(feature = "app")]
pub struct App {
    pub store: Store<FileStore>,
    logger: flexi_logger::LoggerHandle,
}

#[cfg(feature = "app")]
impl App {
    pub fn flush_logs(&self) {
        self.logger.flush();
    }
}

/// Starts logging under [`AppConfig::log_dir`], then [`open`]s the store.
#[cfg(feature = "app")]
pub fn start(config: &AppConfig) -> Result<App, error::StartupError> {
    let settings = logging::LogSettings::resolve(config, |name| std::env::var(name).ok());
    let logger = logging::init_logging(&settings)?;
    let store = open(config)?;
    log::info!(
        "store opened data_dir={} tasks={} authenticated={}",
        config.data_dir.display(),
        store.state().tasks.tasks().len(),
        store.state().auth.is_authenticated()
    );
    Ok(App { store, logger })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_data_dir_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("nested").join("data"),
            ..AppConfig::default()
        };

        let mut store = open(&config).expect("open");
        store.login("admin", "password").unwrap();
        let task = store.add_task(TaskDraft::new("persisted")).unwrap();
        store.dispatch(Action::ToggleCompactMode).unwrap();
        drop(store);

        let reopened = open(&config).expect("reopen");
        assert!(reopened.state().auth.is_authenticated());
        assert_eq!(reopened.state().tasks.tasks(), &[task]);
        assert!(reopened.state().theme.preferences().compact_mode);
    }

    #[test]
    fn open_fails_when_data_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();
        let config = AppConfig {
            data_dir: file,
            ..AppConfig::default()
        };
        assert!(matches!(open(&config), Err(StorageError::Io(_))));
    }

    // Installs the global logger; keep this the only test that calls `start`.
    #[cfg(feature = "app")]
    #[test]
    fn start_writes_log_file_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };

        let mut app = start(&config).expect("start");
        app.store.add_task(TaskDraft::new("logged")).unwrap();
        app.flush_logs();

        let logs: Vec<String> = std::fs::read_dir(config.log_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(logging::LOG_FILE_BASENAME) && name.ends_with(".log"))
            .collect();
        assert!(!logs.is_empty(), "no log file in {:?}", config.log_dir());
        assert!(app.store.storage().load(persistence::TASKS_KEY).is_some());
    }
}
