use std::time::Duration;

use chrono::{SubsecRound, Utc};

use crate::auth::{AuthState, CredentialVerifier, DemoCredentials};
use crate::error::{HydrationError, StoreError};
use crate::events::{Slice, StateChange};
use crate::models::{PartialTheme, Priority, Session, SortMode, Task, TaskDraft, TaskFilter};
use crate::persistence::{
    PersistOp, Persistence, DEFAULT_PRIORITY_KEY, TASKS_KEY, THEME_KEY, USER_KEY,
};
use crate::storage::KeyValueStore;
use crate::tasks::{validate_title, IdGenerator, TasksState};
use crate::theme::ThemeState;
use crate::weather::{resolve_weather, WeatherLookup};

/// Mutation requests accepted by [`Store::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BeginLogin,
    CompleteLogin { username: String, password: String },
    Logout,
    AddTask(TaskDraft),
    RemoveTask(String),
    ToggleTask(String),
    SetFilter(TaskFilter),
    SetSortBy(SortMode),
    SetDefaultPriority(Priority),
    ToggleDarkMode,
    ToggleCompactMode,
    ToggleWeatherDisplay,
    SetPrimaryColor(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::BeginLogin => "begin_login",
            Action::CompleteLogin { .. } => "complete_login",
            Action::Logout => "logout",
            Action::AddTask(_) => "add_task",
            Action::RemoveTask(_) => "remove_task",
            Action::ToggleTask(_) => "toggle_task",
            Action::SetFilter(_) => "set_filter",
            Action::SetSortBy(_) => "set_sort_by",
            Action::SetDefaultPriority(_) => "set_default_priority",
            Action::ToggleDarkMode => "toggle_dark_mode",
            Action::ToggleCompactMode => "toggle_compact_mode",
            Action::ToggleWeatherDisplay => "toggle_weather_display",
            Action::SetPrimaryColor(_) => "set_primary_color",
        }
    }

    pub fn slice(&self) -> Slice {
        match self {
            Action::BeginLogin | Action::CompleteLogin { .. } | Action::Logout => Slice::Auth,
            Action::AddTask(_)
            | Action::RemoveTask(_)
            | Action::ToggleTask(_)
            | Action::SetFilter(_)
            | Action::SetSortBy(_)
            | Action::SetDefaultPriority(_) => Slice::Tasks,
            Action::ToggleDarkMode
            | Action::ToggleCompactMode
            | Action::ToggleWeatherDisplay
            | Action::SetPrimaryColor(_) => Slice::Theme,
        }
    }
}

/// The whole state tree. Read it through [`Store::state`]; change it only by dispatching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub auth: AuthState,
    pub tasks: TasksState,
    pub theme: ThemeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&RootState, &StateChange)>;

/// Result of applying one action to its slice.
struct Applied {
    changed: bool,
    persist: Option<PersistOp>,
}

impl Applied {
    fn new(changed: bool, persist: Option<PersistOp>) -> Self {
        Self { changed, persist }
    }

    fn changed(persist: Option<PersistOp>) -> Self {
        Self::new(true, persist)
    }
}

pub struct Store<S: KeyValueStore> {
    state: RootState,
    persistence: Persistence<S>,
    verifier: Box<dyn CredentialVerifier>,
    ids: IdGenerator,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> Store<S> {
    /// Empty store backed by `storage`; nothing is read until [`Store::hydrate`].
    pub fn new(storage: S) -> Self {
        Self::with_verifier(storage, DemoCredentials)
    }

    pub fn with_verifier(storage: S, verifier: impl CredentialVerifier + 'static) -> Self {
        Self {
            state: RootState::default(),
            persistence: Persistence::new(storage),
            verifier: Box::new(verifier),
            ids: IdGenerator::default(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// [`Store::new`] followed by [`Store::hydrate`].
    pub fn open(storage: S) -> Self {
        let mut store = Self::new(storage);
        store.hydrate();
        store
    }

    pub fn state(&self) -> &RootState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        self.persistence.store()
    }

    /// Restores every slice from storage. Missing keys keep defaults; corrupt
    /// ones are logged, removed, and also keep defaults. Nothing is written back.
    pub fn hydrate(&mut self) {
        if let Some(session) = self.persistence.read_json::<Session>(USER_KEY) {
            if let Err(err) = self.state.auth.hydrate(session) {
                self.persistence.discard(USER_KEY, &err);
            }
        }

        if let Some(tasks) = self.persistence.read_json::<Vec<Task>>(TASKS_KEY) {
            self.ids = IdGenerator::seeded(&tasks);
            self.state.tasks.replace_all(tasks);
        }

        if let Some(raw) = self.persistence.load_raw(DEFAULT_PRIORITY_KEY) {
            match raw.parse::<Priority>() {
                Ok(priority) => {
                    self.state.tasks.set_default_priority(priority);
                }
                Err(_) => self.persistence.discard(
                    DEFAULT_PRIORITY_KEY,
                    &HydrationError::Unrecognised {
                        key: DEFAULT_PRIORITY_KEY,
                        value: raw,
                    },
                ),
            }
        }

        if let Some(partial) = self.persistence.read_json::<PartialTheme>(THEME_KEY) {
            self.state.theme.hydrate(partial);
        }

        log::debug!(
            "hydrated authenticated={} tasks={}",
            self.state.auth.is_authenticated(),
            self.state.tasks.tasks().len()
        );
        for slice in [Slice::Auth, Slice::Tasks, Slice::Theme] {
            self.notify(StateChange {
                slice,
                action: "hydrate",
                persisted: true,
            });
        }
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&RootState, &StateChange) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Applies `action` to its slice, writes the slice through to storage when
    /// it is durable, then notifies subscribers if anything changed.
    ///
    /// Storage failures are logged and do not fail the action.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        let slice = action.slice();
        let name = action.name();
        log::debug!("dispatch action={name}");

        match self.apply(action) {
            Ok(applied) => {
                self.commit(slice, name, applied);
                Ok(())
            }
            Err(err) => {
                // A rejected login still updates the auth status; that is never stored.
                if matches!(err, StoreError::Credential(_)) {
                    self.notify(StateChange {
                        slice,
                        action: name,
                        persisted: false,
                    });
                }
                Err(err)
            }
        }
    }

    /// `BeginLogin` then `CompleteLogin`.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        self.dispatch(Action::BeginLogin)?;
        self.dispatch(Action::CompleteLogin {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn logout(&mut self) {
        // Logout cannot be rejected.
        let _ = self.dispatch(Action::Logout);
    }

    /// Adds a task and returns the stored copy.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        log::debug!("dispatch action=add_task");
        let task = self.insert_task(draft)?;
        self.commit(Slice::Tasks, "add_task", Applied::changed(Some(PersistOp::Tasks)));
        Ok(task)
    }

    /// Like [`Store::add_task`], but first looks up weather for the draft's
    /// location when none was supplied. The lookup is bounded by `timeout` and
    /// any failure just leaves the task without weather.
    pub async fn add_task_enriched<W: WeatherLookup>(
        &mut self,
        mut draft: TaskDraft,
        lookup: &W,
        timeout: Duration,
    ) -> Result<Task, StoreError> {
        validate_title(&draft.title)?;
        if draft.weather.is_none() {
            if let Some(location) = draft.location() {
                draft.weather = resolve_weather(lookup, location, timeout).await;
            }
        }
        self.add_task(draft)
    }

    fn insert_task(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        validate_title(&draft.title)?;
        let now = Utc::now().trunc_subsecs(3);
        let mut id = self.ids.next_id(now);
        while self.state.tasks.contains(&id) {
            id = self.ids.next_id(now);
        }
        let task = self.state.tasks.add(draft, id, now)?;
        Ok(task.clone())
    }

    fn commit(&mut self, slice: Slice, action: &'static str, applied: Applied) {
        let persisted = match applied.persist {
            Some(op) => match self.persistence.flush(op, &self.state) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("write-through failed key={} err={err}", op.key());
                    false
                }
            },
            None => false,
        };
        if applied.changed {
            self.notify(StateChange {
                slice,
                action,
                persisted,
            });
        }
    }

    fn apply(&mut self, action: Action) -> Result<Applied, StoreError> {
        let applied = match action {
            Action::BeginLogin => {
                self.state.auth.begin_login();
                Applied::changed(None)
            }
            Action::CompleteLogin { username, password } => {
                let result =
                    self.state
                        .auth
                        .complete_login(self.verifier.as_ref(), &username, &password);
                match result {
                    Ok(session) => log::info!("login succeeded username={}", session.username),
                    Err(err) => {
                        log::info!("login rejected username={username}");
                        return Err(err.into());
                    }
                }
                Applied::changed(Some(PersistOp::Session))
            }
            Action::Logout => {
                self.state.auth.logout();
                log::info!("logged out");
                Applied::changed(Some(PersistOp::Session))
            }
            Action::AddTask(draft) => {
                self.insert_task(draft)?;
                Applied::changed(Some(PersistOp::Tasks))
            }
            // Removal writes through even when nothing matched.
            Action::RemoveTask(id) => {
                Applied::new(self.state.tasks.remove(&id), Some(PersistOp::Tasks))
            }
            Action::ToggleTask(id) => {
                if self.state.tasks.toggle_completed(&id) {
                    Applied::changed(Some(PersistOp::Tasks))
                } else {
                    Applied::new(false, None)
                }
            }
            Action::SetFilter(filter) => Applied::new(self.state.tasks.set_filter(filter), None),
            Action::SetSortBy(sort_by) => {
                Applied::new(self.state.tasks.set_sort_by(sort_by), None)
            }
            Action::SetDefaultPriority(priority) => Applied::new(
                self.state.tasks.set_default_priority(priority),
                Some(PersistOp::DefaultPriority),
            ),
            Action::ToggleDarkMode => {
                self.state.theme.toggle_dark_mode();
                Applied::changed(Some(PersistOp::Theme))
            }
            Action::ToggleCompactMode => {
                self.state.theme.toggle_compact_mode();
                Applied::changed(Some(PersistOp::Theme))
            }
            Action::ToggleWeatherDisplay => {
                self.state.theme.toggle_weather_display();
                Applied::changed(Some(PersistOp::Theme))
            }
            Action::SetPrimaryColor(name) => Applied::new(
                self.state.theme.set_primary_color(name),
                Some(PersistOp::Theme),
            ),
        };
        Ok(applied)
    }

    fn notify(&mut self, change: StateChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &change);
        }
    }
}
