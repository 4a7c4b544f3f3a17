use std::cmp::Ordering;

use crate::error::ValidationError;
use crate::models::{Priority, SortMode, Task, TaskDraft, TaskFilter, Timestamp};

/// Task collection in insertion order plus the list's view preferences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TasksState {
    tasks: Vec<Task>,
    filter: TaskFilter,
    sort_by: SortMode,
    default_priority: Priority,
}

pub fn validate_title(title: &str) -> Result<&str, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title)
}

impl TasksState {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn sort_by(&self) -> SortMode {
        self.sort_by
    }

    pub fn default_priority(&self) -> Priority {
        self.default_priority
    }

    /// Appends a task built from `draft`. The caller supplies a fresh `id`.
    pub fn add(
        &mut self,
        draft: TaskDraft,
        id: String,
        created_at: Timestamp,
    ) -> Result<&Task, ValidationError> {
        let title = validate_title(&draft.title)?.to_string();
        let location = draft.location().map(str::to_string);
        // Weather only makes sense attached to a location.
        let weather = location.as_ref().and(draft.weather);
        let task = Task {
            id,
            title,
            description: draft.description.trim().to_string(),
            priority: draft.priority.unwrap_or(self.default_priority),
            completed: false,
            created_at,
            deadline: draft.deadline,
            location,
            weather,
        };
        self.tasks.push(task);
        let index = self.tasks.len() - 1;
        Ok(&self.tasks[index])
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Returns whether a task with `id` exists.
    pub fn toggle_completed(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn set_filter(&mut self, filter: TaskFilter) -> bool {
        std::mem::replace(&mut self.filter, filter) != filter
    }

    pub fn set_sort_by(&mut self, sort_by: SortMode) -> bool {
        std::mem::replace(&mut self.sort_by, sort_by) != sort_by
    }

    pub fn set_default_priority(&mut self, priority: Priority) -> bool {
        std::mem::replace(&mut self.default_priority, priority) != priority
    }

    /// Filtered and sorted view, computed fresh on every call.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let mut visible: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect();
        let sort_by = self.sort_by;
        visible.sort_by(|a, b| compare(sort_by, a, b));
        visible
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }
}

fn compare(sort_by: SortMode, a: &Task, b: &Task) -> Ordering {
    match sort_by {
        SortMode::Newest => b.created_at.cmp(&a.created_at),
        SortMode::Oldest => a.created_at.cmp(&b.created_at),
        SortMode::Deadline => {
            // Undated tasks go last; ties fall back to creation order.
            let by_deadline = match (a.deadline, b.deadline) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_deadline.then_with(|| a.created_at.cmp(&b.created_at))
        }
    }
}

/// Time-derived ids: milliseconds since the epoch, bumped past the last issued
/// value so ids stay unique even within one millisecond.
///
/// Once the counter sits at `i64::MAX` (only reachable through stored ids),
/// further ids get a `-<n>` suffix instead.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
    suffix: u64,
}

impl IdGenerator {
    /// Starts above every numeric id already in `tasks`.
    pub fn seeded(tasks: &[Task]) -> Self {
        let last = tasks
            .iter()
            .filter_map(|task| task.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self { last, suffix: 0 }
    }

    pub fn next_id(&mut self, now: Timestamp) -> String {
        let candidate = now.timestamp_millis();
        if candidate > self.last {
            self.last = candidate;
            return self.last.to_string();
        }
        match self.last.checked_add(1) {
            Some(next) => {
                self.last = next;
                next.to_string()
            }
            None => {
                self.suffix += 1;
                format!("{}-{}", self.last, self.suffix)
            }
        }
    }
}
