use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slice {
    Auth,
    Tasks,
    Theme,
}

/// Delivered to subscribers after a mutation changed the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StateChange {
    pub slice: Slice,
    pub action: &'static str,
    /// True once the change is in storage. False for view-only changes and
    /// auth status, and when the write-through failed; in-memory state is
    /// current either way.
    pub persisted: bool,
}
