use serde::Serialize;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StartMode {
    Start,
    #[default]
    Stop,
}

/// Whether the worker is believed to be running.
///
/// Derived from user intent and alive polls together: the worker can die
/// on its own, so intent alone says nothing about whether it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingState {
    #[default]
    NotWorking,
    Mining,
}
