//! Session lifecycle control for an XMRig mining worker.
//!
//! The [`session::SessionController`] owns the start/stop state machine for
//! one mining session. It compiles the selected stored configuration into
//! the worker's runtime configuration ([`config_compiler`]), classifies and
//! orders the worker's streamed log lines ([`log`]), keeps a bounded
//! hashrate history from status polls ([`hashrate`]), and reconciles
//! configuration the worker rewrites on its own back into the settings
//! store ([`settings`]).
//!
//! Process supervision, the settings store and the event bridge are
//! collaborators reached through traits and channels; [`status`] provides a
//! reference HTTP poller for the worker's local status endpoint.

pub mod config;
pub mod config_compiler;
pub mod error;
pub mod hashrate;
pub mod log;
pub mod session;
pub mod settings;
pub mod status;
pub mod tracing;
