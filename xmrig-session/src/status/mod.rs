//! Worker status: the alive-poll contract and an HTTP poller for it.

mod poller;
mod types;

pub use poller::StatusPoller;
pub use types::{AlivePoll, Connection, Hashrate, MinerSummary, Results};
