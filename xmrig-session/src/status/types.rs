//! Worker status data transfer objects.
//!
//! These mirror the parts of the worker's `/2/summary` response the session
//! uses. Unknown fields are ignored and missing ones default, so a partial
//! or newer response still parses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status summary reported by the worker's HTTP endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MinerSummary {
    pub id: Option<String>,
    pub worker_id: Option<String>,
    pub version: Option<String>,
    /// Seconds since the worker started.
    pub uptime: u64,
    pub algo: Option<String>,
    pub hashrate: Hashrate,
    pub results: Results,
    pub connection: Connection,
}

/// Hashrate figures in hashes per second.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Hashrate {
    /// Averages over the worker's reporting windows (10 s, 60 s, 15 min).
    ///
    /// Kept as raw JSON: the worker reports `null` while a window has no
    /// data yet, and some builds report numbers as strings.
    pub total: Vec<Value>,
    pub highest: Option<f64>,
}

/// Share accounting.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Results {
    pub diff_current: u64,
    pub shares_good: u64,
    pub shares_total: u64,
    pub hashes_total: u64,
}

/// Pool connection status.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Connection {
    pub pool: Option<String>,
    pub uptime: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// One alive-poll result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlivePoll {
    /// Whether the worker answered.
    pub alive: bool,
    /// Latest summary, when the worker answered with one.
    pub status: Option<MinerSummary>,
}

impl AlivePoll {
    pub fn alive(status: MinerSummary) -> Self {
        Self {
            alive: true,
            status: Some(status),
        }
    }

    pub fn not_alive() -> Self {
        Self {
            alive: false,
            status: None,
        }
    }
}
