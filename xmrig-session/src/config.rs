//! Session tunables.
//!
//! Defaults match what the compiled worker configuration forces on (the
//! status endpoint at `127.0.0.1:50080`). Each field can be overridden from
//! the environment with [`SessionConfig::from_env`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Loopback host the worker's HTTP status endpoint is bound to.
pub const STATUS_HOST: &str = "127.0.0.1";

/// Port the worker's HTTP status endpoint is bound to.
pub const STATUS_PORT: u16 = 50080;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host of the worker's status endpoint.
    pub status_host: String,

    /// Port of the worker's status endpoint.
    pub status_port: u16,

    /// Interval between alive polls.
    pub poll_interval: Duration,

    /// Per-request timeout for alive polls. A poll that times out counts as
    /// "not alive".
    pub poll_timeout: Duration,

    /// Number of hashrate samples kept for charting.
    pub hashrate_capacity: usize,

    /// Number of log entries kept before the oldest are evicted.
    pub log_capacity: usize,

    /// Depth of the controller's event inbox.
    pub inbox_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_host: STATUS_HOST.to_string(),
            status_port: STATUS_PORT,
            poll_interval: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(1),
            hashrate_capacity: 60,
            log_capacity: 1000,
            inbox_depth: 64,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by any `XMRIG_SESSION_*` variables that are set.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `XMRIG_SESSION_STATUS_HOST` | `status_host` |
    /// | `XMRIG_SESSION_STATUS_PORT` | `status_port` |
    /// | `XMRIG_SESSION_POLL_INTERVAL_MS` | `poll_interval` |
    /// | `XMRIG_SESSION_POLL_TIMEOUT_MS` | `poll_timeout` |
    /// | `XMRIG_SESSION_HASHRATE_CAPACITY` | `hashrate_capacity` |
    /// | `XMRIG_SESSION_LOG_CAPACITY` | `log_capacity` |
    /// | `XMRIG_SESSION_INBOX_DEPTH` | `inbox_depth` |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("XMRIG_SESSION_STATUS_HOST") {
            config.status_host = host;
        }
        if let Some(port) = parse_var(&lookup, "XMRIG_SESSION_STATUS_PORT")? {
            config.status_port = port;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "XMRIG_SESSION_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "XMRIG_SESSION_POLL_TIMEOUT_MS")? {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse_var(&lookup, "XMRIG_SESSION_HASHRATE_CAPACITY")? {
            config.hashrate_capacity = capacity;
        }
        if let Some(capacity) = parse_var(&lookup, "XMRIG_SESSION_LOG_CAPACITY")? {
            config.log_capacity = capacity;
        }
        if let Some(depth) = parse_var(&lookup, "XMRIG_SESSION_INBOX_DEPTH")? {
            config.inbox_depth = depth;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would leave a session unable to run.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        if self.hashrate_capacity == 0 || self.log_capacity == 0 || self.inbox_depth == 0 {
            return Err(Error::Config(
                "hashrate capacity, log capacity and inbox depth must be positive".into(),
            ));
        }
        Ok(())
    }

    /// URL of the worker's summary endpoint.
    pub fn summary_url(&self) -> String {
        format!("http://{}:{}/2/summary", self.status_host, self.status_port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
    }
}
