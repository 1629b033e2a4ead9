use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::types::{AlivePoll, MinerSummary};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::session::SessionHandle;
use crate::tracing::prelude::*;

/// Polls the worker's HTTP summary endpoint and reports liveness.
///
/// Any HTTP response counts as alive, since only a running worker can
/// answer. Connection failures and timeouts count as not alive.
pub struct StatusPoller {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        Self::with_url(config.summary_url(), config.poll_timeout, config.poll_interval)
    }

    pub fn with_url(url: String, timeout: Duration, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the summary, failing on transport errors, non-success status
    /// or an unparsable body.
    pub async fn fetch_summary(&self) -> Result<MinerSummary> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(response.json().await?)
    }

    /// One alive poll.
    pub async fn poll_once(&self) -> AlivePoll {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                trace!(url = %self.url, error = %e, "Status endpoint unreachable");
                return AlivePoll::not_alive();
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(url = %self.url, %status, "Status endpoint answered with error");
            return AlivePoll {
                alive: true,
                status: None,
            };
        }

        match response.json::<MinerSummary>().await {
            Ok(summary) => AlivePoll::alive(summary),
            Err(e) => {
                debug!(url = %self.url, error = %e, "Unparsable status summary");
                AlivePoll {
                    alive: true,
                    status: None,
                }
            }
        }
    }

    /// Poll on a fixed interval, forwarding each result to the session,
    /// until cancelled or the session goes away.
    pub async fn run(self, session: SessionHandle, cancellation: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        debug!(url = %self.url, interval = ?self.interval, "Status poller started");

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    break;
                }
                _ = interval.tick() => {
                    let poll = self.poll_once().await;
                    if session.report_poll(poll).await.is_err() {
                        debug!("Session closed, stopping status poller");
                        break;
                    }
                }
            }
        }

        debug!(url = %self.url, "Status poller stopped");
    }
}
