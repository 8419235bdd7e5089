//! Bounded status polling.
//!
//! [`wait_until_available`] starts a background task that re-describes one
//! instance or snapshot on a fixed interval until its status is
//! "available" or an overall timeout elapses. The single outcome comes back
//! through a [`WaitHandle`], which can be awaited like any future. There is
//! no cancellation; once an outcome is delivered no further describe calls
//! are made.

use crate::aws::rds::{RdsOperations, ResourceRef, current_status};
use anyhow::anyhow;
use rds_clone_common::defaults::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS, STATUS_AVAILABLE,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, interval_at, timeout};
use tracing::{Instrument, debug, info, warn};

/// Polling cadence and overall bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay before the first describe and between describes
    pub interval: Duration,
    /// Maximum total time to wait
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl WaitConfig {
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// How a wait ended
#[derive(Debug)]
pub enum WaitOutcome {
    /// Status reached "available"
    Ready,
    /// The timeout elapsed first
    TimedOut,
    /// A describe call failed
    Failed(anyhow::Error),
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready)
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitOutcome::Ready => f.write_str("succeeded"),
            WaitOutcome::TimedOut => f.write_str("timed out"),
            WaitOutcome::Failed(e) => write!(f, "failed: {e:#}"),
        }
    }
}

/// Awaitable result of a running wait
#[derive(Debug)]
pub struct WaitHandle {
    target: ResourceRef,
    rx: oneshot::Receiver<WaitOutcome>,
}

impl Future for WaitHandle {
    type Output = WaitOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let target = self.target.clone();
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                WaitOutcome::Failed(anyhow!("status waiter for {target} stopped without a result"))
            })
        })
    }
}

/// Start waiting for `target` to become available.
///
/// The poller runs on its own task inside the caller's tracing span.
pub fn wait_until_available<G>(rds: Arc<G>, target: ResourceRef, config: WaitConfig) -> WaitHandle
where
    G: RdsOperations + 'static,
{
    let (tx, rx) = oneshot::channel();
    let task_target = target.clone();

    tokio::spawn(
        async move {
            let outcome = poll_until_available(rds.as_ref(), &task_target, config).await;
            // Receiver gone means nobody is waiting any more
            let _ = tx.send(outcome);
        }
        .in_current_span(),
    );

    WaitHandle { target, rx }
}

async fn poll_until_available<G>(rds: &G, target: &ResourceRef, config: WaitConfig) -> WaitOutcome
where
    G: RdsOperations,
{
    info!(
        resource = %target,
        interval_secs = config.interval.as_secs(),
        timeout_secs = config.timeout.as_secs(),
        "Waiting for resource to become available"
    );

    let polling = async {
        let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
        let mut polls = 0u32;
        loop {
            ticker.tick().await;
            polls += 1;

            match current_status(rds, target).await {
                Ok(status) if status == STATUS_AVAILABLE => {
                    info!(resource = %target, polls, "Resource is available");
                    return WaitOutcome::Ready;
                }
                Ok(status) => {
                    debug!(resource = %target, status = %status, polls, "Resource not ready");
                }
                Err(e) => {
                    warn!(resource = %target, error = ?e, "Status check failed");
                    return WaitOutcome::Failed(e);
                }
            }
        }
    };

    match timeout(config.timeout, polling).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                resource = %target,
                timeout_secs = config.timeout.as_secs(),
                "Timed out waiting for resource"
            );
            WaitOutcome::TimedOut
        }
    }
}
