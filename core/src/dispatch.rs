//! Request dispatch with bounded retry on network failure.
//!
//! # Design
//! A request that gets no response at all is re-sent with the same
//! arguments after an exponentially growing delay, up to
//! `RetryPolicy::max_attempts` attempts in total. Any HTTP response,
//! whatever its status, ends the loop and is handed back unmodified.
//! Failures the transport marks as not retryable (a malformed request, a
//! body cut off after the status line) end the loop after one attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// How often and how patiently to re-send after a network failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Counters kept across all requests sent through one dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    retried: AtomicU64,
    exhausted: AtomicU64,
}

impl DispatchStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }
}

/// Sends requests through a shared transport, retrying network failures.
pub struct Dispatcher<T> {
    transport: Arc<T>,
    policy: RetryPolicy,
    stats: Arc<DispatchStats>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            policy,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Send `request`, re-sending on network failure per the policy.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(method = %request.method, url = %request.url(), attempt, "sending request");
            self.stats.sent.fetch_add(1, Ordering::Relaxed);
            match self.transport.execute(request.clone()).await {
                Ok(response) => {
                    debug!(status = response.status, attempt, "response received");
                    return Ok(response);
                }
                Err(err) if !err.is_retryable() => {
                    error!(url = %request.url(), attempt, error = %err, "request failed, not retrying");
                    return Err(ApiError::NotRetried(err));
                }
                Err(err) if attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(url = %request.url(), attempt, ?delay, error = %err, "network failure, retrying");
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(url = %request.url(), attempts = attempt, error = %err, "network failure, giving up");
                    self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
            }
        }
    }

    /// Send `request` on a spawned task and hand the raw response to
    /// `callback`. The callback runs at most once and is dropped unrun when
    /// the send fails; the cause is logged and returned through the handle.
    ///
    /// Aborting the handle cancels any scheduled retry and guarantees the
    /// callback never runs. An attempt already inside a blocking transport
    /// (such as [`UreqTransport`](crate::UreqTransport)) still runs to
    /// completion; its response is discarded.
    pub fn send_with<F>(&self, request: HttpRequest, callback: F) -> JoinHandle<Result<(), ApiError>>
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let response = dispatcher.send(request).await?;
            callback(response);
            Ok(())
        })
    }
}
