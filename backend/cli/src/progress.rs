//! Request timing for the upload client.
//!
//! Two independent timers: [`CancellationPolicy`] bounds the HTTP request and
//! [`ProgressTicker`] only drives the "still analyzing" output. Neither knows
//! about the other.

use std::time::Duration;

use reqwest::RequestBuilder;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Hard timeout on one analysis request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// How long the progress ticker keeps printing.
pub const PROGRESS_WINDOW: Duration = Duration::from_secs(30);

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// When an in-flight request is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct CancellationPolicy {
    pub request_timeout: Duration,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl CancellationPolicy {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.timeout(self.request_timeout)
    }
}

/// Calls `on_tick` every `interval` until `window` has elapsed or the ticker
/// is stopped. Dropping the ticker stops it too.
pub struct ProgressTicker {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u32>>,
}

impl ProgressTicker {
    pub fn start<F>(window: Duration, interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(Duration) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticks = interval_at(started + interval, interval);
            let mut count = 0u32;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    at = ticks.tick() => {
                        let elapsed = at.duration_since(started);
                        if elapsed >= window {
                            break;
                        }
                        count += 1;
                        on_tick(elapsed);
                    }
                }
            }
            count
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop ticking and return how many ticks fired.
    pub async fn stop(mut self) -> u32 {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}
