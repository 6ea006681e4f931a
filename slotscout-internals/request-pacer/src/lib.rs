//! Slotscout Request Pacer
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! slotscout-internals/request-pacer
//! Concurrency limiting and jittered spacing for calls to an external service.
//!
//! Every call runs exactly once: failures are handed back to the caller untouched.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{self, Instant};

#[derive(Debug, Error)]
pub enum PacerError {
    #[error("pacer is closed")]
    Closed,
}

/// Limits how many calls are in flight and how close together they start.
///
/// # Examples
///
/// Four calls in flight, no spacing:
/// ```ignore
/// let pacer = RequestPacer::with_concurrency_limit(4);
/// ```
///
/// One call at a time, 300ms apart plus up to 50% jitter:
/// ```ignore
/// let pacer = RequestPacer::with_concurrency_limit(1)
///     .min_interval(Duration::from_millis(300))
///     .jitter_factor(0.5);
/// ```
#[derive(Clone, Debug)]
pub struct RequestPacer {
    permits: Arc<Semaphore>,
    min_interval: Duration,
    jitter_factor: f64,
    next_start: Arc<Mutex<Option<Instant>>>,
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(4)),
            min_interval: Duration::ZERO,
            jitter_factor: 0.0,
            next_start: Arc::new(Mutex::new(None)),
        }
    }
}

impl RequestPacer {
    /// Create a pacer allowing `max_concurrent` calls in flight, clamped to
    /// `1..=Semaphore::MAX_PERMITS`.
    pub fn with_concurrency_limit(max_concurrent: u64) -> Self {
        let max_concurrent = max_concurrent.clamp(1, Semaphore::MAX_PERMITS as u64);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent as usize)),
            ..Default::default()
        }
    }

    /// Minimum spacing between the start of two consecutive calls.
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Extra random delay, as a fraction of `min_interval`, added to each gap.
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop admitting new calls. Calls already holding a permit finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Wait for a start slot and reserve the next one.
    async fn wait_for_slot(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let start_at = {
            let mut next = self.next_start.lock().await;
            let now = Instant::now();
            let start_at = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(start_at + self.apply_jitter(self.min_interval));
            start_at
        };
        time::sleep_until(start_at).await;
    }

    /// Run `f` once under the concurrency limit and spacing rules.
    pub async fn run<T, F, Fut>(&self, f: F) -> Result<T, PacerError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = T> + Send,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PacerError::Closed)?;

        self.wait_for_slot().await;

        Ok(f().await)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let jitter_ms = (delay.as_millis() as f64 * self.jitter_factor) as u64;
        let rand_jitter = rand::thread_rng().gen_range(0..=jitter_ms);

        delay + Duration::from_millis(rand_jitter)
    }
}
