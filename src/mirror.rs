use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{MIRROR_BACKOFF_MS, MIRROR_MAX_ATTEMPTS};
use crate::error::{Error, TransportError};
use crate::remote::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per token, first try included. At least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MIRROR_MAX_ATTEMPTS,
            backoff: Duration::from_millis(MIRROR_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1).min(16))
    }
}

#[derive(Default)]
struct Stats {
    delivered: AtomicU64,
    dropped: AtomicU64,
    last_error: Mutex<Option<TransportError>>,
}

/// Pushes state tokens to a [`StateStore`] from a background thread, retrying
/// with backoff. Queued tokens coalesce to the newest.
pub struct MirrorWorker {
    tx: Option<Sender<String>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<Stats>,
}

impl MirrorWorker {
    pub fn spawn(store: Arc<dyn StateStore>, policy: RetryPolicy) -> Result<Self, Error> {
        let (tx, rx) = mpsc::channel();
        let stats = Arc::new(Stats::default());

        let worker_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("state-mirror".into())
            .spawn(move || run(store.as_ref(), &rx, policy, &worker_stats))
            .map_err(|e| Error::Spawn(e.to_string()))?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            stats,
        })
    }

    /// Queue `token` for the remote store. Returns immediately.
    pub fn submit(&self, token: &str) {
        let sent = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(token.to_string()).is_ok());
        if !sent {
            log::warn!("Mirror worker not running, dropping state {:?}", token);
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Tokens the store acknowledged.
    pub fn delivered(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    /// Tokens given up on after exhausting retries (or submitted after shutdown).
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<TransportError> {
        self.stats.last_error.lock().ok().and_then(|last| last.clone())
    }

    /// Close the queue and wait for queued tokens and the in-flight write.
    /// A token waiting out a retry backoff is dropped. Idempotent; also called
    /// on drop.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Mirror worker panicked");
        }
    }
}

impl Drop for MirrorWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Newest queued token, or `current` if nothing newer is waiting.
fn newest(rx: &Receiver<String>, current: String) -> String {
    rx.try_iter().last().unwrap_or(current)
}

fn run(store: &dyn StateStore, rx: &Receiver<String>, policy: RetryPolicy, stats: &Stats) {
    let max_attempts = policy.max_attempts.max(1);

    while let Ok(first) = rx.recv() {
        let mut token = newest(rx, first);
        let mut attempt = 1;

        loop {
            match store.write(&token) {
                Ok(ack) => {
                    log::info!("Mirrored state {:?} (ack {:?})", token, ack);
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                Err(e) if attempt >= max_attempts => {
                    log::error!(
                        "Giving up mirroring {:?} after {} attempts: {}",
                        token,
                        attempt,
                        e
                    );
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                    if let Ok(mut last) = stats.last_error.lock() {
                        *last = Some(e);
                    }
                    break;
                }
                Err(e) => {
                    let delay = policy.delay(attempt);
                    log::warn!(
                        "Mirroring {:?} failed (attempt {}/{}): {}, retrying in {:?}",
                        token,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    if let Ok(mut last) = stats.last_error.lock() {
                        *last = Some(e);
                    }

                    match rx.recv_timeout(delay) {
                        Ok(newer) => {
                            // A newer state supersedes the one being retried.
                            let latest = newest(rx, newer);
                            log::debug!("Mirror: {:?} superseded by {:?}", token, latest);
                            token = latest;
                            attempt = 1;
                        }
                        Err(RecvTimeoutError::Timeout) => attempt += 1,
                        Err(RecvTimeoutError::Disconnected) => {
                            log::warn!("Mirror shut down during backoff, dropping {:?}", token);
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                    }
                }
            }
        }
    }
    log::debug!("Mirror worker exiting");
}
