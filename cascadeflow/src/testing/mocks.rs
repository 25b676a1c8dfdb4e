//! Mock transforms for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::Payload;
use crate::stages::Transform;

/// Passes payloads through unchanged and remembers every one it saw.
#[derive(Debug, Default)]
pub struct RecordingTransform {
    seen: Mutex<Vec<Payload>>,
}

impl RecordingTransform {
    /// Creates a new recording transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded payloads in call order.
    #[must_use]
    pub fn seen(&self) -> Vec<Payload> {
        self.seen.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Transform for RecordingTransform {
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        self.seen.lock().push(payload.clone());
        Ok(payload)
    }
}

/// Always fails with the configured message.
#[derive(Debug)]
pub struct FailingTransform {
    error: String,
}

impl FailingTransform {
    /// Creates a new failing transform.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[async_trait]
impl Transform for FailingTransform {
    async fn apply(&self, _payload: Payload) -> anyhow::Result<Payload> {
        Err(anyhow::anyhow!("{}", self.error))
    }
}

/// Fails when an integer key holds one of the given values, otherwise
/// passes the payload through.
#[derive(Debug)]
pub struct FailOnKey {
    key: String,
    values: HashSet<i64>,
}

impl FailOnKey {
    /// Creates a transform failing for `key` in `values`.
    #[must_use]
    pub fn new(key: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            key: key.into(),
            values: values.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Transform for FailOnKey {
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        let value = payload.require_i64(&self.key)?;
        if self.values.contains(&value) {
            anyhow::bail!("refusing {} = {}", self.key, value);
        }
        Ok(payload)
    }
}

/// Panics on every call.
#[derive(Debug)]
pub struct PanickingTransform {
    message: String,
}

impl PanickingTransform {
    /// Creates a new panicking transform.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Transform for PanickingTransform {
    async fn apply(&self, _payload: Payload) -> anyhow::Result<Payload> {
        panic!("{}", self.message);
    }
}

/// Sleeps before passing the payload through; tracks peak parallelism.
#[derive(Debug)]
pub struct SlowTransform {
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowTransform {
    /// Creates a new slow transform.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Creates a slow transform with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns the highest number of simultaneous calls observed.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transform for SlowTransform {
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(payload)
    }
}
