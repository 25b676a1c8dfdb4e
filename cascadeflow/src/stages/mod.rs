//! Stages and the transforms they run.
//!
//! A [`Stage`] is a bounded FIFO buffer paired with a [`Transform`]. Draining
//! a stage runs the transform on every buffered task concurrently and hands
//! each result to the next stage.

mod options;
mod queue;
mod report;

pub use options::StageOptions;
pub use queue::Stage;
pub use report::DrainReport;

use crate::core::Payload;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// The per-stage processing function.
///
/// A transform consumes a payload and produces the payload of the successor
/// task. Errors and panics are caught by the stage and recorded against the
/// task; they never affect sibling tasks.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Transforms one payload.
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload>;
}

/// A transform backed by a synchronous closure.
pub struct FnTransform<F>
where
    F: Fn(Payload) -> anyhow::Result<Payload> + Send + Sync,
{
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(Payload) -> anyhow::Result<Payload> + Send + Sync,
{
    /// Creates a new function-based transform.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(Payload) -> anyhow::Result<Payload> + Send + Sync,
{
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        (self.func)(payload)
    }
}

/// A transform backed by an async closure.
pub struct AsyncFnTransform<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Payload>> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnTransform<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Payload>> + Send,
{
    /// Creates a new async function-based transform.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Transform for AsyncFnTransform<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Payload>> + Send,
{
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        (self.func)(payload).await
    }
}

/// Passes every payload through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

#[async_trait]
impl Transform for IdentityTransform {
    async fn apply(&self, payload: Payload) -> anyhow::Result<Payload> {
        Ok(payload)
    }
}

/// Wraps a synchronous closure as a shareable transform.
pub fn transform_fn<F>(func: F) -> Arc<dyn Transform>
where
    F: Fn(Payload) -> anyhow::Result<Payload> + Send + Sync + 'static,
{
    Arc::new(FnTransform::new(func))
}

/// Wraps an async closure as a shareable transform.
pub fn async_transform_fn<F, Fut>(func: F) -> Arc<dyn Transform>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Payload>> + Send + 'static,
{
    Arc::new(AsyncFnTransform::new(func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[tokio::test]
    async fn test_fn_transform() {
        let double = FnTransform::new(|p: Payload| {
            let n = p.require_i64("n")?;
            Ok(Payload::new().with("n", n * 2))
        });

        let out = double.apply(Payload::new().with("n", 21)).await.unwrap();
        assert_eq!(out.require_i64("n"), Ok(42));
    }

    #[tokio::test]
    async fn test_fn_transform_propagates_payload_error() {
        let t = transform_fn(|p| {
            p.require_i64("missing")?;
            Ok(p)
        });

        let err = t.apply(Payload::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "missing key 'missing'");
    }

    #[tokio::test]
    async fn test_async_fn_transform() {
        let t = async_transform_fn(|p: Payload| async move {
            tokio::task::yield_now().await;
            if p.is_empty() {
                bail!("empty payload");
            }
            Ok(p.with("seen", true))
        });

        let out = t.apply(Payload::new().with("a", 1)).await.unwrap();
        assert_eq!(out.get("seen"), Some(&serde_json::Value::Bool(true)));
        assert!(t.apply(Payload::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_identity_transform() {
        let payload = Payload::new().with("k", "v");
        let out = IdentityTransform.apply(payload.clone()).await.unwrap();
        assert_eq!(out, payload);
    }
}
