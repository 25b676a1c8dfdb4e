//! Cooperative cancellation for pipeline runs.
//!
//! A [`CancellationToken`] is shared by a pipeline and every execution unit
//! it spawns. Tripping it aborts in-flight transforms and stops the sweep.

mod token;

pub use token::CancellationToken;
