//! Runtime access for code that is invoked outside of an async context,
//! such as `tracing` layers.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs a future to completion on the current thread.
///
/// Uses the lightweight `futures` executor so it never has to construct a
/// tokio runtime; do not call it from inside a tokio worker.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    futures::executor::block_on(future)
}
