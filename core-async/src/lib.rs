//! Async runtime facade for the music player core.
//!
//! Every core crate depends on this crate instead of reaching into tokio
//! directly, so the executor-facing surface (spawning, channels, timers,
//! cancellation) is declared in one place.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `sync`: channels, locks, one-time cells and cancellation tokens
//! - `time`: sleeps, intervals and timeouts
//! - `runtime`: handle lookup and blocking entry point for sync callers
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     let handle = core_async::task::spawn(async move {
//!         core_async::select! {
//!             _ = child.cancelled() => None,
//!             _ = sleep(Duration::from_secs(1)) => Some(42),
//!         }
//!     });
//!     token.cancel();
//!     assert_eq!(handle.await.unwrap(), None);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
pub use tokio::select;
