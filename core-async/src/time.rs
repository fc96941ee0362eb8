//! Time utilities.
//!
//! `Instant` is tokio's instant so that code measured with it follows the
//! paused test clock.

pub use std::time::Duration;
pub use tokio::time::{
    interval, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior, Sleep,
};
pub use tokio::time::error::Elapsed;
