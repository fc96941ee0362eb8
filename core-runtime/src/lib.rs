//! # Core Runtime Module
//!
//! Runtime infrastructure shared by every core crate:
//! - Logging and tracing setup
//! - Configuration with fail-fast capability validation
//! - Event bus for playback and library notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
