//! Workspace placeholder crate.
//!
//! Host applications can depend on `music-player-core` to pull in the
//! bootstrap façade without wiring each workspace crate individually.

pub use core_service::*;
