//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: Tracks where a collection run is in the
//!   count / plan / fetch protocol and how it ended

mod run_phase;

pub use run_phase::RunPhase;
