//! Project production pipeline for Kroma Studio.
//!
//! The [`PipelineController`] owns the per-project state machine
//! (script → character → production) and the per-scene generation lifecycle
//! (pending → generating → completed | error).

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metering;
pub mod metrics;
pub mod polling;

pub use config::{PipelineConfig, DEFAULT_SCENE_COUNT, MAX_SCENE_COUNT};
pub use controller::{PipelineController, VideoJob, VideoOutcome};
pub use error::{PipelineError, PipelineResult};
pub use logging::ProjectLogger;
pub use metering::{Charge, Meter};
pub use polling::{PollPolicy, VideoPoller};
