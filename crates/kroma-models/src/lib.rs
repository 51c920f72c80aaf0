//! Shared data models for Kroma Studio.
//!
//! This crate provides Serde-serializable types for:
//! - Projects and their pipeline step
//! - Scenes and the per-scene generation lifecycle
//! - Aspect ratios supported by video synthesis
//! - User profiles, plan tiers and credit costs

pub mod aspect_ratio;
pub mod credit_cost;
pub mod plan;
pub mod profile;
pub mod project;
pub mod scene;

// Re-export common types
pub use aspect_ratio::{AspectRatio, AspectRatioParseError};
pub use credit_cost::{CreditCost, GenerationKind};
pub use plan::{pricing_catalogue, PlanTier, PricingTier, STARTER_CREDITS};
pub use profile::UserProfile;
pub use project::{PipelineStep, Project, ProjectId, StoredProject, CURRENT_SCHEMA_VERSION};
pub use scene::{Scene, SceneId, SceneStatus, NEW_SCENE_PLACEHOLDER};
