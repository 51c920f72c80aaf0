//! Generation metrics.

use kroma_models::GenerationKind;
use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const GENERATIONS_TOTAL: &str = "kroma_generations_total";
    pub const GENERATION_DURATION_SECONDS: &str = "kroma_generation_duration_seconds";
    pub const CREDITS_CHARGED_TOTAL: &str = "kroma_credits_charged_total";
    pub const CREDITS_REFUNDED_TOTAL: &str = "kroma_credits_refunded_total";
}

/// Outcome label for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Finished after its project or scene was deleted
    Dropped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Dropped => "dropped",
        }
    }
}

/// Record one finished generation.
pub fn record_generation(kind: GenerationKind, outcome: Outcome, duration_secs: f64) {
    let labels = [
        ("kind", kind.as_str().to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];
    counter!(names::GENERATIONS_TOTAL, &labels).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_credits_charged(kind: GenerationKind, amount: u32) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(names::CREDITS_CHARGED_TOTAL, &labels).increment(u64::from(amount));
}

pub fn record_credits_refunded(kind: GenerationKind, amount: u32) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(names::CREDITS_REFUNDED_TOTAL, &labels).increment(u64::from(amount));
}
