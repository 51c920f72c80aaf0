//! Plan tiers and the pricing catalogue.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Credits granted to a brand-new user.
pub const STARTER_CREDITS: u32 = 50;

/// Plan tier enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Creator,
    Director,
}

impl PlanTier {
    /// Parse from string (case-insensitive). Unknown values map to Free.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "creator" => PlanTier::Creator,
            "director" => PlanTier::Director,
            _ => PlanTier::Free,
        }
    }

    /// Get the plan name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Creator => "creator",
            PlanTier::Director => "director",
        }
    }

    /// Pricing for paid tiers. The free tier has no catalogue entry.
    pub fn pricing(&self) -> Option<PricingTier> {
        match self {
            PlanTier::Free => None,
            PlanTier::Creator => Some(PricingTier {
                id: PlanTier::Creator,
                name: "Creator".to_string(),
                price: 19,
                credits: 500,
                features: vec![
                    "500 credits per month".to_string(),
                    "720p scene rendering".to_string(),
                    "Character reference images".to_string(),
                ],
                popular: true,
            }),
            PlanTier::Director => Some(PricingTier {
                id: PlanTier::Director,
                name: "Director".to_string(),
                price: 49,
                credits: 1500,
                features: vec![
                    "1500 credits per month".to_string(),
                    "720p scene rendering".to_string(),
                    "Character reference images".to_string(),
                    "Priority generation".to_string(),
                ],
                popular: false,
            }),
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchasable plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PricingTier {
    pub id: PlanTier,
    pub name: String,
    /// Monthly price in whole US dollars
    pub price: u32,
    pub credits: u32,
    pub features: Vec<String>,
    #[serde(default)]
    pub popular: bool,
}

/// All paid tiers in display order.
pub fn pricing_catalogue() -> Vec<PricingTier> {
    [PlanTier::Creator, PlanTier::Director]
        .iter()
        .filter_map(PlanTier::pricing)
        .collect()
}
