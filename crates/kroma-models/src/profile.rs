//! User profile owned by the credits backend.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::plan::{PlanTier, STARTER_CREDITS};

/// User profile with the current credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub credits: u32,
    #[serde(default)]
    pub plan: PlanTier,
}

impl UserProfile {
    /// Default profile for a user seen for the first time.
    pub fn starter(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            credits: STARTER_CREDITS,
            plan: PlanTier::Free,
        }
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        self.credits >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_profile() {
        let profile = UserProfile::starter("user-1");
        assert_eq!(profile.credits, 50);
        assert_eq!(profile.plan, PlanTier::Free);
        assert!(profile.can_afford(50));
        assert!(!profile.can_afford(51));
    }
}
