//! Credit prices for paid generation calls.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of paid gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Script,
    Character,
    SceneVideo,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Script => "script",
            GenerationKind::Character => "character",
            GenerationKind::SceneVideo => "scene_video",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credit price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreditCost {
    pub script: u32,
    pub character: u32,
    pub scene_video: u32,
}

impl Default for CreditCost {
    fn default() -> Self {
        Self {
            script: 1,
            character: 2,
            scene_video: 10,
        }
    }
}

impl CreditCost {
    /// Price of one call of the given kind.
    pub fn for_kind(&self, kind: GenerationKind) -> u32 {
        match kind {
            GenerationKind::Script => self.script,
            GenerationKind::Character => self.character,
            GenerationKind::SceneVideo => self.scene_video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_costs() {
        let cost = CreditCost::default();
        assert_eq!(cost.for_kind(GenerationKind::Script), 1);
        assert_eq!(cost.for_kind(GenerationKind::Character), 2);
        assert_eq!(cost.for_kind(GenerationKind::SceneVideo), 10);
    }

    #[test]
    fn test_starter_credits_cover_five_videos() {
        // 50 starter credits
        let cost = CreditCost::default();
        assert_eq!(crate::STARTER_CREDITS / cost.scene_video, 5);
    }
}
