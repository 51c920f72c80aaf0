//! Output aspect ratio for generated clips.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aspect ratio applied uniformly to every scene of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    /// Standard widescreen (16:9)
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// Vertical (9:16) for Shorts/Reels
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Wire representation used by the video model.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    /// The other supported ratio.
    pub fn toggled(&self) -> Self {
        match self {
            AspectRatio::Landscape => AspectRatio::Portrait,
            AspectRatio::Portrait => AspectRatio::Landscape,
        }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        match self {
            AspectRatio::Landscape => 16.0 / 9.0,
            AspectRatio::Portrait => 9.0 / 16.0,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            other => Err(AspectRatioParseError::Unsupported(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Unsupported aspect ratio: {0}, expected '16:9' or '9:16'")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_landscape() {
        assert_eq!(AspectRatio::default(), AspectRatio::Landscape);
    }

    #[test]
    fn test_toggle_flips_between_ratios() {
        assert_eq!(AspectRatio::Landscape.toggled(), AspectRatio::Portrait);
        assert_eq!(AspectRatio::Portrait.toggled(), AspectRatio::Landscape);
    }

    #[test]
    fn test_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!(" 9:16 ".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("1:1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_serde_uses_ratio_strings() {
        let json = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(json, "\"9:16\"");
        let parsed: AspectRatio = serde_json::from_str("\"16:9\"").unwrap();
        assert_eq!(parsed, AspectRatio::Landscape);
    }
}
