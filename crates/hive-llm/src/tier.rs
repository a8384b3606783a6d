//! Model tiers
//!
//! Tiers are ordered by preference. Metered tiers fall back to the local
//! tertiary tier; the tertiary tier has nowhere left to go.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fallback level in the model selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Highest quality, metered and remote
    Primary,
    /// Specialized, metered
    Secondary,
    /// Local, unmetered and trainable
    Tertiary,
}

impl Tier {
    /// All tiers in preference order
    pub const ALL: [Tier; 3] = [Tier::Primary, Tier::Secondary, Tier::Tertiary];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
        }
    }

    /// Tier to try when this one fails within the same call
    #[must_use]
    pub fn fallback(&self) -> Option<Tier> {
        match self {
            Self::Primary | Self::Secondary => Some(Self::Tertiary),
            Self::Tertiary => None,
        }
    }

    /// Whether requests on this tier cost money
    #[must_use]
    pub fn is_metered(&self) -> bool {
        !matches!(self, Self::Tertiary)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "tertiary" | "local" => Ok(Self::Tertiary),
            other => Err(format!("unknown tier '{}'", other)),
        }
    }
}
