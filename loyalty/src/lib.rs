//! Shared loyalty data: the reward catalog, the card state machine, and the
//! payloads exchanged between devices and the backend.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod card;
pub mod payloads;
mod remote;

pub use remote::get_catalog_remote;

/// A card holds at most this many stamps.
pub const MAX_STAMPS: u8 = 10;

const DEFAULT_COOLDOWN_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardTier {
    pub stamps: u8,
    pub drinks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointReward {
    pub points: u32,
    pub label: String,
}

/// The stand's reward configuration. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub tiers: Vec<RewardTier>,
    pub point_rewards: Vec<PointReward>,
    #[serde(default = "default_cooldown_ms")]
    pub redeem_cooldown_ms: i64,
}

fn default_cooldown_ms() -> i64 {
    DEFAULT_COOLDOWN_MS
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("catalog is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    Invalid(&'static str),
}

impl Catalog {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(raw)?;
        catalog.validate()?;

        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.tiers.is_empty() {
            return Err(CatalogError::Invalid("no reward tiers"));
        }

        for pair in self.tiers.windows(2) {
            if pair[1].stamps <= pair[0].stamps {
                return Err(CatalogError::Invalid("tiers must ascend by stamps"));
            }
        }

        for tier in &self.tiers {
            if tier.stamps == 0 || tier.stamps > MAX_STAMPS {
                return Err(CatalogError::Invalid("tier thresholds must be 1 to 10 stamps"));
            }
            if tier.drinks == 0 {
                return Err(CatalogError::Invalid("tiers must grant at least one drink"));
            }
        }

        for reward in &self.point_rewards {
            if reward.points == 0 {
                return Err(CatalogError::Invalid("point rewards must cost points"));
            }
            if reward.label.trim().is_empty() {
                return Err(CatalogError::Invalid("point rewards need a label"));
            }
        }

        if self.redeem_cooldown_ms <= 0 {
            return Err(CatalogError::Invalid("redeem cooldown must be positive"));
        }

        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            tiers: vec![
                RewardTier { stamps: 3, drinks: 1 },
                RewardTier { stamps: 6, drinks: 2 },
                RewardTier { stamps: 10, drinks: 3 },
            ],
            point_rewards: vec![
                PointReward {
                    points: 10,
                    label: "Extra Syrup Shot".to_string(),
                },
                PointReward {
                    points: 25,
                    label: "Free Lemonade".to_string(),
                },
                PointReward {
                    points: 50,
                    label: "Lemonade Pitcher".to_string(),
                },
            ],
            redeem_cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        assert!(Catalog::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_tiers() {
        let catalog = Catalog {
            tiers: vec![],
            ..Catalog::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_tiers() {
        let catalog = Catalog {
            tiers: vec![
                RewardTier { stamps: 6, drinks: 2 },
                RewardTier { stamps: 3, drinks: 1 },
            ],
            ..Catalog::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_thresholds() {
        let catalog = Catalog {
            tiers: vec![
                RewardTier { stamps: 3, drinks: 1 },
                RewardTier { stamps: 3, drinks: 2 },
            ],
            ..Catalog::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_cooldown() {
        let catalog = Catalog {
            redeem_cooldown_ms: 0,
            ..Catalog::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_above_card_size() {
        let catalog = Catalog {
            tiers: vec![RewardTier { stamps: 11, drinks: 1 }],
            ..Catalog::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_cooldown_defaults_when_missing() {
        let raw = r#"{
            "tiers": [{ "stamps": 3, "drinks": 1 }],
            "point_rewards": []
        }"#;
        let catalog = Catalog::from_json(raw).unwrap();
        assert_eq!(catalog.redeem_cooldown_ms, DEFAULT_COOLDOWN_MS);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(Catalog::from_json("not json").is_err());
    }
}
