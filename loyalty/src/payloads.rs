use serde::{Deserialize, Serialize};

use crate::{
    card::{Card, Redemption},
    Catalog, RewardTier,
};

/// The slice of a card that is mirrored into the shared presence room. The
/// cooldown timestamp stays on the owning device's record only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(default)]
    pub stamps: u8,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub history: Vec<Redemption>,
}

impl From<&Card> for PresenceRecord {
    fn from(card: &Card) -> Self {
        Self {
            stamps: card.stamps,
            points: card.points,
            history: card.history.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Registered {
    pub client_id: String,
    pub pass_url: String,
}

/// Everything a customer device needs to render its card screen.
#[derive(Debug, Serialize, Deserialize)]
pub struct CardView {
    pub stamps: u8,
    pub points: u32,
    pub reward: Option<RewardTier>,
    pub can_redeem: bool,
    pub cooldown_remaining_ms: i64,
    pub history: Vec<Redemption>,
}

impl CardView {
    pub fn of(card: &Card, catalog: &Catalog, now_ms: i64) -> Self {
        Self {
            stamps: card.stamps,
            points: card.points,
            reward: card.available_reward(catalog).copied(),
            can_redeem: card.can_redeem(catalog, now_ms),
            cooldown_remaining_ms: card.cooldown_remaining_ms(catalog, now_ms),
            history: card.history.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemedDrinks {
    pub drinks: u32,
    pub stamps_spent: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemPoints {
    pub index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemedPoints {
    pub reward: String,
    pub points_spent: u32,
    pub points_left: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassUrl {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerLogin {
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerToken {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GrantPoints {
    pub amount: u32,
}
