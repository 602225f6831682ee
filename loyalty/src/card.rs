use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Catalog, PointReward, RewardTier, MAX_STAMPS};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

#[derive(Error, Debug, PartialEq)]
pub enum CardError {
    #[error("please wait {hours} more hours before redeeming again")]
    CooldownActive { hours: i64 },

    #[error("not enough stamps for a reward")]
    NoRewardAvailable,

    #[error("no point reward at index {0}")]
    InvalidRewardIndex(usize),

    #[error("not enough points for that reward")]
    InsufficientPoints,
}

/// One entry of a card's redemption history, newest first. Stamp redemptions
/// carry `drinks`/`stamps`, point redemptions carry `points`/`reward`;
/// devices tell them apart by which fields are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drinks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamps: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Redemption {
    fn for_drinks(tier: &RewardTier, at: DateTime<Utc>) -> Self {
        Self {
            drinks: Some(tier.drinks),
            stamps: Some(tier.stamps),
            points: None,
            reward: None,
            timestamp: at,
        }
    }

    fn for_points(reward: &PointReward, at: DateTime<Utc>) -> Self {
        Self {
            drinks: None,
            stamps: None,
            points: Some(reward.points),
            reward: Some(reward.label.clone()),
            timestamp: at,
        }
    }
}

/// One customer's loyalty card. Redemption eligibility is never stored; it is
/// recomputed from `(stamps, now, last_redeem_ms)` on every call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Card {
    pub stamps: u8,
    pub points: u32,
    /// Epoch milliseconds of the last stamp redemption, 0 if never redeemed.
    /// Not mirrored into the presence room.
    #[serde(default)]
    pub last_redeem_ms: i64,
    #[serde(default)]
    pub history: Vec<Redemption>,
}

impl Card {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one stamp. A full card ignores the stamp and reports `false` so
    /// callers can skip the save and the celebration.
    pub fn add_stamp(&mut self) -> bool {
        if self.stamps >= MAX_STAMPS {
            return false;
        }

        self.stamps += 1;
        true
    }

    pub fn add_points(&mut self, amount: u32) {
        self.points = self.points.saturating_add(amount);
    }

    /// The highest tier the current stamp count qualifies for.
    pub fn available_reward<'a>(&self, catalog: &'a Catalog) -> Option<&'a RewardTier> {
        catalog
            .tiers
            .iter()
            .rev()
            .find(|tier| self.stamps >= tier.stamps)
    }

    pub fn cooldown_remaining_ms(&self, catalog: &Catalog, now_ms: i64) -> i64 {
        if self.last_redeem_ms == 0 {
            return 0;
        }

        (self.last_redeem_ms + catalog.redeem_cooldown_ms - now_ms).max(0)
    }

    pub fn can_redeem(&self, catalog: &Catalog, now_ms: i64) -> bool {
        self.cooldown_remaining_ms(catalog, now_ms) == 0
    }

    /// Trade the card's stamps for the best available tier. On success the
    /// card is zeroed, the cooldown starts, and the granted tier is returned.
    pub fn redeem(&mut self, catalog: &Catalog, now: DateTime<Utc>) -> Result<RewardTier, CardError> {
        let now_ms = now.timestamp_millis();

        let remaining = self.cooldown_remaining_ms(catalog, now_ms);
        if remaining > 0 {
            return Err(CardError::CooldownActive {
                hours: (remaining as u64).div_ceil(MS_PER_HOUR as u64) as i64,
            });
        }

        let tier = *self
            .available_reward(catalog)
            .ok_or(CardError::NoRewardAvailable)?;

        self.history.insert(0, Redemption::for_drinks(&tier, now));
        self.stamps = 0;
        self.last_redeem_ms = now_ms;

        Ok(tier)
    }

    /// Spend points on a catalog reward.
    pub fn redeem_points(
        &mut self,
        catalog: &Catalog,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<PointReward, CardError> {
        let reward = catalog
            .point_rewards
            .get(index)
            .ok_or(CardError::InvalidRewardIndex(index))?;

        if self.points < reward.points {
            return Err(CardError::InsufficientPoints);
        }

        self.points -= reward.points;
        self.history.insert(0, Redemption::for_points(reward, now));

        Ok(reward.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    // A realistic wall-clock instant, far past any cooldown from epoch zero.
    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn test_stamps_cap_at_ten() {
        let mut card = Card::new();

        for expected in 1..=MAX_STAMPS {
            assert!(card.add_stamp());
            assert_eq!(card.stamps, expected);
        }

        assert!(!card.add_stamp());
        assert_eq!(card.stamps, MAX_STAMPS);
    }

    #[test]
    fn test_available_reward_picks_highest_tier() {
        let catalog = Catalog::default();
        let mut card = Card::new();

        let drinks_for = |card: &Card| card.available_reward(&catalog).map(|tier| tier.drinks);

        card.stamps = 2;
        assert_eq!(drinks_for(&card), None);
        card.stamps = 3;
        assert_eq!(drinks_for(&card), Some(1));
        card.stamps = 5;
        assert_eq!(drinks_for(&card), Some(1));
        card.stamps = 6;
        assert_eq!(drinks_for(&card), Some(2));
        card.stamps = 10;
        assert_eq!(drinks_for(&card), Some(3));
    }

    #[test]
    fn test_redeem_zeroes_stamps_and_records_history() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.stamps = 6;

        let tier = card.redeem(&catalog, at(NOW_MS)).unwrap();

        assert_eq!(tier.drinks, 2);
        assert_eq!(card.stamps, 0);
        assert_eq!(card.last_redeem_ms, NOW_MS);
        assert_eq!(card.history.len(), 1);
        assert_eq!(card.history[0].drinks, Some(2));
        assert_eq!(card.history[0].stamps, Some(6));
        assert!(card.history[0].timestamp.timestamp_millis() >= NOW_MS);
    }

    #[test]
    fn test_redeem_without_stamps_fails() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.stamps = 2;

        assert_eq!(
            card.redeem(&catalog, at(NOW_MS)),
            Err(CardError::NoRewardAvailable)
        );
        assert_eq!(card.stamps, 2);
        assert!(card.history.is_empty());
    }

    #[test]
    fn test_immediate_second_redeem_reports_full_cooldown() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.stamps = 3;

        card.redeem(&catalog, at(NOW_MS)).unwrap();
        card.stamps = 3;

        let err = card.redeem(&catalog, at(NOW_MS + 1)).unwrap_err();
        assert_eq!(err, CardError::CooldownActive { hours: 24 });
        assert_eq!(card.history.len(), 1);
    }

    #[test]
    fn test_cooldown_expires_lazily() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.stamps = 3;

        card.redeem(&catalog, at(NOW_MS)).unwrap();
        card.stamps = 3;

        let later = NOW_MS + catalog.redeem_cooldown_ms;
        assert!(card.can_redeem(&catalog, later));
        assert!(card.redeem(&catalog, at(later)).is_ok());
        assert_eq!(card.history.len(), 2);
    }

    #[test]
    fn test_remaining_wait_rounds_up_to_hours() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.stamps = 3;

        card.redeem(&catalog, at(NOW_MS)).unwrap();
        card.stamps = 3;

        // 30 minutes in: 23.5 hours left, reported as 24.
        let err = card
            .redeem(&catalog, at(NOW_MS + 30 * 60 * 1000))
            .unwrap_err();
        assert_eq!(err, CardError::CooldownActive { hours: 24 });

        // One millisecond short of done: reported as 1.
        let err = card
            .redeem(&catalog, at(NOW_MS + catalog.redeem_cooldown_ms - 1))
            .unwrap_err();
        assert_eq!(err, CardError::CooldownActive { hours: 1 });
    }

    #[test]
    fn test_fresh_card_has_no_cooldown() {
        let catalog = Catalog::default();
        let card = Card::new();

        assert_eq!(card.cooldown_remaining_ms(&catalog, NOW_MS), 0);
        assert!(card.can_redeem(&catalog, NOW_MS));
    }

    #[test]
    fn test_redeem_points_checks_balance() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.points = 5;

        assert_eq!(
            card.redeem_points(&catalog, 0, at(NOW_MS)),
            Err(CardError::InsufficientPoints)
        );
        assert_eq!(card.points, 5);

        card.points = 15;
        let reward = card.redeem_points(&catalog, 0, at(NOW_MS)).unwrap();
        assert_eq!(reward.points, 10);
        assert_eq!(card.points, 5);
    }

    #[test]
    fn test_redeem_points_records_history() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.points = 30;

        card.redeem_points(&catalog, 1, at(NOW_MS)).unwrap();

        assert_eq!(card.history.len(), 1);
        assert_eq!(card.history[0].points, Some(25));
        assert_eq!(card.history[0].reward.as_deref(), Some("Free Lemonade"));
        assert_eq!(card.history[0].drinks, None);
    }

    #[test]
    fn test_redeem_points_rejects_unknown_index() {
        let catalog = Catalog::default();
        let mut card = Card::new();
        card.points = 100;

        assert_eq!(
            card.redeem_points(&catalog, 99, at(NOW_MS)),
            Err(CardError::InvalidRewardIndex(99))
        );
        assert_eq!(card.points, 100);
    }
}
