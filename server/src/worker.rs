use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use loyalty::{card::Card, payloads::PresenceRecord};

use crate::{error::AppError, state::State};

/// Active worker sessions. A correct PIN mints an opaque token that stays
/// valid until an explicit logout. The PIN is a deployment-time shared
/// secret compared verbatim; hashing and rate limiting are out of scope.
pub struct Workers {
    pin: String,
    tokens: RwLock<HashSet<String>>,
}

impl Workers {
    pub fn new(pin: String) -> Self {
        Self {
            pin,
            tokens: RwLock::new(HashSet::new()),
        }
    }

    pub fn login(&self, pin: &str) -> Result<String, AppError> {
        if pin != self.pin {
            return Err(AppError::InvalidPin);
        }

        let token = Uuid::new_v4().to_string();
        self.tokens.write().insert(token.clone());

        Ok(token)
    }

    pub fn logout(&self, token: &str) {
        self.tokens.write().remove(token);
    }

    pub fn require(&self, token: Option<&str>) -> Result<(), AppError> {
        match token {
            Some(token) if self.tokens.read().contains(token) => Ok(()),
            _ => Err(AppError::NotAuthenticated),
        }
    }
}

/// Stamp a client's card. A full card is left alone, same as at the counter.
pub async fn grant_stamp(state: &State, client_id: &str) -> Result<Card, AppError> {
    let mut card = load_card(state, client_id).await?;

    if card.add_stamp() {
        commit(state, client_id, &card).await?;
        info!("Stamped card {client_id}: {} stamps", card.stamps);
    }

    Ok(card)
}

pub async fn grant_points(state: &State, client_id: &str, amount: u32) -> Result<Card, AppError> {
    if amount == 0 {
        return Err(AppError::MalformedPayload);
    }

    let mut card = load_card(state, client_id).await?;
    card.add_points(amount);

    commit(state, client_id, &card).await?;
    info!("Granted {amount} points to client {client_id}: {} total", card.points);

    Ok(card)
}

async fn load_card(state: &State, client_id: &str) -> Result<Card, AppError> {
    state
        .cards
        .load(client_id)
        .await?
        .ok_or(AppError::ClientNotFound)
}

async fn commit(state: &State, client_id: &str, card: &Card) -> Result<(), AppError> {
    state.cards.save(client_id, card).await?;
    state
        .presence
        .push(client_id, &PresenceRecord::from(card))
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_with_correct_pin() {
        let workers = Workers::new("4242".to_string());

        let token = workers.login("4242").unwrap();
        assert!(workers.require(Some(&token)).is_ok());
    }

    #[test]
    fn test_login_with_wrong_pin() {
        let workers = Workers::new("4242".to_string());

        assert!(matches!(workers.login("0000"), Err(AppError::InvalidPin)));
        assert!(matches!(
            workers.require(Some("made-up")),
            Err(AppError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let workers = Workers::new("4242".to_string());
        assert!(matches!(
            workers.require(None),
            Err(AppError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_logout_revokes_token() {
        let workers = Workers::new("4242".to_string());

        let token = workers.login("4242").unwrap();
        workers.logout(&token);

        assert!(matches!(
            workers.require(Some(&token)),
            Err(AppError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_sessions_are_independent() {
        let workers = Workers::new("4242".to_string());

        let first = workers.login("4242").unwrap();
        let second = workers.login("4242").unwrap();
        workers.logout(&first);

        assert!(workers.require(Some(&second)).is_ok());
        assert!(workers.require(Some(&first)).is_err());
    }
}
