//! # Redis
//!
//! RAM database holding every loyalty card plus the shared presence room.
//!
//! ## Schema
//!
//! - `cards` hash: client id → full card JSON (stamps, points, cooldown
//!   timestamp, history). The authoritative copy.
//! - `presence` hash: client id → presence record JSON (stamps, points,
//!   history). What devices mirror; deliberately no cooldown timestamp.
//! - `presence:changed` channel: notification fan-out after every push.
//!
//! Cards are a few hundred bytes of JSON each and client ids are 4-digit
//! strings, so one hash per concern gives O(1) lookups with no key-space
//! scans. Concurrent writers are resolved by whatever HSET Redis applies
//! last; records are never merged.

use std::time::Duration;

use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError,
};
use tracing::warn;

use loyalty::card::Card;

pub const CARDS_KEY: &str = "cards";

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .unwrap();

    connection_manager
}

/// The persistence port for cards: loaded at the top of a request, written
/// back after every mutating operation, never touched from anywhere else.
pub struct CardStore {
    conn: ConnectionManager,
}

impl CardStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Fetch a client's card. Unparseable stored state degrades to a fresh
    /// zero-valued card instead of failing the request.
    pub async fn load(&self, client_id: &str) -> Result<Option<Card>, RedisError> {
        let raw: Option<String> = self.conn.clone().hget(CARDS_KEY, client_id).await?;

        Ok(raw.map(|raw| parse_card(client_id, &raw)))
    }

    pub async fn save(&self, client_id: &str, card: &Card) -> Result<(), RedisError> {
        let raw = serde_json::to_string(card).expect("serialize card");

        let _: () = self.conn.clone().hset(CARDS_KEY, client_id, raw).await?;
        Ok(())
    }
}

fn parse_card(client_id: &str, raw: &str) -> Card {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Discarding unreadable card for client {client_id}: {e}");
        Card::new()
    })
}
