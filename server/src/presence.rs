//! Shared presence room.
//!
//! Every device pushes its client's `{stamps, points, history}` record here
//! and watches everyone else's. Backed by one Redis hash plus a pub/sub
//! channel; each server instance keeps an in-process mirror of the whole
//! room so lookups are synchronous. Writes are last-write-wins at the hash
//! level.

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::StreamExt;
use parking_lot::RwLock;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use tokio::sync::broadcast;
use tracing::warn;

use loyalty::payloads::PresenceRecord;

pub const PRESENCE_KEY: &str = "presence";
pub const PRESENCE_CHANNEL: &str = "presence:changed";

pub type PresenceMap = HashMap<String, PresenceRecord>;

/// The in-process view of the room: a mirror of every record plus a fan-out
/// channel that delivers the full mapping on every remote change. Watchers
/// filter by client id themselves.
pub struct Room {
    mirror: RwLock<PresenceMap>,
    changes: broadcast::Sender<PresenceMap>,
}

impl Room {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);

        Self {
            mirror: RwLock::new(PresenceMap::new()),
            changes,
        }
    }

    /// Record a local write so lookups on this instance see it immediately,
    /// ahead of the pub/sub round trip.
    pub fn apply(&self, client_id: &str, record: PresenceRecord) {
        self.mirror.write().insert(client_id.to_string(), record);
    }

    /// Swap in a fresh snapshot of the room and notify watchers.
    pub fn replace(&self, map: PresenceMap) {
        *self.mirror.write() = map.clone();
        let _ = self.changes.send(map);
    }

    pub fn get(&self, client_id: &str) -> Option<PresenceRecord> {
        self.mirror.read().get(client_id).cloned()
    }

    pub fn watch(&self) -> broadcast::Receiver<PresenceMap> {
        self.changes.subscribe()
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Presence {
    conn: ConnectionManager,
    room: Room,
}

impl Presence {
    /// Join the room: take a full snapshot, then keep the mirror fresh from
    /// change notifications on a dedicated pub/sub connection.
    pub async fn connect(redis_url: &str, conn: ConnectionManager) -> Arc<Self> {
        let presence = Arc::new(Self {
            conn,
            room: Room::new(),
        });

        if let Err(e) = presence.refresh().await {
            warn!("Initial presence snapshot failed: {e}");
        }

        tokio::spawn(listen(redis_url.to_string(), presence.clone()));

        presence
    }

    /// Mirror one client's record into the shared room. Best effort: a
    /// failed write is logged and the caller moves on.
    pub async fn push(&self, client_id: &str, record: &PresenceRecord) {
        self.room.apply(client_id, record.clone());

        if let Err(e) = self.try_push(client_id, record).await {
            warn!("Presence push for client {client_id} failed: {e}");
        }
    }

    /// Last-known record for a client, straight from the mirror.
    pub fn lookup(&self, client_id: &str) -> Option<PresenceRecord> {
        self.room.get(client_id)
    }

    /// Watch the room. Fires on every remote mutation, including ones not
    /// relevant to the caller's client.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceMap> {
        self.room.watch()
    }

    async fn try_push(&self, client_id: &str, record: &PresenceRecord) -> Result<(), RedisError> {
        let raw = serde_json::to_string(record).expect("serialize presence record");
        let mut conn = self.conn.clone();

        let _: () = conn.hset(PRESENCE_KEY, client_id, raw).await?;
        let _: () = conn.publish(PRESENCE_CHANNEL, client_id).await?;

        Ok(())
    }

    async fn refresh(&self) -> Result<(), RedisError> {
        let raw: HashMap<String, String> = self.conn.clone().hgetall(PRESENCE_KEY).await?;
        self.room.replace(parse_room(raw));

        Ok(())
    }
}

fn parse_room(raw: HashMap<String, String>) -> PresenceMap {
    raw.into_iter()
        .filter_map(|(client_id, raw)| match serde_json::from_str(&raw) {
            Ok(record) => Some((client_id, record)),
            Err(e) => {
                warn!("Skipping unreadable presence record for client {client_id}: {e}");
                None
            }
        })
        .collect()
}

async fn listen(redis_url: String, presence: Arc<Presence>) {
    loop {
        if let Err(e) = subscribe_changes(&redis_url, &presence).await {
            warn!("Presence subscription dropped: {e}");
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn subscribe_changes(redis_url: &str, presence: &Presence) -> Result<(), RedisError> {
    let client = Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(PRESENCE_CHANNEL).await?;

    let mut messages = pubsub.on_message();
    while messages.next().await.is_some() {
        presence.refresh().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stamps: u8, points: u32) -> PresenceRecord {
        PresenceRecord {
            stamps,
            points,
            history: vec![],
        }
    }

    #[test]
    fn test_last_write_wins_never_merges() {
        let room = Room::new();

        room.apply("4821", record(3, 10));
        room.apply("4821", record(1, 0));

        let seen = room.get("4821").unwrap();
        assert_eq!(seen.stamps, 1);
        assert_eq!(seen.points, 0);
    }

    #[test]
    fn test_lookup_of_absent_client() {
        let room = Room::new();
        assert!(room.get("0000").is_none());
    }

    #[test]
    fn test_watchers_receive_full_mapping() {
        let room = Room::new();
        let mut watcher = room.watch();

        let mut map = PresenceMap::new();
        map.insert("4821".to_string(), record(2, 5));
        map.insert("1337".to_string(), record(0, 1));
        room.replace(map);

        let seen = watcher.try_recv().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen["4821"].stamps, 2);
        assert_eq!(seen["1337"].points, 1);
    }

    #[test]
    fn test_snapshot_skips_unreadable_records() {
        let mut raw = HashMap::new();
        raw.insert("4821".to_string(), r#"{"stamps":4,"points":2}"#.to_string());
        raw.insert("9999".to_string(), "not json".to_string());

        let map = parse_room(raw);

        assert_eq!(map.len(), 1);
        assert_eq!(map["4821"].stamps, 4);
    }
}
