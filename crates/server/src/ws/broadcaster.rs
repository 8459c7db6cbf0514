//! Per-room fan-out. One `Broadcaster` is built at process start, shared
//! through `AppState`, and owns every subscriber set. A room channel is
//! active while it has subscribers; the entry is removed when the last
//! one leaves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::ws::events::ServerEvent;

pub type ClientId = u64;

pub struct ConnectedClient {
    pub user_id: String,
    pub username: String,
    pub tx: mpsc::Sender<String>,
    pub subscribed_rooms: HashSet<String>,
}

pub struct Broadcaster {
    send_buffer: usize,
    next_id: RwLock<u64>,
    clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    room_subs: RwLock<HashMap<String, HashSet<ClientId>>>,
    // Serializes persist+fan-out per room so subscribers observe events
    // in commit order.
    room_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Broadcaster {
    pub fn new(send_buffer: usize) -> Self {
        Self {
            send_buffer,
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
            room_subs: RwLock::new(HashMap::new()),
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bounded outbound queue for one subscriber. The receiving half is
    /// drained by the connection's forward task; a queue that fills up
    /// gets its owner disconnected (see `broadcast_room`).
    pub fn outbound_queue(&self) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(self.send_buffer)
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: String,
        username: String,
        tx: mpsc::Sender<String>,
    ) {
        let client = ConnectedClient {
            user_id,
            username,
            tx,
            subscribed_rooms: HashSet::new(),
        };
        self.clients.write().await.insert(client_id, client);
    }

    pub async fn unregister(&self, client_id: ClientId) -> Option<ConnectedClient> {
        let client = self.clients.write().await.remove(&client_id)?;

        let mut subs = self.room_subs.write().await;
        for room in &client.subscribed_rooms {
            if let Some(set) = subs.get_mut(room) {
                set.remove(&client_id);
                if set.is_empty() {
                    subs.remove(room);
                }
            }
        }

        Some(client)
    }

    pub async fn subscribe(&self, client_id: ClientId, room: &str) {
        self.room_subs
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(client_id);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_rooms.insert(room.to_string());
        }
    }

    pub async fn unsubscribe(&self, client_id: ClientId, room: &str) {
        let mut subs = self.room_subs.write().await;
        if let Some(set) = subs.get_mut(room) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(room);
            }
        }
        drop(subs);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_rooms.remove(room);
        }
    }

    pub async fn is_subscribed(&self, client_id: ClientId, room: &str) -> bool {
        self.room_subs
            .read()
            .await
            .get(room)
            .is_some_and(|set| set.contains(&client_id))
    }

    /// Remove every connection of `user_id` from a room's subscriber set
    /// (used when a member is removed from the room).
    pub async fn kick_user(&self, room: &str, user_id: &str) {
        let kicked: Vec<ClientId> = {
            let subs = self.room_subs.read().await;
            let clients = self.clients.read().await;
            let Some(set) = subs.get(room) else {
                return;
            };
            set.iter()
                .copied()
                .filter(|cid| clients.get(cid).is_some_and(|c| c.user_id == user_id))
                .collect()
        };

        for cid in kicked {
            self.unsubscribe(cid, room).await;
        }
    }

    /// Drop all subscriber state for a room (room deletion).
    pub async fn drop_room(&self, room: &str) {
        let removed = self.room_subs.write().await.remove(room);
        if let Some(set) = removed {
            let mut clients = self.clients.write().await;
            for cid in set {
                if let Some(client) = clients.get_mut(&cid) {
                    client.subscribed_rooms.remove(room);
                }
            }
        }
        self.room_locks.lock().await.remove(room);
    }

    /// The per-room send lock. Message mutations hold this across
    /// persist + fan-out so broadcast order matches commit order.
    pub async fn send_lock(&self, room: &str) -> Arc<Mutex<()>> {
        self.room_locks
            .lock()
            .await
            .entry(room.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fan an event out to every subscriber of a room. Best-effort per
    /// subscriber: a full outbound queue marks that subscriber for
    /// disconnect instead of stalling the sender or its peers.
    pub async fn broadcast_room(&self, room: &str, event: &ServerEvent, exclude: Option<ClientId>) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let mut overflowed = Vec::new();
        {
            let subs = self.room_subs.read().await;
            let clients = self.clients.read().await;

            if let Some(subscriber_ids) = subs.get(room) {
                for &cid in subscriber_ids {
                    if Some(cid) == exclude {
                        continue;
                    }
                    if let Some(client) = clients.get(&cid) {
                        if let Err(mpsc::error::TrySendError::Full(_)) =
                            client.tx.try_send(msg.clone())
                        {
                            overflowed.push(cid);
                        }
                    }
                }
            }
        }

        for cid in overflowed {
            tracing::warn!("disconnecting slow subscriber {} in room {}", cid, room);
            self.unregister(cid).await;
        }
    }

    pub async fn send_to(&self, client_id: ClientId, event: &ServerEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let clients = self.clients.read().await;
        if let Some(client) = clients.get(&client_id) {
            let _ = client.tx.try_send(msg);
        }
    }

    /// Drop every client sender, ending all forward tasks and closing
    /// their sockets.
    pub async fn shutdown(&self) {
        self.clients.write().await.clear();
        self.room_subs.write().await.clear();
        self.room_locks.lock().await.clear();
    }
}
