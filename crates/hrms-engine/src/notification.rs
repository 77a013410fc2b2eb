//! Notification center - in-session notification fan-out
//!
//! Keeps every published event in memory for the life of the engine and
//! optionally forwards each one over an mpsc channel to a UI consumer.
//! Forwarding is best-effort: a full or closed channel drops the copy.

use hrms_core::{NotificationEvent, Role};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

#[derive(Clone, Default)]
pub struct NotificationCenter {
    events: Arc<RwLock<Vec<NotificationEvent>>>,
    event_tx: Option<mpsc::Sender<NotificationEvent>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every published event to `tx`
    pub fn with_event_channel(mut self, tx: mpsc::Sender<NotificationEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub async fn publish(&self, event: NotificationEvent) {
        if let Some(ref tx) = self.event_tx {
            if let Err(e) = tx.try_send(event.clone()) {
                warn!(notification = %event.id, "Dropped notification on channel: {}", e);
            }
        }
        self.events.write().await.push(event);
    }

    /// All notifications addressed to `role`, in publication order
    pub async fn by_role(&self, role: Role) -> Vec<NotificationEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.recipient_role == role)
            .cloned()
            .collect()
    }

    pub async fn unread_for_role(&self, role: Role) -> Vec<NotificationEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.recipient_role == role && !e.read)
            .cloned()
            .collect()
    }

    /// Mark one notification read. Returns `false` if the id is unknown.
    pub async fn mark_read(&self, id: &str) -> bool {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.mark_read();
                true
            }
            None => false,
        }
    }

    /// Mark every unread notification for `role` read; returns how many changed
    pub async fn mark_all_read(&self, role: Role) -> usize {
        let mut events = self.events.write().await;
        let mut changed = 0;
        for event in events
            .iter_mut()
            .filter(|e| e.recipient_role == role && !e.read)
        {
            event.mark_read();
            changed += 1;
        }
        changed
    }

    pub async fn all(&self) -> Vec<NotificationEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}
