use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for booking lifecycle events, one channel per consultant.
/// This is the seam the notification/chat collaborator subscribes on;
/// delivery itself happens outside this crate.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a consultant's booking events. Creates the channel if
    /// needed.
    pub fn subscribe(&self, consultant_id: Ulid) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(consultant_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, consultant_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&consultant_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a consultant's channel.
    pub fn remove(&self, consultant_id: &Ulid) {
        self.channels.remove(consultant_id);
    }
}
