//! Fan-out of ledger events to connected observers.
//!
//! Every observer owns a bounded queue. Delivery never waits: an observer
//! whose queue is full or whose receiver is gone is removed and the others
//! still get the event. Events are delivered in ledger order, so each
//! observer sees them first-in first-out.

use crate::ledger::{LedgerEvent, LedgerEvents};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ObserverId = Uuid;

/// Receiving side of one subscription. Dropping it unsubscribes on the next broadcast.
pub struct ObserverHandle {
    id: ObserverId,
    receiver: mpsc::Receiver<Arc<LedgerEvent>>,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next event; None once the hub dropped this observer
    pub async fn recv(&mut self) -> Option<Arc<LedgerEvent>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<LedgerEvent>> {
        self.receiver.try_recv().ok()
    }
}

pub struct NotificationHub {
    observers: RwLock<HashMap<ObserverId, mpsc::Sender<Arc<LedgerEvent>>>>,
    queue_capacity: usize,
}

impl NotificationHub {
    /// `queue_capacity` is how many undelivered events an observer may lag behind
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub async fn subscribe(&self) -> ObserverHandle {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, tx);
            observers.len()
        };
        info!("Observer {} subscribed ({} connected)", id, count);
        ObserverHandle { id, receiver: rx }
    }

    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            info!("Observer {} unsubscribed", id);
        }
        removed
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Hand `event` to every observer. Returns how many accepted it.
    pub async fn broadcast(&self, event: Arc<LedgerEvent>) -> usize {
        let mut delivered = 0;
        let mut dropped = Vec::new();

        {
            let observers = self.observers.read().await;
            for (id, tx) in observers.iter() {
                match tx.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!("Observer {} is not keeping up, dropping it", id);
                        dropped.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Observer {} went away", id);
                        dropped.push(*id);
                    }
                }
            }
        }

        if !dropped.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &dropped {
                observers.remove(id);
            }
        }

        debug!(
            "Broadcast event {} to {} observers ({} dropped)",
            event.sequence,
            delivered,
            dropped.len()
        );
        delivered
    }

    /// Forward ledger events until the ledger is gone
    pub async fn run(self: Arc<Self>, mut events: LedgerEvents) {
        info!("Notification hub started");
        while let Some(event) = events.recv().await {
            self.broadcast(Arc::new(event)).await;
        }
        info!("Ledger event stream closed, notification hub stopping");
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(32)
    }
}
