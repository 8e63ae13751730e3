use crate::messaging::Message;
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

const CHANNEL_CAPACITY: usize = 100;

/// Fan-out of newly sent messages to live listeners, per conversation.
#[derive(Debug, Default)]
pub struct MessageHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Message>>>,
}

/// A live feed of one conversation. Dropping it unsubscribes.
#[derive(Debug)]
pub struct MessageSubscription {
    conversation_id: String,
    receiver: broadcast::Receiver<Message>,
}

impl MessageHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, conversation_id: &str) -> MessageSubscription {
        let mut channels = self.channels.write().await;
        prune(&mut channels);
        let sender = channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        debug!("New listener on conversation {}", conversation_id);
        MessageSubscription {
            conversation_id: conversation_id.to_string(),
            receiver: sender.subscribe(),
        }
    }

    /// Delivers `message` to current listeners of its conversation and
    /// returns how many received it.
    pub async fn publish(&self, message: &Message) -> usize {
        let mut channels = self.channels.write().await;
        let Some(sender) = channels.get(&message.conversation_id) else {
            return 0;
        };
        match sender.send(message.clone()) {
            Ok(delivered) => delivered,
            Err(_) => {
                // Every subscription was dropped.
                channels.remove(&message.conversation_id);
                0
            }
        }
    }

    pub async fn listener_count(&self, conversation_id: &str) -> usize {
        let mut channels = self.channels.write().await;
        prune(&mut channels);
        channels
            .get(conversation_id)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Conversations with at least one live subscription.
    pub async fn active_conversations(&self) -> usize {
        let mut channels = self.channels.write().await;
        prune(&mut channels);
        channels.len()
    }
}

// Drops channels whose subscriptions are all gone.
fn prune(channels: &mut HashMap<String, broadcast::Sender<Message>>) {
    channels.retain(|conversation_id, sender| {
        let live = sender.receiver_count() > 0;
        if !live {
            debug!("No listeners left on conversation {}", conversation_id);
        }
        live
    });
}

impl MessageSubscription {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Waits for the next message; `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Listener on {} fell behind, {} messages skipped",
                        self.conversation_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
