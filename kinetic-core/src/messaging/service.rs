use crate::db::models::{Workout, WorkoutStats};
use crate::db::{LocalStore, StoreError, read_json, write_json};
use crate::messaging::{
    CONVERSATIONS_KEY, Conversation, Message, MessageHub, MessageKind, MessageMetadata,
    MessageSubscription, MessagingError, NewMessage, Participant, SenderRole, conversation_id,
    messages_key, unread_key,
};
use crate::session::{Clock, SystemClock};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

type UnreadCounts = BTreeMap<String, u32>;

pub struct MessagingService<S> {
    store: S,
    hub: MessageHub,
    clock: Arc<dyn Clock>,
}

impl<S: LocalStore> MessagingService<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            hub: MessageHub::new(),
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hub(&self) -> &MessageHub {
        &self.hub
    }

    /// Stores the message, bumps the recipient's unread counter and notifies
    /// live listeners of the conversation.
    pub async fn send_message(&self, new: NewMessage) -> Result<Message, MessagingError> {
        if new.content.trim().is_empty() {
            return Err(MessagingError::EmptyContent);
        }
        let timestamp = self.clock.now();
        let suffix = Uuid::new_v4().simple().to_string();
        let message = Message {
            id: format!("msg_{}_{}", timestamp.timestamp_millis(), &suffix[..9]),
            conversation_id: new.conversation_id,
            sender_id: new.sender.id,
            sender_name: new.sender.name,
            sender_type: new.sender.role,
            recipient_id: new.recipient.id,
            recipient_name: new.recipient.name,
            content: new.content,
            kind: new.kind,
            timestamp,
            is_read: false,
            metadata: new.metadata,
        };

        let mut messages = self.get_conversation_messages(&message.conversation_id).await?;
        messages.push(message.clone());
        write_json(&self.store, &messages_key(&message.conversation_id), &messages).await?;
        self.record_in_conversation(&message).await?;
        self.bump_unread(&message.recipient_id, &message.conversation_id)
            .await?;

        let delivered = self.hub.publish(&message).await;
        debug!(
            "Message {} sent in {} ({} live listeners)",
            message.id, message.conversation_id, delivered
        );
        Ok(message)
    }

    async fn get_all_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(read_json(&self.store, CONVERSATIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn record_in_conversation(&self, message: &Message) -> Result<(), StoreError> {
        let (trainer_id, trainer_name, trainee_id, trainee_name) = match message.sender_type {
            SenderRole::Trainer => (
                &message.sender_id,
                &message.sender_name,
                &message.recipient_id,
                &message.recipient_name,
            ),
            SenderRole::Trainee => (
                &message.recipient_id,
                &message.recipient_name,
                &message.sender_id,
                &message.sender_name,
            ),
        };
        let conversation = Conversation {
            id: message.conversation_id.clone(),
            trainer_id: trainer_id.clone(),
            trainer_name: trainer_name.clone(),
            trainee_id: trainee_id.clone(),
            trainee_name: trainee_name.clone(),
            last_message: Some(message.clone()),
            unread_count: 0,
            last_activity: message.timestamp,
            is_active: true,
        };
        self.upsert_conversation(conversation).await
    }

    async fn upsert_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        let mut conversations = self.get_all_conversations().await?;
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation,
            None => conversations.push(conversation),
        }
        write_json(&self.store, CONVERSATIONS_KEY, &conversations).await
    }

    async fn unread_counts(&self, user_id: &str) -> Result<UnreadCounts, StoreError> {
        Ok(read_json(&self.store, &unread_key(user_id))
            .await?
            .unwrap_or_default())
    }

    async fn bump_unread(&self, user_id: &str, conversation_id: &str) -> Result<(), StoreError> {
        let mut counts = self.unread_counts(user_id).await?;
        *counts.entry(conversation_id.to_string()).or_default() += 1;
        write_json(&self.store, &unread_key(user_id), &counts).await
    }

    pub async fn get_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        Ok(read_json(&self.store, &messages_key(conversation_id))
            .await?
            .unwrap_or_default())
    }

    /// Conversations the user takes part in as `role`, most recently active
    /// first, with the user's unread counts filled in.
    pub async fn get_user_conversations(
        &self,
        user_id: &str,
        role: SenderRole,
    ) -> Result<Vec<Conversation>, StoreError> {
        let counts = self.unread_counts(user_id).await?;
        let mut conversations: Vec<Conversation> = self
            .get_all_conversations()
            .await?
            .into_iter()
            .filter(|c| match role {
                SenderRole::Trainer => c.trainer_id == user_id,
                SenderRole::Trainee => c.trainee_id == user_id,
            })
            .map(|mut c| {
                c.unread_count = counts.get(&c.id).copied().unwrap_or(0);
                c
            })
            .collect();
        conversations.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(conversations)
    }

    pub async fn mark_messages_as_read(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let mut messages = self.get_conversation_messages(conversation_id).await?;
        for message in messages.iter_mut().filter(|m| m.recipient_id == user_id) {
            message.is_read = true;
        }
        write_json(&self.store, &messages_key(conversation_id), &messages).await?;

        let mut counts = self.unread_counts(user_id).await?;
        counts.insert(conversation_id.to_string(), 0);
        write_json(&self.store, &unread_key(user_id), &counts).await
    }

    pub async fn get_total_unread_count(&self, user_id: &str) -> Result<u32, StoreError> {
        Ok(self.unread_counts(user_id).await?.values().sum())
    }

    /// Opens (or reactivates) the conversation between a trainer and a
    /// trainee and returns its id. Existing history is kept.
    pub async fn create_conversation(
        &self,
        trainer: &Participant,
        trainee: &Participant,
    ) -> Result<String, StoreError> {
        let id = conversation_id(&trainer.id, &trainee.id);
        let existing = self
            .get_all_conversations()
            .await?
            .into_iter()
            .find(|c| c.id == id);
        let conversation = Conversation {
            id: id.clone(),
            trainer_id: trainer.id.clone(),
            trainer_name: trainer.name.clone(),
            trainee_id: trainee.id.clone(),
            trainee_name: trainee.name.clone(),
            last_message: existing.and_then(|c| c.last_message),
            unread_count: 0,
            last_activity: self.clock.now(),
            is_active: true,
        };
        self.upsert_conversation(conversation).await?;
        info!("Conversation {} ready", id);
        Ok(id)
    }

    pub async fn share_workout(
        &self,
        conversation_id: &str,
        sender: &Participant,
        recipient: &Participant,
        workout: &Workout,
    ) -> Result<Message, MessagingError> {
        let exercises: HashSet<&str> = workout
            .exercises
            .iter()
            .map(|s| s.exercise_id.as_str())
            .collect();
        let content = format!(
            "Shared workout: {} - {} exercises, {} calories burned",
            workout.name,
            exercises.len(),
            workout.total_calories.unwrap_or(0)
        );
        self.send_message(NewMessage {
            kind: MessageKind::Workout,
            metadata: Some(MessageMetadata {
                workout_id: Some(workout.id.clone()),
                ..Default::default()
            }),
            ..NewMessage::text(conversation_id, sender, recipient, &content)
        })
        .await
    }

    pub async fn share_progress(
        &self,
        conversation_id: &str,
        sender: &Participant,
        recipient: &Participant,
        stats: &WorkoutStats,
    ) -> Result<Message, MessagingError> {
        let content = format!(
            "Shared progress update: {} workouts, {} day streak, {} calories burned",
            stats.total_workouts, stats.current_streak, stats.total_calories
        );
        self.send_message(NewMessage {
            kind: MessageKind::ProgressShare,
            metadata: Some(MessageMetadata {
                progress_data: Some(*stats),
                ..Default::default()
            }),
            ..NewMessage::text(conversation_id, sender, recipient, &content)
        })
        .await
    }

    pub async fn subscribe(&self, conversation_id: &str) -> MessageSubscription {
        self.hub.subscribe(conversation_id).await
    }
}
