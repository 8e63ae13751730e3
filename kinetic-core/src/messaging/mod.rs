//! Trainer ↔ trainee messaging on top of the key-value store.
//!
//! Conversations live in one list under [`CONVERSATIONS_KEY`], each
//! conversation's messages under `fitness_messages_<conversationId>` and each
//! user's unread counters under `fitness_unread_<userId>`. Live listeners
//! subscribe through [`MessageHub`].

mod hub;
mod service;

pub use hub::{MessageHub, MessageSubscription};
pub use service::MessagingService;

use crate::db::StoreError;
use crate::db::models::WorkoutStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const CONVERSATIONS_KEY: &str = "fitness_conversations";
pub const MESSAGES_KEY: &str = "fitness_messages";
pub const UNREAD_KEY: &str = "fitness_unread";

pub fn messages_key(conversation_id: &str) -> String {
    format!("{}_{}", MESSAGES_KEY, conversation_id)
}

pub fn unread_key(user_id: &str) -> String {
    format!("{}_{}", UNREAD_KEY, user_id)
}

pub fn conversation_id(trainer_id: &str, trainee_id: &str) -> String {
    format!("conv_{}_{}", trainer_id, trainee_id)
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("message content is empty")]
    EmptyContent,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Trainer,
    Trainee,
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SenderRole::Trainer => "trainer",
            SenderRole::Trainee => "trainee",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Workout,
    SessionUpdate,
    ProgressShare,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_data: Option<WorkoutStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_type: SenderRole,
    pub recipient_id: String,
    pub recipient_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub trainer_id: String,
    pub trainer_name: String,
    pub trainee_id: String,
    pub trainee_name: String,
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
}

/// One side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub role: SenderRole,
}

impl Participant {
    pub fn trainer(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: SenderRole::Trainer,
        }
    }

    pub fn trainee(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: SenderRole::Trainee,
        }
    }
}

/// A message before the service assigns id, timestamp and read flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender: Participant,
    pub recipient: Participant,
    pub content: String,
    pub kind: MessageKind,
    pub metadata: Option<MessageMetadata>,
}

impl NewMessage {
    pub fn text(conversation_id: &str, sender: &Participant, recipient: &Participant, content: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            sender: sender.clone(),
            recipient: recipient.clone(),
            content: content.to_string(),
            kind: MessageKind::Text,
            metadata: None,
        }
    }
}
