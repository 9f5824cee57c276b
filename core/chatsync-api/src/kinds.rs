//! Per-kind behaviour: payload shape, clean-up before persistence and merging
//! of fetched documents with listing info.

use chatsync_types::{Entity, EntityInfo, EntityKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// The JSON document stored behind an entity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument<P> {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(flatten)]
    pub payload: P,
}

/// Describes one storable entity kind.
pub trait EntityKindSpec: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    const KIND: EntityKind;

    /// Strips transient, UI-only state before the payload is serialized.
    fn clean_up_entity(&self, payload: Self::Payload) -> Self::Payload {
        payload
    }

    /// Reconciles listing info with a fetched document.
    ///
    /// Listing info wins for fields present in both (key, name, folder,
    /// update time); the payload always comes from the fetch.
    fn merge_get_result(
        &self,
        info: &EntityInfo,
        fetched: StoredDocument<Self::Payload>,
    ) -> Entity<Self::Payload> {
        let merged = EntityInfo {
            updated_at: info.updated_at.or(fetched.updated_at),
            ..info.clone()
        };
        Entity::new(merged, fetched.payload)
    }
}

// ── Conversations ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Rating given by the user: -1, 0 or 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<i8>,
    /// Error shown next to a failed message; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
            like: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRef {
    pub id: String,
}

/// Replay cursor while a conversation is being played back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    pub active_index: usize,
    pub is_playback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload {
    pub model: ModelRef,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub selected_addons: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_message_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<Playback>,
}

fn default_temperature() -> f64 {
    1.0
}

impl ConversationPayload {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model: ModelRef { id: model_id.into() },
            messages: Vec::new(),
            prompt: String::new(),
            temperature: default_temperature(),
            selected_addons: Vec::new(),
            is_message_streaming: false,
            playback: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationKind;

impl EntityKindSpec for ConversationKind {
    type Payload = ConversationPayload;

    const KIND: EntityKind = EntityKind::Conversation;

    fn clean_up_entity(&self, mut payload: ConversationPayload) -> ConversationPayload {
        payload.is_message_streaming = false;
        payload.playback = None;
        for message in &mut payload.messages {
            message.error_message = None;
        }
        payload
    }
}

// ── Prompts ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptKind;

impl EntityKindSpec for PromptKind {
    type Payload = PromptPayload;

    const KIND: EntityKind = EntityKind::Prompt;

    fn clean_up_entity(&self, payload: PromptPayload) -> PromptPayload {
        let description = payload
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        PromptPayload {
            content: payload.content.trim().to_string(),
            description,
        }
    }
}

// ── Applications ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPayload {
    pub endpoint: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_attachment_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_attachments: Option<u32>,
    /// Deployment status reported by the runtime; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationKind;

impl EntityKindSpec for ApplicationKind {
    type Payload = ApplicationPayload;

    const KIND: EntityKind = EntityKind::Application;

    fn clean_up_entity(&self, mut payload: ApplicationPayload) -> ApplicationPayload {
        payload.function_status = None;
        payload
    }
}
