//! Core wire types shared by every channel adapter, the hook pipeline, and
//! the HTTP surface: [`IncomingMessage`], [`OutgoingMessage`], and their
//! constituent parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Channel transport kind. The three concrete transports named in the
/// purpose statement; adapters are free to add more (: "plus future
/// additions").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Web,
    FederatedChat,
    TradingAppChat,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Web => "web",
            ChannelKind::FederatedChat => "federated-chat",
            ChannelKind::TradingAppChat => "trading-app-chat",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
}

impl Default for MessagePriority {
    fn default() -> Self {
        MessagePriority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn validate(&self) -> Result<()> {
        if self.content.len() > 4000 {
            return Err(Error::Validation("chat message content exceeds 4000 chars".into()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("chat message content is empty".into()));
        }
        if self.content.contains('\0') {
            return Err(Error::Validation("chat message content contains NUL byte".into()));
        }
        Ok(())
    }
}

/// The user/session identity attached to an [`IncomingMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub channel_user_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub auth_timestamp: Option<DateTime<Utc>>,
}

fn user_id_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9_\-@.:]{1,128}$").expect("valid static regex"))
}

impl UserContext {
    pub fn validate(&self) -> Result<()> {
        if !user_id_re().is_match(&self.user_id) {
            return Err(Error::Validation(format!(
                "user_id '{}' does not match required pattern",
                self.user_id
            )));
        }
        Ok(())
    }
}

/// A question submitted by a user through a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: String,
    pub channel: ChannelKind,
    pub question: String,
    pub user: UserContext,
    #[serde(default)]
    pub chat_history: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub channel_metadata: HashMap<String, String>,
    #[serde(default)]
    pub priority: MessagePriority,
    #[serde(default)]
    pub bypass_hooks: Vec<String>,
    #[serde(default)]
    pub channel_signature: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn validate(&self) -> Result<()> {
        let trimmed = self.question.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("question is empty".into()));
        }
        if self.question.len() > 4000 {
            return Err(Error::Validation("question exceeds 4000 chars".into()));
        }
        if self.question.contains('\0') {
            return Err(Error::Validation("question contains NUL byte".into()));
        }
        self.user.validate()?;
        if let Some(history) = &self.chat_history {
            for m in history {
                m.validate()?;
            }
        }
        Ok(())
    }

    /// HMAC-SHA256 signature over `message_id|channel|timestamp`, used by
    /// channel adapters whose transport supports signed webhooks.
    pub fn compute_signature(&self, secret: &[u8]) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(self.signing_payload().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn verify_channel_signature(&self, secret: &[u8]) -> bool {
        use subtle::ConstantTimeEq;
        let Some(provided) = &self.channel_signature else {
            return false;
        };
        let expected = self.compute_signature(secret);
        let (Ok(a), Ok(b)) = (hex::decode(provided), hex::decode(&expected)) else {
            return false;
        };
        a.ct_eq(&b).into()
    }

    fn signing_payload(&self) -> String {
        format!("{}{}{}", self.message_id, self.channel, self.timestamp.to_rfc3339())
    }
}

/// A document/FAQ citation backing an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReference {
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub relevance_score: f64,
    #[serde(default)]
    pub category: Option<String>,
}

/// Picks one label for "the" source type behind an answer that may cite
/// several: the highest-`relevance_score` source's `category`. Used
/// anywhere the Source-Weight Manager (C14) wants a single per-review
/// signal out of a multi-source answer.
pub fn representative_source_type(sources: &[DocumentReference]) -> Option<String> {
    sources
        .iter()
        .max_by(|a, b| a.relevance_score.total_cmp(&b.relevance_score))
        .and_then(|s| s.category.clone())
}

/// The fixed routing action enum at the core boundary: one enum,
/// translated to/from strings at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    AutoSend,
    QueueMedium,
    NeedsHuman,
    StaffResponse,
}

impl RoutingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingAction::AutoSend => "auto_send",
            RoutingAction::QueueMedium => "queue_medium",
            RoutingAction::NeedsHuman => "needs_human",
            RoutingAction::StaffResponse => "staff_response",
        }
    }
}

impl std::fmt::Display for RoutingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub rag_strategy: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u32>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub routing_action: Option<RoutingAction>,
    #[serde(default)]
    pub routing_reason: Option<String>,
    #[serde(default)]
    pub hooks_executed: Vec<String>,
}

/// The response produced by one pipeline invocation, destined for the
/// originating channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub message_id: String,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    pub channel: ChannelKind,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<DocumentReference>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub requires_human: bool,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    pub user: UserContext,
    pub timestamp: DateTime<Utc>,
}

impl OutgoingMessage {
    pub fn mark_hook_executed(&mut self, hook_name: &str) {
        self.metadata.hooks_executed.push(hook_name.to_string());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
    pub last_check: DateTime<Utc>,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

/// A record tracked against a previously dispatched message, keyed by
/// `(channel_id, external_message_id)` — see [`crate::keys`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessageRecord {
    pub internal_message_id: String,
    pub question: String,
    pub answer: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<DocumentReference>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub requires_human: bool,
    #[serde(default)]
    pub routing_action: Option<RoutingAction>,
    #[serde(default)]
    pub delivery_target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionRating {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub channel_id: String,
    pub external_message_id: String,
    pub reactor_id: String,
    pub rating: ReactionRating,
    pub raw_reaction: String,
    pub timestamp: DateTime<Utc>,
}

/// Derived from [`IncomingMessage`] for dedup/locking purposes.
#[derive(Debug, Clone)]
pub struct CanonicalInboundEvent {
    pub channel_id: String,
    pub event_id: String,
    pub thread_id: String,
    pub user_id: String,
}

impl CanonicalInboundEvent {
    /// `thread_id` is derived from `channel_metadata`'s room/conversation/
    /// session identifiers, falling back to the user id so DMs without an
    /// explicit thread still serialize per-user.
    pub fn from_incoming(incoming: &IncomingMessage) -> Self {
        let thread_id = incoming
            .channel_metadata
            .get("room_id")
            .or_else(|| incoming.channel_metadata.get("conversation_id"))
            .or_else(|| incoming.channel_metadata.get("session_id"))
            .cloned()
            .unwrap_or_else(|| incoming.user.user_id.clone());

        Self {
            channel_id: incoming.channel.as_str().to_string(),
            event_id: incoming.message_id.clone(),
            thread_id,
            user_id: incoming.user.user_id.clone(),
        }
    }
}
