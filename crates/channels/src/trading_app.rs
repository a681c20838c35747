//! Trading-app support chat adapter, modeled on a desktop trading
//! client's support conversation surface. Capability set adds
//! `POLL_CONVERSATIONS` and `EXTRACT_FAQS`; `get_delivery_target` reads
//! `conversation_id`. Supports signed-webhook verification via
//! `IncomingMessage::verify_channel_signature`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use gw_domain::{localization, CapabilitySet, ChannelCapability, ChannelKind, HealthStatus, IncomingMessage, OutgoingMessage};
use parking_lot::Mutex;

use crate::adapter::{AdapterError, ChannelAdapter};

pub struct TradingAppChatChannel {
    capabilities: CapabilitySet,
    running: AtomicBool,
    inbox: Mutex<Vec<IncomingMessage>>,
    pub outbox: Mutex<Vec<(String, OutgoingMessage)>>,
    webhook_secret: Option<Vec<u8>>,
}

impl TradingAppChatChannel {
    pub fn new(webhook_secret: Option<Vec<u8>>) -> Self {
        Self {
            capabilities: CapabilitySet::new([
                ChannelCapability::ReceiveMessages,
                ChannelCapability::SendResponses,
                ChannelCapability::PollConversations,
                ChannelCapability::ExtractFaqs,
                ChannelCapability::TextMessages,
            ]),
            running: AtomicBool::new(false),
            inbox: Mutex::new(Vec::new()),
            outbox: Mutex::new(Vec::new()),
            webhook_secret,
        }
    }

    pub fn push_incoming(&self, message: IncomingMessage) {
        self.inbox.lock().push(message);
    }
}

#[async_trait]
impl ChannelAdapter for TradingAppChatChannel {
    fn channel_id(&self) -> &str {
        ChannelKind::TradingAppChat.as_str()
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    async fn start(&self) -> Result<(), AdapterError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            healthy: self.running.load(Ordering::SeqCst),
            message: "trading-app-chat REST/WebSocket stand-in".into(),
            last_check: Utc::now(),
            details: HashMap::new(),
        }
    }

    async fn send_message(&self, target: &str, outgoing: &OutgoingMessage) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        self.outbox.lock().push((target.to_string(), outgoing.clone()));
        true
    }

    fn handle_incoming(&self, incoming: IncomingMessage) -> IncomingMessage {
        if let Some(secret) = &self.webhook_secret {
            if incoming.channel_signature.is_some() && !incoming.verify_channel_signature(secret) {
                tracing::warn!(message_id = %incoming.message_id, "trading-app-chat signature verification failed");
            }
        }
        incoming
    }

    async fn poll_conversations(&self) -> Result<Vec<IncomingMessage>, AdapterError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable(self.channel_id().to_string()));
        }
        Ok(std::mem::take(&mut *self.inbox.lock()))
    }

    fn get_delivery_target(&self, channel_metadata: &HashMap<String, String>) -> Option<String> {
        channel_metadata.get("conversation_id").cloned()
    }

    fn format_escalation_message(&self, _username: &str, escalation_id: i64, support_handle: &str) -> String {
        localization::render_escalation_notice("trading-app", escalation_id, support_handle, Some("en"))
    }
}
