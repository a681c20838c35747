//! Web channel adapter: a synchronous HTTP chat. Capability set
//! `{RECEIVE_MESSAGES, SEND_RESPONSES, TEXT_MESSAGES, CHAT_HISTORY}`;
//! `send_message` is a no-op success because the web channel is
//! poll-only — the browser polls
//! `GET /escalations/{message_id}/response` for staff answers instead
//! of receiving a push.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use gw_domain::{localization, CapabilitySet, ChannelCapability, ChannelKind, HealthStatus, IncomingMessage, OutgoingMessage};

use crate::adapter::{AdapterError, ChannelAdapter};

pub struct WebChannel {
    capabilities: CapabilitySet,
    running: AtomicBool,
}

impl Default for WebChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WebChannel {
    pub fn new() -> Self {
        Self {
            capabilities: CapabilitySet::new([
                ChannelCapability::ReceiveMessages,
                ChannelCapability::SendResponses,
                ChannelCapability::TextMessages,
                ChannelCapability::ChatHistory,
            ]),
            running: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ChannelAdapter for WebChannel {
    fn channel_id(&self) -> &str {
        ChannelKind::Web.as_str()
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
            message: "web channel is synchronous HTTP; no persistent connection to check".into(),
            last_check: Utc::now(),
            details: HashMap::new(),
        }
    }

    async fn send_message(&self, _target: &str, _outgoing: &OutgoingMessage) -> bool {
        // Poll-only: the HTTP response body already carries the answer,
        // and escalation responses are read back via the poll endpoint.
        true
    }

    fn handle_incoming(&self, incoming: IncomingMessage) -> IncomingMessage {
        incoming
    }

    fn get_delivery_target(&self, _channel_metadata: &HashMap<String, String>) -> Option<String> {
        None
    }

    fn format_escalation_message(&self, _username: &str, escalation_id: i64, support_handle: &str) -> String {
        localization::render_escalation_notice("web", escalation_id, support_handle, Some("en"))
    }

    fn is_poll_only(&self) -> bool {
        true
    }
}
