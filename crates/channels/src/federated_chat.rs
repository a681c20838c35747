//! Federated-chat adapter, modeled on a Matrix-style room chat.
//! Capability set adds `PERSISTENT_CONNECTION` and
//! `POLL_CONVERSATIONS`; `get_delivery_target` reads `room_id` from
//! `channel_metadata`. An in-process stand-in: real wire transport is
//! out of scope, but inbound events can be injected via
//! [`FederatedChatChannel::push_incoming`] (simulating the federation
//! client's event stream) and sent messages land in an in-memory
//! outbox for test assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use gw_domain::{localization, CapabilitySet, ChannelCapability, ChannelKind, HealthStatus, IncomingMessage, OutgoingMessage};
use parking_lot::Mutex;

use crate::adapter::{AdapterError, ChannelAdapter};

pub struct FederatedChatChannel {
    capabilities: CapabilitySet,
    running: AtomicBool,
    inbox: Mutex<Vec<IncomingMessage>>,
    pub outbox: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl Default for FederatedChatChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FederatedChatChannel {
    pub fn new() -> Self {
        Self {
            capabilities: CapabilitySet::new([
                ChannelCapability::ReceiveMessages,
                ChannelCapability::SendResponses,
                ChannelCapability::PollConversations,
                ChannelCapability::PersistentConnection,
                ChannelCapability::TextMessages,
                ChannelCapability::ChatHistory,
            ]),
            running: AtomicBool::new(false),
            inbox: Mutex::new(Vec::new()),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Simulates a federation event arriving; the next poll tick picks
    /// it up.
    pub fn push_incoming(&self, message: IncomingMessage) {
        self.inbox.lock().push(message);
    }
}

#[async_trait]
impl ChannelAdapter for FederatedChatChannel {
    fn channel_id(&self) -> &str {
        ChannelKind::FederatedChat.as_str()
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
            message: "federated-chat persistent connection".into(),
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

    async fn poll_conversations(&self) -> Result<Vec<IncomingMessage>, AdapterError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable(self.channel_id().to_string()));
        }
        Ok(std::mem::take(&mut *self.inbox.lock()))
    }

    fn get_delivery_target(&self, channel_metadata: &HashMap<String, String>) -> Option<String> {
        channel_metadata.get("room_id").cloned()
    }

    fn format_escalation_message(&self, _username: &str, escalation_id: i64, support_handle: &str) -> String {
        localization::render_escalation_notice("matrix-like", escalation_id, support_handle, Some("en"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn polling_drains_the_inbox_once() {
        let chan = FederatedChatChannel::new();
        chan.start().await.unwrap();
        chan.push_incoming(IncomingMessage {
            message_id: "m1".into(),
            channel: ChannelKind::FederatedChat,
            question: "hi".into(),
            user: gw_domain::UserContext { user_id: "u1".into(), ..Default::default() },
            chat_history: None,
            channel_metadata: HashMap::new(),
            priority: Default::default(),
            bypass_hooks: Vec::new(),
            channel_signature: None,
            timestamp: Utc::now(),
        });
        let first = chan.poll_conversations().await.unwrap();
        assert_eq!(first.len(), 1);
        let second = chan.poll_conversations().await.unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn delivery_target_reads_room_id() {
        let chan = FederatedChatChannel::new();
        let mut meta = HashMap::new();
        meta.insert("room_id".to_string(), "!room:server".to_string());
        assert_eq!(chan.get_delivery_target(&meta), Some("!room:server".to_string()));
    }
}
