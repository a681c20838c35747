//! The Channel Adapter contract. Every concrete channel
//! (web, federated-chat, trading-app-chat, and future additions)
//! implements this trait; the registry and gateway dispatch against it
//! dynamically (`Arc<dyn ChannelAdapter>`) rather than through class
//! inheritance.

use std::collections::HashMap;

use async_trait::async_trait;
use gw_domain::{CapabilitySet, HealthStatus, IncomingMessage, OutgoingMessage};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("channel unavailable: {0}")]
    Unavailable(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn channel_id(&self) -> &str;

    fn capabilities(&self) -> &CapabilitySet;

    async fn start(&self) -> Result<(), AdapterError>;

    async fn stop(&self) -> Result<(), AdapterError>;

    async fn health_check(&self) -> HealthStatus;

    /// Deliver a response to the channel-specific `target`. `true` on
    /// success.
    async fn send_message(&self, target: &str, outgoing: &OutgoingMessage) -> bool;

    /// Channel-specific transform of a raw inbound event into the
    /// normalized `IncomingMessage`, used by adapters whose transport
    /// pushes a native payload rather than already speaking the core's
    /// envelope.
    fn handle_incoming(&self, incoming: IncomingMessage) -> IncomingMessage {
        incoming
    }

    /// Requires `POLL_CONVERSATIONS`. Default implementation returns no
    /// conversations; adapters that support polling override this.
    async fn poll_conversations(&self) -> Result<Vec<IncomingMessage>, AdapterError> {
        Ok(Vec::new())
    }

    /// Resolve the delivery target (room/conversation id, etc.) for an
    /// escalation response from the original inbound `channel_metadata`.
    fn get_delivery_target(&self, channel_metadata: &HashMap<String, String>) -> Option<String>;

    /// Localized escalation notice, delegated to `gw_domain::localization`
    /// by concrete adapters with the channel's localization bucket.
    fn format_escalation_message(
        &self,
        username: &str,
        escalation_id: i64,
        support_handle: &str,
    ) -> String;

    /// Whether the channel is poll-only (never pushed to directly); web
    /// is poll-only — the user polls `GET /escalations/{message_id}/response`.
    fn is_poll_only(&self) -> bool {
        false
    }
}
