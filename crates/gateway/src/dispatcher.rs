//! Response Dispatcher (C6). Sends the built `OutgoingMessage`
//! back out through the originating channel adapter, unless the
//! Escalation hook already replaced it with a "a human will get back to
//! you" notice, in which case there is nothing left to push.

use std::sync::Arc;

use gw_channels::ChannelRegistry;
use gw_coordination::SentMessageTracker;
use gw_domain::{IncomingMessage, OutgoingMessage, RoutingAction, SentMessageRecord, TraceEvent};

pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    sent_messages: Arc<SentMessageTracker>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, sent_messages: Arc<SentMessageTracker>) -> Self {
        Self {
            registry,
            sent_messages,
        }
    }

    /// Returns `true` when the turn is considered handled: either the
    /// adapter accepted the send, or no send was needed because the
    /// escalation hook already queued it for a human.
    pub async fn dispatch(&self, incoming: &IncomingMessage, response: &OutgoingMessage) -> bool {
        if response.requires_human
            && matches!(
                response.metadata.routing_action,
                Some(RoutingAction::QueueMedium | RoutingAction::NeedsHuman)
            )
        {
            return true;
        }

        let channel_id = incoming.channel.as_str();
        let Some(adapter) = self.registry.get(channel_id) else {
            TraceEvent::Dispatched {
                channel: channel_id.to_string(),
                message_id: response.message_id.clone(),
                success: false,
            }
            .emit();
            return false;
        };

        let target = adapter
            .get_delivery_target(&incoming.channel_metadata)
            .unwrap_or_default();
        let sent = adapter.send_message(&target, response).await;

        if sent {
            self.sent_messages.track(
                channel_id,
                &response.message_id,
                SentMessageRecord {
                    internal_message_id: response.message_id.clone(),
                    question: incoming.question.clone(),
                    answer: response.answer.clone(),
                    user_id: incoming.user.user_id.clone(),
                    timestamp: response.timestamp,
                    sources: response.sources.clone(),
                    confidence_score: response.metadata.confidence_score,
                    requires_human: response.requires_human,
                    routing_action: response.metadata.routing_action,
                    delivery_target: if target.is_empty() { None } else { Some(target) },
                },
            );
        }

        TraceEvent::Dispatched {
            channel: channel_id.to_string(),
            message_id: response.message_id.clone(),
            success: sent,
        }
        .emit();

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_channels::WebChannel;
    use gw_domain::ResponseMetadata;

    #[tokio::test]
    async fn escalation_queue_marker_skips_send() {
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(WebChannel::new()));
        let dispatcher = Dispatcher::new(registry, Arc::new(SentMessageTracker::new(std::time::Duration::from_secs(60))));
        let incoming = crate::test_support::sample_incoming("web");
        let mut response = crate::test_support::sample_outgoing(&incoming, "a human will help shortly");
        response.requires_human = true;
        response.metadata = ResponseMetadata {
            routing_action: Some(RoutingAction::QueueMedium),
            ..Default::default()
        };
        assert!(dispatcher.dispatch(&incoming, &response).await);
        assert!(dispatcher.sent_messages.is_empty());
    }

    #[tokio::test]
    async fn auto_send_tracks_record() {
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(WebChannel::new()));
        let dispatcher = Dispatcher::new(registry, Arc::new(SentMessageTracker::new(std::time::Duration::from_secs(60))));
        let incoming = crate::test_support::sample_incoming("web");
        let response = crate::test_support::sample_outgoing(&incoming, "here's how");
        assert!(dispatcher.dispatch(&incoming, &response).await);
        assert!(dispatcher.sent_messages.lookup("web", &response.message_id).is_some());
    }
}
