//! Response Delivery (C11): routes a staff answer back to the
//! originating channel.

use chrono::Utc;
use gw_channels::ChannelRegistry;
use gw_domain::{Escalation, OutgoingMessage, ResponseMetadata, UserContext};

use crate::edit_distance::whitespace_normalized_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Channel is poll-only; the user will read the answer via the HTTP
    /// poll endpoint. Treated as success with no adapter call.
    NotRequired,
    Delivered,
    Failed,
}

/// Deliver `escalation.staff_answer` to the originating channel. If the
/// staff answer equals the AI draft (whitespace-normalized), the
/// delivered message carries the original sources/confidence; otherwise
/// both are omitted.
pub async fn deliver(registry: &ChannelRegistry, escalation: &Escalation) -> DeliveryOutcome {
    let Some(adapter) = registry.get(escalation.channel.as_str()) else {
        return DeliveryOutcome::Failed;
    };

    if adapter.is_poll_only() {
        return DeliveryOutcome::NotRequired;
    }

    let Some(target) = adapter.get_delivery_target(&escalation.channel_metadata) else {
        return DeliveryOutcome::Failed;
    };

    let staff_answer = escalation.staff_answer.clone().unwrap_or_default();
    let preserves_ai_provenance = whitespace_normalized_eq(&escalation.ai_draft_answer, &staff_answer);

    let outgoing = OutgoingMessage {
        message_id: uuid::Uuid::new_v4().to_string(),
        in_reply_to: Some(escalation.message_id.clone()),
        channel: escalation.channel,
        answer: staff_answer,
        sources: if preserves_ai_provenance { escalation.sources.clone() } else { Vec::new() },
        metadata: ResponseMetadata {
            confidence_score: if preserves_ai_provenance { Some(escalation.confidence) } else { None },
            routing_action: Some(gw_domain::RoutingAction::StaffResponse),
            hooks_executed: Vec::new(),
            ..Default::default()
        },
        requires_human: false,
        suggested_questions: Vec::new(),
        user: UserContext {
            user_id: escalation.user_id.clone(),
            ..Default::default()
        },
        timestamp: Utc::now(),
    };

    if adapter.send_message(&target, &outgoing).await {
        DeliveryOutcome::Delivered
    } else {
        DeliveryOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_channels::{ChannelAdapter, FederatedChatChannel, WebChannel};
    use gw_domain::{ChannelKind, DeliveryStatus, EscalationStatus, MessagePriority};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn base_escalation(channel: ChannelKind, channel_metadata: HashMap<String, String>) -> Escalation {
        Escalation {
            id: 1,
            message_id: "m1".into(),
            channel,
            channel_metadata,
            user_id: "u1".into(),
            question: "q".into(),
            ai_draft_answer: "go to settings -> backup".into(),
            confidence: 0.9,
            routing_action: gw_domain::RoutingAction::NeedsHuman,
            routing_reason: None,
            sources: vec![gw_domain::DocumentReference {
                document_id: "d1".into(),
                title: "Backup guide".into(),
                url: None,
                relevance_score: 0.9,
                category: None,
            }],
            staff_answer: Some("go to settings -> backup".into()),
            staff_id: Some("staff-a".into()),
            edit_distance: Some(0.0),
            staff_answer_rating: None,
            delivery_status: DeliveryStatus::Pending,
            delivery_attempts: 0,
            delivery_error: None,
            status: EscalationStatus::Responded,
            priority: MessagePriority::Normal,
            generated_faq_id: None,
            created_at: Utc::now(),
            claimed_at: Some(Utc::now()),
            responded_at: Some(Utc::now()),
            closed_at: None,
            last_delivery_at: None,
        }
    }

    #[tokio::test]
    async fn web_channel_is_not_required() {
        let registry = ChannelRegistry::new();
        registry.register(Arc::new(WebChannel::new()));
        let e = base_escalation(ChannelKind::Web, HashMap::new());
        assert_eq!(deliver(&registry, &e).await, DeliveryOutcome::NotRequired);
    }

    #[tokio::test]
    async fn verbatim_staff_answer_preserves_sources_and_confidence() {
        let registry = ChannelRegistry::new();
        let chan = Arc::new(FederatedChatChannel::new());
        chan.start().await.unwrap();
        registry.register(chan.clone());
        let mut meta = HashMap::new();
        meta.insert("room_id".to_string(), "!room:server".to_string());
        let e = base_escalation(ChannelKind::FederatedChat, meta);
        assert_eq!(deliver(&registry, &e).await, DeliveryOutcome::Delivered);
        let outbox = chan.outbox.lock();
        let (_, outgoing) = outbox.last().unwrap();
        assert!(!outgoing.sources.is_empty());
        assert_eq!(outgoing.metadata.confidence_score, Some(0.9));
    }

    #[tokio::test]
    async fn edited_staff_answer_omits_sources_and_confidence() {
        let registry = ChannelRegistry::new();
        let chan = Arc::new(FederatedChatChannel::new());
        chan.start().await.unwrap();
        registry.register(chan.clone());
        let mut meta = HashMap::new();
        meta.insert("room_id".to_string(), "!room:server".to_string());
        let mut e = base_escalation(ChannelKind::FederatedChat, meta);
        e.staff_answer = Some("a completely different answer".into());
        assert_eq!(deliver(&registry, &e).await, DeliveryOutcome::Delivered);
        let outbox = chan.outbox.lock();
        let (_, outgoing) = outbox.last().unwrap();
        assert!(outgoing.sources.is_empty());
        assert_eq!(outgoing.metadata.confidence_score, None);
    }

    #[tokio::test]
    async fn missing_delivery_target_fails() {
        let registry = ChannelRegistry::new();
        let chan = Arc::new(FederatedChatChannel::new());
        chan.start().await.unwrap();
        registry.register(chan);
        let e = base_escalation(ChannelKind::FederatedChat, HashMap::new());
        assert_eq!(deliver(&registry, &e).await, DeliveryOutcome::Failed);
    }
}
