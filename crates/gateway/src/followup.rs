//! Feedback Follow-up Coordinator (C9). When a user reacts
//! negatively to an answer, the Reaction Processor primes a pending
//! entry keyed by `(channel, user_id)`; the user's *next* message is
//! then consumed here as the explanation for that rating instead of
//! being routed through the normal pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gw_channels::ChannelRegistry;
use gw_coordination::CoordinationStore;
use gw_domain::keys::feedback_followup_key;
use gw_domain::{IncomingMessage, OutgoingMessage, ResponseMetadata};

use crate::feedback::FeedbackStore;

/// Keyword → issue tag. Deliberately small and literal rather than a
/// classifier — this coordinator only needs a rough signal for staff
/// triage, not a verdict.
const ISSUE_KEYWORDS: &[(&str, &str)] = &[
    ("wrong", "incorrect_answer"),
    ("incorrect", "incorrect_answer"),
    ("slow", "slow_response"),
    ("confus", "confusing"),
    ("incomplete", "incomplete_answer"),
    ("rude", "tone"),
    ("broken", "broken_flow"),
    ("didn't help", "unhelpful"),
    ("not helpful", "unhelpful"),
];

fn channel_kind_for(channel_id: &str) -> gw_domain::ChannelKind {
    match channel_id {
        "federated-chat" => gw_domain::ChannelKind::FederatedChat,
        "trading-app-chat" => gw_domain::ChannelKind::TradingAppChat,
        _ => gw_domain::ChannelKind::Web,
    }
}

fn extract_issue_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    ISSUE_KEYWORDS
        .iter()
        .filter(|(kw, _)| lower.contains(kw))
        .map(|(_, tag)| tag.to_string())
        .collect()
}

const FOLLOWUP_ACK: &str = "Thanks for the detail — I've passed this along to our team.";
const NEGATIVE_RATING_PROMPT: &str = "Sorry that wasn't helpful — what went wrong?";

pub struct FeedbackFollowupCoordinator {
    coordination: Arc<dyn CoordinationStore>,
    feedback: Arc<FeedbackStore>,
    registry: Arc<ChannelRegistry>,
    ttl: Duration,
}

impl FeedbackFollowupCoordinator {
    pub fn new(
        coordination: Arc<dyn CoordinationStore>,
        feedback: Arc<FeedbackStore>,
        registry: Arc<ChannelRegistry>,
        ttl: Duration,
    ) -> Self {
        Self {
            coordination,
            feedback,
            registry,
            ttl,
        }
    }

    /// `true` if `incoming` was consumed as a follow-up explanation
    /// (short-circuits the normal orchestrator pipeline, see step 1 of `process_incoming`).
    pub async fn consume_if_pending(&self, incoming: &IncomingMessage, channel_id: &str) -> bool {
        let key = feedback_followup_key(channel_id, &incoming.user.user_id);
        let Some(internal_message_id) = self.coordination.get_pending(&key).await else {
            return false;
        };

        let issues = extract_issue_tags(&incoming.question);
        self.feedback
            .append_followup(&internal_message_id, incoming.question.clone(), issues);

        if let Some(adapter) = self.registry.get(channel_id) {
            let target = adapter
                .get_delivery_target(&incoming.channel_metadata)
                .unwrap_or_default();
            let ack = OutgoingMessage {
                message_id: incoming.message_id.clone(),
                in_reply_to: Some(incoming.message_id.clone()),
                channel: incoming.channel,
                answer: FOLLOWUP_ACK.to_string(),
                sources: Vec::new(),
                metadata: ResponseMetadata::default(),
                requires_human: false,
                suggested_questions: Vec::new(),
                user: incoming.user.clone(),
                timestamp: Utc::now(),
            };
            adapter.send_message(&target, &ack).await;
        }

        self.coordination.clear_pending(&key).await;
        true
    }

    /// Called by the Reaction Processor (C8) on a negative rating: sends
    /// a "what went wrong?" prompt back through the originating channel
    /// (when one can be reached) and primes the pending follow-up entry
    /// so the user's next message is captured as the explanation instead
    /// of routed through the normal pipeline.
    pub async fn notify_negative_rating(
        &self,
        channel_id: &str,
        user_id: &str,
        internal_message_id: String,
        delivery_target: Option<String>,
    ) {
        if let Some(adapter) = self.registry.get(channel_id) {
            let target = delivery_target.unwrap_or_default();
            let prompt = OutgoingMessage {
                message_id: internal_message_id.clone(),
                in_reply_to: Some(internal_message_id.clone()),
                channel: channel_kind_for(channel_id),
                answer: NEGATIVE_RATING_PROMPT.to_string(),
                sources: Vec::new(),
                metadata: ResponseMetadata::default(),
                requires_human: false,
                suggested_questions: Vec::new(),
                user: gw_domain::UserContext { user_id: user_id.to_string(), ..Default::default() },
                timestamp: Utc::now(),
            };
            adapter.send_message(&target, &prompt).await;
        }

        let key = feedback_followup_key(channel_id, user_id);
        self.coordination.set_pending(&key, internal_message_id, self.ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_channels::WebChannel;
    use gw_coordination::InMemoryCoordinationStore;

    #[tokio::test]
    async fn no_pending_entry_returns_false() {
        let coordinator = FeedbackFollowupCoordinator::new(
            Arc::new(InMemoryCoordinationStore::new()),
            Arc::new(FeedbackStore::new()),
            Arc::new(ChannelRegistry::new()),
            Duration::from_secs(900),
        );
        let incoming = crate::test_support::sample_incoming("web");
        assert!(!coordinator.consume_if_pending(&incoming, "web").await);
    }

    #[tokio::test]
    async fn pending_entry_is_consumed_and_tagged() {
        let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
        let feedback = Arc::new(FeedbackStore::new());
        feedback.record_rating("m1", "web", "q", "a", "user-1", "user-1", gw_domain::ReactionRating::Negative, None);
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(WebChannel::new()));
        let key = feedback_followup_key("web", "user-1");
        coordination.set_pending(&key, "m1".to_string(), Duration::from_secs(900)).await;

        let coordinator = FeedbackFollowupCoordinator::new(coordination.clone(), feedback.clone(), registry, Duration::from_secs(900));
        let mut incoming = crate::test_support::sample_incoming("web");
        incoming.question = "the answer was wrong and confusing".into();
        assert!(coordinator.consume_if_pending(&incoming, "web").await);

        let record = feedback.get("m1").unwrap();
        assert_eq!(record.explanation.as_deref(), Some("the answer was wrong and confusing"));
        assert!(record.issues.contains(&"incorrect_answer".to_string()));
        assert!(record.issues.contains(&"confusing".to_string()));
        assert!(coordination.get_pending(&key).await.is_none());
    }

    #[tokio::test]
    async fn negative_rating_sends_prompt_and_primes_pending() {
        let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(WebChannel::new()));
        let coordinator = FeedbackFollowupCoordinator::new(
            coordination.clone(),
            Arc::new(FeedbackStore::new()),
            registry,
            Duration::from_secs(900),
        );

        coordinator
            .notify_negative_rating("web", "user-1", "m1".to_string(), Some("user-1".to_string()))
            .await;

        let key = feedback_followup_key("web", "user-1");
        assert_eq!(coordination.get_pending(&key).await, Some("m1".to_string()));
    }
}
