//! Reaction Processor (C8). Correlates a channel reaction
//! back to the turn that produced the reacted-to message via the
//! Sent-Message Tracker, then records (or revokes) the rating in the
//! Feedback Store. A negative rating hands off to the Feedback
//! Follow-up Coordinator (C9), which both prompts the user for an
//! explanation and primes the pending entry for their next message.

use std::sync::Arc;

use gw_coordination::SentMessageTracker;
use gw_domain::{representative_source_type, ReactionEvent, ReactionRating, TraceEvent};

use crate::feedback::FeedbackStore;
use crate::followup::FeedbackFollowupCoordinator;

pub struct ReactionProcessor {
    sent_messages: Arc<SentMessageTracker>,
    feedback: Arc<FeedbackStore>,
    followup: Arc<FeedbackFollowupCoordinator>,
}

impl ReactionProcessor {
    pub fn new(
        sent_messages: Arc<SentMessageTracker>,
        feedback: Arc<FeedbackStore>,
        followup: Arc<FeedbackFollowupCoordinator>,
    ) -> Self {
        Self { sent_messages, feedback, followup }
    }

    /// `false` when the reacted-to message was never tracked (unknown or
    /// expired), matching `MESSAGE_NOT_TRACKED` on the HTTP surface.
    pub async fn process(&self, event: &ReactionEvent) -> bool {
        let Some(record) = self
            .sent_messages
            .lookup(&event.channel_id, &event.external_message_id)
        else {
            return false;
        };

        self.feedback.record_rating(
            &record.internal_message_id,
            &event.channel_id,
            &record.question,
            &record.answer,
            &record.user_id,
            &event.reactor_id,
            event.rating,
            representative_source_type(&record.sources),
        );

        if event.rating == ReactionRating::Negative {
            self.followup
                .notify_negative_rating(
                    &event.channel_id,
                    &record.user_id,
                    record.internal_message_id.clone(),
                    record.delivery_target.clone(),
                )
                .await;
        }

        TraceEvent::ReactionProcessed {
            channel: event.channel_id.clone(),
            external_message_id: event.external_message_id.clone(),
            rating: match event.rating {
                ReactionRating::Positive => "positive",
                ReactionRating::Negative => "negative",
            },
        }
        .emit();

        true
    }

    /// `true` if a prior rating from `reactor_id` was found and removed.
    pub async fn revoke_reaction(&self, channel_id: &str, external_message_id: &str, reactor_id: &str) -> bool {
        let Some(record) = self.sent_messages.lookup(channel_id, external_message_id) else {
            return false;
        };
        self.feedback.revoke_rating(&record.internal_message_id, reactor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gw_channels::ChannelRegistry;
    use gw_coordination::{CoordinationStore, InMemoryCoordinationStore};
    use gw_domain::keys::feedback_followup_key;
    use gw_domain::SentMessageRecord;
    use std::time::Duration;

    fn tracked(rating_target: &str) -> (Arc<SentMessageTracker>, ReactionEvent) {
        let tracker = Arc::new(SentMessageTracker::new(Duration::from_secs(60)));
        tracker.track(
            "web",
            "ext-1",
            SentMessageRecord {
                internal_message_id: "m1".into(),
                question: "how do I back up my wallet?".into(),
                answer: "here's how".into(),
                user_id: "user-1".into(),
                timestamp: Utc::now(),
                sources: Vec::new(),
                confidence_score: Some(0.9),
                requires_human: false,
                routing_action: None,
                delivery_target: None,
            },
        );
        let event = ReactionEvent {
            channel_id: "web".into(),
            external_message_id: "ext-1".into(),
            reactor_id: "user-1".into(),
            rating: if rating_target == "negative" {
                ReactionRating::Negative
            } else {
                ReactionRating::Positive
            },
            raw_reaction: "x".into(),
            timestamp: Utc::now(),
        };
        (tracker, event)
    }

    fn followup_coordinator(coordination: Arc<dyn CoordinationStore>) -> Arc<FeedbackFollowupCoordinator> {
        Arc::new(FeedbackFollowupCoordinator::new(
            coordination,
            Arc::new(FeedbackStore::new()),
            Arc::new(ChannelRegistry::new()),
            Duration::from_secs(900),
        ))
    }

    #[tokio::test]
    async fn unknown_message_returns_false() {
        let tracker = Arc::new(SentMessageTracker::new(Duration::from_secs(60)));
        let processor = ReactionProcessor::new(
            tracker,
            Arc::new(FeedbackStore::new()),
            followup_coordinator(Arc::new(InMemoryCoordinationStore::new())),
        );
        let event = ReactionEvent {
            channel_id: "web".into(),
            external_message_id: "missing".into(),
            reactor_id: "user-1".into(),
            rating: ReactionRating::Positive,
            raw_reaction: "x".into(),
            timestamp: Utc::now(),
        };
        assert!(!processor.process(&event).await);
    }

    #[tokio::test]
    async fn negative_rating_primes_followup() {
        let (tracker, event) = tracked("negative");
        let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
        let processor = ReactionProcessor::new(
            tracker,
            Arc::new(FeedbackStore::new()),
            followup_coordinator(coordination.clone()),
        );
        assert!(processor.process(&event).await);
        let key = feedback_followup_key("web", "user-1");
        assert_eq!(coordination.get_pending(&key).await, Some("m1".to_string()));
    }

    #[tokio::test]
    async fn revoke_removes_rating() {
        let (tracker, event) = tracked("positive");
        let feedback = Arc::new(FeedbackStore::new());
        let processor = ReactionProcessor::new(
            tracker,
            feedback.clone(),
            followup_coordinator(Arc::new(InMemoryCoordinationStore::new())),
        );
        assert!(processor.process(&event).await);
        assert!(processor.revoke_reaction("web", "ext-1", "user-1").await);
        assert_eq!(feedback.get("m1").unwrap().positive_count(), 0);
    }
}
