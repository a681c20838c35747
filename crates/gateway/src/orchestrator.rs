//! Inbound Orchestrator (C5). Ties together the
//! Feedback Follow-up Coordinator, the Coordination Store's dedup/lock
//! primitives, the Channel Gateway, and the Response Dispatcher into
//! a six-step idempotent sequence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gw_coordination::{CoordinationStore, ThreadState};
use gw_domain::config::Config;
use gw_domain::keys::{dedup_key, thread_lock_key, thread_state_key};
use gw_domain::{CanonicalInboundEvent, IncomingMessage, TraceEvent};

use crate::dispatcher::Dispatcher;
use crate::followup::FeedbackFollowupCoordinator;
use crate::gateway::ChannelGateway;

pub struct Orchestrator {
    coordination: Arc<dyn CoordinationStore>,
    gateway: Arc<ChannelGateway>,
    dispatcher: Arc<Dispatcher>,
    followup: Arc<FeedbackFollowupCoordinator>,
    dedup_ttl: Duration,
    lock_ttl: Duration,
    thread_state_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        coordination: Arc<dyn CoordinationStore>,
        gateway: Arc<ChannelGateway>,
        dispatcher: Arc<Dispatcher>,
        followup: Arc<FeedbackFollowupCoordinator>,
        config: &Config,
    ) -> Self {
        Self {
            coordination,
            gateway,
            dispatcher,
            followup,
            dedup_ttl: Duration::from_secs(config.coordination.dedup_ttl_secs),
            lock_ttl: Duration::from_secs(config.coordination.thread_lock_ttl_secs),
            thread_state_ttl: Duration::from_secs(config.coordination.thread_state_ttl_secs),
        }
    }

    /// Runs one inbound turn end to end. Returns `false` for every
    /// "nothing further to do" outcome — a duplicate event, a contended
    /// thread lock, or a failed pipeline turn — and `true` once the
    /// response has been handed to the dispatcher.
    pub async fn process_incoming(&self, incoming: &IncomingMessage) -> bool {
        let channel_id = incoming.channel.as_str();

        if self.followup.consume_if_pending(incoming, channel_id).await {
            return true;
        }

        let event = CanonicalInboundEvent::from_incoming(incoming);

        let dedup_key = dedup_key(&event.channel_id, &event.event_id);
        let reserved = self.coordination.reserve_dedup(&dedup_key, self.dedup_ttl).await;
        TraceEvent::DedupReserved {
            channel: event.channel_id.clone(),
            event_id: event.event_id.clone(),
            reserved,
        }
        .emit();
        if !reserved {
            return false;
        }

        let lock_key = thread_lock_key(&event.channel_id, &event.thread_id);
        let Some(token) = self.coordination.acquire_lock(&lock_key, self.lock_ttl).await else {
            TraceEvent::ThreadLockContended {
                channel: event.channel_id.clone(),
                thread_id: event.thread_id.clone(),
            }
            .emit();
            return false;
        };
        TraceEvent::ThreadLockAcquired {
            channel: event.channel_id.clone(),
            thread_id: event.thread_id.clone(),
        }
        .emit();

        let success = self.run_turn(incoming).await;

        let state_key = thread_state_key(&event.channel_id, &event.thread_id);
        self.coordination
            .set_thread_state(
                &state_key,
                ThreadState {
                    last_event_id: event.event_id.clone(),
                    user_id: event.user_id.clone(),
                    timestamp: Utc::now(),
                },
                self.thread_state_ttl,
            )
            .await;
        self.coordination.release_lock(&lock_key, &token).await;

        success
    }

    async fn run_turn(&self, incoming: &IncomingMessage) -> bool {
        match self.gateway.process_message(incoming).await {
            Ok(response) => self.dispatcher.dispatch(incoming, &response).await,
            Err(e) => {
                TraceEvent::PipelineError {
                    message_id: incoming.message_id.clone(),
                    error_code: format!("{:?}", e.error_code),
                }
                .emit();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_answer::{AnswerResponse, StubAnswerService};
    use gw_channels::{ChannelRegistry, WebChannel};
    use gw_coordination::{InMemoryCoordinationStore, SentMessageTracker};
    use gw_learning::LearningEngine;

    fn build(config: Config) -> Orchestrator {
        let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(WebChannel::new()));
        let answer_service = crate::reactors::AnswerServiceHandle::new(Arc::new(
            StubAnswerService::new(AnswerResponse {
                answer: "here's how".into(),
                sources: Vec::new(),
                rag_strategy: "faq".into(),
                model_name: "stub".into(),
                tokens_used: None,
                confidence_score: Some(0.99),
                requires_human: false,
                routing_action: None,
                routing_reason: None,
                suggested_questions: Vec::new(),
            }),
        ));
        let gateway = Arc::new(ChannelGateway::new(
            answer_service,
            Arc::new(LearningEngine::new(50)),
            Vec::new(),
            Vec::new(),
        ));
        let sent_messages = Arc::new(SentMessageTracker::new(Duration::from_secs(60)));
        let dispatcher = Arc::new(Dispatcher::new(registry, sent_messages));
        let followup = Arc::new(FeedbackFollowupCoordinator::new(
            coordination.clone(),
            Arc::new(crate::feedback::FeedbackStore::new()),
            Arc::new(ChannelRegistry::new()),
            Duration::from_secs(900),
        ));
        Orchestrator::new(coordination, gateway, dispatcher, followup, &config)
    }

    #[tokio::test]
    async fn happy_path_dispatches_once() {
        let orchestrator = build(Config::default());
        let incoming = crate::test_support::sample_incoming("web");
        assert!(orchestrator.process_incoming(&incoming).await);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_deduped() {
        let orchestrator = build(Config::default());
        let incoming = crate::test_support::sample_incoming("web");
        assert!(orchestrator.process_incoming(&incoming).await);
        assert!(!orchestrator.process_incoming(&incoming).await);
    }
}
