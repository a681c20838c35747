//! Channel Gateway (C4): runs the pre-hooks, queries the Answer Service,
//! applies the Auto-Send Router's (C13) decision, then runs the
//! post-hooks over the built `OutgoingMessage`.

use std::sync::Arc;

use chrono::Utc;
use gw_domain::{GatewayError, IncomingMessage, OutgoingMessage, ResponseMetadata, RoutingAction};
use gw_learning::{route_response, LearningEngine};

use crate::hooks::{PostHook, PreHook};
use crate::reactors::AnswerServiceHandle;

pub struct ChannelGateway {
    answer_service: AnswerServiceHandle,
    learning: Arc<LearningEngine>,
    pre_hooks: Vec<Arc<dyn PreHook>>,
    post_hooks: Vec<Arc<dyn PostHook>>,
}

impl ChannelGateway {
    pub fn new(
        answer_service: AnswerServiceHandle,
        learning: Arc<LearningEngine>,
        mut pre_hooks: Vec<Arc<dyn PreHook>>,
        mut post_hooks: Vec<Arc<dyn PostHook>>,
    ) -> Self {
        pre_hooks.sort_by_key(|h| h.priority());
        post_hooks.sort_by_key(|h| h.priority());
        Self {
            answer_service,
            learning,
            pre_hooks,
            post_hooks,
        }
    }

    /// Runs one full turn. Errors from a pre-hook or from the Answer
    /// Service itself abort the turn with nothing built.
    /// A post-hook error halts the remaining post-hooks but the
    /// already-built `OutgoingMessage` up to that point is discarded in
    /// favor of the error.
    pub async fn process_message(
        &self,
        incoming: &IncomingMessage,
    ) -> Result<OutgoingMessage, GatewayError> {
        for hook in &self.pre_hooks {
            hook.execute(incoming).await?;
        }

        let started = std::time::Instant::now();
        let answer = self
            .answer_service
            .query(&incoming.question, incoming.chat_history.as_deref())
            .await
            .map_err(|e| e.into_gateway_error())?;

        let (t_high, t_low) = self.learning.get_current_thresholds();
        let confidence = answer.confidence_score.unwrap_or(0.0);
        let routed = route_response(confidence, (t_high, t_low));

        let (routing_action, routing_reason, requires_human) = if answer.requires_human {
            (
                RoutingAction::NeedsHuman,
                answer
                    .routing_reason
                    .clone()
                    .or_else(|| Some("Answer service flagged this for human review.".to_string())),
                true,
            )
        } else {
            (
                routed.action,
                answer.routing_reason.clone().or(routed.flag.map(str::to_string)),
                routed.action != RoutingAction::AutoSend,
            )
        };

        let mut outgoing = OutgoingMessage {
            message_id: incoming.message_id.clone(),
            in_reply_to: Some(incoming.message_id.clone()),
            channel: incoming.channel,
            answer: answer.answer.clone(),
            sources: answer.sources.clone(),
            metadata: ResponseMetadata {
                processing_time_ms: Some(started.elapsed().as_millis() as u64),
                rag_strategy: Some(answer.rag_strategy.clone()),
                model_name: Some(answer.model_name.clone()),
                tokens_used: answer.tokens_used,
                confidence_score: answer.confidence_score,
                routing_action: Some(routing_action),
                routing_reason,
                hooks_executed: Vec::new(),
            },
            requires_human,
            suggested_questions: answer.suggested_questions.clone(),
            user: incoming.user.clone(),
            timestamp: Utc::now(),
        };

        for hook in &self.post_hooks {
            hook.execute(incoming, &mut outgoing).await?;
        }

        Ok(outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_answer::{AnswerResponse, StubAnswerService};
    use std::sync::Arc as StdArc;

    fn gateway_with(answer: AnswerResponse) -> ChannelGateway {
        let svc = StdArc::new(StubAnswerService::new(answer));
        ChannelGateway::new(
            AnswerServiceHandle::new(svc),
            StdArc::new(LearningEngine::new(50)),
            Vec::new(),
            Vec::new(),
        )
    }

    fn answer(confidence: f64, requires_human: bool) -> AnswerResponse {
        AnswerResponse {
            answer: "the answer".into(),
            sources: Vec::new(),
            rag_strategy: "faq".into(),
            model_name: "stub".into(),
            tokens_used: None,
            confidence_score: Some(confidence),
            requires_human,
            routing_action: None,
            routing_reason: None,
            suggested_questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn high_confidence_auto_sends() {
        let gw = gateway_with(answer(0.99, false));
        let incoming = crate::test_support::sample_incoming("web");
        let out = gw.process_message(&incoming).await.unwrap();
        assert!(!out.requires_human);
        assert_eq!(out.metadata.routing_action, Some(RoutingAction::AutoSend));
    }

    #[tokio::test]
    async fn outgoing_message_is_in_reply_to_the_incoming_message_id() {
        let gw = gateway_with(answer(0.99, false));
        let incoming = crate::test_support::sample_incoming("web");
        let out = gw.process_message(&incoming).await.unwrap();
        assert_eq!(out.in_reply_to, Some(incoming.message_id.clone()));
        assert_eq!(out.channel, incoming.channel);
    }

    #[tokio::test]
    async fn low_confidence_requires_human() {
        let gw = gateway_with(answer(0.2, false));
        let incoming = crate::test_support::sample_incoming("web");
        let out = gw.process_message(&incoming).await.unwrap();
        assert!(out.requires_human);
        assert_eq!(out.metadata.routing_action, Some(RoutingAction::NeedsHuman));
    }

    #[tokio::test]
    async fn answer_service_requires_human_overrides_confidence() {
        let gw = gateway_with(answer(0.99, true));
        let incoming = crate::test_support::sample_incoming("web");
        let out = gw.process_message(&incoming).await.unwrap();
        assert!(out.requires_human);
        assert_eq!(out.metadata.routing_action, Some(RoutingAction::NeedsHuman));
    }
}
