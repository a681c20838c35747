//! Hook pipeline. `PreHook`s gate
//! the turn before the Answer Service is called; `PostHook`s run over
//! the built `OutgoingMessage` afterwards. Both run in ascending
//! priority order, ties broken by registration order — `Vec::sort_by_key`
//! is stable so registering in the right order is enough.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gw_channels::ChannelRegistry;
use gw_domain::{
    ErrorCode, GatewayError, IncomingMessage, OutgoingMessage, RoutingAction, TraceEvent,
};
use gw_escalation::{CreateEscalationData, EscalationService};

use crate::pii;
use crate::policy::AutoResponsePolicy;

pub const PRIORITY_HIGH: i32 = 100;
pub const PRIORITY_NORMAL: i32 = 200;
pub const PRIORITY_LOW: i32 = 300;

#[async_trait]
pub trait PreHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    async fn execute(&self, incoming: &IncomingMessage) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait PostHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    async fn execute(
        &self,
        incoming: &IncomingMessage,
        outgoing: &mut OutgoingMessage,
    ) -> Result<(), GatewayError>;
}

/// Rejects the turn before the Answer Service is invoked when the
/// channel has AI generation turned off.
pub struct AiGenerationPolicyHook {
    pub config: Arc<gw_domain::config::Config>,
}

#[async_trait]
impl PreHook for AiGenerationPolicyHook {
    fn name(&self) -> &'static str {
        "ai_generation_policy"
    }

    fn priority(&self) -> i32 {
        PRIORITY_HIGH
    }

    async fn execute(&self, incoming: &IncomingMessage) -> Result<(), GatewayError> {
        if crate::policy::AiGenerationPolicy::is_enabled(&self.config, incoming.channel.as_str()) {
            Ok(())
        } else {
            Err(GatewayError::service_unavailable(format!(
                "AI generation disabled for channel {}",
                incoming.channel
            )))
        }
    }
}

/// Redacts recognized PII patterns from the answer text before it can
/// reach a channel adapter or an escalation record.
pub struct PiiFilterHook;

#[async_trait]
impl PostHook for PiiFilterHook {
    fn name(&self) -> &'static str {
        "pii_filter"
    }

    fn priority(&self) -> i32 {
        PRIORITY_HIGH
    }

    async fn execute(
        &self,
        _incoming: &IncomingMessage,
        outgoing: &mut OutgoingMessage,
    ) -> Result<(), GatewayError> {
        let (redacted, found) = pii::redact(&outgoing.answer);
        if !found.is_empty() {
            outgoing.answer = redacted;
        }
        outgoing.mark_hook_executed(self.name());
        Ok(())
    }
}

/// Forces human review when the channel's auto-response policy is
/// disabled, overriding whatever the Auto-Send Router decided. Runs
/// as a post-hook, before the escalation hook so the override is
/// picked up by it.
pub struct AutoResponsePolicyHook {
    pub config: Arc<gw_domain::config::Config>,
}

const AUTO_RESPONSE_DISABLED_REASON: &str = "Channel auto-response disabled by admin policy.";

#[async_trait]
impl PostHook for AutoResponsePolicyHook {
    fn name(&self) -> &'static str {
        "auto_response_policy"
    }

    fn priority(&self) -> i32 {
        PRIORITY_NORMAL
    }

    async fn execute(
        &self,
        incoming: &IncomingMessage,
        outgoing: &mut OutgoingMessage,
    ) -> Result<(), GatewayError> {
        if !AutoResponsePolicy::is_enabled(&self.config, incoming.channel.as_str()) {
            outgoing.requires_human = true;
            outgoing.metadata.routing_action = Some(RoutingAction::QueueMedium);
            outgoing.metadata.routing_reason = Some(AUTO_RESPONSE_DISABLED_REASON.to_string());
        }
        outgoing.mark_hook_executed(self.name());
        Ok(())
    }
}

/// Handle to the channel a staff reply should be addressed to, shown in
/// the escalation notice text. Not configurable; kept as one constant
/// rather than threading it through config.
const SUPPORT_HANDLE: &str = "support";

/// Creates an `Escalation` for any turn the pipeline decided required a
/// human, and replaces the draft answer with a localized notice.
/// Runs as a post-hook at `NORMAL` priority, registered after the
/// auto-response-policy hook so it always sees the final
/// `requires_human`/`routing_action`.
pub struct EscalationHook {
    pub escalations: Arc<EscalationService>,
    pub registry: Arc<ChannelRegistry>,
}

#[async_trait]
impl PostHook for EscalationHook {
    fn name(&self) -> &'static str {
        "escalation"
    }

    fn priority(&self) -> i32 {
        PRIORITY_NORMAL
    }

    async fn execute(
        &self,
        incoming: &IncomingMessage,
        outgoing: &mut OutgoingMessage,
    ) -> Result<(), GatewayError> {
        if !outgoing.requires_human {
            return Ok(());
        }

        let data = CreateEscalationData {
            message_id: incoming.message_id.clone(),
            channel: incoming.channel,
            channel_metadata: incoming.channel_metadata.clone(),
            user_id: incoming.user.user_id.clone(),
            question: incoming.question.clone(),
            ai_draft_answer: outgoing.answer.clone(),
            confidence: outgoing.metadata.confidence_score.unwrap_or(0.0),
            routing_action: outgoing.metadata.routing_action.unwrap_or(RoutingAction::NeedsHuman),
            routing_reason: outgoing.metadata.routing_reason.clone(),
            sources: outgoing.sources.clone(),
            priority: incoming.priority,
        };
        let escalation = self.escalations.create_escalation(data);

        TraceEvent::EscalationCreated {
            escalation_id: escalation.id,
            message_id: escalation.message_id.clone(),
            channel: incoming.channel.as_str().to_string(),
        }
        .emit();

        if let Some(adapter) = self.registry.get(incoming.channel.as_str()) {
            outgoing.answer = adapter.format_escalation_message(
                &incoming.user.user_id,
                escalation.id,
                SUPPORT_HANDLE,
            );
        }
        outgoing.mark_hook_executed(self.name());
        Ok(())
    }
}

/// Records that the pipeline ran, for the metrics surface
/// (the "metrics hook" runs post, at LOW priority). This codebase has no
/// metrics backend (ambient Non-goal), so it only emits a trace event —
/// `gw-gateway`'s `GET /healthz`/`GET /v1/metrics`-equivalent endpoints
/// read from the escalation/feedback stores directly rather than from a
/// counter this hook would maintain.
pub struct MetricsHook;

#[async_trait]
impl PostHook for MetricsHook {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn priority(&self) -> i32 {
        PRIORITY_LOW
    }

    async fn execute(
        &self,
        incoming: &IncomingMessage,
        outgoing: &mut OutgoingMessage,
    ) -> Result<(), GatewayError> {
        TraceEvent::HookExecuted {
            hook: self.name().to_string(),
            kind: "post",
            message_id: incoming.message_id.clone(),
        }
        .emit();
        outgoing.mark_hook_executed(self.name());
        Ok(())
    }
}

#[allow(dead_code)]
fn channel_metadata_placeholder() -> HashMap<String, String> {
    HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_domain::config::{ChannelPolicyConfig, Config};

    #[tokio::test]
    async fn ai_generation_policy_blocks_disabled_channel() {
        let mut config = Config::default();
        config.channels.policies.insert(
            "web".into(),
            ChannelPolicyConfig {
                ai_generation_enabled: false,
                ..Default::default()
            },
        );
        let hook = AiGenerationPolicyHook {
            config: Arc::new(config),
        };
        let incoming = crate::test_support::sample_incoming("web");
        let err = hook.execute(&incoming).await.unwrap_err();
        assert_eq!(err.error_code, ErrorCode::ServiceUnavailable);
    }

    #[tokio::test]
    async fn pii_filter_redacts_answer() {
        let hook = PiiFilterHook;
        let incoming = crate::test_support::sample_incoming("web");
        let mut outgoing = crate::test_support::sample_outgoing(&incoming, "email me at a@b.com");
        hook.execute(&incoming, &mut outgoing).await.unwrap();
        assert!(outgoing.answer.contains("[REDACTED:email]"));
    }

    #[tokio::test]
    async fn auto_response_disabled_forces_human_review() {
        let mut config = Config::default();
        config.channels.policies.insert(
            "web".into(),
            ChannelPolicyConfig {
                auto_response_enabled: false,
                ..Default::default()
            },
        );
        let hook = AutoResponsePolicyHook {
            config: Arc::new(config),
        };
        let incoming = crate::test_support::sample_incoming("web");
        let mut outgoing = crate::test_support::sample_outgoing(&incoming, "the answer");
        hook.execute(&incoming, &mut outgoing).await.unwrap();
        assert!(outgoing.requires_human);
        assert_eq!(outgoing.metadata.routing_action, Some(RoutingAction::QueueMedium));
        assert_eq!(outgoing.metadata.routing_reason.as_deref(), Some(AUTO_RESPONSE_DISABLED_REASON));
    }
}
