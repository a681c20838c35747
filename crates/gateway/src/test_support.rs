//! Shared fixtures for `#[cfg(test)]` modules across this crate. Not
//! part of the public API.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gw_answer::{AnswerResponse, StubAnswerService};
use gw_channels::ChannelRegistry;
use gw_coordination::{CoordinationStore, InMemoryCoordinationStore, SentMessageTracker};
use gw_domain::config::Config;
use gw_domain::{
    ChannelKind, IncomingMessage, MessagePriority, OutgoingMessage, ResponseMetadata, UserContext,
};
use gw_learning::LearningEngine;

use crate::dispatcher::Dispatcher;
use crate::followup::FeedbackFollowupCoordinator;
use crate::gateway::ChannelGateway;
use crate::orchestrator::Orchestrator;
use crate::reactors::AnswerServiceHandle;

pub fn sample_incoming(channel: &str) -> IncomingMessage {
    let channel = match channel {
        "federated-chat" => ChannelKind::FederatedChat,
        "trading-app-chat" => ChannelKind::TradingAppChat,
        _ => ChannelKind::Web,
    };
    IncomingMessage {
        message_id: "msg-1".into(),
        channel,
        question: "how do I back up my wallet?".into(),
        user: UserContext {
            user_id: "user-1".into(),
            ..Default::default()
        },
        chat_history: None,
        channel_metadata: HashMap::new(),
        priority: MessagePriority::Normal,
        bypass_hooks: Vec::new(),
        channel_signature: None,
        timestamp: Utc::now(),
    }
}

pub fn sample_outgoing(incoming: &IncomingMessage, answer: &str) -> OutgoingMessage {
    OutgoingMessage {
        message_id: incoming.message_id.clone(),
        in_reply_to: Some(incoming.message_id.clone()),
        channel: incoming.channel,
        answer: answer.to_string(),
        sources: Vec::new(),
        metadata: ResponseMetadata::default(),
        requires_human: false,
        suggested_questions: Vec::new(),
        user: incoming.user.clone(),
        timestamp: Utc::now(),
    }
}

/// A minimal `Orchestrator` wired against the given registry, for tests
/// that only care about the coordination/dispatch plumbing and not the
/// Answer Service's behavior.
pub fn orchestrator_stub(config: Config, registry: Arc<ChannelRegistry>) -> Orchestrator {
    let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
    let answer_service = AnswerServiceHandle::new(Arc::new(StubAnswerService::new(AnswerResponse {
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
    })));
    let gateway = Arc::new(ChannelGateway::new(
        answer_service,
        Arc::new(LearningEngine::new(50)),
        Vec::new(),
        Vec::new(),
    ));
    let sent_messages = Arc::new(SentMessageTracker::new(Duration::from_secs(60)));
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sent_messages));
    let followup = Arc::new(FeedbackFollowupCoordinator::new(
        coordination.clone(),
        Arc::new(crate::feedback::FeedbackStore::new()),
        registry,
        Duration::from_secs(900),
    ));
    Orchestrator::new(coordination, gateway, dispatcher, followup, &config)
}
