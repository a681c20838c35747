//! Shared application state, handed to every axum handler and background
//! task via `State<AppState>`: one `Clone`-able struct of `Arc`-wrapped
//! subsystems, grouped by concern.

use std::path::PathBuf;
use std::sync::Arc;

use gw_channels::ChannelRegistry;
use gw_coordination::{CoordinationStore, SentMessageTracker};
use gw_domain::config::Config;
use gw_escalation::EscalationService;
use gw_learning::{LearningEngine, SourceWeightManager};

use crate::feedback::FeedbackStore;
use crate::orchestrator::Orchestrator;
use crate::reactions::ReactionProcessor;
use crate::reactors::AnswerServiceHandle;

#[derive(Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub config_path: PathBuf,

    // ── Channels (C3) ────────────────────────────────────────────────
    pub registry: Arc<ChannelRegistry>,

    // ── Coordination (C1/C2) ─────────────────────────────────────────
    pub coordination: Arc<dyn CoordinationStore>,
    pub sent_messages: Arc<SentMessageTracker>,

    // ── Answer service seam ──────────────────────────────────────────
    pub answer_service: AnswerServiceHandle,

    // ── Pipeline entry point (C4/C5/C6), shared by the HTTP inbound
    // route and the Polling Service ───────────────────────────────────
    pub orchestrator: Arc<Orchestrator>,

    // ── Escalation (C10/C11) ─────────────────────────────────────────
    pub escalations: Arc<EscalationService>,

    // ── Learning (C13/C14) ───────────────────────────────────────────
    pub learning: Arc<LearningEngine>,
    pub source_weights: Arc<SourceWeightManager>,

    // ── Feedback (C8/C9) ─────────────────────────────────────────────
    pub feedback: Arc<FeedbackStore>,
    pub reactions: Arc<ReactionProcessor>,

    // ── Auth ─────────────────────────────────────────────────────────
    /// `None` means dev mode (admin routes open, a warning was logged at
    /// startup).
    pub admin_token_hash: Option<Vec<u8>>,
}
