use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use gw_answer::{AnswerResponse, StubAnswerService};
use gw_channels::{ChannelRegistry, FederatedChatChannel, TradingAppChatChannel, WebChannel};
use gw_coordination::{CoordinationStore, InMemoryCoordinationStore, SentMessageTracker};
use gw_domain::config::{Config, ConfigSeverity};
use gw_escalation::{EscalationService, EscalationStore};
use gw_learning::{LearningEngine, SourceWeightConfig, SourceWeightManager};

use gw_gateway::api;
use gw_gateway::dispatcher::Dispatcher;
use gw_gateway::feedback::FeedbackStore;
use gw_gateway::followup::FeedbackFollowupCoordinator;
use gw_gateway::gateway::ChannelGateway;
use gw_gateway::hooks::{AiGenerationPolicyHook, AutoResponsePolicyHook, EscalationHook, MetricsHook, PiiFilterHook};
use gw_gateway::learning_bridge::EscalationLearningBridge;
use gw_gateway::orchestrator::Orchestrator;
use gw_gateway::poller::PollingService;
use gw_gateway::reactions::ReactionProcessor;
use gw_gateway::reactors::AnswerServiceHandle;
use gw_gateway::AppState;

const CONFIG_PATH_ENV: &str = "GW_CONFIG";
const TRADING_APP_WEBHOOK_SECRET_ENV: &str = "GW_TRADING_APP_WEBHOOK_SECRET";

/// A multi-channel support gateway: routes inbound questions to an
/// answer service, escalates low-confidence turns to staff, and learns
/// from staff edits and user reactions.
#[derive(Debug, Parser)]
#[command(name = "gw-gateway", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load the configuration from the path named by `GW_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the
/// path that was used.
fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = load_config()?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            let errors = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
            if errors > 0 {
                println!("{config_path}: {errors} error(s)");
                std::process::exit(1);
            }
            println!("{config_path}: OK");
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = load_config()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,gw_gateway=debug")))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("support gateway starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    // ── Channels (C3) ─────────────────────────────────────────────────
    let registry = Arc::new(ChannelRegistry::new());
    registry.register(Arc::new(WebChannel::new()));
    registry.register(Arc::new(FederatedChatChannel::new()));
    let webhook_secret = std::env::var(TRADING_APP_WEBHOOK_SECRET_ENV).ok().map(String::into_bytes);
    if webhook_secret.is_none() {
        tracing::warn!(
            env_var = TRADING_APP_WEBHOOK_SECRET_ENV,
            "trading-app-chat webhook signature verification DISABLED — set {TRADING_APP_WEBHOOK_SECRET_ENV} to enable"
        );
    }
    registry.register(Arc::new(TradingAppChatChannel::new(webhook_secret)));
    for (channel_id, error) in registry.start_all(true).await {
        tracing::error!(channel = %channel_id, error = %error, "channel adapter failed to start");
    }
    tracing::info!(channels = registry.channel_ids().len(), "channel registry ready");

    // ── Coordination (C1/C2) ─────────────────────────────────────────
    let coordination: Arc<dyn CoordinationStore> = Arc::new(InMemoryCoordinationStore::new());
    let sent_messages = Arc::new(SentMessageTracker::new(Duration::from_secs(config.coordination.sent_message_ttl_secs)));

    // ── Feedback (C8/C9) ─────────────────────────────────────────────
    let feedback = Arc::new(FeedbackStore::new());
    let followup = Arc::new(FeedbackFollowupCoordinator::new(
        coordination.clone(),
        feedback.clone(),
        registry.clone(),
        Duration::from_secs(config.coordination.feedback_followup_ttl_secs),
    ));
    let reactions = Arc::new(ReactionProcessor::new(sent_messages.clone(), feedback.clone(), followup.clone()));

    // ── Learning (C13/C14), wired as the Escalation Service's learning
    // sink so a staff response/rating feeds both the Auto-Send Router's
    // thresholds and the Source-Weight Manager ───────────────────────
    let learning = Arc::new(LearningEngine::with_thresholds(
        config.learning.min_reviews_for_update,
        config.learning.t_high,
        config.learning.t_low,
    ));
    let source_weights = Arc::new(SourceWeightManager::with_config(SourceWeightConfig {
        min_weight: config.learning.source_weight_min,
        max_weight: config.learning.source_weight_max,
        quadrant_learning_rate: config.learning.quadrant_learning_rate,
        circuit_breaker_max_delta: config.learning.quadrant_circuit_breaker,
        batch_min_samples: config.learning.batch_min_samples,
        batch_cold_start_threshold: config.learning.batch_cold_start_threshold,
        batch_lr_cold_start: config.learning.batch_lr_cold_start,
        batch_lr_warm: config.learning.batch_lr_warm,
    }));
    let learning_bridge = Arc::new(EscalationLearningBridge::new(learning.clone(), source_weights.clone()));

    // ── Escalation (C10/C11) ─────────────────────────────────────────
    let escalations = Arc::new(
        EscalationService::new(
            Arc::new(EscalationStore::new()),
            config.escalation.claim_ttl_minutes as i64,
            config.escalation.auto_close_hours as i64,
            config.escalation.retention_days as i64,
        )
        .with_learning_sink(learning_bridge),
    );
    tracing::info!("escalation service ready");

    // ── Answer service seam (RAG/retrieval engine is out of scope;
    // a stub double stands in) ────────────────────────────────────────
    let answer_service = AnswerServiceHandle::new(Arc::new(StubAnswerService::new(AnswerResponse {
        answer: "Let me find that for you.".into(),
        sources: Vec::new(),
        rag_strategy: "stub".into(),
        model_name: "stub-model".into(),
        tokens_used: None,
        confidence_score: Some(0.5),
        requires_human: false,
        routing_action: None,
        routing_reason: None,
        suggested_questions: Vec::new(),
    })));

    // ── Hook pipeline (C4) ───────────────────────────────────────────
    let pre_hooks: Vec<Arc<dyn gw_gateway::hooks::PreHook>> = vec![Arc::new(AiGenerationPolicyHook { config: config.clone() })];
    let post_hooks: Vec<Arc<dyn gw_gateway::hooks::PostHook>> = vec![
        Arc::new(PiiFilterHook),
        Arc::new(AutoResponsePolicyHook { config: config.clone() }),
        Arc::new(EscalationHook { escalations: escalations.clone(), registry: registry.clone() }),
        Arc::new(MetricsHook),
    ];
    let gateway = Arc::new(ChannelGateway::new(answer_service.clone(), learning.clone(), pre_hooks, post_hooks));

    // ── Dispatcher (C6) + Orchestrator (C5) ──────────────────────────
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sent_messages.clone()));
    let orchestrator = Arc::new(Orchestrator::new(coordination.clone(), gateway, dispatcher, followup.clone(), &config));

    // ── Admin token (read once, hash for constant-time comparison) ──
    let admin_token_hash = match std::env::var(&config.admin.token_env) {
        Ok(token) if !token.is_empty() => {
            tracing::info!("admin bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            let env_var = &config.admin.token_env;
            tracing::warn!(env_var = %env_var, "admin bearer-token auth DISABLED — set {env_var} to enable");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        config_path: std::path::PathBuf::from("config.toml"),
        registry: registry.clone(),
        coordination: coordination.clone(),
        sent_messages,
        answer_service,
        orchestrator: orchestrator.clone(),
        escalations: escalations.clone(),
        learning,
        source_weights,
        feedback,
        reactions,
        admin_token_hash,
    };

    // ── Polling Service (C7) ─────────────────────────────────────────
    let polling = Arc::new(PollingService::new(
        registry.clone(),
        orchestrator,
        config.clone(),
        config.coordination.poll_interval_secs,
        config.coordination.poll_backoff_secs,
    ));
    polling.spawn_all();
    tracing::info!("polling service started");

    // ── Escalation sweepers ──────────────────────────────────────────
    let sweep_escalations = escalations.clone();
    let sweep_interval = Duration::from_secs(config.escalation.sweep_interval_secs);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_interval);
        loop {
            tick.tick().await;
            let released = sweep_escalations.reap_stale_claims();
            let closed = sweep_escalations.auto_close_stale();
            let purged = sweep_escalations.purge_expired();
            if released + closed + purged > 0 {
                tracing::info!(released, closed, purged, "escalation sweep");
            }
        }
    });
    tracing::info!(interval_secs = config.escalation.sweep_interval_secs, "escalation sweepers started");

    // ── Source-Weight Manager batch feedback sweep (C14) ──────────────
    let batch_feedback = state.feedback.clone();
    let batch_weights = state.source_weights.clone();
    let batch_sweep_interval = Duration::from_secs(config.learning.batch_sweep_interval_secs);
    let batch_window = chrono::Duration::days(config.learning.batch_feedback_window_days as i64);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(batch_sweep_interval);
        loop {
            tick.tick().await;
            let since = chrono::Utc::now() - batch_window;
            let stats = batch_feedback.source_type_stats(since);
            for (source_type, (positive, total)) in stats {
                batch_weights.apply_batch_feedback(&source_type, positive, total);
            }
        }
    });
    tracing::info!(
        interval_secs = config.learning.batch_sweep_interval_secs,
        window_days = config.learning.batch_feedback_window_days,
        "source-weight batch feedback sweep started"
    );

    // ── CORS layer (config-aware) ────────────────────────────────────
    let cors_layer = build_cors_layer(&config.server.cors);

    // ── Router ───────────────────────────────────────────────────────
    let app = api::router(state.clone()).layer(cors_layer).with_state(state);

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "support gateway listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Origins may carry a trailing `:*` wildcard for the port segment
/// (e.g. `http://localhost:*`), expanded into a predicate matching any
/// numeric port on that host. A literal `"*"` allows all origins (not
/// recommended for production, and flagged by `Config::validate`).
fn build_cors_layer(cors: &gw_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
