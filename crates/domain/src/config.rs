//! Top-level configuration schema: serde + `toml`, sectioned
//! by concern, with a `validate()` that collects every issue instead of
//! failing on the first one.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_3210(),
            host: d_host(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Coordination store TTLs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    #[serde(default = "d_dedup_ttl")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "d_lock_ttl")]
    pub thread_lock_ttl_secs: u64,
    #[serde(default = "d_thread_state_ttl")]
    pub thread_state_ttl_secs: u64,
    #[serde(default = "d_feedback_followup_ttl")]
    pub feedback_followup_ttl_secs: u64,
    #[serde(default = "d_sent_message_ttl")]
    pub sent_message_ttl_secs: u64,
    #[serde(default = "d_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "d_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "d_poll_backoff")]
    pub poll_backoff_secs: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: d_dedup_ttl(),
            thread_lock_ttl_secs: d_lock_ttl(),
            thread_state_ttl_secs: d_thread_state_ttl(),
            feedback_followup_ttl_secs: d_feedback_followup_ttl(),
            sent_message_ttl_secs: d_sent_message_ttl(),
            store_timeout_ms: d_store_timeout_ms(),
            poll_interval_secs: d_poll_interval(),
            poll_backoff_secs: d_poll_backoff(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channels (policy toggles + language, per channel id)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPolicyConfig {
    #[serde(default = "d_true")]
    pub ai_generation_enabled: bool,
    #[serde(default = "d_true")]
    pub auto_response_enabled: bool,
    #[serde(default = "d_lang")]
    pub language: String,
    #[serde(default = "d_answer_timeout_ms")]
    pub answer_timeout_ms: u64,
    /// Raw reaction (lowercased emoji name/unicode glyph) → `"positive"`/
    /// `"negative"`. Empty means "use the built-in default map for this
    /// channel" — the emoji map is channel configuration, not a core
    /// concern.
    #[serde(default)]
    pub reaction_map: HashMap<String, String>,
}

impl Default for ChannelPolicyConfig {
    fn default() -> Self {
        Self {
            ai_generation_enabled: true,
            auto_response_enabled: true,
            language: d_lang(),
            answer_timeout_ms: d_answer_timeout_ms(),
            reaction_map: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    /// Keyed by channel id (`web`, `federated-chat`, `trading-app-chat`).
    #[serde(default)]
    pub policies: HashMap<String, ChannelPolicyConfig>,
}

impl ChannelsConfig {
    pub fn policy_for(&self, channel_id: &str) -> ChannelPolicyConfig {
        self.policies
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Escalation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "d_claim_ttl_min")]
    pub claim_ttl_minutes: u64,
    #[serde(default = "d_auto_close_hours")]
    pub auto_close_hours: u64,
    #[serde(default = "d_retention_days")]
    pub retention_days: u64,
    #[serde(default = "d_delivery_retries")]
    pub delivery_max_retries: u32,
    #[serde(default = "d_delivery_backoff")]
    pub delivery_backoff_secs: u64,
    #[serde(default = "d_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    #[serde(default = "d_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            claim_ttl_minutes: d_claim_ttl_min(),
            auto_close_hours: d_auto_close_hours(),
            retention_days: d_retention_days(),
            delivery_max_retries: d_delivery_retries(),
            delivery_backoff_secs: d_delivery_backoff(),
            delivery_timeout_ms: d_delivery_timeout_ms(),
            sweep_interval_secs: d_sweep_interval(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Learning (C13/C14)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "d_t_high")]
    pub t_high: f64,
    #[serde(default = "d_t_low")]
    pub t_low: f64,
    #[serde(default = "d_min_reviews")]
    pub min_reviews_for_update: u64,
    #[serde(default = "d_weight_min")]
    pub source_weight_min: f64,
    #[serde(default = "d_weight_max")]
    pub source_weight_max: f64,
    #[serde(default = "d_quadrant_lr")]
    pub quadrant_learning_rate: f64,
    #[serde(default = "d_quadrant_breaker")]
    pub quadrant_circuit_breaker: f64,
    #[serde(default = "d_batch_window_days")]
    pub batch_feedback_window_days: u64,
    #[serde(default = "d_batch_min_samples")]
    pub batch_min_samples: u64,
    #[serde(default = "d_batch_lr_cold")]
    pub batch_lr_cold_start: f64,
    #[serde(default = "d_batch_lr_warm")]
    pub batch_lr_warm: f64,
    #[serde(default = "d_batch_cold_threshold")]
    pub batch_cold_start_threshold: u64,
    #[serde(default = "d_batch_sweep_interval")]
    pub batch_sweep_interval_secs: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            t_high: d_t_high(),
            t_low: d_t_low(),
            min_reviews_for_update: d_min_reviews(),
            source_weight_min: d_weight_min(),
            source_weight_max: d_weight_max(),
            quadrant_learning_rate: d_quadrant_lr(),
            quadrant_circuit_breaker: d_quadrant_breaker(),
            batch_feedback_window_days: d_batch_window_days(),
            batch_min_samples: d_batch_min_samples(),
            batch_lr_cold_start: d_batch_lr_cold(),
            batch_lr_warm: d_batch_lr_warm(),
            batch_cold_start_threshold: d_batch_cold_threshold(),
            batch_sweep_interval_secs: d_batch_sweep_interval(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Name of the env var holding the admin bearer token. Unset at
    /// runtime ⇒ dev mode (admin routes open), logged as a warning.
    #[serde(default = "d_admin_token_env")]
    pub token_env: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token_env: d_admin_token_env(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_3210() -> u16 {
    8080
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}
fn d_dedup_ttl() -> u64 {
    3600
}
fn d_lock_ttl() -> u64 {
    15
}
fn d_thread_state_ttl() -> u64 {
    900
}
fn d_feedback_followup_ttl() -> u64 {
    900
}
fn d_sent_message_ttl() -> u64 {
    24 * 3600
}
fn d_store_timeout_ms() -> u64 {
    1000
}
fn d_poll_interval() -> u64 {
    3
}
fn d_poll_backoff() -> u64 {
    3
}
fn d_true() -> bool {
    true
}
fn d_lang() -> String {
    "en".into()
}
fn d_answer_timeout_ms() -> u64 {
    30_000
}
fn d_claim_ttl_min() -> u64 {
    30
}
fn d_auto_close_hours() -> u64 {
    72
}
fn d_retention_days() -> u64 {
    90
}
fn d_delivery_retries() -> u32 {
    3
}
fn d_delivery_backoff() -> u64 {
    5
}
fn d_delivery_timeout_ms() -> u64 {
    15_000
}
fn d_sweep_interval() -> u64 {
    60
}
fn d_t_high() -> f64 {
    0.95
}
fn d_t_low() -> f64 {
    0.70
}
fn d_min_reviews() -> u64 {
    50
}
fn d_weight_min() -> f64 {
    0.75
}
fn d_weight_max() -> f64 {
    1.25
}
fn d_quadrant_lr() -> f64 {
    0.02
}
fn d_quadrant_breaker() -> f64 {
    0.10
}
fn d_batch_window_days() -> u64 {
    30
}
fn d_batch_min_samples() -> u64 {
    10
}
fn d_batch_lr_cold() -> f64 {
    0.1
}
fn d_batch_lr_warm() -> f64 {
    0.3
}
fn d_batch_cold_threshold() -> u64 {
    100
}
fn d_batch_sweep_interval() -> u64 {
    3_600
}
fn d_admin_token_env() -> String {
    "GW_ADMIN_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return every issue found (errors
    /// abort startup, warnings are logged and startup continues).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard CORS origin allows any site to call admin endpoints".into(),
            });
        }

        if !(self.learning.t_low < self.learning.t_high) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "learning.t_low/t_high".into(),
                message: format!(
                    "t_low ({}) must be less than t_high ({})",
                    self.learning.t_low, self.learning.t_high
                ),
            });
        }
        for (field, v) in [
            ("learning.t_high", self.learning.t_high),
            ("learning.t_low", self.learning.t_low),
        ] {
            if !(0.0..=1.0).contains(&v) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: format!("{v} is outside the valid confidence range [0,1]"),
                });
            }
        }
        if !(self.learning.source_weight_min < self.learning.source_weight_max) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "learning.source_weight_min/max".into(),
                message: "source_weight_min must be less than source_weight_max".into(),
            });
        }

        if self.coordination.thread_lock_ttl_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "coordination.thread_lock_ttl_secs".into(),
                message: "thread lock TTL must be greater than 0".into(),
            });
        }

        if self.escalation.delivery_max_retries == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "escalation.delivery_max_retries".into(),
                message: "0 retries means any transient delivery failure is permanent".into(),
            });
        }

        if self.admin.token_env.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "admin.token_env".into(),
                message: "token_env must name an environment variable".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_is_localhost() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn explicit_host_parses() {
        let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3210);
    }

    #[test]
    fn validate_flags_inverted_thresholds() {
        let mut config = Config::default();
        config.learning.t_low = 0.99;
        config.learning.t_high = 0.5;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "learning.t_low/t_high" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn validate_passes_on_defaults() {
        let issues = Config::default().validate();
        assert!(issues
            .iter()
            .all(|e| e.severity != ConfigSeverity::Error));
    }
}
