use serde::Serialize;

/// Structured trace events emitted across all gateway crates. Each is
/// logged as a single `tracing::info!` with the JSON-encoded event as a
/// field, matching the rest of the codebase's structured-logging idiom.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    DedupReserved {
        channel: String,
        event_id: String,
        reserved: bool,
    },
    ThreadLockAcquired {
        channel: String,
        thread_id: String,
    },
    ThreadLockContended {
        channel: String,
        thread_id: String,
    },
    HookExecuted {
        hook: String,
        kind: &'static str,
        message_id: String,
    },
    PipelineError {
        message_id: String,
        error_code: String,
    },
    Dispatched {
        channel: String,
        message_id: String,
        success: bool,
    },
    EscalationCreated {
        escalation_id: i64,
        message_id: String,
        channel: String,
    },
    EscalationClaimed {
        escalation_id: i64,
        staff_id: String,
    },
    EscalationResponded {
        escalation_id: i64,
        staff_id: String,
        edit_distance: f64,
    },
    EscalationDelivered {
        escalation_id: i64,
        success: bool,
    },
    ReactionProcessed {
        channel: String,
        external_message_id: String,
        rating: &'static str,
    },
    ThresholdsUpdated {
        t_high: f64,
        t_low: f64,
        review_count: u64,
    },
    SourceWeightUpdated {
        source_type: String,
        old_weight: f64,
        new_weight: f64,
        reason: &'static str,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "gateway_event");
    }
}
