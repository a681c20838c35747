//! Escalation Service (C10): the `PENDING → IN_REVIEW → RESPONDED →
//! CLOSED` state machine, claim/respond atomicity, and the three
//! background sweepers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use gw_domain::{
    representative_source_type, ChannelKind, DeliveryStatus, DocumentReference, Escalation,
    EscalationStatus, MessagePriority, RoutingAction,
};

use crate::edit_distance::normalized_edit_distance;
use crate::store::EscalationStore;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("escalation already claimed")]
    AlreadyClaimed,
    #[error("escalation not found")]
    NotFound,
    #[error("no staff answer recorded yet")]
    NoStaffAnswer,
    #[error("rating must be 0 or 1")]
    InvalidRating,
}

pub struct CreateEscalationData {
    pub message_id: String,
    pub channel: ChannelKind,
    pub channel_metadata: HashMap<String, String>,
    pub user_id: String,
    pub question: String,
    pub ai_draft_answer: String,
    pub confidence: f64,
    pub routing_action: RoutingAction,
    pub routing_reason: Option<String>,
    pub sources: Vec<DocumentReference>,
    pub priority: MessagePriority,
}

#[derive(Debug, Clone, Default)]
pub struct EscalationFilters {
    pub status: Option<EscalationStatus>,
    pub channel: Option<String>,
    pub priority: Option<MessagePriority>,
    pub staff_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A staff decision recorded for the Learning Engine (C13). Kept as a
/// plain struct rather than a dependency on `gw-learning` so the crate
/// graph stays acyclic:
/// `gw-gateway` wires the learning engine's `record_review` against the
/// channel this emits.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub message_id: String,
    pub confidence: f64,
    pub edit_distance: f64,
    pub helpful: Option<bool>,
    pub routing_action: RoutingAction,
    pub source_type: Option<String>,
}

pub trait LearningSink: Send + Sync {
    fn record_review(&self, record: ReviewRecord);
}

pub struct EscalationService {
    store: Arc<EscalationStore>,
    claim_ttl: ChronoDuration,
    auto_close: ChronoDuration,
    retention: ChronoDuration,
    learning_sink: Option<Arc<dyn LearningSink>>,
}

impl EscalationService {
    pub fn new(
        store: Arc<EscalationStore>,
        claim_ttl_minutes: i64,
        auto_close_hours: i64,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            claim_ttl: ChronoDuration::minutes(claim_ttl_minutes),
            auto_close: ChronoDuration::hours(auto_close_hours),
            retention: ChronoDuration::days(retention_days),
            learning_sink: None,
        }
    }

    pub fn with_learning_sink(mut self, sink: Arc<dyn LearningSink>) -> Self {
        self.learning_sink = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<EscalationStore> {
        &self.store
    }

    /// Idempotent create: a duplicate `message_id` returns the existing
    /// row rather than erroring. Routed through
    /// `EscalationStore::find_or_insert_by_message_id` so the
    /// find-then-insert is a single atomic section — two concurrent
    /// calls for the same `message_id` can't both observe "not found"
    /// and insert separate rows (the at-least-once redelivery case
    /// §4.5 anticipates).
    pub fn create_escalation(&self, data: CreateEscalationData) -> Escalation {
        let message_id = data.message_id.clone();
        let (escalation, inserted) = self.store.find_or_insert_by_message_id(&message_id, |id| Escalation {
            id,
            message_id: data.message_id,
            channel: data.channel,
            channel_metadata: data.channel_metadata,
            user_id: data.user_id,
            question: data.question,
            ai_draft_answer: data.ai_draft_answer,
            confidence: data.confidence,
            routing_action: data.routing_action,
            routing_reason: data.routing_reason,
            sources: data.sources,
            staff_answer: None,
            staff_id: None,
            edit_distance: None,
            staff_answer_rating: None,
            delivery_status: DeliveryStatus::Pending,
            delivery_attempts: 0,
            delivery_error: None,
            status: EscalationStatus::Pending,
            priority: data.priority,
            generated_faq_id: None,
            created_at: Utc::now(),
            claimed_at: None,
            responded_at: None,
            closed_at: None,
            last_delivery_at: None,
        });
        if inserted {
            gw_domain::TraceEvent::EscalationCreated {
                escalation_id: escalation.id,
                message_id: escalation.message_id.clone(),
                channel: escalation.channel.to_string(),
            }
            .emit();
        }
        escalation
    }

    pub fn get(&self, id: i64) -> Option<Escalation> {
        self.store.get(id)
    }

    pub fn find_by_message_id(&self, message_id: &str) -> Option<Escalation> {
        self.store.find_by_message_id(message_id).and_then(|id| self.store.get(id))
    }

    pub fn claim(&self, id: i64, staff_id: &str) -> Result<Escalation, ServiceError> {
        self.store
            .compare_and_update(id, |e| {
                if e.status != EscalationStatus::Pending {
                    return Err(ServiceError::AlreadyClaimed);
                }
                e.status = EscalationStatus::InReview;
                e.staff_id = Some(staff_id.to_string());
                e.claimed_at = Some(Utc::now());
                gw_domain::TraceEvent::EscalationClaimed {
                    escalation_id: e.id,
                    staff_id: staff_id.to_string(),
                }
                .emit();
                Ok(e.clone())
            })
            .ok_or(ServiceError::NotFound)?
    }

    pub fn respond(&self, id: i64, answer: &str, staff_id: &str) -> Result<Escalation, ServiceError> {
        let result = self.store.compare_and_update(id, |e| {
            match e.status {
                EscalationStatus::Closed => return Err(ServiceError::NotFound),
                EscalationStatus::Responded => {
                    // Idempotent re-call for the same staff_id; otherwise
                    // another staff already holds the answer.
                    if e.staff_id.as_deref() == Some(staff_id) {
                        return Ok((e.clone(), false));
                    }
                    return Err(ServiceError::AlreadyClaimed);
                }
                EscalationStatus::InReview => {
                    if e.staff_id.as_deref() != Some(staff_id) {
                        return Err(ServiceError::AlreadyClaimed);
                    }
                }
                EscalationStatus::Pending => {
                    // Not yet claimed; allow direct respond by claiming
                    // implicitly for this staff_id.
                    e.staff_id = Some(staff_id.to_string());
                    e.claimed_at = Some(Utc::now());
                }
            }
            let distance = normalized_edit_distance(&e.ai_draft_answer, answer);
            e.staff_answer = Some(answer.to_string());
            e.edit_distance = Some(distance);
            e.status = EscalationStatus::Responded;
            e.responded_at = Some(Utc::now());
            gw_domain::TraceEvent::EscalationResponded {
                escalation_id: e.id,
                staff_id: staff_id.to_string(),
                edit_distance: distance,
            }
            .emit();
            Ok((e.clone(), true))
        });

        let (escalation, newly_responded) = result.ok_or(ServiceError::NotFound)??;

        if newly_responded {
            if let Some(sink) = &self.learning_sink {
                sink.record_review(ReviewRecord {
                    message_id: escalation.message_id.clone(),
                    confidence: escalation.confidence,
                    edit_distance: escalation.edit_distance.unwrap_or(0.0),
                    helpful: escalation.staff_answer_rating.map(|r| r == 1),
                    routing_action: escalation.routing_action,
                    source_type: representative_source_type(&escalation.sources),
                });
            }
        }

        Ok(escalation)
    }

    pub fn close(&self, id: i64) -> Result<Escalation, ServiceError> {
        self.store
            .compare_and_update(id, |e| {
                e.status = EscalationStatus::Closed;
                e.closed_at = Some(Utc::now());
                e.clone()
            })
            .ok_or(ServiceError::NotFound)
    }

    pub fn rate_staff_answer(&self, message_id: &str, rating: u8) -> Result<Escalation, ServiceError> {
        if rating != 0 && rating != 1 {
            return Err(ServiceError::InvalidRating);
        }
        let id = self.store.find_by_message_id(message_id).ok_or(ServiceError::NotFound)?;
        let result = self.store.compare_and_update(id, |e| {
            if e.staff_answer.is_none() {
                return Err(ServiceError::NoStaffAnswer);
            }
            e.staff_answer_rating = Some(rating);
            Ok(e.clone())
        });
        let escalation = result.ok_or(ServiceError::NotFound)??;

        if let Some(sink) = &self.learning_sink {
            sink.record_review(ReviewRecord {
                message_id: escalation.message_id.clone(),
                confidence: escalation.confidence,
                edit_distance: escalation.edit_distance.unwrap_or(0.0),
                helpful: Some(rating == 1),
                routing_action: escalation.routing_action,
                source_type: representative_source_type(&escalation.sources),
            });
        }
        Ok(escalation)
    }

    pub fn list(&self, filters: &EscalationFilters) -> Vec<Escalation> {
        self.store.list(filters)
    }

    pub fn counts_by_status(&self) -> HashMap<String, usize> {
        self.store.counts_by_status()
    }

    /// Records delivery bookkeeping after a `deliver` attempt; kept
    /// separate from `deliver` itself so a retrying sweeper can call
    /// both without re-implementing the store update.
    pub fn record_delivery_result(&self, id: i64, success: bool, error: Option<String>) {
        self.store.compare_and_update(id, |e| {
            e.delivery_attempts += 1;
            e.last_delivery_at = Some(Utc::now());
            if success {
                e.delivery_status = DeliveryStatus::Delivered;
                e.delivery_error = None;
            } else {
                e.delivery_status = DeliveryStatus::Failed;
                e.delivery_error = error;
            }
        });
    }

    pub fn mark_not_required(&self, id: i64) {
        self.store.compare_and_update(id, |e| {
            e.delivery_status = DeliveryStatus::NotRequired;
        });
    }

    /// Stale-claim reaper: releases claims older than `claim_ttl`,
    /// returning them to PENDING so another staff member can claim.
    pub fn reap_stale_claims(&self) -> usize {
        let mut released = 0;
        for id in self.store.all_ids() {
            let touched = self.store.compare_and_update(id, |e| {
                if e.status == EscalationStatus::InReview {
                    if let Some(claimed_at) = e.claimed_at {
                        if Utc::now() - claimed_at > self.claim_ttl {
                            e.status = EscalationStatus::Pending;
                            e.staff_id = None;
                            e.claimed_at = None;
                            return true;
                        }
                    }
                }
                false
            });
            if touched == Some(true) {
                released += 1;
            }
        }
        released
    }

    /// Auto-closer: closes RESPONDED rows older than `auto_close_hours`.
    pub fn auto_close_stale(&self) -> usize {
        let mut closed = 0;
        for id in self.store.all_ids() {
            let touched = self.store.compare_and_update(id, |e| {
                if e.status == EscalationStatus::Responded {
                    if let Some(responded_at) = e.responded_at {
                        if Utc::now() - responded_at > self.auto_close {
                            e.status = EscalationStatus::Closed;
                            e.closed_at = Some(Utc::now());
                            return true;
                        }
                    }
                }
                false
            });
            if touched == Some(true) {
                closed += 1;
            }
        }
        closed
    }

    /// Purger: deletes CLOSED rows beyond the retention window.
    pub fn purge_expired(&self) -> usize {
        let mut purged = 0;
        for id in self.store.all_ids() {
            let expired = self
                .store
                .get(id)
                .map(|e| {
                    e.status == EscalationStatus::Closed
                        && e.closed_at
                            .map(|c| Utc::now() - c > self.retention)
                            .unwrap_or(false)
                })
                .unwrap_or(false);
            if expired {
                self.store.remove(id);
                purged += 1;
            }
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_domain::ChannelKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn data() -> CreateEscalationData {
        CreateEscalationData {
            message_id: "m1".into(),
            channel: ChannelKind::Web,
            channel_metadata: HashMap::new(),
            user_id: "u1".into(),
            question: "how do I back up my wallet?".into(),
            ai_draft_answer: "go to settings -> backup".into(),
            confidence: 0.4,
            routing_action: RoutingAction::NeedsHuman,
            routing_reason: None,
            sources: Vec::new(),
            priority: MessagePriority::High,
        }
    }

    fn service() -> EscalationService {
        EscalationService::new(Arc::new(EscalationStore::new()), 30, 72, 90)
    }

    #[test]
    fn duplicate_create_returns_existing_row() {
        let svc = service();
        let first = svc.create_escalation(data());
        let second = svc.create_escalation(data());
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn concurrent_duplicate_create_never_orphans_a_row() {
        let svc = Arc::new(service());
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let svc = svc.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    svc.create_escalation(data())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0].id, results[1].id);
        assert_eq!(svc.store.all_ids().len(), 1);
    }

    #[test]
    fn claim_is_exclusive() {
        let svc = service();
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        let err = svc.claim(e.id, "staff-b").unwrap_err();
        assert_eq!(err, ServiceError::AlreadyClaimed);
    }

    #[test]
    fn respond_by_different_staff_after_claim_fails() {
        let svc = service();
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        let err = svc.respond(e.id, "answer", "staff-b").unwrap_err();
        assert_eq!(err, ServiceError::AlreadyClaimed);
    }

    #[test]
    fn respond_is_idempotent_for_same_staff() {
        let svc = service();
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        let r1 = svc.respond(e.id, "final answer", "staff-a").unwrap();
        let r2 = svc.respond(e.id, "final answer", "staff-a").unwrap();
        assert_eq!(r1.responded_at, r2.responded_at);
    }

    #[test]
    fn respond_on_closed_returns_not_found() {
        let svc = service();
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        svc.respond(e.id, "answer", "staff-a").unwrap();
        svc.close(e.id).unwrap();
        let err = svc.respond(e.id, "answer", "staff-a").unwrap_err();
        assert_eq!(err, ServiceError::NotFound);
    }

    #[test]
    fn respond_computes_edit_distance_and_invariants_hold() {
        let svc = service();
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        let responded = svc.respond(e.id, "go to settings -> backup", "staff-a").unwrap();
        assert_eq!(responded.edit_distance, Some(0.0));
        assert!(responded.timestamps_consistent());
    }

    #[test]
    fn reap_stale_claims_releases_after_ttl() {
        let svc = EscalationService::new(Arc::new(EscalationStore::new()), 0, 72, 90);
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let released = svc.reap_stale_claims();
        assert_eq!(released, 1);
        assert_eq!(svc.get(e.id).unwrap().status, EscalationStatus::Pending);
    }

    struct CountingSink(AtomicUsize);
    impl LearningSink for CountingSink {
        fn record_review(&self, _record: ReviewRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn respond_feeds_learning_sink_once() {
        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let svc = service().with_learning_sink(sink.clone());
        let e = svc.create_escalation(data());
        svc.claim(e.id, "staff-a").unwrap();
        svc.respond(e.id, "answer", "staff-a").unwrap();
        svc.respond(e.id, "answer", "staff-a").unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }
}
