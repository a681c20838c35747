//! Feedback record store backing the Reaction Processor (C8) and
//! Feedback Follow-up Coordinator (C9): one
//! `parking_lot::Mutex<HashMap<...>>` of append-only records, no
//! external persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gw_domain::ReactionRating;
use parking_lot::Mutex;

/// Feedback accumulated against one previously-sent answer, keyed by its
/// `internal_message_id`. A record is created lazily on the first
/// reaction; a later follow-up text analysis appends to it in place.
#[derive(Debug, Clone)]
pub struct FeedbackRecord {
    pub internal_message_id: String,
    pub channel: String,
    pub question: String,
    pub answer: String,
    pub user_id: String,
    /// Overwritten, not accumulated: the same reactor changing their
    /// mind replaces their prior rating.
    pub ratings: HashMap<String, ReactionRating>,
    pub explanation: Option<String>,
    pub issues: Vec<String>,
    /// The representative source-type label for the answer this
    /// feedback is attached to (see `gw_domain::representative_source_type`),
    /// set once on first touch. Feeds the Source-Weight Manager's (C14)
    /// batch Wilson-score update.
    pub source_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackRecord {
    fn new(
        internal_message_id: String,
        channel: String,
        question: String,
        answer: String,
        user_id: String,
        source_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            internal_message_id,
            channel,
            question,
            answer,
            user_id,
            ratings: HashMap::new(),
            explanation: None,
            issues: Vec::new(),
            source_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn positive_count(&self) -> usize {
        self.ratings.values().filter(|r| **r == ReactionRating::Positive).count()
    }

    pub fn negative_count(&self) -> usize {
        self.ratings.values().filter(|r| **r == ReactionRating::Negative).count()
    }
}

#[derive(Default)]
pub struct FeedbackStore {
    records: Mutex<HashMap<String, FeedbackRecord>>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) one reactor's rating. Creates the record on
    /// first touch using the sent-message context the caller already has
    /// on hand (from the Sent-Message Tracker lookup).
    pub fn record_rating(
        &self,
        internal_message_id: &str,
        channel: &str,
        question: &str,
        answer: &str,
        user_id: &str,
        reactor_id: &str,
        rating: ReactionRating,
        source_type: Option<String>,
    ) {
        let mut records = self.records.lock();
        let record = records.entry(internal_message_id.to_string()).or_insert_with(|| {
            FeedbackRecord::new(
                internal_message_id.to_string(),
                channel.to_string(),
                question.to_string(),
                answer.to_string(),
                user_id.to_string(),
                source_type,
            )
        });
        record.ratings.insert(reactor_id.to_string(), rating);
        record.updated_at = Utc::now();
    }

    /// Per-source-type `(positive, total)` rating counts across records
    /// touched at or after `since`, feeding the Source-Weight Manager's
    /// (C14) time-windowed batch update. Records with no resolved
    /// source type are skipped — there is nothing to attribute the
    /// rating to.
    pub fn source_type_stats(&self, since: DateTime<Utc>) -> HashMap<String, (u64, u64)> {
        let records = self.records.lock();
        let mut stats: HashMap<String, (u64, u64)> = HashMap::new();
        for record in records.values() {
            if record.updated_at < since {
                continue;
            }
            let Some(source_type) = record.source_type.as_ref() else {
                continue;
            };
            let entry = stats.entry(source_type.clone()).or_insert((0, 0));
            entry.0 += record.positive_count() as u64;
            entry.1 += record.ratings.len() as u64;
        }
        stats
    }

    /// `true` if a prior rating from `reactor_id` existed and was removed.
    pub fn revoke_rating(&self, internal_message_id: &str, reactor_id: &str) -> bool {
        let mut records = self.records.lock();
        match records.get_mut(internal_message_id) {
            Some(record) => {
                let removed = record.ratings.remove(reactor_id).is_some();
                if removed {
                    record.updated_at = Utc::now();
                }
                removed
            }
            None => false,
        }
    }

    pub fn append_followup(&self, internal_message_id: &str, explanation: String, issues: Vec<String>) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(internal_message_id) {
            record.explanation = Some(explanation);
            record.issues = issues;
            record.updated_at = Utc::now();
        }
    }

    pub fn get(&self, internal_message_id: &str) -> Option<FeedbackRecord> {
        self.records.lock().get(internal_message_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_overwrites_same_reactor() {
        let store = FeedbackStore::new();
        store.record_rating("m1", "web", "q", "a", "u1", "u1", ReactionRating::Positive, None);
        store.record_rating("m1", "web", "q", "a", "u1", "u1", ReactionRating::Negative, None);
        let record = store.get("m1").unwrap();
        assert_eq!(record.ratings.len(), 1);
        assert_eq!(record.negative_count(), 1);
    }

    #[test]
    fn revoke_removes_prior_rating() {
        let store = FeedbackStore::new();
        store.record_rating("m1", "web", "q", "a", "u1", "u1", ReactionRating::Positive, None);
        assert!(store.revoke_rating("m1", "u1"));
        assert_eq!(store.get("m1").unwrap().positive_count(), 0);
        assert!(!store.revoke_rating("m1", "u1"));
    }

    #[test]
    fn followup_appends_explanation_and_issues() {
        let store = FeedbackStore::new();
        store.record_rating("m1", "web", "q", "a", "u1", "u1", ReactionRating::Negative, None);
        store.append_followup("m1", "answer was incomplete".into(), vec!["incomplete".into()]);
        let record = store.get("m1").unwrap();
        assert_eq!(record.explanation.as_deref(), Some("answer was incomplete"));
        assert_eq!(record.issues, vec!["incomplete".to_string()]);
    }

    #[test]
    fn source_type_stats_aggregate_positive_and_total() {
        let store = FeedbackStore::new();
        store.record_rating("m1", "web", "q", "a", "u1", "r1", ReactionRating::Positive, Some("faq".into()));
        store.record_rating("m2", "web", "q", "a", "u2", "r2", ReactionRating::Negative, Some("faq".into()));
        store.record_rating("m3", "web", "q", "a", "u3", "r3", ReactionRating::Positive, Some("wiki".into()));
        store.record_rating("m4", "web", "q", "a", "u4", "r4", ReactionRating::Positive, None);

        let stats = store.source_type_stats(Utc::now() - chrono::Duration::days(1));
        assert_eq!(stats.get("faq"), Some(&(1, 2)));
        assert_eq!(stats.get("wiki"), Some(&(1, 1)));
        assert_eq!(stats.get("unknown"), None);
    }

    #[test]
    fn source_type_stats_excludes_records_before_window() {
        let store = FeedbackStore::new();
        store.record_rating("m1", "web", "q", "a", "u1", "r1", ReactionRating::Positive, Some("faq".into()));
        let stats = store.source_type_stats(Utc::now() + chrono::Duration::seconds(5));
        assert!(stats.is_empty());
    }
}
