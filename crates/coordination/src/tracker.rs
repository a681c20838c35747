//! Sent-Message Tracker (C2): a TTL map from `(channel_id,
//! external_message_id)` to the delivered-message record, so a later
//! reaction can be correlated back to the turn that produced it.
//! Bounded TTL-map, swept lazily on read plus a periodic sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gw_domain::SentMessageRecord;
use parking_lot::RwLock;

const SWEEP_THRESHOLD: usize = 10_000;

struct Entry {
    record: SentMessageRecord,
    expires_at: Instant,
}

/// Thread-safe, TTL-bounded map. Keys are partitioned by `channel_id` —
/// identical external ids across channels are independent.
pub struct SentMessageTracker {
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl SentMessageTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn track(&self, channel_id: &str, external_message_id: &str, record: SentMessageRecord) {
        let mut map = self.entries.write();
        if map.len() > SWEEP_THRESHOLD {
            self.sweep_locked(&mut map);
        }
        map.insert(
            (channel_id.to_string(), external_message_id.to_string()),
            Entry {
                record,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// `None` if expired or missing; expired entries are lazily evicted.
    pub fn lookup(&self, channel_id: &str, external_message_id: &str) -> Option<SentMessageRecord> {
        let key = (channel_id.to_string(), external_message_id.to_string());
        {
            let map = self.entries.read();
            match map.get(&key) {
                Some(e) if Instant::now() < e.expires_at => return Some(e.record.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().remove(&key);
        None
    }

    pub fn remove(&self, channel_id: &str, external_message_id: &str) {
        self.entries
            .write()
            .remove(&(channel_id.to_string(), external_message_id.to_string()));
    }

    /// Periodic sweep, so memory is bounded even without lookup traffic.
    pub fn sweep(&self) {
        let mut map = self.entries.write();
        self.sweep_locked(&mut map);
    }

    fn sweep_locked(&self, map: &mut HashMap<(String, String), Entry>) {
        let now = Instant::now();
        map.retain(|_, e| now < e.expires_at);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> SentMessageRecord {
        SentMessageRecord {
            internal_message_id: "m1".into(),
            question: "q".into(),
            answer: "a".into(),
            user_id: "u1".into(),
            timestamp: Utc::now(),
            sources: Vec::new(),
            confidence_score: Some(0.9),
            requires_human: false,
            routing_action: None,
            delivery_target: None,
        }
    }

    #[test]
    fn tracks_and_looks_up() {
        let tracker = SentMessageTracker::new(Duration::from_secs(60));
        tracker.track("web", "ext1", record());
        assert!(tracker.lookup("web", "ext1").is_some());
        assert!(tracker.lookup("federated-chat", "ext1").is_none());
    }

    #[test]
    fn expires_and_is_lazily_evicted() {
        let tracker = SentMessageTracker::new(Duration::from_millis(10));
        tracker.track("web", "ext1", record());
        std::thread::sleep(Duration::from_millis(30));
        assert!(tracker.lookup("web", "ext1").is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn overwrite_replaces_existing() {
        let tracker = SentMessageTracker::new(Duration::from_secs(60));
        tracker.track("web", "ext1", record());
        let mut r2 = record();
        r2.answer = "updated".into();
        tracker.track("web", "ext1", r2);
        assert_eq!(tracker.lookup("web", "ext1").unwrap().answer, "updated");
    }
}
