//! In-memory escalation store. A single `parking_lot::Mutex` guards the
//! whole table so claim/respond/close are trivially atomic
//! compare-and-update operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use gw_domain::Escalation;
use parking_lot::Mutex;

#[derive(Default)]
pub struct EscalationStore {
    next_id: AtomicI64,
    rows: Mutex<HashMap<i64, Escalation>>,
    by_message_id: Mutex<HashMap<String, i64>>,
}

impl EscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the existing row's id if `message_id` is already known,
    /// without inserting.
    pub fn find_by_message_id(&self, message_id: &str) -> Option<i64> {
        self.by_message_id.lock().get(message_id).copied()
    }

    /// Single-winner find-or-insert keyed by `message_id`: holds the
    /// `by_message_id` lock across the whole check-then-insert so two
    /// concurrent callers racing on the same `message_id` can't both
    /// observe "not found" and each insert their own row. `build`
    /// receives the freshly allocated id and is only invoked for the
    /// winner. Returns `(row, true)` for the winner that inserted a new
    /// row, `(row, false)` for a loser that observed an existing one.
    pub fn find_or_insert_by_message_id<F>(&self, message_id: &str, build: F) -> (Escalation, bool)
    where
        F: FnOnce(i64) -> Escalation,
    {
        let mut by_message_id = self.by_message_id.lock();
        if let Some(&id) = by_message_id.get(message_id) {
            let existing = self.rows.lock().get(&id).cloned().expect("by_message_id entry without a row");
            return (existing, false);
        }
        let id = self.next_id();
        let escalation = build(id);
        self.rows.lock().insert(id, escalation.clone());
        by_message_id.insert(message_id.to_string(), id);
        (escalation, true)
    }

    pub fn get(&self, id: i64) -> Option<Escalation> {
        self.rows.lock().get(&id).cloned()
    }

    /// Atomically reads, calls `f`, and writes back the result — every
    /// mutation (claim/respond/close) goes through this so a second
    /// caller never observes a torn intermediate state.
    pub fn compare_and_update<F, R>(&self, id: i64, f: F) -> Option<R>
    where
        F: FnOnce(&mut Escalation) -> R,
    {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id)?;
        Some(f(row))
    }

    pub fn list(&self, filters: &crate::service::EscalationFilters) -> Vec<Escalation> {
        let rows = self.rows.lock();
        let mut out: Vec<Escalation> = rows
            .values()
            .filter(|e| filters.status.map_or(true, |s| e.status == s))
            .filter(|e| {
                filters
                    .channel
                    .as_ref()
                    .map_or(true, |c| e.channel.as_str() == c)
            })
            .filter(|e| filters.priority.map_or(true, |p| e.priority == p))
            .filter(|e| {
                filters
                    .staff_id
                    .as_ref()
                    .map_or(true, |s| e.staff_id.as_deref() == Some(s.as_str()))
            })
            .cloned()
            .collect();
        out.sort_by_key(|e| e.id);
        let offset = filters.offset.unwrap_or(0);
        let limit = filters.limit.unwrap_or(out.len());
        out.into_iter().skip(offset).take(limit).collect()
    }

    pub fn counts_by_status(&self) -> HashMap<String, usize> {
        let rows = self.rows.lock();
        let mut counts = HashMap::new();
        for e in rows.values() {
            *counts
                .entry(format!("{:?}", e.status).to_lowercase())
                .or_insert(0) += 1;
        }
        counts
    }

    pub fn remove(&self, id: i64) -> Option<Escalation> {
        let removed = self.rows.lock().remove(&id);
        if let Some(e) = &removed {
            self.by_message_id.lock().remove(&e.message_id);
        }
        removed
    }

    pub fn all_ids(&self) -> Vec<i64> {
        self.rows.lock().keys().copied().collect()
    }
}
