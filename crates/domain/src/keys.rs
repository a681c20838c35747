//! Stable string formats for Coordination Store keys. Tests depend on
//! these exact formats, so they live in one place rather than
//! being assembled ad hoc at call sites.

pub fn dedup_key(channel: &str, event_id: &str) -> String {
    format!("dedup:{channel}:{event_id}")
}

pub fn thread_lock_key(channel: &str, thread_id: &str) -> String {
    format!("thread-lock:{channel}:{thread_id}")
}

pub fn thread_state_key(channel: &str, thread_id: &str) -> String {
    format!("thread:{channel}:{thread_id}")
}

/// Key for the pending feedback-follow-up entry, per (channel, user_id).
pub fn feedback_followup_key(channel: &str, user_id: &str) -> String {
    format!("feedback-followup:{channel}:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_stable() {
        assert_eq!(dedup_key("web", "evt1"), "dedup:web:evt1");
        assert_eq!(thread_lock_key("web", "t1"), "thread-lock:web:t1");
        assert_eq!(thread_state_key("web", "t1"), "thread:web:t1");
        assert_eq!(
            feedback_followup_key("web", "u1"),
            "feedback-followup:web:u1"
        );
    }
}
