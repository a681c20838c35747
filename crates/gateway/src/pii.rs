//! PII filter post-hook. Pattern table modeled on a typical
//! `PIIDetector` utility (email, IP, BTC address, phone, matrix-like
//! ID); reworked from a detect-and-log utility into a redact-in-place
//! post-hook, since the gateway does not ship a log scanning/alerting
//! surface.

use std::sync::OnceLock;

use regex::Regex;

/// `(name, pattern, case_insensitive)`. Order matters here: once a span
/// is redacted it becomes `[REDACTED:...]` and later patterns in the
/// list no longer see the original characters.
const PATTERNS: &[(&str, &str, bool)] = &[
    ("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}", false),
    ("ip_address", r"\b(?:\d{1,3}\.){3}\d{1,3}\b", false),
    ("bitcoin_legacy", r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b", false),
    ("bitcoin_bech32", r"\bbc1[qp][a-z0-9]{38,58}\b", true),
    ("matrix_id", r"@[a-zA-Z0-9._-]+:[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}", false),
    (
        "phone",
        r"\b(?:\+\d{1,3}[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b",
        false,
    ),
];

fn compiled() -> &'static Vec<(&'static str, Regex)> {
    static COMPILED: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(name, pattern, ci)| {
                let re = if *ci {
                    Regex::new(&format!("(?i){pattern}"))
                } else {
                    Regex::new(pattern)
                }
                .expect("valid static PII regex");
                (*name, re)
            })
            .collect()
    })
}

/// Redact every recognized PII pattern in `text`, replacing each match
/// with `[REDACTED:<type>]`. Returns the redacted text plus the set of
/// PII types found (empty if none).
pub fn redact(text: &str) -> (String, Vec<&'static str>) {
    let mut out = text.to_string();
    let mut found = Vec::new();
    for (name, re) in compiled() {
        if re.is_match(&out) {
            found.push(*name);
            out = re.replace_all(&out, format!("[REDACTED:{name}]")).into_owned();
        }
    }
    (out, found)
}

pub fn contains_pii(text: &str) -> bool {
    compiled().iter().any(|(_, re)| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email() {
        let (redacted, found) = redact("contact me at jane.doe@example.com please");
        assert!(redacted.contains("[REDACTED:email]"));
        assert_eq!(found, vec!["email"]);
    }

    #[test]
    fn redacts_bitcoin_bech32_case_insensitively() {
        let (redacted, found) = redact("send to BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ");
        assert!(redacted.contains("[REDACTED:bitcoin_bech32]"));
        assert_eq!(found, vec!["bitcoin_bech32"]);
    }

    #[test]
    fn redacts_matrix_id() {
        let (redacted, found) = redact("ping @alice:matrix.org about this");
        assert!(redacted.contains("[REDACTED:matrix_id]"));
        assert_eq!(found, vec!["matrix_id"]);
    }

    #[test]
    fn clean_text_is_unchanged() {
        let (redacted, found) = redact("how do I back up my wallet?");
        assert_eq!(redacted, "how do I back up my wallet?");
        assert!(found.is_empty());
    }

    #[test]
    fn contains_pii_detects_without_mutating() {
        assert!(contains_pii("my ip is 192.168.1.1"));
        assert!(!contains_pii("no pii here"));
    }
}
