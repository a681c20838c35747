//! Localized escalation notice rendering: a 2-D `channel × language`
//! template table with a hard-coded English fallback.

use std::collections::HashMap;
use std::sync::OnceLock;

const FALLBACK_LANGUAGE: &str = "en";

/// Normalize a language code to a stable 2-letter lowercase token,
/// stripping region suffixes (`en-US` → `en`). Never infer beyond this.
pub fn normalize_language_code(language_code: Option<&str>) -> String {
    let normalized = language_code.unwrap_or("").trim().to_lowercase();
    if normalized.is_empty() {
        return FALLBACK_LANGUAGE.to_string();
    }
    let head = normalized.split('-').next().unwrap_or("");
    let truncated: String = head.chars().take(2).collect();
    if truncated.is_empty() {
        FALLBACK_LANGUAGE.to_string()
    } else {
        truncated
    }
}

type TemplateTable = HashMap<&'static str, HashMap<&'static str, &'static str>>;

fn templates() -> &'static TemplateTable {
    static TABLE: OnceLock<TemplateTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: TemplateTable = HashMap::new();

        let generic_web: HashMap<&'static str, &'static str> = HashMap::from([
            ("en", "Your question has been forwarded to our support team. A staff member will review and respond shortly. (Reference: #{escalation_id})"),
            ("de", "Ihre Frage wurde an unser Support-Team weitergeleitet. Ein Teammitglied wird sie prüfen und bald antworten. (Referenz: #{escalation_id})"),
            ("es", "Tu pregunta ha sido enviada a nuestro equipo de soporte. Un miembro del equipo la revisará y responderá en breve. (Referencia: #{escalation_id})"),
            ("fr", "Votre question a été transmise à notre équipe de support. Un membre de l'équipe va l'examiner et répondre sous peu. (Référence: #{escalation_id})"),
        ]);
        table.insert("generic", generic_web.clone());
        table.insert("web", generic_web);

        table.insert(
            "matrix-like",
            HashMap::from([
                ("en", "Your question has been escalated to {support_handle} for review. A support team member will respond in this room. (Reference: #{escalation_id})"),
                ("de", "Ihre Frage wurde zur Prüfung an {support_handle} eskaliert. Ein Mitglied des Support-Teams wird in diesem Raum antworten. (Referenz: #{escalation_id})"),
                ("es", "Tu pregunta fue escalada a {support_handle} para revisión. Un miembro del equipo de soporte responderá en esta sala. (Referencia: #{escalation_id})"),
                ("fr", "Votre question a été transmise à {support_handle} pour examen. Un membre de l'équipe support répondra dans cette salle. (Référence: #{escalation_id})"),
            ]),
        );

        table.insert(
            "trading-app",
            HashMap::from([
                ("en", "Your question has been escalated to {support_handle} for review. A support team member will respond in this conversation. (Reference: #{escalation_id})"),
                ("de", "Ihre Frage wurde zur Prüfung an {support_handle} eskaliert. Ein Mitglied des Support-Teams wird in dieser Unterhaltung antworten. (Referenz: #{escalation_id})"),
                ("es", "Tu pregunta fue escalada a {support_handle} para revisión. Un miembro del equipo de soporte responderá en esta conversación. (Referencia: #{escalation_id})"),
                ("fr", "Votre question a été transmise à {support_handle} pour examen. Un membre de l'équipe support répondra dans cette conversation. (Référence: #{escalation_id})"),
            ]),
        );

        table
    })
}

/// Render a localized escalation notice with graceful English fallback.
pub fn render_escalation_notice(
    channel_bucket: &str,
    escalation_id: i64,
    support_handle: &str,
    language_code: Option<&str>,
) -> String {
    let table = templates();
    let bucket = table
        .get(channel_bucket)
        .unwrap_or_else(|| table.get("generic").expect("generic bucket always present"));
    let lang = normalize_language_code(language_code);
    let template = bucket
        .get(lang.as_str())
        .or_else(|| bucket.get(FALLBACK_LANGUAGE))
        .copied()
        .unwrap_or("Your question has been forwarded to our support team. (Reference: #{escalation_id})");

    template
        .replace("{support_handle}", support_handle)
        .replace("{escalation_id}", &escalation_id.to_string())
}

/// Maps a [`crate::models::ChannelKind`] to the localization bucket used
/// for its escalation notices.
pub fn bucket_for_channel(channel: crate::models::ChannelKind) -> &'static str {
    match channel {
        crate::models::ChannelKind::Web => "web",
        crate::models::ChannelKind::FederatedChat => "matrix-like",
        crate::models::ChannelKind::TradingAppChat => "trading-app",
    }
}
