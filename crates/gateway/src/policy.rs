//! Policy Services (C12): two thin, stateless queries over
//! the live `Config`. Re-reading the config on every call (rather than
//! caching a snapshot at startup) means an admin edit takes effect on
//! the next message without a restart.

use gw_domain::config::Config;

pub struct AiGenerationPolicy;

impl AiGenerationPolicy {
    pub fn is_enabled(config: &Config, channel_id: &str) -> bool {
        config.channels.policy_for(channel_id).ai_generation_enabled
    }
}

pub struct AutoResponsePolicy;

impl AutoResponsePolicy {
    pub fn is_enabled(config: &Config, channel_id: &str) -> bool {
        config.channels.policy_for(channel_id).auto_response_enabled
    }
}
