//! Channel Registry (C3): a named, value-typed lookup of active
//! adapters with lifecycle management — a
//! `parking_lot::RwLock<HashMap<...>>` rather than a class hierarchy.

use std::collections::HashMap;
use std::sync::Arc;

use gw_domain::{ChannelCapability, HealthStatus};
use parking_lot::RwLock;

use crate::adapter::{AdapterError, ChannelAdapter};

#[derive(Default)]
pub struct ChannelRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn ChannelAdapter>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, adapter: Arc<dyn ChannelAdapter>) {
        let id = adapter.channel_id().to_string();
        self.adapters.write().insert(id, adapter);
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters.read().get(channel_id).cloned()
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.adapters.read().keys().cloned().collect()
    }

    /// Adapters advertising `POLL_CONVERSATIONS`, for the Polling
    /// Service (C7) to iterate.
    pub fn pollable(&self) -> Vec<Arc<dyn ChannelAdapter>> {
        self.adapters
            .read()
            .values()
            .filter(|a| a.capabilities().has(ChannelCapability::PollConversations))
            .cloned()
            .collect()
    }

    /// Starts every registered adapter. When `continue_on_error` is
    /// true, a failing adapter does not abort the cohort — its error is
    /// collected and returned alongside any others.
    pub async fn start_all(&self, continue_on_error: bool) -> Vec<(String, AdapterError)> {
        let adapters: Vec<_> = self.adapters.read().values().cloned().collect();
        let mut errors = Vec::new();
        for adapter in adapters {
            if let Err(e) = adapter.start().await {
                errors.push((adapter.channel_id().to_string(), e));
                if !continue_on_error {
                    break;
                }
            }
        }
        errors
    }

    pub async fn stop_all(&self) -> Vec<(String, AdapterError)> {
        let adapters: Vec<_> = self.adapters.read().values().cloned().collect();
        let mut errors = Vec::new();
        for adapter in adapters {
            if let Err(e) = adapter.stop().await {
                errors.push((adapter.channel_id().to_string(), e));
            }
        }
        errors
    }

    pub async fn restart(&self, channel_id: &str) -> Result<(), AdapterError> {
        let adapter = self
            .get(channel_id)
            .ok_or_else(|| AdapterError::Unavailable(channel_id.to_string()))?;
        adapter.stop().await?;
        adapter.start().await
    }

    pub async fn health_check_all(&self) -> HashMap<String, HealthStatus> {
        let adapters: Vec<_> = self.adapters.read().values().cloned().collect();
        let mut out = HashMap::new();
        for adapter in adapters {
            out.insert(adapter.channel_id().to_string(), adapter.health_check().await);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FederatedChatChannel, WebChannel};

    #[tokio::test]
    async fn start_all_continues_past_individual_errors() {
        let registry = ChannelRegistry::new();
        registry.register(Arc::new(WebChannel::new()));
        registry.register(Arc::new(FederatedChatChannel::new()));
        let errors = registry.start_all(true).await;
        assert!(errors.is_empty());
        assert_eq!(registry.pollable().len(), 1);
    }

    #[tokio::test]
    async fn health_check_all_covers_every_registered_adapter() {
        let registry = ChannelRegistry::new();
        registry.register(Arc::new(WebChannel::new()));
        registry.register(Arc::new(FederatedChatChannel::new()));
        registry.start_all(true).await;
        let health = registry.health_check_all().await;
        assert_eq!(health.len(), 2);
        assert!(health.values().all(|h| h.healthy));
    }
}
