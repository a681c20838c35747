//! Polling Service (C7). One cooperatively-cancellable loop
//! per pollable adapter; ticks are strictly sequential per adapter so a
//! slow `poll_conversations()` call never overlaps with the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gw_channels::{ChannelAdapter, ChannelRegistry};
use gw_domain::config::Config;

use crate::orchestrator::Orchestrator;
use crate::policy::AiGenerationPolicy;

const MIN_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 3_600;

pub struct PollingService {
    registry: Arc<ChannelRegistry>,
    orchestrator: Arc<Orchestrator>,
    config: Arc<Config>,
    interval: Duration,
    backoff: Duration,
    shutdown: Arc<AtomicBool>,
}

impl PollingService {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        orchestrator: Arc<Orchestrator>,
        config: Arc<Config>,
        interval_secs: u64,
        backoff_secs: u64,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            config,
            interval: Duration::from_secs(interval_secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)),
            backoff: Duration::from_secs(backoff_secs.max(MIN_INTERVAL_SECS)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Spawns one task per currently-registered adapter advertising
    /// `POLL_CONVERSATIONS`. Must be called on an `Arc<PollingService>`
    /// so each task can share the shutdown flag and dependencies.
    pub fn spawn_all(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        self.registry
            .pollable()
            .into_iter()
            .map(|adapter| {
                let this = self.clone();
                tokio::spawn(async move { this.poll_loop(adapter).await })
            })
            .collect()
    }

    async fn poll_loop(&self, adapter: Arc<dyn ChannelAdapter>) {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            tick.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            if !AiGenerationPolicy::is_enabled(&self.config, adapter.channel_id()) {
                continue;
            }

            match adapter.poll_conversations().await {
                Ok(messages) => {
                    for incoming in messages {
                        let incoming = adapter.handle_incoming(incoming);
                        self.orchestrator.process_incoming(&incoming).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = adapter.channel_id(), error = %e, "poll failed, backing off");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_channels::FederatedChatChannel;
    use gw_domain::config::Config;

    #[tokio::test]
    async fn spawns_one_task_per_pollable_adapter() {
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(Arc::new(FederatedChatChannel::new()));
        let config = Arc::new(Config::default());
        let orchestrator = Arc::new(crate::test_support::orchestrator_stub((*config).clone(), registry.clone()));
        let service = Arc::new(PollingService::new(registry, orchestrator, config, 1, 1));
        let handles = service.spawn_all();
        assert_eq!(handles.len(), 1);
        service.stop();
        for h in handles {
            let _ = tokio::time::timeout(Duration::from_secs(2), h).await;
        }
    }

    #[tokio::test]
    async fn disabled_channel_skips_poll_conversations() {
        let registry = Arc::new(ChannelRegistry::new());
        let chan = Arc::new(FederatedChatChannel::new());
        chan.start().await.unwrap();
        chan.push_incoming(crate::test_support::sample_incoming("federated-chat"));
        registry.register(chan.clone());
        let mut config = Config::default();
        let policy =
            gw_domain::config::ChannelPolicyConfig { ai_generation_enabled: false, ..Default::default() };
        config.channels.policies.insert("federated-chat".into(), policy);
        let config = Arc::new(config);
        let orchestrator = Arc::new(crate::test_support::orchestrator_stub((*config).clone(), registry.clone()));
        let service = Arc::new(PollingService::new(registry, orchestrator, config, 1, 1));
        let handles = service.spawn_all();
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.stop();
        for h in handles {
            let _ = tokio::time::timeout(Duration::from_secs(2), h).await;
        }

        // Never drained: the disabled-channel skip kept `poll_conversations`
        // from being called at all.
        let remaining = chan.poll_conversations().await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
