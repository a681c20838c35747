use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A capability a channel adapter may advertise. The registry and poller
/// select adapters by capability rather than by concrete type — see the
/// "dynamic dispatch via capabilities" design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCapability {
    ReceiveMessages,
    SendResponses,
    PollConversations,
    ExtractFaqs,
    PersistentConnection,
    TextMessages,
    ChatHistory,
}

/// A set of capabilities advertised by a channel adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitySet(HashSet<ChannelCapability>);

impl CapabilitySet {
    pub fn new(caps: impl IntoIterator<Item = ChannelCapability>) -> Self {
        Self(caps.into_iter().collect())
    }

    pub fn has(&self, cap: ChannelCapability) -> bool {
        self.0.contains(&cap)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelCapability> {
        self.0.iter()
    }
}
