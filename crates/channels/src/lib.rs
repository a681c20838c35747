//! Channel Registry (C3): the adapter trait, the named registry, and
//! three in-process adapter stand-ins for the named transports
//! (web, federated-chat, trading-app-chat). Real wire protocols are
//! out of scope; these adapters exercise the full `ChannelAdapter`
//! trait contract so the registry, gateway, and escalation delivery
//! get real polymorphic dispatch.

mod adapter;
mod federated_chat;
mod registry;
mod trading_app;
mod web;

pub use adapter::{AdapterError, ChannelAdapter};
pub use federated_chat::FederatedChatChannel;
pub use registry::ChannelRegistry;
pub use trading_app::TradingAppChatChannel;
pub use web::WebChannel;
