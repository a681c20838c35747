//! Shared types for the support gateway core: wire models, the error
//! taxonomy, coordination-store key formats, escalation records,
//! configuration, and localization tables. Every other gateway crate
//! depends on this one; it depends on nothing gateway-specific.

pub mod capability;
pub mod config;
pub mod error;
pub mod escalation;
pub mod keys;
pub mod localization;
pub mod models;
pub mod trace;

pub use capability::{CapabilitySet, ChannelCapability};
pub use error::{Error, ErrorCode, GatewayError, Result};
pub use escalation::{DeliveryStatus, Escalation, EscalationStatus};
pub use models::{
    representative_source_type, CanonicalInboundEvent, ChannelKind, ChatMessage, ChatRole,
    DocumentReference, HealthStatus, IncomingMessage, MessagePriority, OutgoingMessage,
    ReactionEvent, ReactionRating, ResponseMetadata, RoutingAction, SentMessageRecord, UserContext,
};
pub use trace::TraceEvent;
