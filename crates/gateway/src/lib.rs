//! Gateway composition root: wires C1-C14 into one process. The
//! binary (`src/main.rs`) owns startup/shutdown; everything else here
//! is a library so the wiring can also be exercised from tests (see
//! `test_support`).

pub mod api;
pub mod dispatcher;
pub mod feedback;
pub mod followup;
pub mod gateway;
pub mod hooks;
pub mod learning_bridge;
pub mod orchestrator;
pub mod pii;
pub mod policy;
pub mod poller;
pub mod reactions;
pub mod reactors;
pub mod state;

#[cfg(test)]
mod test_support;

pub use state::AppState;
