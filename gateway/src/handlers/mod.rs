//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `confirm` - Spoken confirmation of money proposals
//! - `events` - Machine event injection by the agent
//! - `interrupt` - Browser VAD interrupt
//! - `session` - Duplex session WebSocket and connection hub
//! - `peer` - Session keys derived from the request's network origin

pub mod api;
pub mod confirm;
pub mod events;
pub mod interrupt;
pub mod peer;
pub mod session;

pub use session::{ConnectionHub, session_handler};
