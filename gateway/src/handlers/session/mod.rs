//! Duplex session relay
//!
//! `GET /ws/session` carries JSON control frames and binary PCM audio from the
//! browser, and every session event back to it.
//!
//! ## Client → Server
//!
//! - **ping**: answered with `pong`
//! - **vad_interrupt**: interrupts this session and pauses audio on every connection
//! - **mic_press**, **record_end**, **tts_end**: drive the conversation directly
//! - **confirm**: spoken yes/no for a pending money proposal
//! - **Binary frames**: PCM audio for streaming transcription
//!
//! ## Server → Client
//!
//! - **hello** first, then **state_change**, **confirm_request**, **speak_sentence**,
//!   **pause_audio**, **confirm_cancelled**, **pong**, **transcript_partial**,
//!   **transcript_final**, **error**

mod handler;
pub mod hub;
pub mod messages;

pub use handler::session_handler;
pub use hub::ConnectionHub;
