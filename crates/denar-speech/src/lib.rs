//! Spoken announcements for detected Macedonian currency.
//!
//! This crate provides:
//! - Announcement text in Macedonian or English
//! - The ElevenLabs text-to-speech client
//! - [`Announcer`], which combines the two

pub mod announcement;
pub mod announcer;
pub mod client;
pub mod config;
pub mod error;

pub use announcement::{compose_announcement, Language};
pub use announcer::{Announcement, Announcer};
pub use client::{ElevenLabsClient, SpeechSynthesizer};
pub use config::{SpeechConfig, VoiceSettings};
pub use error::{SpeechError, SpeechResult};
