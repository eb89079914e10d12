//! subgen - subtitle generation for video files
//!
//! Audio extraction with ffmpeg, transcription with whisper-cpp, contextual
//! batch translation through ollama and SRT output, driven either from the
//! command line or as background tasks behind an HTTP API.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod server;
pub mod subtitle;
pub mod task;
pub mod transcribe;
pub mod transcript;
pub mod translate;
pub mod workflow;
