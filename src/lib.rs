//! Kiru - Prompt-Driven Video Editing
//!
//! Turns a natural-language editing request into one structured
//! instruction via an LLM, validates it, and carries it out on local
//! video files with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod interpret;
pub mod media;
pub mod plan;
pub mod registry;
pub mod server;
pub mod timeparse;
pub mod validate;
pub mod workflow;
