//! Opus Translator - German/English machine translation service
//!
//! This library splits documents into sentences, translates them in parallel
//! with pretrained Marian (opus-mt) models and serves the result over HTTP.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod server;

// Re-export key types for convenience
pub use crate::core::{
    config::ServiceConfig,
    errors::TranslationError,
    models::{DeviceKind, Direction, TranslationRequest, TranslationResponse},
    pipeline::TranslationPipeline,
    pool::WorkerPool,
    registry::{ModelLoader, ModelRegistry},
    splitter::{split_sentences, Sentence},
    unit::{SentenceTranslator, TranslationUnit},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
