//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::TranslationError;

/// Translation direction (source -> target language pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// German to English
    #[serde(rename = "de-en")]
    DeEn,
    /// English to German
    #[serde(rename = "en-de")]
    EnDe,
}

impl Direction {
    /// Every supported direction
    pub const ALL: [Direction; 2] = [Direction::DeEn, Direction::EnDe];

    /// Wire name, e.g. `de-en`
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::DeEn => "de-en",
            Direction::EnDe => "en-de",
        }
    }

    /// ISO 639-1 code of the target language
    pub fn target_lang(&self) -> &'static str {
        match self {
            Direction::DeEn => "en",
            Direction::EnDe => "de",
        }
    }

    /// Hugging Face identifier of the pretrained model
    pub fn model_id(&self) -> &'static str {
        match self {
            Direction::DeEn => "Helsinki-NLP/opus-mt-de-en",
            Direction::EnDe => "Helsinki-NLP/opus-mt-en-de",
        }
    }

    /// Short sentence used to warm up a freshly loaded model
    pub fn warm_up_text(&self) -> &'static str {
        match self {
            Direction::DeEn => "Hallo Welt.",
            Direction::EnDe => "Hello world.",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "de-en" => Ok(Direction::DeEn),
            "en-de" => Ok(Direction::EnDe),
            other => Err(TranslationError::InvalidDirection {
                direction: other.to_string(),
            }),
        }
    }
}

/// Execution device a model is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Host CPU
    Cpu,
    /// First CUDA device
    Gpu,
}

impl DeviceKind {
    /// Device key used in config and routes
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Gpu => "gpu",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "gpu" | "cuda" => Ok(DeviceKind::Gpu),
            other => Err(TranslationError::ConfigError {
                message: format!("unknown device '{}'", other),
            }),
        }
    }
}

/// Translation request as received over HTTP.
///
/// `direction` stays a plain string so that unsupported or missing values
/// reach the router and are reported as [`TranslationError::InvalidDirection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default)]
    pub direction: String,
}

impl TranslationRequest {
    /// Parse the requested direction
    pub fn direction(&self) -> Result<Direction, TranslationError> {
        self.direction.parse()
    }
}

/// Successful translation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translation: String,
}
