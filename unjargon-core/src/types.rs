//! Core types shared across the simplification pipeline.

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical section headers every result must contain exactly once, in order.
pub const HEADER_SUMMARY: &str = "1. Summary";
pub const HEADER_MAIN_POINTS: &str = "2. Main Points";
pub const HEADER_DEFINITIONS: &str = "3. Helpful Definitions";

/// Placeholder body for a section the model left empty.
pub const EMPTY_SECTION: &str = "N/A";

/// Subject domain selecting the guidance block of the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    General,
    Legal,
    Medical,
    Government,
    Financial,
    Education,
    Nutrition,
}

impl Domain {
    /// Lenient parse: unknown or empty values fall back to `General`.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "legal" => Domain::Legal,
            "medical" => Domain::Medical,
            "government" => Domain::Government,
            "financial" => Domain::Financial,
            "education" => Domain::Education,
            "nutrition" => Domain::Nutrition,
            _ => Domain::General,
        }
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Domain::from_param(&raw))
    }
}

/// Target reading level selecting the style directive of the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Professional,
}

impl Level {
    /// Lenient parse: unknown or empty values fall back to `Intermediate`.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Level::Beginner,
            "advanced" => Level::Advanced,
            "professional" => Level::Professional,
            _ => Level::Intermediate,
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Level::from_param(&raw))
    }
}

/// A request to the upstream chat-completions API.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction carrying the three-section output contract.
    pub system: String,
    /// User prompt with level/domain guidance and the source text.
    pub prompt: String,
    /// Optional inline image payload (a `data:` URL) attached to the user turn.
    pub image_data_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            image_data_url: None,
            temperature: 0.0,
            max_tokens: 450,
        }
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image_data_url = Some(data_url.into());
        self
    }
}
