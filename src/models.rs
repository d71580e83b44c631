//! Core data models used throughout docchat.
//!
//! These types represent the uploads, documents, provider settings, search
//! results, and chat turns that flow through the ingestion and query pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A file handed to the pipeline, before extraction.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Extracted document held by the [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub summary: Option<String>,
}

/// Language-model services docchat can talk to.
///
/// [`Provider::Gemini`] is the default and the only one with a key-format
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::OpenAI, Provider::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    /// Models offered for this provider. The first entry is the default.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"],
            Provider::OpenAI => &["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo"],
            Provider::Anthropic => &["claude-3-opus", "claude-3-sonnet", "claude-3-haiku"],
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.models().contains(&model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(format!(
                "unknown provider '{}'. Must be gemini, openai, or anthropic.",
                other
            )),
        }
    }
}

/// Credentials and model selection for the active provider.
///
/// `configured` is only ever set by
/// [`CredentialManager`](crate::credentials::CredentialManager) after the
/// key and model pass validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub configured: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            api_key: String::new(),
            model: Provider::Gemini.default_model().to_string(),
            configured: false,
        }
    }
}

impl ProviderConfig {
    /// Whether a provider call may be attempted with these settings.
    pub fn is_ready(&self) -> bool {
        self.configured && !self.api_key.is_empty()
    }
}

/// Outcome of a connection test. Never an error: failures are reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
}

/// A local search hit. Recomputed per query, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub document_id: String,
    pub snippet: String,
    /// Match density heuristic in `0..=100`.
    pub relevance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only chat transcript.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_str() {
        for p in Provider::ALL {
            assert_eq!(p.as_str().parse::<Provider>().unwrap(), p);
        }
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::OpenAI).unwrap(), "\"openai\"");
        let p: Provider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(p, Provider::Anthropic);
    }

    #[test]
    fn default_config_is_unconfigured_gemini() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.provider, Provider::Gemini);
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert!(!cfg.configured);
        assert!(!cfg.is_ready());
    }

    #[test]
    fn model_sets_are_disjoint() {
        assert!(Provider::OpenAI.supports_model("gpt-4"));
        assert!(!Provider::Gemini.supports_model("gpt-4"));
        assert!(!Provider::Anthropic.supports_model("gemini-1.5-pro"));
    }
}
