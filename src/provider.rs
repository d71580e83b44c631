//! Provider adapters: wire formats for the supported language-model APIs.
//!
//! An adapter only builds and interprets messages; sending them is the job of
//! a [`Transport`](crate::transport::Transport). Each provider differs in
//! endpoint, auth scheme, and JSON shape:
//!
//! | Provider | Endpoint | Auth | Answer path |
//! |----------|----------|------|-------------|
//! | `gemini` | `/v1beta/models/{model}:generateContent` | `?key=` query | `candidates[0].content.parts[0].text` |
//! | `openai` | `/v1/chat/completions` | `Authorization: Bearer` | `choices[0].message.content` |
//! | `anthropic` | `/v1/messages` | `x-api-key` + `anthropic-version` | `content[0].text` |
//!
//! Adding a provider means one new [`ProviderAdapter`] and one arm in
//! [`adapter_for`].

use serde_json::{json, Value};

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::models::{Provider, ProviderConfig};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_SYSTEM_PROMPT: &str =
    "You are an AI assistant specialized in document analysis and Q&A.";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// A fully-formed provider call, ready for a transport.
///
/// `Debug` is intentionally not derived: the URL or headers carry the API key.
#[derive(Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ProviderRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn build_request(&self, config: &ProviderConfig, prompt: &str) -> ProviderRequest;

    /// JSON pointer to the answer text inside a successful response.
    fn answer_pointer(&self) -> &'static str;

    /// Pull the answer text out of a decoded response body.
    fn parse_response(&self, json: &Value) -> Result<String> {
        let pointer = self.answer_pointer();
        match json.pointer(pointer) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(_) => Err(Error::response_format(
                self.provider().as_str(),
                format!("{} is not a string", pointer),
            )),
            None => Err(Error::response_format(
                self.provider().as_str(),
                format!("missing {}", pointer),
            )),
        }
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("Content-Type".to_string(), "application/json".to_string())]
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

// ============ Gemini ============

pub struct GeminiAdapter {
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: trim_base(base_url),
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn build_request(&self, config: &ProviderConfig, prompt: &str) -> ProviderRequest {
        ProviderRequest {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url, config.model, config.api_key
            ),
            headers: json_headers(),
            body: json!({
                "contents": [
                    { "parts": [ { "text": prompt } ] }
                ]
            }),
        }
    }

    fn answer_pointer(&self) -> &'static str {
        "/candidates/0/content/parts/0/text"
    }
}

// ============ OpenAI ============

pub struct OpenAIAdapter {
    base_url: String,
}

impl OpenAIAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: trim_base(base_url),
        }
    }
}

impl ProviderAdapter for OpenAIAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn build_request(&self, config: &ProviderConfig, prompt: &str) -> ProviderRequest {
        let mut headers = json_headers();
        headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", config.api_key),
        ));
        ProviderRequest {
            url: format!("{}/v1/chat/completions", self.base_url),
            headers,
            body: json!({
                "model": config.model,
                "messages": [
                    { "role": "system", "content": OPENAI_SYSTEM_PROMPT },
                    { "role": "user", "content": prompt }
                ],
                "max_tokens": MAX_TOKENS,
                "temperature": TEMPERATURE,
            }),
        }
    }

    fn answer_pointer(&self) -> &'static str {
        "/choices/0/message/content"
    }
}

// ============ Anthropic ============

pub struct AnthropicAdapter {
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: trim_base(base_url),
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn build_request(&self, config: &ProviderConfig, prompt: &str) -> ProviderRequest {
        let mut headers = json_headers();
        headers.push(("x-api-key".to_string(), config.api_key.clone()));
        headers.push((
            "anthropic-version".to_string(),
            ANTHROPIC_VERSION.to_string(),
        ));
        ProviderRequest {
            url: format!("{}/v1/messages", self.base_url),
            headers,
            body: json!({
                "model": config.model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
            }),
        }
    }

    fn answer_pointer(&self) -> &'static str {
        "/content/0/text"
    }
}

/// Look up the adapter for a provider, using the configured base URLs.
pub fn adapter_for(provider: Provider, endpoints: &ProvidersConfig) -> Box<dyn ProviderAdapter> {
    match provider {
        Provider::Gemini => Box::new(GeminiAdapter::new(&endpoints.gemini_base_url)),
        Provider::OpenAI => Box::new(OpenAIAdapter::new(&endpoints.openai_base_url)),
        Provider::Anthropic => Box::new(AnthropicAdapter::new(&endpoints.anthropic_base_url)),
    }
}

/// Build the request for `config.provider` against the default endpoints.
pub fn build_request(config: &ProviderConfig, prompt: &str) -> ProviderRequest {
    adapter_for(config.provider, &ProvidersConfig::default()).build_request(config, prompt)
}

/// Parse a raw response body from `provider` into answer text.
///
/// Fails with [`Error::ResponseFormat`] if the body is not JSON or the
/// answer path is absent.
pub fn parse_response(provider: Provider, raw_body: &str) -> Result<String> {
    let json: Value = serde_json::from_str(raw_body)
        .map_err(|e| Error::response_format(provider.as_str(), format!("invalid JSON: {}", e)))?;
    adapter_for(provider, &ProvidersConfig::default()).parse_response(&json)
}
