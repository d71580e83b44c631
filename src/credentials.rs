//! Provider credential management.
//!
//! Holds the active [`ProviderConfig`], validates changes, and persists them
//! to [`LocalStorage`]. Two keys are written on save:
//!
//! - `apiConfig`: `{"provider", "apiKey", "model", "isConfigured"}` with the
//!   key base64-encoded
//! - `gemini_api_key`: the raw key, read back on startup when `apiConfig` is
//!   missing
//!
//! # Security
//!
//! Base64 is an encoding, not encryption. Anyone who can read the storage
//! file can recover the key, and the raw key is stored beside it in
//! plaintext. Protect the storage file with filesystem permissions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::models::{ConnectionStatus, Provider, ProviderConfig};
use crate::provider::adapter_for;
use crate::storage::{LocalStorage, KEY_API_CONFIG, KEY_RAW_API_KEY};
use crate::transport::Transport;

/// Required prefix of a Gemini API key.
pub const GEMINI_KEY_PREFIX: &str = "AIza";

const CONNECTION_TEST_PROMPT: &str = "Reply with the single word OK.";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfig {
    provider: Provider,
    api_key: String,
    model: String,
    is_configured: bool,
}

/// Check a key/model pair for `provider`, returning the trimmed key.
pub fn validate(provider: Provider, api_key: &str, model: &str) -> Result<String> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(Error::Validation("API key must not be empty".to_string()));
    }
    if provider == Provider::Gemini && !key.starts_with(GEMINI_KEY_PREFIX) {
        return Err(Error::Validation(format!(
            "Invalid Gemini API key format. It should start with \"{}\"",
            GEMINI_KEY_PREFIX
        )));
    }
    if !provider.supports_model(model) {
        return Err(Error::Validation(format!(
            "model '{}' is not available for {}. Choose one of: {}",
            model,
            provider,
            provider.models().join(", ")
        )));
    }
    Ok(key.to_string())
}

pub fn encode_key(api_key: &str) -> String {
    STANDARD.encode(api_key.as_bytes())
}

pub fn decode_key(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

pub struct CredentialManager {
    storage: Arc<dyn LocalStorage>,
    current: ProviderConfig,
}

impl CredentialManager {
    /// Start from defaults without reading storage.
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            current: ProviderConfig::default(),
        }
    }

    /// Start from whatever is persisted, falling back to defaults.
    pub fn open(storage: Arc<dyn LocalStorage>) -> Self {
        let mut manager = Self::new(storage);
        manager.load();
        manager
    }

    pub fn current(&self) -> &ProviderConfig {
        &self.current
    }

    /// Validate and persist new settings.
    ///
    /// On any failure the in-memory and stored settings are left untouched.
    pub fn save(&mut self, provider: Provider, api_key: &str, model: &str) -> Result<()> {
        let key = validate(provider, api_key, model)?;

        let stored = StoredConfig {
            provider,
            api_key: encode_key(&key),
            model: model.to_string(),
            is_configured: true,
        };
        let json = serde_json::to_string(&stored).map_err(|e| Error::Storage(e.to_string()))?;
        let previous = self.storage.get(KEY_API_CONFIG);
        self.storage.set(KEY_API_CONFIG, &json)?;
        if let Err(e) = self.storage.set(KEY_RAW_API_KEY, &key) {
            let restored = match &previous {
                Some(old) => self.storage.set(KEY_API_CONFIG, old),
                None => self.storage.remove(KEY_API_CONFIG),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "failed to roll back provider configuration");
            }
            return Err(e);
        }

        self.current = ProviderConfig {
            provider,
            api_key: key,
            model: model.to_string(),
            configured: true,
        };
        info!(provider = %provider, model, "provider configuration saved");
        Ok(())
    }

    /// Rehydrate from storage. Missing or malformed state leaves the current
    /// settings as they are and returns `None`.
    pub fn load(&mut self) -> Option<ProviderConfig> {
        let loaded = match self.storage.get(KEY_API_CONFIG) {
            Some(raw) => decode_stored(&raw),
            None => self.storage.get(KEY_RAW_API_KEY).and_then(|key| from_raw_key(&key)),
        }?;
        self.current = loaded.clone();
        Some(loaded)
    }

    /// Forget all persisted credentials and return to defaults.
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(KEY_API_CONFIG)?;
        self.storage.remove(KEY_RAW_API_KEY)?;
        self.current = ProviderConfig::default();
        Ok(())
    }
}

fn decode_stored(raw: &str) -> Option<ProviderConfig> {
    let stored: StoredConfig = match serde_json::from_str(raw) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "ignoring malformed stored provider configuration");
            return None;
        }
    };
    let Some(api_key) = decode_key(&stored.api_key) else {
        warn!("ignoring stored provider configuration with undecodable key");
        return None;
    };
    let valid = validate(stored.provider, &api_key, &stored.model).is_ok();
    if stored.is_configured && !valid {
        warn!(provider = %stored.provider, "stored provider configuration no longer validates");
    }
    Some(ProviderConfig {
        provider: stored.provider,
        configured: stored.is_configured && valid,
        api_key,
        model: stored.model,
    })
}

fn from_raw_key(key: &str) -> Option<ProviderConfig> {
    let provider = Provider::Gemini;
    let model = provider.default_model();
    let key = validate(provider, key, model).ok()?;
    Some(ProviderConfig {
        provider,
        api_key: key,
        model: model.to_string(),
        configured: true,
    })
}

/// Make one minimal round trip to the provider. Never fails: problems are
/// reported as [`ConnectionStatus::Error`].
pub async fn test_connection(
    config: &ProviderConfig,
    endpoints: &ProvidersConfig,
    transport: &dyn Transport,
) -> ConnectionStatus {
    if !config.is_ready() {
        return ConnectionStatus::Error("API key not configured".to_string());
    }
    let adapter = adapter_for(config.provider, endpoints);
    let request = adapter.build_request(config, CONNECTION_TEST_PROMPT);
    let outcome = match transport.post(&request).await {
        Ok(body) => serde_json::from_str(&body)
            .map_err(|e| Error::response_format(config.provider.as_str(), e.to_string()))
            .and_then(|json| adapter.parse_response(&json)),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(_) => ConnectionStatus::Connected,
        Err(e) => {
            warn!(provider = %config.provider, error = %e, "connection test failed");
            ConnectionStatus::Error(e.to_string())
        }
    }
}

/// Print the active settings with the key masked.
pub fn run_config_show(manager: &CredentialManager) {
    let cfg = manager.current();
    println!("provider:   {}", cfg.provider);
    println!("model:      {}", cfg.model);
    println!("api key:    {}", mask_key(&cfg.api_key));
    println!("configured: {}", cfg.configured);
}

/// Keep the first four characters of a key, hide the rest.
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(none)".to_string();
    }
    let visible: String = key.chars().take(4).collect();
    format!("{}{}", visible, "*".repeat(key.chars().count().saturating_sub(4).min(16)))
}
