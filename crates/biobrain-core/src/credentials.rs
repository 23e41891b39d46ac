//! Persistence of a user-supplied API key for the direct provider route.
//!
//! The key is stored base64-encoded. This is obfuscation only: anything
//! with access to the browser profile can decode it. It keeps the key out
//! of casual view in devtools and nothing more.

use std::rc::Rc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use biobrain_types::{ChatError, Result};

use crate::ports::StoragePort;

pub const API_KEY_KEY: &str = "biobrain:api_key";
pub const USE_DEFAULT_KEY_KEY: &str = "biobrain:use_default_key";

/// The key the LLM adapter should use right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveKey {
    pub key: String,
    pub using_default: bool,
}

pub struct CredentialStore {
    storage: Rc<dyn StoragePort>,
    default_key: String,
}

impl CredentialStore {
    pub fn new(storage: Rc<dyn StoragePort>, default_key: impl Into<String>) -> Self {
        Self {
            storage,
            default_key: default_key.into(),
        }
    }

    fn default_active(&self) -> ActiveKey {
        ActiveKey {
            key: self.default_key.clone(),
            using_default: true,
        }
    }

    /// Restore the key chosen in a previous visit. Any read or decode
    /// problem falls back to the default key.
    pub async fn load(&self) -> ActiveKey {
        let use_default = matches!(
            self.storage.get(USE_DEFAULT_KEY_KEY).await,
            Ok(Some(ref flag)) if flag == "true"
        );
        if use_default {
            return self.default_active();
        }

        match self.storage.get(API_KEY_KEY).await {
            Ok(Some(stored)) => match decode(&stored) {
                Ok(key) => ActiveKey {
                    key,
                    using_default: false,
                },
                Err(e) => {
                    log::warn!("Stored API key unreadable ({}), using default", e);
                    self.default_active()
                }
            },
            Ok(None) => self.default_active(),
            Err(e) => {
                log::warn!("Failed to read API key: {}", e);
                self.default_active()
            }
        }
    }

    /// Switch to `key`, or back to the default key when it is blank.
    /// With `remember == false` the key is used but any stored copy is removed.
    pub async fn save(&self, key: &str, remember: bool) -> Result<ActiveKey> {
        let key = key.trim();
        if key.is_empty() {
            self.storage.set(USE_DEFAULT_KEY_KEY, "true").await?;
            self.storage.remove(API_KEY_KEY).await?;
            return Ok(self.default_active());
        }

        self.storage.set(USE_DEFAULT_KEY_KEY, "false").await?;
        if remember {
            self.storage.set(API_KEY_KEY, &STANDARD.encode(key)).await?;
        } else {
            self.storage.remove(API_KEY_KEY).await?;
        }
        Ok(ActiveKey {
            key: key.to_string(),
            using_default: false,
        })
    }

    /// Whether a key is currently remembered in storage.
    pub async fn has_stored_key(&self) -> bool {
        matches!(self.storage.get(API_KEY_KEY).await, Ok(Some(_)))
    }
}

fn decode(stored: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(stored.trim())
        .map_err(|e| ChatError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ChatError::Serialization(e.to_string()))
}
