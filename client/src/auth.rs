//! Access token lookup.
//!
//! The realtime socket authenticates with the bearer access token embedded in
//! its URL. Tokens live in client-side storage under [`TOKEN_STORAGE_KEY`] and
//! are re-read on every connect attempt, so a logout between reconnects stops
//! the retry loop.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Key under which the token pair is persisted
pub const TOKEN_STORAGE_KEY: &str = "tokens";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Source of the access token used to open the realtime socket
pub trait TokenStore: Send + Sync {
    /// The current access token, or None when the user is not authenticated
    fn access_token(&self) -> Option<String>;
}

/// In-process token storage
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }

    pub fn set(&self, tokens: TokenPair) {
        if let Ok(mut slot) = self.tokens.write() {
            *slot = Some(tokens);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.tokens.write() {
            *slot = None;
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .ok()?
            .as_ref()
            .map(|t| t.access.clone())
            .filter(|access| !access.is_empty())
    }
}

/// Token storage backed by a JSON document on disk.
///
/// The document is a flat key/value object; the token pair sits under
/// [`TOKEN_STORAGE_KEY`]. Other keys are preserved on write.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the token pair; a missing file or key means no tokens
    pub fn load(&self) -> Result<Option<TokenPair>, ClientError> {
        let document = match self.read_document()? {
            Some(document) => document,
            None => return Ok(None),
        };

        match document.get(TOKEN_STORAGE_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| self.malformed(e.to_string())),
        }
    }

    pub fn store(&self, tokens: &TokenPair) -> Result<(), ClientError> {
        let mut document = self.read_document()?.unwrap_or_default();
        document.insert(TOKEN_STORAGE_KEY.to_string(), serde_json::to_value(tokens)?);
        self.write_document(&document)
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        let Some(mut document) = self.read_document()? else {
            return Ok(());
        };
        document.remove(TOKEN_STORAGE_KEY);
        self.write_document(&document)
    }

    fn read_document(&self) -> Result<Option<Map<String, Value>>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ClientError::TokenStorage {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(self.malformed("expected a JSON object".to_string())),
            Err(e) => Err(self.malformed(e.to_string())),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), ClientError> {
        let body = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, body).map_err(|source| ClientError::TokenStorage {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn malformed(&self, reason: String) -> ClientError {
        ClientError::MalformedTokens {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        match self.load() {
            Ok(tokens) => tokens.map(|t| t.access).filter(|access| !access.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored tokens");
                None
            }
        }
    }
}
