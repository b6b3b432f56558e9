//! Storage for client credentials

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::Credentials;

/// Abstract storage interface for the client identity
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load stored credentials, if any
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be read or parsed
    async fn load(&self) -> Result<Option<Credentials>, StorageError>;

    /// Persist credentials, replacing any previous ones
    ///
    /// # Errors
    ///
    /// Returns error if storage fails
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// In-memory credential storage (non-persistent)
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with credentials
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.credentials.read().await.clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        *self.credentials.write().await = Some(credentials.clone());
        Ok(())
    }
}

/// JSON file credential storage
///
/// The document is `{"clientId": "...", "seed": "<64 hex chars>"}`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store credentials at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the JSON document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&self.path).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let credentials = tokio::task::spawn_blocking(move || serde_json::from_slice(&bytes))
            .await
            .map_err(|e| StorageError::Serialization(format!("Deserialization task failed: {e}")))?
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(Some(credentials))
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let credentials = credentials.clone();
        let bytes = tokio::task::spawn_blocking(move || serde_json::to_vec_pretty(&credentials))
            .await
            .map_err(|e| StorageError::Serialization(format!("Serialization task failed: {e}")))?
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}
