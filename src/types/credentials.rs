use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::AirPlayError;
use crate::protocol::crypto::Ed25519KeyPair;
use crate::protocol::pairing::CredentialStore;

/// Length of a generated client identifier
pub const CLIENT_ID_LEN: usize = 16;

/// Length of the identity seed
pub const SEED_LEN: usize = 32;

const CLIENT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Persistent client identity
///
/// Only the identifier and the seed are stored; the Ed25519 key pair is
/// re-derived from the seed whenever it is needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    client_id: String,
    #[serde(serialize_with = "seed_to_hex", deserialize_with = "seed_from_hex")]
    seed: [u8; SEED_LEN],
}

impl Credentials {
    /// Generate a random identifier and seed
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let client_id = (0..CLIENT_ID_LEN)
            .map(|_| char::from(CLIENT_ID_ALPHABET[rng.gen_range(0..CLIENT_ID_ALPHABET.len())]))
            .collect();
        let mut seed = [0u8; SEED_LEN];
        rng.fill(&mut seed);
        Self { client_id, seed }
    }

    /// Build credentials from stored parts
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::InvalidCredentials`] if the identifier is empty
    /// or not alphanumeric.
    pub fn new(client_id: impl Into<String>, seed: [u8; SEED_LEN]) -> Result<Self, AirPlayError> {
        let client_id = client_id.into();
        if client_id.is_empty() || !client_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AirPlayError::InvalidCredentials {
                message: format!("client id {client_id:?} must be non-empty and alphanumeric"),
            });
        }
        Ok(Self { client_id, seed })
    }

    /// Build credentials from an identifier and a hex-encoded seed
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::InvalidCredentials`] for a malformed seed or identifier.
    pub fn from_hex(client_id: impl Into<String>, seed_hex: &str) -> Result<Self, AirPlayError> {
        let seed = decode_hex_seed(seed_hex).map_err(|e| AirPlayError::InvalidCredentials {
            message: format!("seed must be {} hex characters: {e}", SEED_LEN * 2),
        })?;
        Self::new(client_id, seed)
    }

    /// Load credentials from `store`, generating and saving new ones on a miss
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Storage`] if the store cannot be read or written.
    pub async fn load_or_generate(store: &dyn CredentialStore) -> Result<Self, AirPlayError> {
        if let Some(credentials) = store.load().await? {
            tracing::debug!(client_id = %credentials.client_id, "Loaded stored credentials");
            return Ok(credentials);
        }

        let credentials = Self::generate();
        store.save(&credentials).await?;
        tracing::info!(client_id = %credentials.client_id, "Generated new credentials");
        Ok(credentials)
    }

    /// Client identifier, used as the SRP identity
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Raw seed
    #[must_use]
    pub fn seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }

    /// Seed as lower-case hex
    #[must_use]
    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    /// Derive the long-term Ed25519 key pair
    #[must_use]
    pub fn key_pair(&self) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&self.seed)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("seed", &"<redacted>")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

fn decode_hex_seed(seed_hex: &str) -> Result<[u8; SEED_LEN], hex::FromHexError> {
    let mut seed = [0u8; SEED_LEN];
    hex::decode_to_slice(seed_hex.trim(), &mut seed)?;
    Ok(seed)
}

fn seed_to_hex<S: Serializer>(seed: &[u8; SEED_LEN], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(seed))
}

fn seed_from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; SEED_LEN], D::Error> {
    let seed_hex = String::deserialize(deserializer)?;
    decode_hex_seed(&seed_hex).map_err(serde::de::Error::custom)
}
