use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key, IV, nonce or tag had the wrong size
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Signature did not verify
    #[error("invalid signature")]
    InvalidSignature,

    /// Public key bytes are not a valid point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// AEAD decryption or tag check failed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// AEAD encryption failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// SRP parameter or proof failure
    #[error("SRP error: {0}")]
    SrpError(String),
}
