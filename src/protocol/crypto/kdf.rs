use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use super::lengths;

/// AES key and IV derived from a shared secret
///
/// Each half is the first 16 bytes of `SHA-512(label || secret)`.
pub struct AesMaterial {
    /// AES-128 key
    pub key: [u8; lengths::AES_128_KEY],
    /// AES IV / nonce
    pub iv: [u8; lengths::AES_IV],
}

impl AesMaterial {
    /// Derive key and IV using the two context labels
    #[must_use]
    pub fn derive(key_label: &[u8], iv_label: &[u8], secret: &[u8]) -> Self {
        Self {
            key: truncated_digest(key_label, secret),
            iv: truncated_digest(iv_label, secret),
        }
    }
}

impl Drop for AesMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

fn truncated_digest(label: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut hasher = Sha512::new();
    hasher.update(label);
    hasher.update(secret);
    let digest = hasher.finalize();

    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}
