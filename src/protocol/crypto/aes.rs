use super::{CryptoError, lengths};
use aes::Aes128;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{AeadInPlace, AesGcm, KeyInit};
use ctr::cipher::{KeyIvInit, StreamCipher};

/// Full 128-bit big-endian counter, so the keystream never wraps inside the IV's low half
type Aes128CtrImpl = ctr::Ctr128BE<Aes128>;

/// AES-GCM with the 16-byte nonce used by pair-setup
type Aes128Gcm16 = AesGcm<Aes128, U16>;

/// AES-128-CTR stream cipher used by pair-verify
pub struct Aes128Ctr {
    cipher: Aes128CtrImpl,
}

impl Aes128Ctr {
    /// Create cipher with 16-byte key and 16-byte IV
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for a wrong key or IV size.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != lengths::AES_128_KEY {
            return Err(CryptoError::InvalidKeyLength {
                expected: lengths::AES_128_KEY,
                actual: key.len(),
            });
        }
        if iv.len() != lengths::AES_IV {
            return Err(CryptoError::InvalidKeyLength {
                expected: lengths::AES_IV,
                actual: iv.len(),
            });
        }

        let cipher =
            Aes128CtrImpl::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_128_KEY,
                actual: key.len(),
            })?;

        Ok(Self { cipher })
    }

    /// Encrypt/decrypt in place (XOR with keystream)
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }

    /// Encrypt/decrypt, returning new buffer
    #[must_use]
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut output = data.to_vec();
        self.apply_keystream(&mut output);
        output
    }

    /// Consume `len` bytes of keystream without producing output
    pub fn skip(&mut self, len: usize) {
        let mut scratch = vec![0u8; len];
        self.cipher.apply_keystream(&mut scratch);
    }
}

/// AES-128-GCM with a 16-byte nonce and detached tag
pub struct Aes128Gcm {
    cipher: Aes128Gcm16,
}

impl Aes128Gcm {
    /// Create cipher with 16-byte key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for a wrong key size.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes128Gcm16::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: lengths::AES_128_KEY,
            actual: key.len(),
        })?;

        Ok(Self { cipher })
    }

    /// Encrypt without associated data, returning `(ciphertext, tag)`
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong nonce size or if encryption fails.
    pub fn encrypt(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; lengths::AES_GCM_TAG]), CryptoError> {
        check_nonce(nonce)?;

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut buffer)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut tag_bytes = [0u8; lengths::AES_GCM_TAG];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    /// Decrypt without associated data, checking the detached tag
    ///
    /// # Errors
    ///
    /// Returns an error for wrong sizes or an authentication failure.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce)?;
        if tag.len() != lengths::AES_GCM_TAG {
            return Err(CryptoError::InvalidKeyLength {
                expected: lengths::AES_GCM_TAG,
                actual: tag.len(),
            });
        }

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                b"",
                &mut buffer,
                GenericArray::from_slice(tag),
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        Ok(buffer)
    }
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() == lengths::AES_GCM_NONCE {
        Ok(())
    } else {
        Err(CryptoError::InvalidKeyLength {
            expected: lengths::AES_GCM_NONCE,
            actual: nonce.len(),
        })
    }
}
