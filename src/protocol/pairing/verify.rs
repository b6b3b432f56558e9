//! Pair-Verify - prove possession of a registered long-term key
//!
//! Two exchanges on `/pair-verify`:
//!
//! 1. `01 00 00 00 || ephemeral public || long-term public`
//! 2. `00 00 00 00 || AES-CTR(signature(ephemeral || peer ephemeral))`
//!
//! The CTR stream is first advanced past the encrypted tail the device
//! sent with its ephemeral key, so both sides sit at the same offset.

use super::{PairingError, PairingState};
use crate::protocol::crypto::{
    Aes128Ctr, AesMaterial, Ed25519KeyPair, X25519KeyPair, X25519PublicKey, lengths,
};

const VERIFY_START_FLAGS: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const VERIFY_FINISH_FLAGS: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

const AES_KEY_LABEL: &[u8] = b"Pair-Verify-AES-Key";
const AES_IV_LABEL: &[u8] = b"Pair-Verify-AES-IV";

/// Pair-Verify session
///
/// The Curve25519 key is derived from the long-term secret rather than drawn
/// fresh. Receivers expect this exact derivation, so it is kept even though
/// it means the "ephemeral" key is the same on every attempt.
pub struct PairVerify {
    state: PairingState,
    long_term: Ed25519KeyPair,
    ephemeral: X25519KeyPair,
}

impl PairVerify {
    /// Create a session for one handshake attempt
    #[must_use]
    pub fn new(long_term: &Ed25519KeyPair) -> Self {
        let ephemeral = X25519KeyPair::from_secret(long_term.secret_bytes());
        Self {
            state: PairingState::Init,
            long_term: long_term.clone(),
            ephemeral,
        }
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Our Curve25519 public key
    #[must_use]
    pub fn ephemeral_public_key(&self) -> X25519PublicKey {
        self.ephemeral.public_key()
    }

    /// Build the first request body
    ///
    /// # Errors
    ///
    /// Returns [`PairingError::InvalidState`] if the session already started.
    pub fn start(&mut self) -> Result<Vec<u8>, PairingError> {
        self.expect_state(PairingState::Init)?;

        let mut body = Vec::with_capacity(4 + lengths::X25519_PUBLIC_KEY + lengths::ED25519_PUBLIC_KEY);
        body.extend_from_slice(&VERIFY_START_FLAGS);
        body.extend_from_slice(self.ephemeral.public_key().as_bytes());
        body.extend_from_slice(self.long_term.public_key().as_bytes());

        self.state = PairingState::WaitingResponse;
        Ok(body)
    }

    /// Process the device's reply and build the second request body
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order or the reply is shorter than
    /// a public key.
    pub fn finish(&mut self, response: &[u8]) -> Result<Vec<u8>, PairingError> {
        self.expect_state(PairingState::WaitingResponse)?;

        if response.len() < lengths::X25519_PUBLIC_KEY {
            self.state = PairingState::Failed;
            return Err(PairingError::ResponseTooShort {
                expected: lengths::X25519_PUBLIC_KEY,
                actual: response.len(),
            });
        }
        let (peer_bytes, tail) = response.split_at(lengths::X25519_PUBLIC_KEY);
        let peer = X25519PublicKey::from_bytes(peer_bytes)?;

        let shared = self.ephemeral.diffie_hellman(&peer);
        let material = AesMaterial::derive(AES_KEY_LABEL, AES_IV_LABEL, shared.as_bytes());

        let mut signed = Vec::with_capacity(2 * lengths::X25519_PUBLIC_KEY);
        signed.extend_from_slice(self.ephemeral.public_key().as_bytes());
        signed.extend_from_slice(peer.as_bytes());
        let signature = self.long_term.sign(&signed);

        let mut cipher = Aes128Ctr::new(&material.key, &material.iv)?;
        cipher.skip(tail.len());
        let encrypted = cipher.process(&signature.to_bytes());

        let mut body = Vec::with_capacity(4 + encrypted.len());
        body.extend_from_slice(&VERIFY_FINISH_FLAGS);
        body.extend_from_slice(&encrypted);

        self.state = PairingState::Complete;
        Ok(body)
    }

    fn expect_state(&self, expected: PairingState) -> Result<(), PairingError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PairingError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}
