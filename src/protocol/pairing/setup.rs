//! Pair-Setup - PIN-based pairing using SRP-6a
//!
//! Registers the client's long-term Ed25519 key with the device. All three
//! exchanges are binary plists posted to `/pair-setup-pin`:
//!
//! 1. `{method: "pin", user}` -> `{salt, pk}`
//! 2. `{pk: A, proof: M1}` -> `{proof: M2}` (checked only in strict mode)
//! 3. `{epk, authTag}`: the long-term public key under AES-128-GCM

use super::{PairingError, PairingState};
use crate::protocol::crypto::{
    Aes128Gcm, AesMaterial, Ed25519KeyPair, SrpClient, SrpGroup, SrpVerifier,
};
use crate::protocol::plist::{self, DictBuilder, PlistValue};

const AES_KEY_LABEL: &[u8] = b"Pair-Setup-AES-Key";
const AES_IV_LABEL: &[u8] = b"Pair-Setup-AES-IV";

/// Pair-Setup session for PIN-based pairing
pub struct PairSetup {
    state: PairingState,
    client_id: String,
    /// Long-term key; its secret doubles as the SRP private value
    long_term: Ed25519KeyPair,
    /// Require a matching server proof after step 2
    strict: bool,
    /// SRP state kept between steps 2 and 3
    srp_verifier: Option<SrpVerifier>,
}

impl PairSetup {
    /// Create a new Pair-Setup session
    #[must_use]
    pub fn new(client_id: impl Into<String>, long_term: &Ed25519KeyPair) -> Self {
        Self {
            state: PairingState::Init,
            client_id: client_id.into(),
            long_term: long_term.clone(),
            strict: false,
            srp_verifier: None,
        }
    }

    /// Validate the server proof `M2` returned by step 2
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Build the step 1 body
    ///
    /// # Errors
    ///
    /// Returns an error if the session already started.
    pub fn start(&mut self) -> Result<Vec<u8>, PairingError> {
        self.expect_state(PairingState::Init)?;

        let body = DictBuilder::new()
            .insert("method", "pin")
            .insert("user", self.client_id.as_str())
            .build();
        let encoded = plist::encode(&body)?;

        self.state = PairingState::WaitingResponse;
        Ok(encoded)
    }

    /// Process the salt and `B` from step 1, returning the step 2 body
    ///
    /// # Errors
    ///
    /// Returns an error if the response is malformed or `B` is degenerate.
    pub fn process_challenge(&mut self, response: &[u8], pin: &str) -> Result<Vec<u8>, PairingError> {
        self.expect_state(PairingState::WaitingResponse)?;

        let result = self.compute_proof(response, pin);
        if result.is_err() {
            self.state = PairingState::Failed;
        }
        result
    }

    fn compute_proof(&mut self, response: &[u8], pin: &str) -> Result<Vec<u8>, PairingError> {
        let challenge = plist::decode(response)?;
        let salt = challenge
            .get("salt")
            .and_then(PlistValue::as_bytes)
            .ok_or(PairingError::MissingField("salt"))?;
        let server_public = challenge
            .get("pk")
            .and_then(PlistValue::as_bytes)
            .ok_or(PairingError::MissingField("pk"))?;

        let client = SrpClient::new(SrpGroup::rfc5054_2048(), &self.long_term.secret_bytes())?;
        let verifier = client.process_challenge(
            self.client_id.as_bytes(),
            pin.as_bytes(),
            salt,
            server_public,
        )?;

        let body = DictBuilder::new()
            .insert("pk", client.public_key())
            .insert("proof", verifier.client_proof())
            .build();
        let encoded = plist::encode(&body)?;

        self.srp_verifier = Some(verifier);
        self.state = PairingState::SrpExchange;
        Ok(encoded)
    }

    /// Process the step 2 reply, returning the step 3 body
    ///
    /// Outside strict mode the reply is not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError::ServerProofMismatch`] in strict mode when the
    /// reply lacks `proof` or it differs from the expected `M2`.
    pub fn process_proof(&mut self, response: &[u8]) -> Result<Vec<u8>, PairingError> {
        self.expect_state(PairingState::SrpExchange)?;

        let result = self.encrypt_public_key(response);
        self.srp_verifier = None;
        self.state = if result.is_ok() {
            PairingState::Complete
        } else {
            PairingState::Failed
        };
        result
    }

    fn encrypt_public_key(&self, response: &[u8]) -> Result<Vec<u8>, PairingError> {
        let verifier = self.srp_verifier.as_ref().ok_or(PairingError::InvalidState {
            expected: PairingState::SrpExchange,
            actual: self.state,
        })?;

        if self.strict {
            let reply = plist::decode(response)?;
            let proof = reply
                .get("proof")
                .and_then(PlistValue::as_bytes)
                .ok_or(PairingError::ServerProofMismatch)?;
            verifier
                .verify_server(proof)
                .map_err(|_| PairingError::ServerProofMismatch)?;
        }

        let mut material = AesMaterial::derive(
            AES_KEY_LABEL,
            AES_IV_LABEL,
            verifier.session_key().as_bytes(),
        );
        material.iv[15] = material.iv[15].wrapping_add(1);

        let cipher = Aes128Gcm::new(&material.key)?;
        let (epk, tag) = cipher.encrypt(&material.iv, self.long_term.public_key().as_bytes())?;

        let body = DictBuilder::new()
            .insert("epk", epk)
            .insert("authTag", &tag[..])
            .build();
        Ok(plist::encode(&body)?)
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
