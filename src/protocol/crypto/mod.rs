//! Cryptographic primitives for `AirPlay` pairing and verification

mod aes;
mod ed25519;
mod error;
mod kdf;
mod srp;
mod x25519;

pub use self::aes::{Aes128Ctr, Aes128Gcm};
pub use self::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use self::error::CryptoError;
pub use self::kdf::AesMaterial;
pub use self::srp::{SessionKey, SrpClient, SrpGroup, SrpServer, SrpVerifier};
pub use self::x25519::{X25519KeyPair, X25519PublicKey, X25519SharedSecret};

/// Length of various cryptographic values
pub mod lengths {
    /// Ed25519 seed / secret key length
    pub const ED25519_SEED: usize = 32;
    /// Ed25519 public key length
    pub const ED25519_PUBLIC_KEY: usize = 32;
    /// Ed25519 signature length
    pub const ED25519_SIGNATURE: usize = 64;
    /// X25519 public key length
    pub const X25519_PUBLIC_KEY: usize = 32;
    /// X25519 shared secret length
    pub const X25519_SHARED_SECRET: usize = 32;
    /// AES-128 key length
    pub const AES_128_KEY: usize = 16;
    /// AES block / IV length
    pub const AES_IV: usize = 16;
    /// AES-GCM nonce length used by pair-setup
    pub const AES_GCM_NONCE: usize = 16;
    /// AES-GCM authentication tag length
    pub const AES_GCM_TAG: usize = 16;
    /// SRP group modulus length in bytes (2048-bit group)
    pub const SRP_MODULUS: usize = 256;
    /// SRP session key length (two SHA-1 digests)
    pub const SRP_SESSION_KEY: usize = 40;
}
