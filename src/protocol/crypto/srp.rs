use super::{CryptoError, lengths};
use num_bigint::BigUint;
use num_traits::Zero;
use sha1::{Digest, Sha1};
use zeroize::Zeroize;

/// RFC 5054 2048-bit group prime
const N_2048: [u8; lengths::SRP_MODULUS] = [
    0xac, 0x6b, 0xdb, 0x41, 0x32, 0x4a, 0x9a, 0x9b, 0xf1, 0x66, 0xde, 0x5e,
    0x13, 0x89, 0x58, 0x2f, 0xaf, 0x72, 0xb6, 0x65, 0x19, 0x87, 0xee, 0x07,
    0xfc, 0x31, 0x92, 0x94, 0x3d, 0xb5, 0x60, 0x50, 0xa3, 0x73, 0x29, 0xcb,
    0xb4, 0xa0, 0x99, 0xed, 0x81, 0x93, 0xe0, 0x75, 0x77, 0x67, 0xa1, 0x3d,
    0xd5, 0x23, 0x12, 0xab, 0x4b, 0x03, 0x31, 0x0d, 0xcd, 0x7f, 0x48, 0xa9,
    0xda, 0x04, 0xfd, 0x50, 0xe8, 0x08, 0x39, 0x69, 0xed, 0xb7, 0x67, 0xb0,
    0xcf, 0x60, 0x95, 0x17, 0x9a, 0x16, 0x3a, 0xb3, 0x66, 0x1a, 0x05, 0xfb,
    0xd5, 0xfa, 0xaa, 0xe8, 0x29, 0x18, 0xa9, 0x96, 0x2f, 0x0b, 0x93, 0xb8,
    0x55, 0xf9, 0x79, 0x93, 0xec, 0x97, 0x5e, 0xea, 0xa8, 0x0d, 0x74, 0x0a,
    0xdb, 0xf4, 0xff, 0x74, 0x73, 0x59, 0xd0, 0x41, 0xd5, 0xc3, 0x3e, 0xa7,
    0x1d, 0x28, 0x1e, 0x44, 0x6b, 0x14, 0x77, 0x3b, 0xca, 0x97, 0xb4, 0x3a,
    0x23, 0xfb, 0x80, 0x16, 0x76, 0xbd, 0x20, 0x7a, 0x43, 0x6c, 0x64, 0x81,
    0xf1, 0xd2, 0xb9, 0x07, 0x87, 0x17, 0x46, 0x1a, 0x5b, 0x9d, 0x32, 0xe6,
    0x88, 0xf8, 0x77, 0x48, 0x54, 0x45, 0x23, 0xb5, 0x24, 0xb0, 0xd5, 0x7d,
    0x5e, 0xa7, 0x7a, 0x27, 0x75, 0xd2, 0xec, 0xfa, 0x03, 0x2c, 0xfb, 0xdb,
    0xf5, 0x2f, 0xb3, 0x78, 0x61, 0x60, 0x27, 0x90, 0x04, 0xe5, 0x7a, 0xe6,
    0xaf, 0x87, 0x4e, 0x73, 0x03, 0xce, 0x53, 0x29, 0x9c, 0xcc, 0x04, 0x1c,
    0x7b, 0xc3, 0x08, 0xd8, 0x2a, 0x56, 0x98, 0xf3, 0xa8, 0xd0, 0xc3, 0x82,
    0x71, 0xae, 0x35, 0xf8, 0xe9, 0xdb, 0xfb, 0xb6, 0x94, 0xb5, 0xc8, 0x03,
    0xd8, 0x9f, 0x7a, 0xe4, 0x35, 0xde, 0x23, 0x6d, 0x52, 0x5f, 0x54, 0x75,
    0x9b, 0x65, 0xe3, 0x72, 0xfc, 0xd6, 0x8e, 0xf2, 0x0f, 0xa7, 0x11, 0x1f,
    0x9e, 0x4a, 0xff, 0x73,];

/// SRP-6a group parameters
#[derive(Clone)]
pub struct SrpGroup {
    n: BigUint,
    g: BigUint,
    /// Multiplier `k = H(N || PAD(g))`
    k: BigUint,
}

impl SrpGroup {
    /// The 2048-bit group with generator 2, hashed with SHA-1
    #[must_use]
    pub fn rfc5054_2048() -> Self {
        let n = BigUint::from_bytes_be(&N_2048);
        let g = BigUint::from(2u32);
        let k = BigUint::from_bytes_be(&hash(&[&N_2048, &pad(&g)]));
        Self { n, g, k }
    }
}

impl std::fmt::Debug for SrpGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpGroup")
            .field("bits", &self.n.bits())
            .field("g", &self.g)
            .finish()
    }
}

fn hash(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Left-pad a value to the modulus length
fn pad(value: &BigUint) -> Vec<u8> {
    pad_bytes(&value.to_bytes_be())
}

fn pad_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() >= lengths::SRP_MODULUS {
        return bytes.to_vec();
    }
    let mut padded = vec![0u8; lengths::SRP_MODULUS];
    padded[lengths::SRP_MODULUS - bytes.len()..].copy_from_slice(bytes);
    padded
}

/// `K = H(PAD(S) || 00000000) || H(PAD(S) || 00000001)`
fn interleaved_key(shared: &BigUint) -> Vec<u8> {
    let premaster = pad(shared);
    let mut key = hash(&[&premaster, &[0, 0, 0, 0]]);
    key.extend(hash(&[&premaster, &[0, 0, 0, 1]]));
    key
}

/// `x = H(salt || H(I || ":" || P))`
fn private_x(identity: &[u8], password: &[u8], salt: &[u8]) -> BigUint {
    let inner = hash(&[identity, b":", password]);
    BigUint::from_bytes_be(&hash(&[salt, &inner]))
}

/// `M1 = H((H(N) xor H(g)) || H(I) || s || A || B || K)`
fn client_proof(
    group: &SrpGroup,
    identity: &[u8],
    salt: &[u8],
    a_pub: &[u8],
    b_pub: &[u8],
    key: &[u8],
) -> Vec<u8> {
    let hn = hash(&[&group.n.to_bytes_be()]);
    let hg = hash(&[&group.g.to_bytes_be()]);
    let xor: Vec<u8> = hn.iter().zip(&hg).map(|(a, b)| a ^ b).collect();
    let hi = hash(&[identity]);
    hash(&[&xor, &hi, salt, a_pub, b_pub, key])
}

/// SRP-6a client with a caller-supplied private value
///
/// The private value `a` is the big-endian interpretation of the secret passed
/// to [`SrpClient::new`], so the public value `A` is reproducible for a given
/// secret.
pub struct SrpClient {
    group: SrpGroup,
    a: BigUint,
    public_key: Vec<u8>,
}

impl SrpClient {
    /// Create a client whose private value is derived from `secret`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] if the secret reduces to zero.
    pub fn new(group: SrpGroup, secret: &[u8]) -> Result<Self, CryptoError> {
        let a = BigUint::from_bytes_be(secret);
        if a.is_zero() {
            return Err(CryptoError::SrpError("private value is zero".to_string()));
        }
        let public_key = pad(&group.g.modpow(&a, &group.n));
        Ok(Self {
            group,
            a,
            public_key,
        })
    }

    /// Padded public value `A`
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Feed the server's salt and public value `B`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] if `B` or the scrambler `u` is zero mod N.
    pub fn process_challenge(
        &self,
        identity: &[u8],
        password: &[u8],
        salt: &[u8],
        server_public: &[u8],
    ) -> Result<SrpVerifier, CryptoError> {
        let n = &self.group.n;
        let b_pub = BigUint::from_bytes_be(server_public);
        if (&b_pub % n).is_zero() {
            return Err(CryptoError::SrpError(
                "invalid server public key".to_string(),
            ));
        }

        let u = BigUint::from_bytes_be(&hash(&[&self.public_key, &pad_bytes(server_public)]));
        if u.is_zero() {
            return Err(CryptoError::SrpError("scrambler is zero".to_string()));
        }

        let x = private_x(identity, password, salt);

        // S = (B - k * g^x) ^ (a + u * x) mod N, kept non-negative
        let k_g_x = (&self.group.k * self.group.g.modpow(&x, n)) % n;
        let base = ((&b_pub % n) + n - k_g_x) % n;
        let exponent = &self.a + &u * &x;
        let shared = base.modpow(&exponent, n);

        let session_key = interleaved_key(&shared);
        let m1 = client_proof(
            &self.group,
            identity,
            salt,
            &self.public_key,
            server_public,
            &session_key,
        );
        let m2 = hash(&[&self.public_key, &m1, &session_key]);

        Ok(SrpVerifier {
            m1,
            m2,
            session_key: SessionKey { key: session_key },
        })
    }
}

/// Result of a completed client-side SRP computation
pub struct SrpVerifier {
    m1: Vec<u8>,
    m2: Vec<u8>,
    session_key: SessionKey,
}

impl SrpVerifier {
    /// Client proof `M1`
    #[must_use]
    pub fn client_proof(&self) -> &[u8] {
        &self.m1
    }

    /// Check the server proof `M2 = H(A || M1 || K)`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] if the proof does not match.
    pub fn verify_server(&self, server_proof: &[u8]) -> Result<(), CryptoError> {
        if self.m2.as_slice() == server_proof {
            Ok(())
        } else {
            Err(CryptoError::SrpError(
                "server proof verification failed".to_string(),
            ))
        }
    }

    /// Shared session key `K`
    #[must_use]
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }
}

/// Device side of the exchange
///
/// Holds the password verifier `v = g^x` and the server secret `b`.
pub struct SrpServer {
    group: SrpGroup,
    identity: Vec<u8>,
    salt: Vec<u8>,
    verifier: BigUint,
    b: BigUint,
    public_key: Vec<u8>,
}

impl SrpServer {
    /// Create a server for one identity/password pair
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] if the server secret reduces to zero.
    pub fn new(
        group: SrpGroup,
        identity: &[u8],
        password: &[u8],
        salt: &[u8],
        secret: &[u8],
    ) -> Result<Self, CryptoError> {
        let n = &group.n;
        let b = BigUint::from_bytes_be(secret);
        if b.is_zero() {
            return Err(CryptoError::SrpError("private value is zero".to_string()));
        }
        let verifier = group.g.modpow(&private_x(identity, password, salt), n);
        let b_pub = (&group.k * &verifier + group.g.modpow(&b, n)) % n;
        let public_key = pad(&b_pub);

        Ok(Self {
            group,
            identity: identity.to_vec(),
            salt: salt.to_vec(),
            verifier,
            b,
            public_key,
        })
    }

    /// Padded public value `B`
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Salt to hand to the client
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Check the client's `A` and `M1`, returning `K` and the server proof `M2`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] for a degenerate `A` or a wrong proof.
    pub fn verify_client(
        &self,
        client_public: &[u8],
        client_proof_bytes: &[u8],
    ) -> Result<(SessionKey, Vec<u8>), CryptoError> {
        let n = &self.group.n;
        let a_pub = BigUint::from_bytes_be(client_public);
        if (&a_pub % n).is_zero() {
            return Err(CryptoError::SrpError("invalid client public key".to_string()));
        }
        let a_padded = pad_bytes(client_public);

        let u = BigUint::from_bytes_be(&hash(&[&a_padded, &self.public_key]));
        // S = (A * v^u) ^ b mod N
        let shared = (a_pub * self.verifier.modpow(&u, n)).modpow(&self.b, n);
        let session_key = interleaved_key(&shared);

        let expected = client_proof(
            &self.group,
            &self.identity,
            &self.salt,
            &a_padded,
            &self.public_key,
            &session_key,
        );
        if expected.as_slice() != client_proof_bytes {
            return Err(CryptoError::SrpError(
                "client proof verification failed".to_string(),
            ));
        }

        let m2 = hash(&[&a_padded, &expected, &session_key]);
        Ok((SessionKey { key: session_key }, m2))
    }
}

/// SRP session key `K`, two interleaved SHA-1 digests of the padded premaster secret
pub struct SessionKey {
    key: Vec<u8>,
}

impl SessionKey {
    /// Key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
