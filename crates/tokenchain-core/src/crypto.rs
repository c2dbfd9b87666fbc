//! Signing capabilities consumed by the block engines.
//!
//! DID key management lives outside this crate. Blocks only need an opaque
//! "sign these bytes as DID x" and "does this signature by DID x verify"
//! capability, expressed by the traits below. [`Ed25519Did`] and
//! [`KeyRing`] are a self-contained implementation used by tests and
//! tooling.

use std::collections::HashMap;
use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::canonical::sha3_256;
use crate::error::{CoreError, Result};

/// Private-key signing on behalf of one DID.
pub trait DidSigner {
    /// The DID this signer signs as.
    fn did(&self) -> &str;

    /// Sign a message with the DID's private key.
    fn pvt_sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Verification of private-key signatures for arbitrary DIDs.
pub trait DidVerifier {
    /// Returns `Ok(false)` for a well-formed but wrong signature and `Err`
    /// when the DID is unknown or the signature cannot be parsed.
    fn pvt_verify(&self, did: &str, message: &[u8], signature: &[u8]) -> Result<bool>;
}

/// Two-slot signing used by smart-contract blocks: a share signature and a
/// key signature over the same hash.
pub trait ShareSigner: DidSigner {
    /// Returns `(share_signature, key_signature)`.
    fn share_sign(&self, hash: &str) -> Result<(Vec<u8>, Vec<u8>)>;
}

/// Verification counterpart of [`ShareSigner`].
pub trait ShareVerifier {
    fn share_verify(
        &self,
        did: &str,
        hash: &str,
        share_signature: &[u8],
        key_signature: &[u8],
    ) -> Result<bool>;
}

/// An Ed25519-backed DID holding a private key and a derived share key.
#[derive(Clone)]
pub struct Ed25519Did {
    did: String,
    key: SigningKey,
    share_key: SigningKey,
}

impl Ed25519Did {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let key = SigningKey::generate(&mut rng);
        Self::from_signing_key(key)
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let mut share_seed = Vec::with_capacity(40);
        share_seed.extend_from_slice(b"share-v1");
        share_seed.extend_from_slice(&key.to_bytes());
        let share_key = SigningKey::from_bytes(&sha3_256(&share_seed));
        let did = did_for_key(&key.verifying_key());
        Self {
            did,
            key,
            share_key,
        }
    }

    /// Public key of the private-signature slot.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Public key of the share-signature slot.
    pub fn share_verifying_key(&self) -> VerifyingKey {
        self.share_key.verifying_key()
    }
}

impl fmt::Debug for Ed25519Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Did({})", self.did)
    }
}

impl DidSigner for Ed25519Did {
    fn did(&self) -> &str {
        &self.did
    }

    fn pvt_sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

impl ShareSigner for Ed25519Did {
    fn share_sign(&self, hash: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let share = self.share_key.sign(hash.as_bytes()).to_bytes().to_vec();
        let key = self.key.sign(hash.as_bytes()).to_bytes().to_vec();
        Ok((share, key))
    }
}

/// Derive the DID string for a public key.
pub fn did_for_key(key: &VerifyingKey) -> String {
    let digest = sha3_256(key.as_bytes());
    format!("did:tc:{}", hex::encode(&digest[..20]))
}

/// Public keys for a set of DIDs.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: HashMap<String, (VerifyingKey, VerifyingKey)>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the public half of an identity.
    pub fn insert(&mut self, did: &Ed25519Did) {
        self.keys.insert(
            did.did.clone(),
            (did.verifying_key(), did.share_verifying_key()),
        );
    }

    pub fn contains(&self, did: &str) -> bool {
        self.keys.contains_key(did)
    }

    fn lookup(&self, did: &str) -> Result<&(VerifyingKey, VerifyingKey)> {
        self.keys
            .get(did)
            .ok_or_else(|| CoreError::Crypto(format!("unknown did {did}")))
    }
}

impl FromIterator<Ed25519Did> for KeyRing {
    fn from_iter<I: IntoIterator<Item = Ed25519Did>>(iter: I) -> Self {
        let mut ring = KeyRing::new();
        for did in iter {
            ring.insert(&did);
        }
        ring
    }
}

fn parse_signature(bytes: &[u8]) -> Result<Signature> {
    let arr: [u8; 64] = bytes
        .try_into()
        .map_err(|_| CoreError::Crypto(format!("invalid signature length {}", bytes.len())))?;
    Ok(Signature::from_bytes(&arr))
}

impl DidVerifier for KeyRing {
    fn pvt_verify(&self, did: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
        let (key, _) = self.lookup(did)?;
        let sig = parse_signature(signature)?;
        Ok(key.verify(message, &sig).is_ok())
    }
}

impl ShareVerifier for KeyRing {
    fn share_verify(
        &self,
        did: &str,
        hash: &str,
        share_signature: &[u8],
        key_signature: &[u8],
    ) -> Result<bool> {
        let (key, share_key) = self.lookup(did)?;
        let share = parse_signature(share_signature)?;
        let pvt = parse_signature(key_signature)?;
        Ok(share_key.verify(hash.as_bytes(), &share).is_ok()
            && key.verify(hash.as_bytes(), &pvt).is_ok())
    }
}
