// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Prekey Signatures
//!
//! The identity's Ed25519 key signs the raw bytes of each signed prekey so an
//! initiator can check that a fetched bundle belongs to the claimed identity.

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use serde_with::Bytes;

/// Ed25519 keypair owned by an identity.
///
/// Holds no copy of its seed; the identity's master seed is the backup.
pub struct SigningKeyPair(Ed25519KeyPair);

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningKeyPair")
            .field(&self.public_key().fingerprint())
            .finish()
    }
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let seed = ring::rand::generate::<[u8; 32]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        // Any 32 bytes form a valid Ed25519 seed
        let keypair =
            Ed25519KeyPair::from_seed_unchecked(seed).expect("Seed should be valid for Ed25519");
        SigningKeyPair(keypair)
    }

    pub fn public_key(&self) -> PublicKey {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(self.0.public_key().as_ref());
        PublicKey(bytes)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(self.0.sign(message).as_ref());
        Signature(bytes)
    }
}

/// Ed25519 verification key published in a bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex of the key, used as a public identity id.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.0)
    }

    /// True if `signature` is this key's signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        UnparsedPublicKey::new(&ED25519, &self.0)
            .verify(message, &signature.0)
            .is_ok()
    }
}

/// Detached Ed25519 signature.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] [u8; 64]);

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}
