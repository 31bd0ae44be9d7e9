// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Identity Keys and Prekey Bundles
//!
//! An identity holds an Ed25519 signing keypair and an X25519 exchange
//! keypair, both derived from one master seed. The responder side of X3DH
//! keeps a [`PreKeyStore`] and publishes [`KeyBundle`]s from it.

use std::collections::BTreeMap;

use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::x3dh::X3DHKeyPair;
use super::ExchangeError;
use crate::crypto::{PublicKey, Signature, SigningKeyPair, HKDF};

/// HKDF info label for the exchange key seed.
const EXCHANGE_SEED_INFO: &[u8] = b"Pigeon_Exchange_Seed";

/// Long-term identity: Ed25519 signing key and X25519 exchange key.
pub struct IdentityKeyPair {
    master_seed: [u8; 32],
    signing_keypair: SigningKeyPair,
    exchange_keypair: X3DHKeyPair,
}

impl Drop for IdentityKeyPair {
    fn drop(&mut self) {
        self.master_seed.zeroize();
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_id", &self.public_id())
            .field("master_seed", &"[REDACTED]")
            .finish()
    }
}

impl IdentityKeyPair {
    /// Creates a new identity from a random master seed.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let seed = ring::rand::generate::<[u8; 32]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        Self::from_seed(seed)
    }

    /// Recreates an identity from its master seed.
    pub fn from_seed(master_seed: [u8; 32]) -> Self {
        let signing_keypair = SigningKeyPair::from_seed(&master_seed);

        // Derive exchange keypair using HKDF with domain separation
        let mut exchange_seed = HKDF::derive_key(Some(&master_seed), &[], EXCHANGE_SEED_INFO);
        let exchange_keypair = X3DHKeyPair::from_bytes(exchange_seed);
        exchange_seed.zeroize();

        IdentityKeyPair {
            master_seed,
            signing_keypair,
            exchange_keypair,
        }
    }

    /// Returns the master seed (for backup).
    pub fn master_seed(&self) -> &[u8; 32] {
        &self.master_seed
    }

    pub fn signing_public_key(&self) -> PublicKey {
        self.signing_keypair.public_key()
    }

    pub fn exchange_keypair(&self) -> &X3DHKeyPair {
        &self.exchange_keypair
    }

    pub fn exchange_public_key(&self) -> &[u8; 32] {
        self.exchange_keypair.public_key()
    }

    /// Returns the public ID (hex fingerprint of signing key).
    pub fn public_id(&self) -> String {
        self.signing_keypair.public_key().fingerprint()
    }

    /// Signs a message using this identity's signing key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_keypair.sign(message)
    }
}

/// Published one-time prekey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimePreKey {
    pub id: u32,
    pub public_key: [u8; 32],
}

/// Public key material an initiator needs to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundle {
    /// Responder's identity exchange key (X25519)
    pub identity_key: [u8; 32],
    /// Responder's identity signing key (Ed25519)
    pub identity_signing_key: PublicKey,
    /// Medium-term signed prekey (X25519)
    pub signed_pre_key: [u8; 32],
    /// Signature over the raw signed prekey bytes
    pub signed_pre_key_signature: Signature,
    /// Optional one-time prekey
    pub one_time_pre_key: Option<OneTimePreKey>,
}

impl KeyBundle {
    /// Checks the signed prekey signature against the identity signing key.
    pub fn verify(&self) -> Result<(), ExchangeError> {
        if self
            .identity_signing_key
            .verify(&self.signed_pre_key, &self.signed_pre_key_signature)
        {
            Ok(())
        } else {
            Err(ExchangeError::SignatureVerificationFailed)
        }
    }
}

/// Responder-side prekey storage.
///
/// Holds the identity, the signed prekey and the unused one-time prekeys.
/// Each one-time prekey is removed once a key agreement consumes it.
pub struct PreKeyStore {
    identity: IdentityKeyPair,
    signed_pre_key: X3DHKeyPair,
    signed_pre_key_signature: Signature,
    one_time_pre_keys: BTreeMap<u32, X3DHKeyPair>,
    next_pre_key_id: u32,
}

impl std::fmt::Debug for PreKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreKeyStore")
            .field("identity", &self.identity)
            .field("one_time_pre_keys", &self.one_time_pre_keys.len())
            .finish()
    }
}

impl PreKeyStore {
    /// Creates a store with a fresh signed prekey and `one_time_count`
    /// one-time prekeys.
    pub fn generate(identity: IdentityKeyPair, one_time_count: u32) -> Self {
        let signed_pre_key = X3DHKeyPair::generate();
        let signed_pre_key_signature = identity.sign(signed_pre_key.public_key());

        let mut store = PreKeyStore {
            identity,
            signed_pre_key,
            signed_pre_key_signature,
            one_time_pre_keys: BTreeMap::new(),
            next_pre_key_id: 1,
        };
        store.add_one_time_pre_keys(one_time_count);
        store
    }

    /// Generates more one-time prekeys and returns their ids.
    pub fn add_one_time_pre_keys(&mut self, count: u32) -> Vec<u32> {
        (0..count)
            .map(|_| {
                let id = self.next_pre_key_id;
                self.next_pre_key_id += 1;
                self.one_time_pre_keys.insert(id, X3DHKeyPair::generate());
                id
            })
            .collect()
    }

    /// Builds a bundle offering the lowest unused one-time prekey, if any.
    pub fn publish_bundle(&self) -> KeyBundle {
        let one_time_pre_key = self
            .one_time_pre_keys
            .first_key_value()
            .map(|(id, pair)| OneTimePreKey {
                id: *id,
                public_key: *pair.public_key(),
            });

        KeyBundle {
            identity_key: *self.identity.exchange_public_key(),
            identity_signing_key: self.identity.signing_public_key(),
            signed_pre_key: *self.signed_pre_key.public_key(),
            signed_pre_key_signature: self.signed_pre_key_signature.clone(),
            one_time_pre_key,
        }
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    /// The signed prekey doubles as the responder's first ratchet keypair.
    pub fn signed_pre_key_pair(&self) -> &X3DHKeyPair {
        &self.signed_pre_key
    }

    pub fn one_time_pre_key(&self, id: u32) -> Option<&X3DHKeyPair> {
        self.one_time_pre_keys.get(&id)
    }

    pub(crate) fn remove_one_time_pre_key(&mut self, id: u32) -> Option<X3DHKeyPair> {
        self.one_time_pre_keys.remove(&id)
    }

    pub fn one_time_pre_key_count(&self) -> usize {
        self.one_time_pre_keys.len()
    }
}
