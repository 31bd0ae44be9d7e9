// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Root and Chain Key Ratcheting
//!
//! The two KDF chains of the Double Ratchet:
//! - the root chain, keyed by DH outputs, yields fresh chain keys
//! - a symmetric chain, stepped once per message, yields message keys

use ring::hmac;
use zeroize::Zeroize;

use super::encryption::SymmetricKey;
use super::kdf::HKDF;

/// HKDF info label for the root chain.
const ROOT_KEY_INFO: &[u8] = b"doubleratchet.KDFRootKey";

/// HMAC input for the message key.
const MESSAGE_KEY_CONSTANT: u8 = 0x01;
/// HMAC input for the next chain key.
const CHAIN_KEY_CONSTANT: u8 = 0x02;

/// Root chain step: `(new_root_key, chain_key) = HKDF(salt = root_key, ikm = dh_output)`.
pub fn derive_root_step(root_key: &[u8; 32], dh_output: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    HKDF::derive_key_pair(Some(root_key), dh_output, ROOT_KEY_INFO)
}

/// Symmetric chain step: returns `(next_chain_key, message_key)`.
///
/// # Panics
///
/// Panics if `chain_key` is not exactly 32 bytes. Callers only ever pass
/// keys produced by this module.
pub fn derive_chain_step(chain_key: &[u8]) -> ([u8; 32], [u8; 32]) {
    assert_eq!(
        chain_key.len(),
        32,
        "chain key must be 32 bytes, got {}",
        chain_key.len()
    );

    let key = hmac::Key::new(hmac::HMAC_SHA256, chain_key);

    let mut message_key = [0u8; 32];
    message_key.copy_from_slice(hmac::sign(&key, &[MESSAGE_KEY_CONSTANT]).as_ref());

    let mut next_chain_key = [0u8; 32];
    next_chain_key.copy_from_slice(hmac::sign(&key, &[CHAIN_KEY_CONSTANT]).as_ref());

    (next_chain_key, message_key)
}

/// A chain key used for symmetric ratcheting.
///
/// Chain keys are never used directly for encryption. They derive:
/// - Message keys (for actual encryption)
/// - The next chain key (for ratcheting forward)
#[derive(Clone)]
pub struct ChainKey {
    key: [u8; 32],
    generation: u32,
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainKey")
            .field("key", &"[REDACTED]")
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for ChainKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl ChainKey {
    /// Creates a new chain key from raw bytes at generation 0.
    pub fn new(key: [u8; 32]) -> Self {
        ChainKey { key, generation: 0 }
    }

    /// Returns how many message keys have been derived from this chain.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Advances the chain by one step, returning a message key and the next chain key.
    pub fn ratchet(&self) -> (MessageKey, ChainKey) {
        let (next_chain_key, message_key) = derive_chain_step(&self.key);

        let message_key = MessageKey {
            key: SymmetricKey::from_bytes(message_key),
            generation: self.generation,
        };

        let next_chain = ChainKey {
            key: next_chain_key,
            generation: self.generation + 1,
        };

        (message_key, next_chain)
    }

    /// Returns a reference to the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// A message encryption key derived from a chain key.
///
/// Message keys are single-use and should be deleted after use
/// to provide forward secrecy.
#[derive(Clone)]
pub struct MessageKey {
    key: SymmetricKey,
    generation: u32,
}

impl std::fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageKey")
            .field("key", &"[REDACTED]")
            .field("generation", &self.generation)
            .finish()
    }
}

impl MessageKey {
    /// Returns the chain position this key was derived at (0-based).
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the underlying symmetric key for encryption.
    pub fn symmetric_key(&self) -> &SymmetricKey {
        &self.key
    }
}
