// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared helpers used across test modules.

#![allow(dead_code)]

pub mod strategies;

use pigeon_core::crypto::*;
use pigeon_core::*;

/// Associated data used by ratchet tests that don't care about identities.
pub const TEST_AD: &[u8] = b"alice|bob";

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Alice (initiator) and Bob (responder) sharing a fixed secret.
pub fn create_test_pair() -> (DoubleRatchetState, DoubleRatchetState) {
    create_test_pair_with(RatchetConfig::default())
}

pub fn create_test_pair_with(config: RatchetConfig) -> (DoubleRatchetState, DoubleRatchetState) {
    // Simulate X3DH: both parties derive the same shared secret
    let shared_secret = SymmetricKey::from_bytes([42u8; 32]);

    // Bob's signed prekey doubles as his first ratchet keypair
    let bob_dh = X3DHKeyPair::generate();
    let bob_public = *bob_dh.public_key();

    let alice =
        DoubleRatchetState::initialize_initiator(&shared_secret, bob_public, config.clone());
    let bob = DoubleRatchetState::initialize_responder(&shared_secret, bob_dh, config);

    (alice, bob)
}

/// Encrypts `count` numbered messages and returns (plaintext, header, ciphertext).
pub fn send_numbered(
    sender: &mut DoubleRatchetState,
    prefix: &str,
    count: usize,
) -> Vec<(Vec<u8>, RatchetHeader, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let plaintext = format!("{} {}", prefix, i).into_bytes();
            let (header, ciphertext) = sender.encrypt(&plaintext, TEST_AD).unwrap();
            (plaintext, header, ciphertext)
        })
        .collect()
}
