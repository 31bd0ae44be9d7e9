// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! X3DH Key Agreement Protocol
//!
//! Extended Triple Diffie-Hellman between an initiator and a responder who
//! published a [`KeyBundle`]. Uses X25519 for Diffie-Hellman key agreement.
//!
//! ```text
//! DH1 = DH(IK_A, SPK_B)
//! DH2 = DH(EK_A, IK_B)
//! DH3 = DH(EK_A, SPK_B)
//! DH4 = DH(EK_A, OPK_B)      (only when a one-time prekey was used)
//! SK  = HKDF-SHA256(salt = 0x00*32, ikm = 0xFF*32 || DH1 || DH2 || DH3 [|| DH4])
//! ```

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::bundle::{IdentityKeyPair, KeyBundle, PreKeyStore};
use super::ExchangeError;
use crate::crypto::{SymmetricKey, HKDF};

/// Domain separator prepended to the DH outputs (X25519 variant).
const KDF_PREFIX: [u8; 32] = [0xFF; 32];

/// Zero salt, one hash length.
const KDF_SALT: [u8; 32] = [0u8; 32];

/// X25519 keypair for X3DH key agreement and the DH ratchet.
#[derive(Clone)]
pub struct X3DHKeyPair {
    /// The static secret key
    secret: StaticSecret,
    /// The public key (cached for efficiency)
    public: PublicKey,
}

impl std::fmt::Debug for X3DHKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X3DHKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl X3DHKeyPair {
    /// Generates a new random X25519 keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);

        X3DHKeyPair { secret, public }
    }

    /// Creates a keypair from a 32-byte seed.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);

        X3DHKeyPair { secret, public }
    }

    /// Returns the public key bytes.
    pub fn public_key(&self) -> &[u8; 32] {
        self.public.as_bytes()
    }

    /// Returns the secret key bytes (for backup/restore).
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Performs Diffie-Hellman key agreement with a public key.
    ///
    /// Returns the 32-byte shared secret.
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        let their_public_key = PublicKey::from(*their_public);
        let shared = self.secret.diffie_hellman(&their_public_key);
        *shared.as_bytes()
    }

    /// Diffie-Hellman that rejects low-order public keys.
    pub fn checked_diffie_hellman(&self, their_public: &[u8; 32]) -> Result<[u8; 32], ExchangeError> {
        let their_public_key = PublicKey::from(*their_public);
        let shared = self.secret.diffie_hellman(&their_public_key);
        if !shared.was_contributory() {
            return Err(ExchangeError::InvalidPublicKey);
        }
        Ok(*shared.as_bytes())
    }
}

/// First message from initiator to responder.
///
/// Carries what the responder needs to recompute the shared secret. The
/// initiator's first ratchet message travels alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialMessage {
    /// Initiator's identity exchange key
    pub identity_key: [u8; 32],
    /// Initiator's ephemeral key
    pub ephemeral_key: [u8; 32],
    /// One-time prekey the initiator consumed, if any
    pub one_time_pre_key_id: Option<u32>,
}

/// Result of [`X3DH::initiate`].
#[derive(Debug)]
pub struct X3DHOutput {
    /// Shared secret, used as the initial ratchet root key
    pub shared_secret: SymmetricKey,
    /// Ephemeral keypair generated for this agreement
    pub ephemeral: X3DHKeyPair,
    /// The responder's signed prekey, which is their initial ratchet key
    pub their_ratchet_key: [u8; 32],
    /// Message to send to the responder
    pub initial_message: InitialMessage,
}

/// X3DH protocol implementation.
///
/// Provides methods for initiating and responding to key agreement.
pub struct X3DH;

impl X3DH {
    /// Initiates key agreement against a published bundle.
    ///
    /// Verifies the signed prekey signature before any DH is computed.
    pub fn initiate(
        our_identity: &IdentityKeyPair,
        bundle: &KeyBundle,
    ) -> Result<X3DHOutput, ExchangeError> {
        bundle.verify()?;

        let ephemeral = X3DHKeyPair::generate();
        let signed_pre_key = bundle.signed_pre_key;

        let mut dh_outputs = Vec::with_capacity(4 * 32);
        dh_outputs.extend_from_slice(
            &our_identity
                .exchange_keypair()
                .checked_diffie_hellman(&signed_pre_key)?,
        );
        dh_outputs.extend_from_slice(&ephemeral.checked_diffie_hellman(&bundle.identity_key)?);
        dh_outputs.extend_from_slice(&ephemeral.checked_diffie_hellman(&signed_pre_key)?);
        if let Some(opk) = &bundle.one_time_pre_key {
            dh_outputs.extend_from_slice(&ephemeral.checked_diffie_hellman(&opk.public_key)?);
        }

        let shared_secret = derive_shared_secret(&mut dh_outputs);

        debug!(
            one_time_pre_key = bundle.one_time_pre_key.is_some(),
            "X3DH initiated"
        );

        let initial_message = InitialMessage {
            identity_key: *our_identity.exchange_public_key(),
            ephemeral_key: *ephemeral.public_key(),
            one_time_pre_key_id: bundle.one_time_pre_key.as_ref().map(|opk| opk.id),
        };

        Ok(X3DHOutput {
            shared_secret,
            ephemeral,
            their_ratchet_key: signed_pre_key,
            initial_message,
        })
    }

    /// Responds to key agreement using our prekey store.
    ///
    /// A referenced one-time prekey is consumed. On failure the store is
    /// left unchanged.
    pub fn respond(
        store: &mut PreKeyStore,
        message: &InitialMessage,
    ) -> Result<SymmetricKey, ExchangeError> {
        let one_time_pre_key = match message.one_time_pre_key_id {
            Some(id) => Some(
                store
                    .one_time_pre_key(id)
                    .ok_or(ExchangeError::UnknownOneTimePreKey(id))?,
            ),
            None => None,
        };

        let signed_pre_key = store.signed_pre_key_pair();
        let mut dh_outputs = Vec::with_capacity(4 * 32);
        dh_outputs.extend_from_slice(&signed_pre_key.checked_diffie_hellman(&message.identity_key)?);
        dh_outputs.extend_from_slice(
            &store
                .identity()
                .exchange_keypair()
                .checked_diffie_hellman(&message.ephemeral_key)?,
        );
        dh_outputs.extend_from_slice(&signed_pre_key.checked_diffie_hellman(&message.ephemeral_key)?);
        if let Some(opk) = one_time_pre_key {
            dh_outputs.extend_from_slice(&opk.checked_diffie_hellman(&message.ephemeral_key)?);
        }

        let shared_secret = derive_shared_secret(&mut dh_outputs);

        if let Some(id) = message.one_time_pre_key_id {
            store.remove_one_time_pre_key(id);
        }

        debug!(
            one_time_pre_key = message.one_time_pre_key_id.is_some(),
            "X3DH responded"
        );

        Ok(shared_secret)
    }
}

/// Runs the X3DH KDF over concatenated DH outputs and wipes them.
fn derive_shared_secret(dh_outputs: &mut Vec<u8>) -> SymmetricKey {
    let mut ikm = Vec::with_capacity(KDF_PREFIX.len() + dh_outputs.len());
    ikm.extend_from_slice(&KDF_PREFIX);
    ikm.extend_from_slice(dh_outputs);

    let key = HKDF::derive_key(Some(&KDF_SALT), &ikm, &[]);

    ikm.zeroize();
    dh_outputs.zeroize();

    SymmetricKey::from_bytes(key)
}
