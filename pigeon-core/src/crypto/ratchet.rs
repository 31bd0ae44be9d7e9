// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Double Ratchet Protocol
//!
//! Implements the Double Ratchet algorithm for end-to-end encrypted messaging
//! with forward secrecy and break-in recovery. Based on the Signal Protocol.
//!
//! The Double Ratchet combines:
//! - A DH ratchet (using X25519) for break-in recovery
//! - Symmetric ratchets (chain keys) for forward secrecy
//!
//! Message indices in headers start at 1: the n-th message of a chain is
//! encrypted with the n-th key derived from that chain.
//!
//! Decryption works on a draft copy of the state and only commits it once
//! the message has authenticated. A failed decrypt leaves the state exactly
//! as it was.

use std::collections::HashMap;

use ring::digest;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroize;

use super::chain::{derive_root_step, ChainKey, MessageKey};
use super::config::{RatchetConfig, RemoteKeyPolicy};
use super::encryption::{decrypt, encrypt, EncryptionError, SymmetricKey};
use super::header::{concat, HeaderError, RatchetHeader};
use crate::exchange::X3DHKeyPair;

/// Double Ratchet error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatchetError {
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    #[error("Skip limit exceeded: {requested} keys requested (max {max_skip})")]
    SkipLimitExceeded { requested: u32, max_skip: u32 },

    #[error("Cannot send: no sending chain (responder must receive first)")]
    NoSendingChain,

    #[error("No receiving chain")]
    NoReceivingChain,

    #[error("Unknown remote ratchet key")]
    UnknownRemoteKey,

    #[error("Duplicate message (already decrypted)")]
    DuplicateMessage,

    #[error("Malformed header: {0}")]
    MalformedHeader(String),
}

/// Identifies a skipped message key: the remote ratchet key of its chain and
/// the message index within that chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkippedKeyId {
    pub dh_public: [u8; 32],
    pub index: u32,
}

impl SkippedKeyId {
    pub fn new(dh_public: [u8; 32], index: u32) -> Self {
        SkippedKeyId { dh_public, index }
    }
}

/// Hashed view of every field of a ratchet state.
///
/// Secrets appear only as SHA-256 digests, so two states can be compared
/// (e.g. before and after a rejected message) without exposing key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatchetFingerprint {
    pub root_key: String,
    pub sending_chain: Option<String>,
    pub receiving_chain: Option<String>,
    pub our_public_key: [u8; 32],
    pub their_public_key: Option<[u8; 32]>,
    pub dh_generation: u32,
    pub send_count: u32,
    pub recv_count: u32,
    pub previous_send_chain_length: u32,
    pub skipped_keys: String,
}

/// The Double Ratchet state machine.
///
/// Maintains the cryptographic state for secure bidirectional communication
/// with a single peer. Callers serialize access (one encrypt/decrypt in
/// flight per session).
pub struct DoubleRatchetState {
    /// Root key for deriving new chain keys
    root_key: [u8; 32],
    /// Our current DH keypair
    our_dh: X3DHKeyPair,
    /// Their current DH public key (None until known)
    their_dh: Option<[u8; 32]>,
    /// Sending chain key
    send_chain: Option<ChainKey>,
    /// Receiving chain key
    recv_chain: Option<ChainKey>,
    /// Number of DH ratchet steps performed
    dh_generation: u32,
    /// Number of messages sent in current sending chain
    send_message_count: u32,
    /// Number of message keys derived in current receiving chain
    recv_message_count: u32,
    /// Previous sending chain length (for message header)
    previous_send_chain_length: u32,
    /// Stored skipped message keys
    skipped_keys: HashMap<SkippedKeyId, MessageKey>,
    config: RatchetConfig,
}

impl std::fmt::Debug for DoubleRatchetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleRatchetState")
            .field("dh_generation", &self.dh_generation)
            .field("send_message_count", &self.send_message_count)
            .field("recv_message_count", &self.recv_message_count)
            .field("skipped_keys_count", &self.skipped_keys.len())
            .finish()
    }
}

impl Drop for DoubleRatchetState {
    fn drop(&mut self) {
        self.root_key.zeroize();
        self.skipped_keys.clear();
    }
}

impl DoubleRatchetState {
    /// Initialize as the initiator (Alice) after X3DH.
    ///
    /// The initiator knows the responder's ratchet public key (the signed
    /// prekey) and can send immediately.
    pub fn initialize_initiator(
        shared_secret: &SymmetricKey,
        their_dh_public: [u8; 32],
        config: RatchetConfig,
    ) -> Self {
        let our_dh = X3DHKeyPair::generate();

        let mut dh_output = our_dh.diffie_hellman(&their_dh_public);
        let (root_key, send_chain_key) = derive_root_step(shared_secret.as_bytes(), &dh_output);
        dh_output.zeroize();

        DoubleRatchetState {
            root_key,
            our_dh,
            their_dh: Some(their_dh_public),
            send_chain: Some(ChainKey::new(send_chain_key)),
            recv_chain: None,
            dh_generation: 0,
            send_message_count: 0,
            recv_message_count: 0,
            previous_send_chain_length: 0,
            skipped_keys: HashMap::new(),
            config,
        }
    }

    /// Initialize as the responder (Bob) after X3DH.
    ///
    /// The responder waits for the initiator's first message before it can send.
    pub fn initialize_responder(
        shared_secret: &SymmetricKey,
        our_dh: X3DHKeyPair,
        config: RatchetConfig,
    ) -> Self {
        DoubleRatchetState {
            root_key: *shared_secret.as_bytes(),
            our_dh,
            their_dh: None,
            send_chain: None,
            recv_chain: None,
            dh_generation: 0,
            send_message_count: 0,
            recv_message_count: 0,
            previous_send_chain_length: 0,
            skipped_keys: HashMap::new(),
            config,
        }
    }

    /// Initialize as a responder that already knows the initiator's first
    /// ratchet public key.
    ///
    /// Under [`RemoteKeyPolicy::Strict`] the first message must carry exactly
    /// this key.
    pub fn initialize_responder_pinned(
        shared_secret: &SymmetricKey,
        our_dh: X3DHKeyPair,
        their_dh_public: [u8; 32],
        config: RatchetConfig,
    ) -> Self {
        let mut state = Self::initialize_responder(shared_secret, our_dh, config);
        state.their_dh = Some(their_dh_public);
        state
    }

    /// Returns our current DH public key.
    pub fn our_public_key(&self) -> [u8; 32] {
        *self.our_dh.public_key()
    }

    /// Returns the last known remote ratchet public key.
    pub fn their_public_key(&self) -> Option<[u8; 32]> {
        self.their_dh
    }

    /// Whether `encrypt` can be called.
    pub fn can_send(&self) -> bool {
        self.send_chain.is_some()
    }

    /// Encrypt a message using the Double Ratchet.
    ///
    /// Advances the sending chain and returns the header to send along with
    /// the ciphertext. The header is authenticated together with
    /// `associated_data`.
    pub fn encrypt(
        &mut self,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(RatchetHeader, Vec<u8>), RatchetError> {
        let send_chain = self
            .send_chain
            .as_ref()
            .ok_or(RatchetError::NoSendingChain)?;

        let (message_key, next_chain) = send_chain.ratchet();
        let message_index = self.send_message_count + 1;

        let header = RatchetHeader::new(
            self.our_public_key(),
            self.previous_send_chain_length,
            message_index,
        );
        let ciphertext = encrypt(
            message_key.symmetric_key(),
            plaintext,
            &concat(associated_data, &header)?,
        )?;

        self.send_chain = Some(next_chain);
        self.send_message_count = message_index;

        Ok((header, ciphertext))
    }

    /// Decrypt a received message using the Double Ratchet.
    ///
    /// Handles DH ratchet steps and out-of-order messages. On any error the
    /// state is unchanged, so the caller may retry with corrected input.
    pub fn decrypt(
        &mut self,
        header: &RatchetHeader,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, RatchetError> {
        let result = self.decrypt_inner(header, ciphertext, associated_data);
        if let Err(ref err) = result {
            warn!(
                message_index = header.message_index,
                previous_chain_length = header.previous_chain_length,
                error = %err,
                "Rejected ratchet message"
            );
        }
        result
    }

    fn decrypt_inner(
        &mut self,
        header: &RatchetHeader,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, RatchetError> {
        if header.message_index == 0 {
            return Err(RatchetError::MalformedHeader(
                "message index must start at 1".into(),
            ));
        }

        let bound_data = concat(associated_data, header)?;

        // Try skipped keys first
        let skipped_id = SkippedKeyId::new(header.dh_public, header.message_index);
        if let Some(key) = self.skipped_keys.get(&skipped_id) {
            let plaintext = decrypt(key.symmetric_key(), ciphertext, &bound_data)?;
            self.skipped_keys.remove(&skipped_id);
            debug!(
                message_index = header.message_index,
                "Decrypted with skipped message key"
            );
            return Ok(plaintext);
        }

        let mut draft = self.draft();
        let plaintext = draft.ratchet_decrypt(header, ciphertext, &bound_data)?;
        *self = draft;
        Ok(plaintext)
    }

    /// Ratchet forward as needed and decrypt. Runs on a draft state.
    fn ratchet_decrypt(
        &mut self,
        header: &RatchetHeader,
        ciphertext: &[u8],
        bound_data: &[u8],
    ) -> Result<Vec<u8>, RatchetError> {
        let their_dh = match (self.their_dh, self.config.remote_key_policy) {
            (Some(key), _) => key,
            (None, RemoteKeyPolicy::TrustOnFirstUse) => {
                debug!("Adopting remote ratchet key from first message");
                self.their_dh = Some(header.dh_public);
                header.dh_public
            }
            (None, RemoteKeyPolicy::Strict) => return Err(RatchetError::UnknownRemoteKey),
        };

        if self.recv_chain.is_none() {
            // Responder bootstrap: the pinned key must match under Strict.
            if self.config.remote_key_policy == RemoteKeyPolicy::Strict
                && self.send_chain.is_none()
                && header.dh_public != their_dh
            {
                return Err(RatchetError::UnknownRemoteKey);
            }
            self.dh_ratchet_step(&header.dh_public);
        } else if header.dh_public != their_dh {
            self.skip_message_keys(header.previous_chain_length)?;
            self.dh_ratchet_step(&header.dh_public);
        } else if header.message_index <= self.recv_message_count {
            return Err(RatchetError::DuplicateMessage);
        }

        // The claimed index itself is bounded, not just the keys before it
        self.check_skip_limit(header.message_index)?;
        self.skip_message_keys(header.message_index - 1)?;

        let recv_chain = self
            .recv_chain
            .as_ref()
            .ok_or(RatchetError::NoReceivingChain)?;
        let (message_key, next_chain) = recv_chain.ratchet();
        self.recv_chain = Some(next_chain);
        self.recv_message_count += 1;

        Ok(decrypt(message_key.symmetric_key(), ciphertext, bound_data)?)
    }

    /// Advance the receiving chain until `until` keys have been derived,
    /// caching each message key for later out-of-order delivery.
    fn skip_message_keys(&mut self, until: u32) -> Result<(), RatchetError> {
        self.check_skip_limit(until)?;

        // No chain yet, nothing to skip
        let Some(their_dh) = self.their_dh else {
            return Ok(());
        };
        let Some(mut chain) = self.recv_chain.take() else {
            return Ok(());
        };

        let start = self.recv_message_count;
        while self.recv_message_count < until {
            let (message_key, next_chain) = chain.ratchet();
            chain = next_chain;
            self.recv_message_count += 1;
            self.skipped_keys.insert(
                SkippedKeyId::new(their_dh, self.recv_message_count),
                message_key,
            );
        }
        self.recv_chain = Some(chain);

        if self.recv_message_count > start {
            debug!(
                skipped = self.recv_message_count - start,
                stored = self.skipped_keys.len(),
                "Cached skipped message keys"
            );
        }

        Ok(())
    }

    /// Reject positions more than `max_skip` past the receive counter.
    fn check_skip_limit(&self, position: u32) -> Result<(), RatchetError> {
        let max_skip = self.config.max_skip;
        if self.recv_message_count.saturating_add(max_skip) < position {
            return Err(RatchetError::SkipLimitExceeded {
                requested: position - self.recv_message_count,
                max_skip,
            });
        }
        Ok(())
    }

    /// Perform a DH ratchet step towards a new remote ratchet key.
    fn dh_ratchet_step(&mut self, their_new_public: &[u8; 32]) {
        self.previous_send_chain_length = self.send_message_count;
        self.send_message_count = 0;
        self.recv_message_count = 0;
        self.their_dh = Some(*their_new_public);

        // DH with their new key and our current key -> new receiving chain
        let mut dh_recv = self.our_dh.diffie_hellman(their_new_public);
        let (root_key, recv_chain_key) = derive_root_step(&self.root_key, &dh_recv);
        dh_recv.zeroize();
        self.root_key = root_key;
        self.recv_chain = Some(ChainKey::new(recv_chain_key));

        // Replacing our keypair drops the old secret
        self.our_dh = X3DHKeyPair::generate();

        // DH with their key and our NEW key -> new sending chain
        let mut dh_send = self.our_dh.diffie_hellman(their_new_public);
        let (root_key, send_chain_key) = derive_root_step(&self.root_key, &dh_send);
        dh_send.zeroize();
        self.root_key = root_key;
        self.send_chain = Some(ChainKey::new(send_chain_key));

        self.dh_generation += 1;

        debug!(
            dh_generation = self.dh_generation,
            previous_chain_length = self.previous_send_chain_length,
            "Performed DH ratchet step"
        );
    }

    /// Deep copy used as the working state of a decrypt.
    fn draft(&self) -> DoubleRatchetState {
        DoubleRatchetState {
            root_key: self.root_key,
            our_dh: self.our_dh.clone(),
            their_dh: self.their_dh,
            send_chain: self.send_chain.clone(),
            recv_chain: self.recv_chain.clone(),
            dh_generation: self.dh_generation,
            send_message_count: self.send_message_count,
            recv_message_count: self.recv_message_count,
            previous_send_chain_length: self.previous_send_chain_length,
            skipped_keys: self.skipped_keys.clone(),
            config: self.config.clone(),
        }
    }

    /// Returns the number of skipped keys currently stored.
    pub fn skipped_keys_count(&self) -> usize {
        self.skipped_keys.len()
    }

    /// Returns the number of DH ratchet steps performed.
    pub fn dh_generation(&self) -> u32 {
        self.dh_generation
    }

    /// Messages sent in the current sending chain.
    pub fn send_count(&self) -> u32 {
        self.send_message_count
    }

    /// Message keys derived in the current receiving chain.
    pub fn recv_count(&self) -> u32 {
        self.recv_message_count
    }

    /// Length of the previous sending chain.
    pub fn previous_send_chain_length(&self) -> u32 {
        self.previous_send_chain_length
    }

    pub fn config(&self) -> &RatchetConfig {
        &self.config
    }

    /// Returns a digest of the complete state.
    pub fn fingerprint(&self) -> RatchetFingerprint {
        let mut skipped: Vec<(&SkippedKeyId, &MessageKey)> = self.skipped_keys.iter().collect();
        skipped.sort_by_key(|(id, _)| **id);

        let mut ctx = digest::Context::new(&digest::SHA256);
        for (id, key) in skipped {
            ctx.update(&id.dh_public);
            ctx.update(&id.index.to_be_bytes());
            ctx.update(key.symmetric_key().as_bytes());
        }

        RatchetFingerprint {
            root_key: digest_hex(&self.root_key),
            sending_chain: self.send_chain.as_ref().map(|c| digest_hex(c.as_bytes())),
            receiving_chain: self.recv_chain.as_ref().map(|c| digest_hex(c.as_bytes())),
            our_public_key: self.our_public_key(),
            their_public_key: self.their_dh,
            dh_generation: self.dh_generation,
            send_count: self.send_message_count,
            recv_count: self.recv_message_count,
            previous_send_chain_length: self.previous_send_chain_length,
            skipped_keys: hex::encode(ctx.finish()),
        }
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, bytes))
}
