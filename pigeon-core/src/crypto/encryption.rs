// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Envelope (AES-256-CBC + HMAC-SHA512)
//!
//! Authenticated encryption of a single ratchet message under a message key.
//!
//! The message key is stretched with HKDF-SHA512 into an AES-256 key, an
//! HMAC key and a CBC IV. The plaintext is PKCS#7 padded and encrypted, then
//! `HMAC-SHA512(auth_key, associated_data || ciphertext)` is appended.
//!
//! Ciphertext format: `cbc_ciphertext || tag (64 bytes)`
//!
//! The tag is always verified before any decryption or unpadding happens.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::hmac;
use ring::rand::SystemRandom;
use thiserror::Error;
use zeroize::Zeroize;

use super::kdf::HKDF;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encryption error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Ciphertext too short")]
    CiphertextTooShort,
    #[error("Authentication failed: data may be corrupted or wrong key")]
    AuthenticationFailed,
    #[error("Ciphertext is not block aligned")]
    MalformedCiphertext,
    #[error("Invalid padding")]
    InvalidPadding,
}

/// HKDF info label for envelope key material.
const ENVELOPE_INFO: &[u8] = b"doubleratchet.Encrypt";

/// AES-256 key size.
const CIPHER_KEY_SIZE: usize = 32;
/// HMAC-SHA512 key size.
const AUTH_KEY_SIZE: usize = 32;
/// CBC IV size (one AES block).
const IV_SIZE: usize = 16;
/// AES block size.
const BLOCK_SIZE: usize = 16;
/// HMAC-SHA512 tag size.
pub const TAG_SIZE: usize = 64;

/// Inputs shorter than the derived key material are rejected outright.
const MIN_INPUT_SIZE: usize = CIPHER_KEY_SIZE + AUTH_KEY_SIZE + IV_SIZE;

/// 256-bit symmetric encryption key.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SymmetricKey {
    /// Generates a new random symmetric key.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let key = ring::rand::generate::<[u8; 32]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        SymmetricKey { bytes: key }
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SymmetricKey { bytes }
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Key material derived from a message key.
struct EnvelopeKeys {
    cipher_key: [u8; CIPHER_KEY_SIZE],
    auth_key: hmac::Key,
    iv: [u8; IV_SIZE],
}

impl Drop for EnvelopeKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.iv.zeroize();
    }
}

impl EnvelopeKeys {
    fn derive(key: &SymmetricKey) -> Self {
        let mut okm = HKDF::derive_with(
            hmac::HMAC_SHA512,
            None,
            key.as_bytes(),
            ENVELOPE_INFO,
            MIN_INPUT_SIZE,
        )
        .expect("80 bytes is valid length");

        let mut cipher_key = [0u8; CIPHER_KEY_SIZE];
        cipher_key.copy_from_slice(&okm[..CIPHER_KEY_SIZE]);
        let auth_key = hmac::Key::new(
            hmac::HMAC_SHA512,
            &okm[CIPHER_KEY_SIZE..CIPHER_KEY_SIZE + AUTH_KEY_SIZE],
        );
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&okm[CIPHER_KEY_SIZE + AUTH_KEY_SIZE..]);
        okm.zeroize();

        EnvelopeKeys {
            cipher_key,
            auth_key,
            iv,
        }
    }

    fn tag(&self, associated_data: &[u8], ciphertext: &[u8]) -> hmac::Tag {
        let mut ctx = hmac::Context::with_key(&self.auth_key);
        ctx.update(associated_data);
        ctx.update(ciphertext);
        ctx.sign()
    }
}

/// Encrypts and authenticates `plaintext`, binding `associated_data`.
///
/// Output format: `cbc_ciphertext || HMAC-SHA512 tag`
pub fn encrypt(
    key: &SymmetricKey,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    seal_blocks(key, pad(plaintext), associated_data)
}

/// Verifies and decrypts an envelope produced by [`encrypt`].
pub fn decrypt(
    key: &SymmetricKey,
    input: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if input.len() < MIN_INPUT_SIZE {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (ciphertext, tag) = input.split_at(input.len() - TAG_SIZE);
    let keys = EnvelopeKeys::derive(key);

    // hmac::verify compares in constant time
    let mut authenticated = Vec::with_capacity(associated_data.len() + ciphertext.len());
    authenticated.extend_from_slice(associated_data);
    authenticated.extend_from_slice(ciphertext);
    hmac::verify(&keys.auth_key, &authenticated, tag)
        .map_err(|_| EncryptionError::AuthenticationFailed)?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(EncryptionError::MalformedCiphertext);
    }

    let mut buffer = ciphertext.to_vec();
    Aes256CbcDec::new_from_slices(&keys.cipher_key, &keys.iv)
        .map_err(|_| EncryptionError::MalformedCiphertext)?
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| EncryptionError::MalformedCiphertext)?;

    unpad(buffer)
}

/// Encrypts already block-aligned data and appends the tag.
fn seal_blocks(
    key: &SymmetricKey,
    mut padded: Vec<u8>,
    associated_data: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let keys = EnvelopeKeys::derive(key);
    let len = padded.len();

    Aes256CbcEnc::new_from_slices(&keys.cipher_key, &keys.iv)
        .map_err(|_| EncryptionError::EncryptionFailed)?
        .encrypt_padded_mut::<NoPadding>(&mut padded, len)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let tag = keys.tag(associated_data, &padded);
    padded.extend_from_slice(tag.as_ref());
    Ok(padded)
}

/// PKCS#7 padding to the AES block size. Always adds at least one byte.
fn pad(plaintext: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(plaintext.len() + pad_len);
    padded.extend_from_slice(plaintext);
    padded.resize(plaintext.len() + pad_len, pad_len as u8);
    padded
}

fn unpad(mut padded: Vec<u8>) -> Result<Vec<u8>, EncryptionError> {
    let pad_len = match padded.last() {
        Some(&byte) => byte as usize,
        None => return Err(EncryptionError::InvalidPadding),
    };

    if pad_len == 0 || pad_len > padded.len() {
        return Err(EncryptionError::InvalidPadding);
    }
    if padded[padded.len() - pad_len..]
        .iter()
        .any(|&b| b as usize != pad_len)
    {
        return Err(EncryptionError::InvalidPadding);
    }

    padded.truncate(padded.len() - pad_len);
    Ok(padded)
}
