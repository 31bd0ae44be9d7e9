// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HKDF Key Derivation Function
//!
//! Implements HMAC-based Extract-and-Expand Key Derivation Function (HKDF)
//! as specified in RFC 5869, on top of `ring::hmac`.
//!
//! SHA-256 is used for the ratchet root chain and X3DH. SHA-512 is used by
//! the message envelope to stretch a message key into cipher key, MAC key
//! and IV.

use ring::hmac;
use thiserror::Error;

/// KDF error types.
#[derive(Error, Debug)]
pub enum KDFError {
    #[error("Output length exceeds maximum (255 * hash_len)")]
    OutputTooLong,
}

/// HKDF key derivation.
///
/// The plain methods (`extract`, `expand`, `derive`, `derive_key`,
/// `derive_key_pair`) use HMAC-SHA256. The `*_with` methods take the
/// HMAC algorithm explicitly.
pub struct HKDF;

impl HKDF {
    /// HKDF Extract with HMAC-SHA256.
    ///
    /// PRK = HMAC-SHA256(salt, IKM)
    ///
    /// If salt is None, uses a string of HashLen zeros.
    pub fn extract(salt: Option<&[u8]>, ikm: &[u8]) -> [u8; 32] {
        let tag = Self::extract_with(hmac::HMAC_SHA256, salt, ikm);
        let mut prk = [0u8; 32];
        prk.copy_from_slice(&tag);
        prk
    }

    /// HKDF Expand with HMAC-SHA256.
    ///
    /// Maximum output length is 255 * 32 = 8160 bytes.
    pub fn expand(prk: &[u8; 32], info: &[u8], length: usize) -> Result<Vec<u8>, KDFError> {
        Self::expand_with(hmac::HMAC_SHA256, prk, info, length)
    }

    /// Full HKDF-SHA256: Extract-then-Expand in one step.
    pub fn derive(
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KDFError> {
        Self::derive_with(hmac::HMAC_SHA256, salt, ikm, info, length)
    }

    /// Derives a fixed-size 32-byte key.
    pub fn derive_key(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> [u8; 32] {
        let prk = Self::extract(salt, ikm);
        // expand for exactly 32 bytes can't fail
        let okm = Self::expand(&prk, info, 32).expect("32 bytes is valid length");
        let mut key = [0u8; 32];
        key.copy_from_slice(&okm);
        key
    }

    /// Derives two 32-byte keys from the same input.
    ///
    /// Used by the root chain for deriving (root_key, chain_key) pairs.
    pub fn derive_key_pair(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> ([u8; 32], [u8; 32]) {
        let prk = Self::extract(salt, ikm);
        let okm = Self::expand(&prk, info, 64).expect("64 bytes is valid length");
        let mut key1 = [0u8; 32];
        let mut key2 = [0u8; 32];
        key1.copy_from_slice(&okm[..32]);
        key2.copy_from_slice(&okm[32..]);
        (key1, key2)
    }

    /// HKDF Extract for an arbitrary HMAC algorithm.
    ///
    /// A missing salt is replaced by HashLen zero bytes.
    pub fn extract_with(algorithm: hmac::Algorithm, salt: Option<&[u8]>, ikm: &[u8]) -> Vec<u8> {
        let hash_len = algorithm.digest_algorithm().output_len();
        let default_salt = vec![0u8; hash_len];
        let salt_bytes = salt.unwrap_or(&default_salt);
        let key = hmac::Key::new(algorithm, salt_bytes);
        hmac::sign(&key, ikm).as_ref().to_vec()
    }

    /// HKDF Expand for an arbitrary HMAC algorithm.
    ///
    /// OKM = T(1) || T(2) || ... || T(N)
    /// where T(i) = HMAC(PRK, T(i-1) || info || i)
    pub fn expand_with(
        algorithm: hmac::Algorithm,
        prk: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KDFError> {
        let hash_len = algorithm.digest_algorithm().output_len();
        if length > 255 * hash_len {
            return Err(KDFError::OutputTooLong);
        }

        if length == 0 {
            return Ok(Vec::new());
        }

        let key = hmac::Key::new(algorithm, prk);
        let n = length.div_ceil(hash_len);

        let mut okm = Vec::with_capacity(n * hash_len);
        let mut t_prev: Vec<u8> = Vec::new();

        for i in 1..=n {
            let mut ctx = hmac::Context::with_key(&key);
            ctx.update(&t_prev);
            ctx.update(info);
            ctx.update(&[i as u8]);
            t_prev = ctx.sign().as_ref().to_vec();
            okm.extend_from_slice(&t_prev);
        }

        okm.truncate(length);
        Ok(okm)
    }

    /// Extract-then-Expand for an arbitrary HMAC algorithm.
    pub fn derive_with(
        algorithm: hmac::Algorithm,
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KDFError> {
        let prk = Self::extract_with(algorithm, salt, ikm);
        Self::expand_with(algorithm, &prk, info, length)
    }
}
