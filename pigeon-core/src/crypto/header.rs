// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Ratchet Message Header
//!
//! The header travels in the clear next to each ciphertext. Its integrity is
//! protected by feeding `concat(associated_data, header)` to the envelope as
//! authenticated data.
//!
//! Binding layout (all integers big-endian):
//!
//! ```text
//! ad_len (u32) || ad || key_len (u8, = 32) || dh_public (32) || pn (u32) || n (u32)
//! ```
//!
//! The length prefixes make the encoding injective, so two distinct
//! `(associated_data, header)` pairs never produce the same bytes.
//! Associated data longer than `u32::MAX` bytes is rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of an X25519 public key.
const KEY_SIZE: usize = 32;

/// Size of the standalone header encoding.
pub const HEADER_SIZE: usize = KEY_SIZE + 4 + 4;

/// Header codec error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Associated data too large: {0} bytes")]
    AssociatedDataTooLarge(usize),
}

/// Per-message ratchet header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetHeader {
    /// Sender's current ratchet public key
    pub dh_public: [u8; 32],
    /// Number of messages in the sender's previous sending chain
    pub previous_chain_length: u32,
    /// Message number within the current chain (starts at 1)
    pub message_index: u32,
}

impl RatchetHeader {
    pub fn new(dh_public: [u8; 32], previous_chain_length: u32, message_index: u32) -> Self {
        RatchetHeader {
            dh_public,
            previous_chain_length,
            message_index,
        }
    }

    /// Encodes the header alone: `dh_public || pn (u32 BE) || n (u32 BE)`.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..KEY_SIZE].copy_from_slice(&self.dh_public);
        out[KEY_SIZE..KEY_SIZE + 4].copy_from_slice(&self.previous_chain_length.to_be_bytes());
        out[KEY_SIZE + 4..].copy_from_slice(&self.message_index.to_be_bytes());
        out
    }

    /// Decodes a header produced by [`RatchetHeader::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() != HEADER_SIZE {
            return Err(HeaderError::MalformedHeader(format!(
                "expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        let mut reader = Reader::new(bytes);
        let header = reader.header_fields()?;
        Ok(header)
    }
}

/// Big-endian u32 length prefix, or `None` if `len` does not fit.
pub(crate) fn length_prefix(len: usize) -> Option<[u8; 4]> {
    u32::try_from(len).ok().map(u32::to_be_bytes)
}

/// Builds the authenticated-data input for one message.
pub fn concat(associated_data: &[u8], header: &RatchetHeader) -> Result<Vec<u8>, HeaderError> {
    let ad_len = length_prefix(associated_data.len())
        .ok_or(HeaderError::AssociatedDataTooLarge(associated_data.len()))?;

    let mut out = Vec::with_capacity(4 + associated_data.len() + 1 + HEADER_SIZE);
    out.extend_from_slice(&ad_len);
    out.extend_from_slice(associated_data);
    out.push(KEY_SIZE as u8);
    out.extend_from_slice(&header.to_bytes());
    Ok(out)
}

/// Inverse of [`concat`]: returns the header and the associated data.
pub fn parse(bytes: &[u8]) -> Result<(RatchetHeader, Vec<u8>), HeaderError> {
    let mut reader = Reader::new(bytes);

    let ad_len = reader.u32()? as usize;
    let associated_data = reader.take(ad_len)?.to_vec();

    let key_len = reader.take(1)?[0] as usize;
    if key_len != KEY_SIZE {
        return Err(HeaderError::MalformedHeader(format!(
            "unexpected public key length {}",
            key_len
        )));
    }

    let header = reader.header_fields()?;
    reader.finish()?;

    Ok((header, associated_data))
}

/// Bounds-checked cursor over an encoded buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], HeaderError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                HeaderError::MalformedHeader(format!(
                    "truncated at offset {} (need {} more bytes)",
                    self.pos, len
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, HeaderError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn header_fields(&mut self) -> Result<RatchetHeader, HeaderError> {
        let mut dh_public = [0u8; KEY_SIZE];
        dh_public.copy_from_slice(self.take(KEY_SIZE)?);
        let previous_chain_length = self.u32()?;
        let message_index = self.u32()?;
        Ok(RatchetHeader {
            dh_public,
            previous_chain_length,
            message_index,
        })
    }

    fn finish(&self) -> Result<(), HeaderError> {
        if self.pos != self.bytes.len() {
            return Err(HeaderError::MalformedHeader(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}
