// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Associated Data
//!
//! Binds both parties' identity keys and usernames into every ratchet
//! message. The sender's fields always come first, so the sender's
//! [`AssociatedData::encode_for_encryption`] and the receiver's
//! [`AssociatedData::encode_for_decryption`] yield the same bytes.
//!
//! Each party is encoded as `identity_key (32) || name_len (u32 BE) || name`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::header::length_prefix;

/// Associated data error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssociatedDataError {
    #[error("Username too long: {0} bytes")]
    UsernameTooLong(usize),
}

/// Identity binding for one session, seen from the local side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedData {
    pub local_identity_key: [u8; 32],
    pub remote_identity_key: [u8; 32],
    pub local_username: String,
    pub remote_username: String,
}

impl AssociatedData {
    pub fn new(
        local_identity_key: [u8; 32],
        local_username: impl Into<String>,
        remote_identity_key: [u8; 32],
        remote_username: impl Into<String>,
    ) -> Self {
        AssociatedData {
            local_identity_key,
            remote_identity_key,
            local_username: local_username.into(),
            remote_username: remote_username.into(),
        }
    }

    /// Bytes for messages we send (local first).
    pub fn encode_for_encryption(&self) -> Result<Vec<u8>, AssociatedDataError> {
        let mut out = Vec::new();
        encode_party(&mut out, &self.local_identity_key, &self.local_username)?;
        encode_party(&mut out, &self.remote_identity_key, &self.remote_username)?;
        Ok(out)
    }

    /// Bytes for messages we receive (remote first).
    pub fn encode_for_decryption(&self) -> Result<Vec<u8>, AssociatedDataError> {
        let mut out = Vec::new();
        encode_party(&mut out, &self.remote_identity_key, &self.remote_username)?;
        encode_party(&mut out, &self.local_identity_key, &self.local_username)?;
        Ok(out)
    }

    /// The same session seen from the other side.
    pub fn reversed(&self) -> Self {
        AssociatedData {
            local_identity_key: self.remote_identity_key,
            remote_identity_key: self.local_identity_key,
            local_username: self.remote_username.clone(),
            remote_username: self.local_username.clone(),
        }
    }
}

fn encode_party(
    out: &mut Vec<u8>,
    identity_key: &[u8; 32],
    username: &str,
) -> Result<(), AssociatedDataError> {
    let name_len = length_prefix(username.len())
        .ok_or(AssociatedDataError::UsernameTooLong(username.len()))?;
    out.extend_from_slice(identity_key);
    out.extend_from_slice(&name_len);
    out.extend_from_slice(username.as_bytes());
    Ok(())
}
