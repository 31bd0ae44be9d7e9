// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exchange Error Types

use thiserror::Error;

/// Errors that can occur during X3DH key agreement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Signed prekey signature verification failed")]
    SignatureVerificationFailed,

    #[error("Unknown or already used one-time prekey: {0}")]
    UnknownOneTimePreKey(u32),

    #[error("Invalid public key: key agreement produced a non-contributory result")]
    InvalidPublicKey,
}
