// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Establishment Module
//!
//! X3DH key agreement against published prekey bundles.

mod bundle;
mod error;
mod x3dh;

pub use bundle::{IdentityKeyPair, KeyBundle, OneTimePreKey, PreKeyStore};
pub use error::ExchangeError;
pub use x3dh::{InitialMessage, X3DHKeyPair, X3DHOutput, X3DH};
