// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod chain;
pub mod config;
pub mod encryption;
pub mod header;
pub mod kdf;
pub mod ratchet;
pub mod signing;

pub use chain::{derive_chain_step, derive_root_step, ChainKey, MessageKey};
pub use config::{RatchetConfig, RemoteKeyPolicy, DEFAULT_MAX_SKIP};
pub use encryption::{decrypt, encrypt, EncryptionError, SymmetricKey, TAG_SIZE};
pub use header::{concat, parse, HeaderError, RatchetHeader, HEADER_SIZE};
pub use kdf::{KDFError, HKDF};
pub use ratchet::{DoubleRatchetState, RatchetError, RatchetFingerprint, SkippedKeyId};
pub use signing::{PublicKey, Signature, SigningKeyPair};
