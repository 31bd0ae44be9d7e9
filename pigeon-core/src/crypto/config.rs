// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for Double Ratchet sessions

/// Default bound on message keys skipped in a single decrypt.
pub const DEFAULT_MAX_SKIP: u32 = 1000;

/// How a responder treats the first incoming message when it has no
/// remote ratchet key yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteKeyPolicy {
    /// Adopt the ratchet key from the first message header.
    ///
    /// The key is not authenticated by anything but the message itself.
    #[default]
    TrustOnFirstUse,
    /// Require the remote ratchet key to be known in advance
    /// (see `DoubleRatchetState::initialize_responder_pinned`) and reject a
    /// first message carrying any other key.
    Strict,
}

/// Per-session ratchet parameters, fixed at state construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatchetConfig {
    /// Maximum number of message keys derived and cached by one skip.
    pub max_skip: u32,

    /// Handling of the first incoming message without a known remote key.
    pub remote_key_policy: RemoteKeyPolicy,
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self {
            max_skip: DEFAULT_MAX_SKIP,
            remote_key_policy: RemoteKeyPolicy::TrustOnFirstUse,
        }
    }
}

impl RatchetConfig {
    /// Override the skip bound.
    pub fn with_max_skip(mut self, max_skip: u32) -> Self {
        self.max_skip = max_skip;
        self
    }

    /// Require pinned remote ratchet keys for responder bootstrap.
    pub fn strict(mut self) -> Self {
        self.remote_key_policy = RemoteKeyPolicy::Strict;
        self
    }
}
