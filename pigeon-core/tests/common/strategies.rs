// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use pigeon_core::crypto::RatchetHeader;
use proptest::prelude::*;

// ============================================================
// Byte Array Strategies
// ============================================================

/// Strategy for generating 32-byte arrays (keys).
pub fn bytes32_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Strategy for generating variable-length byte vectors.
pub fn byte_vec_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), min..max)
}

/// Plaintexts around block boundaries and a few larger sizes.
pub fn plaintext_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        byte_vec_strategy(0, 48),
        byte_vec_strategy(48, 1024),
    ]
}

// ============================================================
// Protocol Strategies
// ============================================================

pub fn header_strategy() -> impl Strategy<Value = RatchetHeader> {
    (bytes32_strategy(), any::<u32>(), any::<u32>())
        .prop_map(|(dh, pn, n)| RatchetHeader::new(dh, pn, n))
}

/// Delivery order for `len` messages.
pub fn permutation_strategy(len: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..len).collect::<Vec<_>>()).prop_shuffle()
}
