//! Tests for crypto::chain and crypto::kdf

use pigeon_core::crypto::*;
use ring::hmac;

#[test]
fn test_root_step_is_deterministic() {
    let root = [1u8; 32];
    let dh = [2u8; 32];
    assert_eq!(derive_root_step(&root, &dh), derive_root_step(&root, &dh));
}

#[test]
fn test_root_step_matches_hkdf() {
    let root = [3u8; 32];
    let dh = [4u8; 32];
    let okm = HKDF::derive(Some(&root), &dh, b"doubleratchet.KDFRootKey", 64).unwrap();

    let (new_root, chain) = derive_root_step(&root, &dh);
    assert_eq!(&okm[..32], &new_root);
    assert_eq!(&okm[32..], &chain);
}

#[test]
fn test_chain_step_separates_message_and_chain_keys() {
    let (next, message) = derive_chain_step(&[5u8; 32]);
    assert_ne!(next, message);
    assert_ne!(next, [5u8; 32]);

    // Stepping again from the next key yields fresh material
    let (next2, message2) = derive_chain_step(&next);
    assert_ne!(message, message2);
    assert_ne!(next, next2);
}

#[test]
#[should_panic(expected = "chain key must be 32 bytes")]
fn test_chain_step_rejects_wrong_length() {
    derive_chain_step(&[0u8; 31]);
}

#[test]
fn test_chain_key_ratchet_advances_generation() {
    let chain = ChainKey::new([6u8; 32]);
    assert_eq!(chain.generation(), 0);

    let (mk0, chain1) = chain.ratchet();
    let (mk1, chain2) = chain1.ratchet();

    assert_eq!(mk0.generation(), 0);
    assert_eq!(mk1.generation(), 1);
    assert_eq!(chain2.generation(), 2);
    assert_ne!(mk0.symmetric_key().as_bytes(), mk1.symmetric_key().as_bytes());
}

#[test]
fn test_chain_key_ratchet_matches_chain_step() {
    let chain = ChainKey::new([7u8; 32]);
    let (expected_next, expected_message) = derive_chain_step(&[7u8; 32]);

    let (message, next) = chain.ratchet();
    assert_eq!(message.symmetric_key().as_bytes(), &expected_message);
    assert_eq!(next.as_bytes(), &expected_next);
}

#[test]
fn test_hkdf_with_sha256_matches_default() {
    let ikm = b"input key material";
    let info = b"context";
    let generic = HKDF::derive_with(hmac::HMAC_SHA256, Some(b"salt"), ikm, info, 48).unwrap();
    let default = HKDF::derive(Some(b"salt"), ikm, info, 48).unwrap();
    assert_eq!(generic, default);
}

#[test]
fn test_hkdf_sha512_output_limit() {
    let prk = HKDF::extract_with(hmac::HMAC_SHA512, None, b"ikm");
    assert_eq!(prk.len(), 64);

    assert_eq!(
        HKDF::expand_with(hmac::HMAC_SHA512, &prk, b"", 255 * 64)
            .unwrap()
            .len(),
        255 * 64
    );
    assert!(matches!(
        HKDF::expand_with(hmac::HMAC_SHA512, &prk, b"", 255 * 64 + 1),
        Err(KDFError::OutputTooLong)
    ));
}

#[test]
fn test_hkdf_sha512_prefix_consistency() {
    let prk = HKDF::extract_with(hmac::HMAC_SHA512, None, b"ikm");
    let short = HKDF::expand_with(hmac::HMAC_SHA512, &prk, b"info", 80).unwrap();
    let long = HKDF::expand_with(hmac::HMAC_SHA512, &prk, b"info", 160).unwrap();
    assert_eq!(&long[..80], short.as_slice());
}
