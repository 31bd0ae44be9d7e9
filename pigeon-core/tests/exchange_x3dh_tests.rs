//! Tests for exchange::x3dh and exchange::bundle

use pigeon_core::crypto::*;
use pigeon_core::*;

fn responder_store(one_time_count: u32) -> PreKeyStore {
    PreKeyStore::generate(IdentityKeyPair::generate(), one_time_count)
}

#[test]
fn test_x3dh_agreement_with_one_time_pre_key() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(3);
    let bundle = bob_store.publish_bundle();

    let output = X3DH::initiate(&alice, &bundle).unwrap();
    assert_eq!(output.initial_message.one_time_pre_key_id, Some(1));
    assert_eq!(output.initial_message.identity_key, *alice.exchange_public_key());
    assert_eq!(output.initial_message.ephemeral_key, *output.ephemeral.public_key());
    assert_eq!(output.their_ratchet_key, bundle.signed_pre_key);

    let bob_secret = X3DH::respond(&mut bob_store, &output.initial_message).unwrap();

    assert_eq!(output.shared_secret.as_bytes(), bob_secret.as_bytes());
    assert_eq!(bob_store.one_time_pre_key_count(), 2);
    assert!(bob_store.one_time_pre_key(1).is_none());
}

#[test]
fn test_x3dh_agreement_without_one_time_pre_key() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(0);
    let bundle = bob_store.publish_bundle();
    assert!(bundle.one_time_pre_key.is_none());

    let output = X3DH::initiate(&alice, &bundle).unwrap();
    assert_eq!(output.initial_message.one_time_pre_key_id, None);

    let bob_secret = X3DH::respond(&mut bob_store, &output.initial_message).unwrap();
    assert_eq!(output.shared_secret.as_bytes(), bob_secret.as_bytes());
}

#[test]
fn test_x3dh_mismatched_one_time_pre_key_yields_different_secret() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(1);
    let mut bundle = bob_store.publish_bundle();
    bundle.one_time_pre_key = None;

    // Initiator skipped the one-time prekey but the message claims it
    let output = X3DH::initiate(&alice, &bundle).unwrap();
    let mut forged = output.initial_message.clone();
    forged.one_time_pre_key_id = Some(1);

    let bob_secret = X3DH::respond(&mut bob_store, &forged).unwrap();
    assert_ne!(output.shared_secret.as_bytes(), bob_secret.as_bytes());
}

#[test]
fn test_x3dh_reused_one_time_pre_key_rejected() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(2);
    let bundle = bob_store.publish_bundle();

    let output = X3DH::initiate(&alice, &bundle).unwrap();
    X3DH::respond(&mut bob_store, &output.initial_message).unwrap();

    assert_eq!(
        X3DH::respond(&mut bob_store, &output.initial_message).unwrap_err(),
        ExchangeError::UnknownOneTimePreKey(1)
    );
    assert_eq!(bob_store.one_time_pre_key_count(), 1);

    // The next bundle offers the next key
    assert_eq!(
        bob_store.publish_bundle().one_time_pre_key.map(|opk| opk.id),
        Some(2)
    );
}

#[test]
fn test_x3dh_unknown_one_time_pre_key_rejected() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(1);
    let output = X3DH::initiate(&alice, &bob_store.publish_bundle()).unwrap();

    let mut message = output.initial_message;
    message.one_time_pre_key_id = Some(99);
    assert_eq!(
        X3DH::respond(&mut bob_store, &message).unwrap_err(),
        ExchangeError::UnknownOneTimePreKey(99)
    );
    assert_eq!(bob_store.one_time_pre_key_count(), 1);
}

#[test]
fn test_x3dh_bad_signature_rejected() {
    let alice = IdentityKeyPair::generate();
    let bob_store = responder_store(1);
    let mut bundle = bob_store.publish_bundle();

    let mut sig = *bundle.signed_pre_key_signature.as_bytes();
    sig[0] ^= 0x01;
    bundle.signed_pre_key_signature = Signature::from_bytes(sig);

    assert_eq!(
        X3DH::initiate(&alice, &bundle).unwrap_err(),
        ExchangeError::SignatureVerificationFailed
    );
}

#[test]
fn test_x3dh_signature_from_other_identity_rejected() {
    let alice = IdentityKeyPair::generate();
    let bob_store = responder_store(1);
    let mallory = IdentityKeyPair::generate();

    let mut bundle = bob_store.publish_bundle();
    bundle.identity_signing_key = mallory.signing_public_key();

    assert_eq!(
        X3DH::initiate(&alice, &bundle).unwrap_err(),
        ExchangeError::SignatureVerificationFailed
    );
}

#[test]
fn test_x3dh_low_order_identity_key_rejected() {
    let alice = IdentityKeyPair::generate();
    let bob_store = responder_store(0);
    let mut bundle = bob_store.publish_bundle();
    bundle.identity_key = [0u8; 32];

    assert_eq!(
        X3DH::initiate(&alice, &bundle).unwrap_err(),
        ExchangeError::InvalidPublicKey
    );
}

#[test]
fn test_x3dh_low_order_ephemeral_rejected_without_consuming_pre_key() {
    let alice = IdentityKeyPair::generate();
    let mut bob_store = responder_store(1);
    let output = X3DH::initiate(&alice, &bob_store.publish_bundle()).unwrap();

    let mut message = output.initial_message;
    message.ephemeral_key = [0u8; 32];
    assert_eq!(
        X3DH::respond(&mut bob_store, &message).unwrap_err(),
        ExchangeError::InvalidPublicKey
    );
    assert_eq!(bob_store.one_time_pre_key_count(), 1);
}

#[test]
fn test_bundle_survives_serde() {
    let bundle = responder_store(1).publish_bundle();
    let json = serde_json::to_string(&bundle).unwrap();
    let restored: KeyBundle = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, bundle);
    assert!(restored.verify().is_ok());
}

#[test]
fn test_initial_message_serde() {
    let alice = IdentityKeyPair::generate();
    let output = X3DH::initiate(&alice, &responder_store(1).publish_bundle()).unwrap();

    let json = serde_json::to_string(&output.initial_message).unwrap();
    let restored: InitialMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, output.initial_message);
}

#[test]
fn test_x3dh_feeds_double_ratchet() {
    let alice_identity = IdentityKeyPair::generate();
    let mut bob_store = responder_store(1);
    let bundle = bob_store.publish_bundle();

    let output = X3DH::initiate(&alice_identity, &bundle).unwrap();
    let bob_secret = X3DH::respond(&mut bob_store, &output.initial_message).unwrap();

    let config = RatchetConfig::default();
    let mut alice = DoubleRatchetState::initialize_initiator(
        &output.shared_secret,
        output.their_ratchet_key,
        config.clone(),
    );
    let mut bob = DoubleRatchetState::initialize_responder(
        &bob_secret,
        bob_store.signed_pre_key_pair().clone(),
        config,
    );

    let alice_ad = AssociatedData::new(
        *alice_identity.exchange_public_key(),
        "alice",
        bundle.identity_key,
        "bob",
    );
    let bob_ad = alice_ad.reversed();

    let (h, c) = alice
        .encrypt(b"hello bob", &alice_ad.encode_for_encryption().unwrap())
        .unwrap();
    assert_eq!(
        bob.decrypt(&h, &c, &bob_ad.encode_for_decryption().unwrap()).unwrap(),
        b"hello bob"
    );

    let (h, c) = bob
        .encrypt(b"hello alice", &bob_ad.encode_for_encryption().unwrap())
        .unwrap();
    assert_eq!(
        alice
            .decrypt(&h, &c, &alice_ad.encode_for_decryption().unwrap())
            .unwrap(),
        b"hello alice"
    );

    // Using the sender-side encoding on receipt does not authenticate
    let (h, c) = alice
        .encrypt(b"again", &alice_ad.encode_for_encryption().unwrap())
        .unwrap();
    assert!(bob.decrypt(&h, &c, &bob_ad.encode_for_encryption().unwrap()).is_err());
}
