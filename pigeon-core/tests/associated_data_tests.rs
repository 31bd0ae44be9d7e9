//! Tests for associated_data

use pigeon_core::AssociatedData;

fn alice_view() -> AssociatedData {
    AssociatedData::new([0xA1; 32], "alice", [0xB0; 32], "bob")
}

#[test]
fn test_sender_and_receiver_encode_same_bytes() {
    let alice = alice_view();
    let bob = alice.reversed();

    assert_eq!(
        alice.encode_for_encryption().unwrap(),
        bob.encode_for_decryption().unwrap()
    );
    assert_eq!(
        bob.encode_for_encryption().unwrap(),
        alice.encode_for_decryption().unwrap()
    );
}

#[test]
fn test_direction_matters() {
    let alice = alice_view();
    assert_ne!(
        alice.encode_for_encryption().unwrap(),
        alice.encode_for_decryption().unwrap()
    );
}

#[test]
fn test_layout_sender_first() {
    let bytes = alice_view().encode_for_encryption().unwrap();

    assert_eq!(&bytes[..32], &[0xA1; 32]);
    assert_eq!(&bytes[32..36], &[0, 0, 0, 5]);
    assert_eq!(&bytes[36..41], b"alice");
    assert_eq!(&bytes[41..73], &[0xB0; 32]);
    assert_eq!(&bytes[73..77], &[0, 0, 0, 3]);
    assert_eq!(&bytes[77..], b"bob");
}

#[test]
fn test_username_boundary_is_unambiguous() {
    let a = AssociatedData::new([1; 32], "ab", [2; 32], "c");
    let b = AssociatedData::new([1; 32], "a", [2; 32], "bc");
    assert_ne!(a.encode_for_encryption().unwrap(), b.encode_for_encryption().unwrap());
}

#[test]
fn test_reversed_twice_is_identity() {
    let alice = alice_view();
    assert_eq!(alice.reversed().reversed(), alice);
}
