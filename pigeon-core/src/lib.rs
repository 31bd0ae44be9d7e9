//! Pigeon Core Library
//!
//! Session cryptography for an end-to-end encrypted messenger: X3DH key
//! agreement followed by the Double Ratchet.
//! HMAC, HKDF, SHA and Ed25519 come from the audited `ring` crate.

pub mod associated_data;
pub mod crypto;
pub mod exchange;

pub use associated_data::{AssociatedData, AssociatedDataError};
pub use crypto::{
    DoubleRatchetState, PublicKey, RatchetConfig, RatchetError, RatchetHeader, RemoteKeyPolicy,
    Signature, SigningKeyPair, SymmetricKey,
};
pub use exchange::{
    ExchangeError, IdentityKeyPair, InitialMessage, KeyBundle, OneTimePreKey, PreKeyStore,
    X3DHKeyPair, X3DHOutput, X3DH,
};
