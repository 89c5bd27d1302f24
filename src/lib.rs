//! OpenPGP message encryption and key pair generation.
//!
//! - [`EncryptPipeline`]: literal, compressed, session key encrypted and optionally armored
//!   messages for one or more recipients.
//! - [`KeyPairGenerator`]: RSA or DSA/ElGamal key pairs exported as protected key rings.
//! - [`select_encryption_key`]: picks the encryption key out of a public key ring collection.

pub mod armor;
pub mod config;
pub mod error;
pub mod group;
pub mod keygen;
pub mod keyring;
pub mod packet;
pub mod passphrase;
pub mod pipeline;

#[cfg(test)]
mod testkit;

pub use crate::config::PgpConfig;
pub use error::{PgpError, Result};
pub use group::{GroupParameterStore, GroupParameters};
pub use keygen::{GeneratedKeyRings, KeyAlgorithm, KeyGenPara, KeyPairGenerator};
pub use keyring::{select_encryption_key, KeyRing, KeyRingBundle};
pub use passphrase::Passphrase;
pub use pipeline::{EncryptConfig, EncryptPipeline};
