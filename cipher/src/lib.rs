//! Primitive layer of the OpenPGP workflow: public key algorithms over `num-bigint`,
//! the OpenPGP flavour of CFB over AES-128, and PKCS#1 v1.5 encodings.

mod error;
pub use error::CipherError;

pub use rand::{DefaultRand, Rand};

pub mod block_cipher;
pub use block_cipher::BlockEncrypt;

pub mod cfb;
pub mod dsa;
pub mod elgamal;
pub mod padding;
pub mod rsa;
