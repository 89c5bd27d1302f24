//! AES-128 (FIPS 197), symmetric algorithm id 7 in OpenPGP.
//! The block transform comes from the RustCrypto `aes` crate.

use crate::BlockEncrypt;
use ::aes::cipher::generic_array::GenericArray;
use ::aes::cipher::{BlockEncrypt as _, KeyInit};

#[derive(Clone)]
pub struct AES128 {
    inner: ::aes::Aes128,
}

impl AES128 {
    pub fn new(key: &[u8; 16]) -> Self {
        Self {
            inner: ::aes::Aes128::new(GenericArray::from_slice(key.as_slice())),
        }
    }
}

impl BlockEncrypt<16> for AES128 {
    fn encrypt_block(&self, plaintext: &[u8; 16]) -> [u8; 16] {
        let mut block = GenericArray::clone_from_slice(plaintext.as_slice());
        self.inner.encrypt_block(&mut block);

        let mut out = [0u8; 16];
        out.copy_from_slice(block.as_slice());
        out
    }
}
