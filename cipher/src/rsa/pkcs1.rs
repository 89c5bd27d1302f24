//! = RFC 8017
//!
//! == PKCS #1: RSA Cryptography Specification Version 2.2
//!
//! === PKCS1(Public Key Cryptography Standards v1.5)
//!
//! OpenPGP stores the RSA results as MPIs, so the operations here return integers instead of
//! `k` octet strings.

use crate::padding::{eme_pkcs1_decode, eme_pkcs1_encode, emsa_pkcs1_sha256, scrub};
use crate::rsa::{PrivateKey, PublicKey};
use crate::{CipherError, Rand};
use num_bigint::BigUint;
use utils::BigUintExt;

#[derive(Clone, Debug)]
pub struct PKCS1Encrypt {
    key: PublicKey,
}

#[derive(Clone, Debug)]
pub struct PKCS1Decrypt {
    key: PrivateKey,
}

impl PKCS1Encrypt {
    pub fn new(key: PublicKey) -> Result<Self, CipherError> {
        if key.key_len() <= 11 {
            return Err(CipherError::Other(
                "rsa: the public key is too short".to_string(),
            ));
        }

        key.is_valid()?;
        Ok(Self { key })
    }

    pub fn key_len(&self) -> usize {
        self.key.key_len()
    }

    pub fn max_msg_len(&self) -> usize {
        self.key_len() - 11
    }

    /// RSAES-PKCS1-v1_5 encryption of a single block, `msg.len()` at most [`Self::max_msg_len`]
    pub fn encrypt<R: Rand>(&self, msg: &[u8], rng: &mut R) -> Result<BigUint, CipherError> {
        let mut em = eme_pkcs1_encode(msg, self.key_len(), rng)?;
        let m = BigUint::from_bytes_be(em.as_slice());
        scrub(&mut em);
        self.key.rsaep(&m)
    }
}

impl PKCS1Decrypt {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }

    pub fn key_len(&self) -> usize {
        self.key.public_key().key_len()
    }

    pub fn decrypt(&self, c: &BigUint) -> Result<Vec<u8>, CipherError> {
        let m = self.key.rsadp(c)?;
        let mut em = BigUintExt(&m)
            .to_bytes_be_padded(self.key_len())
            .ok_or_else(|| CipherError::Decryption("rsa: decrypted block too long".to_string()))?;
        let msg = eme_pkcs1_decode(em.as_slice());
        scrub(&mut em);
        msg
    }

    /// RSASSA-PKCS1-v1_5 signature over a SHA-256 `digest`
    pub fn sign_sha256(&self, digest: &[u8]) -> Result<BigUint, CipherError> {
        let em = emsa_pkcs1_sha256(digest, self.key_len())?;
        self.key.rsadp(&BigUint::from_bytes_be(em.as_slice()))
    }
}

impl PKCS1Encrypt {
    pub fn verify_sha256(&self, digest: &[u8], sig: &BigUint) -> Result<(), CipherError> {
        let em = emsa_pkcs1_sha256(digest, self.key_len())?;
        if self.key.rsaep(sig)? == BigUint::from_bytes_be(em.as_slice()) {
            Ok(())
        } else {
            Err(CipherError::Other("rsa: signature mismatch".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PKCS1Decrypt, PKCS1Encrypt};
    use crate::rsa::PrivateKey;
    use crate::DefaultRand;
    use std::sync::OnceLock;

    fn key() -> &'static PrivateKey {
        static KEY: OnceLock<PrivateKey> = OnceLock::new();
        KEY.get_or_init(|| {
            PrivateKey::generate_key(1024, 13, &mut DefaultRand::default()).unwrap()
        })
    }

    #[test]
    fn pkcs1_session_key() {
        let mut rng = DefaultRand::default();
        let enc = PKCS1Encrypt::new(key().public_key().clone()).unwrap();
        let dec = PKCS1Decrypt::new(key().clone());
        assert_eq!(enc.max_msg_len(), 117);

        let msg = [7u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 0, 136];
        let c = enc.encrypt(&msg, &mut rng).unwrap();
        assert_eq!(dec.decrypt(&c).unwrap(), msg);

        // fresh padding each time
        assert_ne!(c, enc.encrypt(&msg, &mut rng).unwrap());
        assert!(enc.encrypt(&[0u8; 118], &mut rng).is_err());
    }

    #[test]
    fn pkcs1_sign_sha256() {
        let enc = PKCS1Encrypt::new(key().public_key().clone()).unwrap();
        let dec = PKCS1Decrypt::new(key().clone());
        let digest = [0x3cu8; 32];
        let sig = dec.sign_sha256(&digest).unwrap();
        enc.verify_sha256(&digest, &sig).unwrap();
        assert!(enc.verify_sha256(&[0x3du8; 32], &sig).is_err());
    }
}
