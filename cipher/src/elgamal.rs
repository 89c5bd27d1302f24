//! ElGamal encryption over $Z_p^*$ (OpenPGP public key algorithm 16)
//!
//! - 私钥$x$, 公钥$y = g^x \mod p$;
//! - 加密: 随机$k$, $c_1 = g^k \mod p$, $c_2 = m \cdot y^k \mod p$;
//! - 解密: $m = c_2 \cdot (c_1^x)^{-1} \mod p$;
//!
//! The message is an EME-PKCS1-v1_5 block sized to the byte length of $p$.

use crate::padding::{eme_pkcs1_decode, eme_pkcs1_encode, scrub};
use crate::{CipherError, Rand};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use utils::BigUintExt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    p: BigUint,
    g: BigUint,
    y: BigUint,
}

#[derive(Clone, Debug)]
pub struct PrivateKey {
    pk: PublicKey,
    x: BigUint,
}

impl PublicKey {
    pub fn new_uncheck(p: BigUint, g: BigUint, y: BigUint) -> Self {
        Self { p, g, y }
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    pub fn y(&self) -> &BigUint {
        &self.y
    }

    pub fn key_len(&self) -> usize {
        (self.p.bits() as usize + 7) >> 3
    }

    /// encrypt a session key block, returns $(c_1, c_2)$
    pub fn encrypt_pkcs1v15<R: Rand>(
        &self,
        msg: &[u8],
        rng: &mut R,
    ) -> Result<(BigUint, BigUint), CipherError> {
        let mut em = eme_pkcs1_encode(msg, self.key_len(), rng)?;
        let m = BigUint::from_bytes_be(em.as_slice());
        scrub(&mut em);
        if m >= self.p {
            return Err(CipherError::MessageTooLong {
                max: self.key_len().saturating_sub(11),
                real: msg.len(),
            });
        }

        // k in [1, p-1)
        let k = BigUintExt(&(&self.p - 1u32)).gen_random_from(&BigUint::one(), rng);
        let c1 = self.g.modpow(&k, &self.p);
        let c2 = (m * self.y.modpow(&k, &self.p)) % &self.p;
        Ok((c1, c2))
    }
}

impl PrivateKey {
    /// random exponent $x \in [2, p-1)$ in the group $(p, g)$
    pub fn generate<R: Rand>(p: BigUint, g: BigUint, rng: &mut R) -> Result<Self, CipherError> {
        let two = BigUint::from(2u8);
        if p <= BigUint::from(3u8) || g < two || g >= p {
            return Err(CipherError::InvalidPublicKey(
                "elgamal: invalid group parameters".to_string(),
            ));
        }

        let x = BigUintExt(&(&p - 1u32)).gen_random_from(&two, rng);
        let y = g.modpow(&x, &p);
        Ok(Self {
            pk: PublicKey::new_uncheck(p, g, y),
            x,
        })
    }

    pub fn from_components(pk: PublicKey, x: BigUint) -> Result<Self, CipherError> {
        if x.is_zero() || pk.g.modpow(&x, &pk.p) != pk.y {
            return Err(CipherError::InvalidPrivateKey(
                "elgamal: x does not match the public key".to_string(),
            ));
        }

        Ok(Self { pk, x })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    pub fn x(&self) -> &BigUint {
        &self.x
    }

    pub fn decrypt_pkcs1v15(&self, c1: &BigUint, c2: &BigUint) -> Result<Vec<u8>, CipherError> {
        let p = &self.pk.p;
        if c1.is_zero() || c1 >= p || c2 >= p {
            return Err(CipherError::Decryption(
                "elgamal: ciphertext out of range".to_string(),
            ));
        }

        let s = c1.modpow(&self.x, p);
        let s_inv = BigUintExt(&s)
            .modinv(p)
            .ok_or_else(|| CipherError::Decryption("elgamal: c1 is not invertible".to_string()))?;
        let m = (c2 * s_inv) % p;

        let mut em = BigUintExt(&m)
            .to_bytes_be_padded(self.pk.key_len())
            .ok_or_else(|| CipherError::Decryption("elgamal: block too long".to_string()))?;
        let msg = eme_pkcs1_decode(em.as_slice());
        scrub(&mut em);
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::PrivateKey;
    use crate::DefaultRand;
    use num_bigint::BigUint;
    use num_traits::Num;

    // RFC 2409 §6.2 second Oakley group
    const OAKLEY_1024: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF";

    #[test]
    fn elgamal_session_key() {
        let mut rng = DefaultRand::default();
        let p = BigUint::from_str_radix(OAKLEY_1024, 16).unwrap();
        let key = PrivateKey::generate(p, BigUint::from(2u8), &mut rng).unwrap();
        assert_eq!(key.public_key().key_len(), 128);

        let msg = b"\x07sixteen byte key\x05\x5b";
        let (c1, c2) = key.public_key().encrypt_pkcs1v15(msg, &mut rng).unwrap();
        assert_eq!(key.decrypt_pkcs1v15(&c1, &c2).unwrap(), msg);

        let (c1b, _) = key.public_key().encrypt_pkcs1v15(msg, &mut rng).unwrap();
        assert_ne!(c1, c1b);
        assert!(key.decrypt_pkcs1v15(&c1, &(&c2 + 1u8)).is_err());
    }

    #[test]
    fn invalid_group() {
        let mut rng = DefaultRand::default();
        let g = BigUint::from(2u8);
        assert!(PrivateKey::generate(BigUint::from(3u8), g.clone(), &mut rng).is_err());
        assert!(PrivateKey::generate(BigUint::from(23u8), BigUint::from(23u8), &mut rng).is_err());
    }
}
