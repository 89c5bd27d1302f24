use crate::{CipherError, Rand};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt::{Display, Formatter};
use utils::BigUintExt;

/// fixed public exponent used for every generated key
pub const PUBLIC_EXPONENT: u32 = 65537;

#[derive(Clone, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub struct PublicKey {
    // n = p * q
    n: BigUint,
    // public exponent, gcd(e, (p-1)(q-1)) = 1
    e: BigUint,
}

#[derive(Clone, Debug)]
pub struct PrivateKey {
    pk: PublicKey,
    // d * e = 1 % (p-1)(q-1)
    d: BigUint,
    // p < q, the order OpenPGP expects for its `u = p^{-1} mod q` coefficient
    p: BigUint,
    q: BigUint,
    pre: PrecomputedValues,
}

#[derive(Clone, Debug)]
struct PrecomputedValues {
    // d % (p - 1)
    d_p: BigUint,
    // d % (q - 1)
    d_q: BigUint,
    // q^{-1} % p
    q_inv: BigUint,
}

impl PublicKey {
    /// note: not to check the `n` and `exp` are right RSA parameters
    pub fn new_uncheck(n: BigUint, exp: BigUint) -> Self {
        Self { e: exp, n }
    }

    /// n
    pub fn modules(&self) -> &BigUint {
        &self.n
    }

    /// e
    pub fn exponent(&self) -> &BigUint {
        &self.e
    }

    /// modulus length in bytes
    pub fn key_len(&self) -> usize {
        (self.n.bits() as usize + 7) >> 3
    }

    /// RSAEP: $m^e \mod n, m \lt n$
    pub fn rsaep(&self, m: &BigUint) -> Result<BigUint, CipherError> {
        if m < &self.n {
            Ok(m.modpow(&self.e, &self.n))
        } else {
            Err(CipherError::Other(format!(
                "rsaep: invalid message that need less than {:#x}",
                self.n
            )))
        }
    }

    pub fn is_valid(&self) -> Result<(), CipherError> {
        if self.e < BigUint::from(3u8) || (&self.e % 2u8).is_zero() {
            Err(CipherError::InvalidPublicKey(format!(
                "rsa: public exponent {:#x} is invalid",
                self.e
            )))
        } else if self.n.bits() < 512 {
            Err(CipherError::InvalidPublicKey(format!(
                "rsa: modulus of {} bits is too small",
                self.n.bits()
            )))
        } else {
            Ok(())
        }
    }
}

impl PrivateKey {
    /// Rebuild a private key from its stored components, `p` and `q` may come in either order.
    pub fn from_components(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        p: BigUint,
        q: BigUint,
    ) -> Result<Self, CipherError> {
        if &p * &q != n {
            return Err(CipherError::InvalidPrivateKey(
                "rsa: p * q does not match the modulus".to_string(),
            ));
        }

        let (p, q) = if p < q { (p, q) } else { (q, p) };
        let pre = PrecomputedValues::new(&p, &q, &d)?;
        let key = Self {
            pk: PublicKey::new_uncheck(n, e),
            d,
            p,
            q,
            pre,
        };
        key.is_valid()?;
        Ok(key)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    pub fn exponent(&self) -> &BigUint {
        &self.d
    }

    /// the smaller prime factor
    pub fn prime_p(&self) -> &BigUint {
        &self.p
    }

    /// the larger prime factor
    pub fn prime_q(&self) -> &BigUint {
        &self.q
    }

    /// OpenPGP coefficient $u = p^{-1} \mod q$
    pub fn coefficient(&self) -> Result<BigUint, CipherError> {
        BigUintExt(&self.p)
            .modinv(&self.q)
            .ok_or_else(|| CipherError::InvalidPrivateKey("rsa: p is not invertible".to_string()))
    }

    /// RSADP: RSA Decrypt primitive
    pub fn rsadp(&self, c: &BigUint) -> Result<BigUint, CipherError> {
        if c < &self.pk.n {
            Ok(self.rsadp_uncheck(c))
        } else {
            Err(CipherError::Other(format!(
                "rsadp: invalid cipher message {:#x} that need less than {:#x}",
                c, self.pk.n
            )))
        }
    }

    // m1 = c^{dp} % p, m2 = c^{dq} % q
    // h = (m1 - m2) * qinv % p
    // m = m2 + q * h
    fn rsadp_uncheck(&self, c: &BigUint) -> BigUint {
        let (m1, m2) = (
            c.modpow(&self.pre.d_p, &self.p),
            c.modpow(&self.pre.d_q, &self.q),
        );

        let diff = (m1 + &self.p - (&m2 % &self.p)) % &self.p;
        let h = (diff * &self.pre.q_inv) % &self.p;
        m2 + h * &self.q
    }

    pub fn is_valid(&self) -> Result<(), CipherError> {
        self.pk.is_valid()?;

        for prime in [&self.p, &self.q] {
            if prime.is_zero() || prime.is_one() {
                return Err(CipherError::InvalidPrivateKey(
                    "rsa: invalid prime value".to_string(),
                ));
            }
        }

        if &self.p * &self.q != self.pk.n {
            return Err(CipherError::InvalidPrivateKey(
                "rsa: invalid modulus".to_string(),
            ));
        }

        // d*e = 1 mod (prime - 1)
        let de = &self.d * &self.pk.e;
        for prime in [&self.p, &self.q] {
            let pm1 = prime - 1u8;
            if !(&de % pm1).is_one() {
                return Err(CipherError::InvalidPrivateKey(
                    "rsa: invalid exponent".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a two prime RSA key whose modulus has exactly `bits_len` bits and whose public
    /// exponent is [`PUBLIC_EXPONENT`].
    ///
    /// `prime_test_rounds` is the number of Miller-Rabin rounds each prime has to pass, a composite
    /// survives with probability at most $4^{-rounds}$.
    pub fn generate_key<R: Rand>(
        bits_len: usize,
        prime_test_rounds: usize,
        rd: &mut R,
    ) -> Result<PrivateKey, CipherError> {
        if bits_len < 512 {
            return Err(CipherError::Other(format!(
                "rsa: modulus of `{bits_len}` bits is too small"
            )));
        }

        let pub_exp = BigUint::from(PUBLIC_EXPONENT);
        let (p_bits, q_bits) = (bits_len >> 1, bits_len - (bits_len >> 1));

        let (p, q, d, n) = loop {
            let p = BigUintExt::<BigUint>::generate_prime(p_bits, prime_test_rounds, rd)?;
            let q = BigUintExt::<BigUint>::generate_prime(q_bits, prime_test_rounds, rd)?;
            if p == q {
                continue;
            }

            // top two bits of each prime are set, so this only trips on a broken source
            let n = &p * &q;
            if n.bits() as usize != bits_len {
                continue;
            }

            let totient = (&p - 1u32) * (&q - 1u32);
            if let Some(d) = BigUintExt(&pub_exp).modinv(&totient) {
                break (p, q, d, n);
            }
        };

        Self::from_components(n, pub_exp, d, p, q)
    }
}

impl PrecomputedValues {
    fn new(p: &BigUint, q: &BigUint, d: &BigUint) -> Result<Self, CipherError> {
        let one = BigUint::one();
        let q_inv = BigUintExt(q).modinv(p).ok_or_else(|| {
            CipherError::InvalidPrivateKey("rsa: the prime factors are not coprime".to_string())
        })?;

        Ok(Self {
            d_p: d % (p - &one),
            d_q: d % (q - &one),
            q_inv,
        })
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{n={:#x}, e={:#x}}}", self.n, self.e)
    }
}

#[cfg(test)]
mod tests {
    use crate::rsa::key::PrivateKey;
    use crate::DefaultRand;
    use num_bigint::BigUint;
    use num_traits::Num;

    fn key_basics(key: &PrivateKey) {
        key.is_valid().unwrap();
        assert!(key.prime_p() < key.prime_q());
        let m = BigUint::from(42u32);
        let c = key.public_key().rsaep(&m).unwrap();
        let m2 = key.rsadp(&c).unwrap();
        assert_eq!(m, m2, "encrypt message != decrypt message");
    }

    #[test]
    fn rsa_keygen_1024() {
        let mut rng = DefaultRand::default();
        let key = PrivateKey::generate_key(1024, 13, &mut rng).unwrap();
        assert_eq!(key.public_key().modules().bits(), 1024);
        assert_eq!(key.public_key().exponent(), &BigUint::from(65537u32));
        key_basics(&key);

        let u = key.coefficient().unwrap();
        assert_eq!((&u * key.prime_p()) % key.prime_q(), BigUint::from(1u8));
    }

    #[test]
    fn too_small_modulus() {
        let mut rng = DefaultRand::default();
        assert!(PrivateKey::generate_key(256, 13, &mut rng).is_err());
    }

    #[test]
    fn gnu_tls_key() {
        let n = BigUint::from_str_radix("290684273230919398108010081414538931343", 10).unwrap();
        let e = BigUint::from(65537u32);
        let d = BigUint::from_str_radix("31877380284581499213530787347443987241", 10).unwrap();
        let (p, q) = (
            BigUint::from_str_radix("16775196964030542637", 10).unwrap(),
            BigUint::from_str_radix("17328218193455850539", 10).unwrap(),
        );

        // the modulus is far below the 512-bit floor, so only the math is checked here
        let err = PrivateKey::from_components(n.clone(), e.clone(), d.clone(), q.clone(), p.clone());
        assert!(err.is_err());

        let c = BigUint::from(42u32).modpow(&e, &n);
        assert_eq!(c.modpow(&d, &n), BigUint::from(42u32));
    }
}
