//! FIPS 186-4: Digital Signature Algorithm over a prime field
//!
//! - 域参数$(p, q, g)$: $q$是$N$位质数, $p$是$L$位质数且$q \mid p-1$, $g$的阶为$q$;
//! - 私钥$x \in [1, q)$, 公钥$y = g^x \mod p$;
//!
//! 签名: $r = (g^k \mod p) \mod q$, $s = k^{-1}(z + xr) \mod q$;
//!
//! 验证: $w = s^{-1}$, $v = (g^{zw} y^{rw} \mod p) \mod q$, 检查$v = r$;

use crate::{CipherError, Rand};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt::{Display, Formatter};
use utils::BigUintExt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainParameters {
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    dp: DomainParameters,
    y: BigUint,
}

#[derive(Clone, Debug)]
pub struct PrivateKey {
    pk: PublicKey,
    x: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

impl DomainParameters {
    pub fn new_uncheck(p: BigUint, q: BigUint, g: BigUint) -> Self {
        Self { p, q, g }
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Generate fresh `(L, N)` domain parameters.
    ///
    /// For each random `N`-bit prime `q` up to `4L` candidates $X$ with the top bit set are tried,
    /// $p = X - (X \mod 2q) + 1$ is kept once it has `L` bits and is prime. The generator is
    /// $g = h^{(p-1)/q} \mod p$ for the smallest $h \ge 2$ giving $g \ne 1$.
    pub fn generate<R: Rand>(
        l_bits: usize,
        n_bits: usize,
        prime_test_rounds: usize,
        rng: &mut R,
    ) -> Result<Self, CipherError> {
        if n_bits < 16 || l_bits <= n_bits {
            return Err(CipherError::Other(format!(
                "dsa: invalid domain parameter sizes L=`{l_bits}`, N=`{n_bits}`"
            )));
        }

        let (p, q) = 'found: loop {
            let q = BigUintExt::<BigUint>::generate_prime(n_bits, prime_test_rounds, rng)?;
            let two_q = &q << 1;

            for _ in 0..(4 * l_bits) {
                let x = BigUintExt::<BigUint>::generate_with_top_bit(l_bits, rng);
                let p: BigUint = &x - (&x % &two_q) + 1u32;
                if p.bits() as usize != l_bits {
                    continue;
                }

                if BigUintExt(&p).probably_prime_test(prime_test_rounds, rng) {
                    break 'found (p, q);
                }
            }
        };

        let e = (&p - 1u32) / &q;
        let mut h = BigUint::from(2u8);
        let g = loop {
            let g = h.modpow(&e, &p);
            if !g.is_one() {
                break g;
            }
            h += 1u32;
        };

        Ok(Self { p, q, g })
    }

    pub fn is_valid(&self) -> Result<(), CipherError> {
        let one = BigUint::one();
        if self.q.is_zero() || !((&self.p - &one) % &self.q).is_zero() {
            return Err(CipherError::InvalidPublicKey(
                "dsa: q does not divide p - 1".to_string(),
            ));
        }

        if self.g <= one || self.g >= self.p || !self.g.modpow(&self.q, &self.p).is_one() {
            return Err(CipherError::InvalidPublicKey(
                "dsa: g is not a generator of the order q subgroup".to_string(),
            ));
        }

        Ok(())
    }

    // leftmost min(N, outlen) bits of the digest
    fn digest_to_int(&self, digest: &[u8]) -> BigUint {
        let n_bits = self.q.bits() as usize;
        let n_bytes = (n_bits + 7) >> 3;
        let z = BigUint::from_bytes_be(&digest[..digest.len().min(n_bytes)]);
        let excess = (digest.len().min(n_bytes) << 3).saturating_sub(n_bits);
        z >> excess
    }
}

impl PublicKey {
    pub fn new_uncheck(dp: DomainParameters, y: BigUint) -> Self {
        Self { dp, y }
    }

    pub fn domain(&self) -> &DomainParameters {
        &self.dp
    }

    pub fn y(&self) -> &BigUint {
        &self.y
    }

    pub fn verify(&self, digest: &[u8], sig: &Signature) -> Result<(), CipherError> {
        let (p, q, g) = (&self.dp.p, &self.dp.q, &self.dp.g);
        if sig.r.is_zero() || sig.s.is_zero() || &sig.r >= q || &sig.s >= q {
            return Err(CipherError::Other("dsa: signature out of range".to_string()));
        }

        let w = BigUintExt(&sig.s)
            .modinv(q)
            .ok_or_else(|| CipherError::Other("dsa: s is not invertible".to_string()))?;
        let z = self.dp.digest_to_int(digest);
        let (u1, u2) = ((z * &w) % q, (&sig.r * &w) % q);
        let v = ((g.modpow(&u1, p) * self.y.modpow(&u2, p)) % p) % q;

        if v == sig.r {
            Ok(())
        } else {
            Err(CipherError::Other("dsa: signature mismatch".to_string()))
        }
    }
}

impl PrivateKey {
    /// uniform $x \in [1, q)$ and $y = g^x$
    pub fn generate<R: Rand>(dp: DomainParameters, rng: &mut R) -> Result<Self, CipherError> {
        dp.is_valid()?;
        let x = BigUintExt(&dp.q).gen_random_from(&BigUint::one(), rng);
        let y = dp.g.modpow(&x, &dp.p);
        Ok(Self {
            pk: PublicKey::new_uncheck(dp, y),
            x,
        })
    }

    pub fn from_components(pk: PublicKey, x: BigUint) -> Result<Self, CipherError> {
        if x.is_zero() || &x >= pk.dp.q() || pk.dp.g.modpow(&x, &pk.dp.p) != pk.y {
            return Err(CipherError::InvalidPrivateKey(
                "dsa: x does not match the public key".to_string(),
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

    /// sign an already hashed message, digests longer than `q` are truncated
    pub fn sign<R: Rand>(&self, digest: &[u8], rng: &mut R) -> Result<Signature, CipherError> {
        let (p, q, g) = (&self.pk.dp.p, &self.pk.dp.q, &self.pk.dp.g);
        let z = self.pk.dp.digest_to_int(digest);
        let one = BigUint::one();

        loop {
            let k = BigUintExt(q).gen_random_from(&one, rng);
            let r = g.modpow(&k, p) % q;
            if r.is_zero() {
                continue;
            }

            let Some(k_inv) = BigUintExt(&k).modinv(q) else {
                continue;
            };
            let s = (k_inv * ((&z + &self.x * &r) % q)) % q;
            if !s.is_zero() {
                break Ok(Signature { r, s });
            }
        }
    }
}

impl Signature {
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> &BigUint {
        &self.r
    }

    pub fn s(&self) -> &BigUint {
        &self.s
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{r: {:x}, s: {:x}}}", self.r, self.s)
    }
}
