use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::Rand;
use std::borrow::Borrow;
use std::ops::Deref;
use std::sync::OnceLock;
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

/// Extension methods over a borrowed or owned `BigUint`.
pub struct BigUintExt<T: Borrow<BigUint>>(pub T);

impl<T: Borrow<BigUint>> Deref for BigUintExt<T> {
    type Target = BigUint;
    fn deref(&self) -> &Self::Target {
        self.0.borrow()
    }
}

/// Miller-Rabin rounds needed so that a composite passes with probability at most
/// $2^{-certainty}$ (each round errs with probability at most 1/4).
pub fn rounds_for_certainty(certainty: usize) -> usize {
    ((certainty + 1) >> 1).max(1)
}

// odd primes below 2048, used to sieve candidates before any modpow
fn small_primes() -> &'static [u32] {
    static PRIMES: OnceLock<Vec<u32>> = OnceLock::new();
    PRIMES.get_or_init(|| {
        const LIMIT: usize = 2048;
        let mut composite = vec![false; LIMIT];
        let mut primes = Vec::with_capacity(320);
        for i in 2..LIMIT {
            if composite[i] {
                continue;
            }
            if i != 2 {
                primes.push(i as u32);
            }
            let mut j = i * i;
            while j < LIMIT {
                composite[j] = true;
                j += i;
            }
        }
        primes
    })
}

impl<T: Borrow<BigUint>> BigUintExt<T> {
    /// self * inv = 1 \mod modulus
    pub fn modinv(&self, modulus: &BigUint) -> Option<BigUint> {
        if modulus.is_zero() {
            return None;
        }

        let (a, n) = (
            BigInt::from(self.deref() % modulus),
            BigInt::from(modulus.clone()),
        );
        let g = a.extended_gcd(&n);
        if !g.gcd.is_one() {
            return None;
        }

        (((g.x % &n) + &n) % &n).to_biguint()
    }

    /// uniform random number in `[0, self)`, `self` must not be zero
    pub fn gen_random<R: Rand>(&self, rng: &mut R) -> BigUint {
        let bits = self.bits() as usize;
        if bits == 0 {
            return BigUint::zero();
        }

        let mut n = vec![0u8; (bits + 7) >> 3];
        let excess = (n.len() << 3) - bits;
        loop {
            rng.rand(n.as_mut_slice());
            if let Some(x) = n.first_mut() {
                *x &= 0xffu8 >> excess;
            }

            let r = BigUint::from_bytes_be(n.as_slice());
            if &r < self.deref() {
                #[cfg(feature = "sec-zeroize")]
                n.zeroize();
                return r;
            }
        }
    }

    /// uniform random number in `[low, self)`
    pub fn gen_random_from<R: Rand>(&self, low: &BigUint, rng: &mut R) -> BigUint {
        if low >= self.deref() {
            return low.clone();
        }

        let span = self.deref() - low;
        BigUintExt(&span).gen_random(rng) + low
    }

    /// `bytes_len` big-endian bytes, left padded with zero (I2OSP)
    pub fn to_bytes_be_padded(&self, bytes_len: usize) -> Option<Vec<u8>> {
        let b = self.to_bytes_be();
        if self.is_zero() {
            return Some(vec![0u8; bytes_len]);
        }

        if b.len() > bytes_len {
            return None;
        }

        let mut out = vec![0u8; bytes_len - b.len()];
        out.extend_from_slice(&b);
        Some(out)
    }

    /// Probable prime test: trial division by the odd primes below 2048, then
    /// `test_rounds` Miller-Rabin rounds with random bases.
    ///
    /// For any odd number n > 2 the probability that a composite passes is at most $4^{-test\_rounds}$.
    pub fn probably_prime_test<Rng: Rand>(&self, test_rounds: usize, rng: &mut Rng) -> bool {
        let n = self.deref();
        if n.bits() <= 11 {
            return match n.to_u32() {
                Some(2) => true,
                Some(x) => small_primes().binary_search(&x).is_ok(),
                None => false,
            };
        } else if n.is_even() {
            return false;
        }

        for &p in small_primes() {
            if (n % p).is_zero() {
                return false;
            }
        }

        self.prime_validate_by_miller_rabin(test_rounds, rng)
    }

    /// `n` is composite when `a` is a witness, n - 1 = 2^s * r
    fn miller_rabin_witness(&self, s: u64, r: &BigUint, n_m1: &BigUint, a: &BigUint) -> bool {
        let n = self.deref();
        let mut y = a.modpow(r, n);
        if y.is_one() || &y == n_m1 {
            return false;
        }

        for _ in 1..s {
            y = (&y * &y) % n;
            if &y == n_m1 {
                return false;
            }
            if y.is_one() {
                return true;
            }
        }

        true
    }

    /// Miller-Rabin test, the caller guarantees `self` is an odd number greater than 3.
    pub fn prime_validate_by_miller_rabin<Rng: Rand>(&self, t: usize, rng: &mut Rng) -> bool {
        let n_m1 = self.deref() - 1u32;
        let s = n_m1.trailing_zeros().unwrap_or(0);
        let r = &n_m1 >> s;
        let (two, n_m2) = (BigUint::from(2u8), self.deref() - 2u32);

        for _ in 0..t.max(1) {
            // a in [2, n-2)
            let a = BigUintExt(&n_m2).gen_random_from(&two, rng);
            if self.miller_rabin_witness(s, &r, &n_m1, &a) {
                return false;
            }
        }

        true
    }

    /// random number of exactly `bits_len` bits, the top bit is set
    pub fn generate_with_top_bit<Rng: Rand>(bits_len: usize, rng: &mut Rng) -> BigUint {
        let mut p = vec![0u8; (bits_len + 7) >> 3];
        rng.rand(p.as_mut_slice());

        let b = if (bits_len & 7) == 0 { 8 } else { bits_len & 7 };
        if let Some(x) = p.first_mut() {
            *x &= 0xffu8 >> (8 - b);
            *x |= 1 << (b - 1);
        }

        let n = BigUint::from_bytes_be(p.as_slice());
        #[cfg(feature = "sec-zeroize")]
        p.zeroize();
        n
    }

    /// Generate a prime with exactly `bits_len` bits whose two most significant bits are set,
    /// so that the product of two such primes is never one bit short.
    ///
    /// A random odd start is sieved against the small primes and walked upward in steps of two,
    /// only survivors of the sieve pay for Miller-Rabin rounds.
    pub fn generate_prime<Rng: Rand>(
        bits_len: usize,
        test_round_num: usize,
        rng: &mut Rng,
    ) -> Result<BigUint, String> {
        if bits_len < 16 {
            return Err(format!("prime size must at least 16-bits, got `{bits_len}`"));
        }

        let primes = small_primes();
        let mut p = vec![0u8; (bits_len + 7) >> 3];
        let b = if (bits_len & 7) == 0 { 8 } else { bits_len & 7 };
        let mut residues = Vec::with_capacity(primes.len());

        loop {
            rng.rand(p.as_mut_slice());

            if let Some(x) = p.first_mut() {
                *x &= 0xffu8 >> (8 - b);
                if b >= 2 {
                    *x |= 3 << (b - 2);
                } else {
                    *x |= 1;
                }
            }
            if b < 2 {
                if let Some(x) = p.get_mut(1) {
                    *x |= 0x80;
                }
            }
            if let Some(x) = p.last_mut() {
                *x |= 1;
            }

            let base = BigUint::from_bytes_be(p.as_slice());
            residues.clear();
            residues.extend(
                primes
                    .iter()
                    .map(|&prime| (&base % prime).to_u32().unwrap_or_default()),
            );

            'next_delta: for delta in (0u32..(1 << 16)).step_by(2) {
                for (&prime, &r) in primes.iter().zip(residues.iter()) {
                    if (r + delta) % prime == 0 {
                        continue 'next_delta;
                    }
                }

                let candidate = &base + delta;
                if candidate.bits() as usize != bits_len {
                    break;
                }

                if BigUintExt(&candidate).prime_validate_by_miller_rabin(test_round_num, rng) {
                    #[cfg(feature = "sec-zeroize")]
                    p.zeroize();
                    return Ok(candidate);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{rounds_for_certainty, BigUintExt};
    use num_bigint::BigUint;
    use num_traits::{Num, One};
    use rand::DefaultRand;

    #[test]
    fn gen_prime_bits() {
        let mut rng = DefaultRand::default();
        for bits_len in [16, 33, 64, 160, 256] {
            let p = BigUintExt::<BigUint>::generate_prime(bits_len, 20, &mut rng).unwrap();
            assert_eq!(p.bits() as usize, bits_len);
            assert!(BigUintExt(&p).probably_prime_test(20, &mut rng));
        }

        assert!(BigUintExt::<BigUint>::generate_prime(8, 20, &mut rng).is_err());
    }

    #[test]
    fn composite_validate() {
        let cases = [
            "0",
            "1",
            "4",
            "2047",
            "21284175091214687912771199898307297748211672914763848041968395774954376176754",
            "6084766654921918907427900243509372380954290099172559290432744450051395395951",
            "84594350493221918389213352992032324280367711247940675652888030554255915464401",
            "82793403787388584738507275144194252681",
            // strong pseudoprime to prime bases 2 through 29
            "1195068768795265792518361315725116351898245581",
            // Carmichael numbers
            "561",
            "41041",
            "825265",
            "3673744903",
            "3281593591",
            "2385076987",
            "2738053141",
            "2009621503",
            "1502682721",
            "255866131",
            "117987841",
            "587861",
        ];

        let (test_rounds, mut rng) = (20, DefaultRand::default());
        for s in cases {
            let composite = BigUint::from_str_radix(s, 10).unwrap();
            assert!(
                !BigUintExt(composite).probably_prime_test(test_rounds, &mut rng),
                "composite `{}` test failed",
                s
            );
        }
    }

    #[test]
    fn prime_validate() {
        let cases = [
            "2",
            "3",
            "5",
            "2039",
            "13756265695458089029",
            "13496181268022124907",
            "10953742525620032441",
            "17908251027575790097",
            "18699199384836356663",
            "98920366548084643601728869055592650835572950932266967461790948584315647051443",
            "94560208308847015747498523884063394671606671904944666360068158221458669711639",
            // Curve25519: 2^255-19
            "57896044618658097711785492504343953926634992332820282019728792003956564819949",
        ];

        let (test_rounds, mut rng) = (20usize, DefaultRand::default());
        for s in cases {
            let prime = BigUint::from_str_radix(s, 10).unwrap();
            assert!(
                BigUintExt(prime).probably_prime_test(test_rounds, &mut rng),
                "prime `{}` test failed",
                s
            );
        }
    }

    #[test]
    fn modinv_and_padding() {
        let (a, m) = (BigUint::from(3u32), BigUint::from(11u32));
        let inv = BigUintExt(&a).modinv(&m).unwrap();
        assert!(((&a * &inv) % &m).is_one());
        assert!(BigUintExt(BigUint::from(6u32))
            .modinv(&BigUint::from(9u32))
            .is_none());

        let x = BigUint::from(0x0102u32);
        assert_eq!(BigUintExt(&x).to_bytes_be_padded(4).unwrap(), vec![0, 0, 1, 2]);
        assert!(BigUintExt(&x).to_bytes_be_padded(1).is_none());
    }

    #[test]
    fn random_in_range() {
        let mut rng = DefaultRand::default();
        let (low, high) = (BigUint::from(1000u32), BigUint::from(1003u32));
        for _ in 0..64 {
            let r = BigUintExt(&high).gen_random_from(&low, &mut rng);
            assert!(r >= low && r < high);
        }

        let r = BigUintExt::<BigUint>::generate_with_top_bit(161, &mut rng);
        assert_eq!(r.bits(), 161);
    }

    #[test]
    fn certainty_rounds() {
        assert_eq!(rounds_for_certainty(25), 13);
        assert_eq!(rounds_for_certainty(80), 40);
        assert_eq!(rounds_for_certainty(0), 1);
    }
}
