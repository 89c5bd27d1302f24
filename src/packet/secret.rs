use super::key::{KeyMaterial, PublicKey, PublicKeyAlgorithm};
use super::{read_mpi, read_u16, read_u8, take, write_mpi, HASH_SHA1, HASH_SHA256, SYM_AES128};
use crate::error::{PgpError, Result};
use crate::passphrase::Passphrase;
use cipher::block_cipher::AES128;
use cipher::cfb::Aes128Cfb;
use cipher::{dsa, elgamal, rsa, CipherError, Rand};
use num_bigint::BigUint;
use sha1::Sha1;
use sha2::{Digest, Sha256};
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

// secret material is encrypted and followed by a SHA-1 of the plaintext MPIs
const USAGE_SHA1_CHECK: u8 = 254;
const USAGE_SUM16_CHECK: u8 = 255;

/// String-to-key specifier (RFC 4880 §3.7), iterated and salted when we write it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S2k {
    kind: u8,
    hash_algo: u8,
    salt: [u8; 8],
    count: u8,
}

impl S2k {
    pub fn iterated<R: Rand>(count: u8, rng: &mut R) -> Self {
        let mut salt = [0u8; 8];
        rng.rand(&mut salt);
        Self {
            kind: 3,
            hash_algo: HASH_SHA256,
            salt,
            count,
        }
    }

    fn parse(buf: &mut &[u8]) -> Result<Self> {
        let kind = read_u8(buf)?;
        let hash_algo = read_u8(buf)?;
        let (mut salt, mut count) = ([0u8; 8], 0);
        match kind {
            0 => {}
            1 => salt.copy_from_slice(take(buf, 8)?),
            3 => {
                salt.copy_from_slice(take(buf, 8)?);
                count = read_u8(buf)?;
            }
            k => {
                return Err(PgpError::parse(format!("unsupported s2k specifier `{k}`")));
            }
        }

        Ok(Self {
            kind,
            hash_algo,
            salt,
            count,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.kind, self.hash_algo]);
        if self.kind != 0 {
            out.extend_from_slice(&self.salt);
        }
        if self.kind == 3 {
            out.push(self.count);
        }
    }

    /// number of octets hashed by the iterated form
    pub fn decoded_count(&self) -> usize {
        (16 + (self.count as usize & 15)) << ((self.count as usize >> 4) + 6)
    }

    fn hash_input<D: Digest>(&self, pass: &[u8]) -> Vec<u8> {
        let mut h = D::new();
        match self.kind {
            0 => h.update(pass),
            1 => {
                h.update(self.salt);
                h.update(pass);
            }
            _ => {
                let unit = self.salt.len() + pass.len();
                let mut left = self.decoded_count().max(unit);
                while left >= unit {
                    h.update(self.salt);
                    h.update(pass);
                    left -= unit;
                }
                if left > 0 {
                    let tail = [&self.salt[..], pass].concat();
                    h.update(&tail[..left]);
                }
            }
        }
        h.finalize().to_vec()
    }

    /// AES-128 key derived from the passphrase
    pub fn derive_key(&self, passphrase: &Passphrase) -> Result<[u8; 16]> {
        let mut digest = match self.hash_algo {
            HASH_SHA256 => self.hash_input::<Sha256>(passphrase.as_bytes()),
            HASH_SHA1 => self.hash_input::<Sha1>(passphrase.as_bytes()),
            h => {
                return Err(PgpError::parse(format!(
                    "unsupported s2k hash algorithm `{h}`"
                )))
            }
        };

        let mut key = [0u8; 16];
        key.copy_from_slice(&digest[..16]);
        #[cfg(feature = "sec-zeroize")]
        digest.zeroize();
        #[cfg(not(feature = "sec-zeroize"))]
        digest.clear();
        Ok(key)
    }
}

/// Plaintext secret MPIs.
#[derive(Clone)]
pub enum SecretParams {
    /// `d`, `p`, `q` with p < q and `u = p^{-1} mod q`
    Rsa {
        d: BigUint,
        p: BigUint,
        q: BigUint,
        u: BigUint,
    },
    Dsa { x: BigUint },
    ElGamal { x: BigUint },
}

impl SecretParams {
    pub fn from_rsa(key: &rsa::PrivateKey) -> std::result::Result<Self, CipherError> {
        Ok(Self::Rsa {
            d: key.exponent().clone(),
            p: key.prime_p().clone(),
            q: key.prime_q().clone(),
            u: key.coefficient()?,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024);
        match self {
            Self::Rsa { d, p, q, u } => {
                for x in [d, p, q, u] {
                    write_mpi(&mut out, x);
                }
            }
            Self::Dsa { x } | Self::ElGamal { x } => write_mpi(&mut out, x),
        }
        out
    }

    fn parse(algorithm: PublicKeyAlgorithm, buf: &mut &[u8]) -> Result<Self> {
        match &algorithm {
            PublicKeyAlgorithm::RsaEncryptSign
            | PublicKeyAlgorithm::RsaEncrypt
            | PublicKeyAlgorithm::RsaSign => Ok(Self::Rsa {
                d: read_mpi(buf)?,
                p: read_mpi(buf)?,
                q: read_mpi(buf)?,
                u: read_mpi(buf)?,
            }),
            PublicKeyAlgorithm::Dsa => Ok(Self::Dsa { x: read_mpi(buf)? }),
            PublicKeyAlgorithm::ElGamalEncrypt | PublicKeyAlgorithm::ElGamalEncryptSign => {
                Ok(Self::ElGamal { x: read_mpi(buf)? })
            }
            a => Err(PgpError::parse(format!(
                "no secret key support for algorithm {a:?}"
            ))),
        }
    }
}

/// A secret key ready for use.
#[derive(Clone, Debug)]
pub enum UnlockedKey {
    Rsa(rsa::PrivateKey),
    Dsa(dsa::PrivateKey),
    ElGamal(elgamal::PrivateKey),
}

impl UnlockedKey {
    fn assemble(public: &PublicKey, params: SecretParams) -> Result<Self> {
        let bad = |e: CipherError| PgpError::parse(format!("corrupt secret key: {e}"));
        match (public.material(), params) {
            (KeyMaterial::Rsa { n, e }, SecretParams::Rsa { d, p, q, .. }) => Ok(Self::Rsa(
                rsa::PrivateKey::from_components(n.clone(), e.clone(), d, p, q).map_err(bad)?,
            )),
            (KeyMaterial::Dsa { .. }, SecretParams::Dsa { x }) => {
                let pk = public
                    .dsa_key()
                    .ok_or_else(|| PgpError::parse("dsa key material expected"))?;
                Ok(Self::Dsa(dsa::PrivateKey::from_components(pk, x).map_err(bad)?))
            }
            (KeyMaterial::ElGamal { .. }, SecretParams::ElGamal { x }) => {
                let pk = public
                    .elgamal_key()
                    .ok_or_else(|| PgpError::parse("elgamal key material expected"))?;
                Ok(Self::ElGamal(
                    elgamal::PrivateKey::from_components(pk, x).map_err(bad)?,
                ))
            }
            _ => Err(PgpError::parse(
                "secret parameters do not match the public key",
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Protection {
    /// secret MPIs followed by their 16-bit sum
    Clear(Vec<u8>),
    Encrypted {
        usage: u8,
        sym_algo: u8,
        s2k: S2k,
        iv: Vec<u8>,
        data: Vec<u8>,
    },
}

/// V4 secret key (or subkey) packet, the secret part stays encrypted until [`SecretKey::unlock`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    public: PublicKey,
    protection: Protection,
}

impl SecretKey {
    /// Encrypt `params` under `passphrase`: iterated and salted SHA-256 S2K, AES-128 CFB,
    /// SHA-1 integrity check over the MPIs.
    pub fn protect<R: Rand>(
        public: PublicKey,
        params: &SecretParams,
        passphrase: &Passphrase,
        s2k_count: u8,
        rng: &mut R,
    ) -> Result<Self> {
        let s2k = S2k::iterated(s2k_count, rng);
        let mut key = s2k.derive_key(passphrase)?;
        let mut iv = [0u8; 16];
        rng.rand(&mut iv);

        let mut data = params.to_bytes();
        let check = Sha1::digest(&data);
        data.extend_from_slice(&check);
        Aes128Cfb::new(AES128::new(&key), iv).encrypt(&mut data);
        #[cfg(feature = "sec-zeroize")]
        key.zeroize();

        Ok(Self {
            public,
            protection: Protection::Encrypted {
                usage: USAGE_SHA1_CHECK,
                sym_algo: SYM_AES128,
                s2k,
                iv: iv.to_vec(),
                data,
            },
        })
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        let buf = &mut &body[..];
        let public = PublicKey::parse(buf)?;
        let usage = read_u8(buf)?;
        let protection = match usage {
            0 => Protection::Clear(buf.to_vec()),
            USAGE_SHA1_CHECK | USAGE_SUM16_CHECK => {
                let sym_algo = read_u8(buf)?;
                let s2k = S2k::parse(buf)?;
                let iv_len = if sym_algo == SYM_AES128 { 16 } else { 8 };
                let iv = take(buf, iv_len)?.to_vec();
                Protection::Encrypted {
                    usage,
                    sym_algo,
                    s2k,
                    iv,
                    data: buf.to_vec(),
                }
            }
            u => {
                return Err(PgpError::parse(format!(
                    "unsupported secret key protection `{u}`"
                )))
            }
        };

        Ok(Self { public, protection })
    }

    pub fn to_body(&self) -> Vec<u8> {
        let mut out = self.public.to_body();
        match &self.protection {
            Protection::Clear(data) => {
                out.push(0);
                out.extend_from_slice(data);
            }
            Protection::Encrypted {
                usage,
                sym_algo,
                s2k,
                iv,
                data,
            } => {
                out.extend_from_slice(&[*usage, *sym_algo]);
                s2k.write(&mut out);
                out.extend_from_slice(iv);
                out.extend_from_slice(data);
            }
        }
        out
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.protection, Protection::Encrypted { .. })
    }

    /// Decrypt the secret material, a wrong passphrase shows up as a checksum mismatch.
    pub fn unlock(&self, passphrase: &Passphrase) -> Result<UnlockedKey> {
        let key_id = self.public.key_id();
        let mut plain = match &self.protection {
            Protection::Clear(data) => data.clone(),
            Protection::Encrypted {
                sym_algo,
                s2k,
                iv,
                data,
                ..
            } => {
                if *sym_algo != SYM_AES128 {
                    return Err(PgpError::parse(format!(
                        "unsupported secret key cipher `{sym_algo}`"
                    )));
                }

                let mut key = s2k.derive_key(passphrase)?;
                let iv: [u8; 16] = iv
                    .as_slice()
                    .try_into()
                    .map_err(|_| PgpError::parse("secret key iv length"))?;
                let mut plain = data.clone();
                Aes128Cfb::new(AES128::new(&key), iv).decrypt(&mut plain);
                #[cfg(feature = "sec-zeroize")]
                key.zeroize();
                plain
            }
        };

        let usage = match &self.protection {
            Protection::Clear(_) => 0,
            Protection::Encrypted { usage, .. } => *usage,
        };
        let mpis_len = match verify_checksum(&plain, usage) {
            Some(len) => len,
            None => {
                scrub(&mut plain);
                return Err(PgpError::BadPassphrase(key_id));
            }
        };

        let params = SecretParams::parse(self.public.algorithm(), &mut &plain[..mpis_len]);
        scrub(&mut plain);
        UnlockedKey::assemble(&self.public, params?)
    }
}

// length of the MPI part when the trailing check matches
fn verify_checksum(plain: &[u8], usage: u8) -> Option<usize> {
    if usage == USAGE_SHA1_CHECK {
        let len = plain.len().checked_sub(20)?;
        (Sha1::digest(&plain[..len]).as_slice() == &plain[len..]).then_some(len)
    } else {
        let len = plain.len().checked_sub(2)?;
        let sum = plain[..len]
            .iter()
            .fold(0u16, |acc, &x| acc.wrapping_add(x as u16));
        let expect = read_u16(&mut &plain[len..]).ok()?;
        (sum == expect).then_some(len)
    }
}

fn scrub(buf: &mut Vec<u8>) {
    #[cfg(feature = "sec-zeroize")]
    buf.zeroize();
    #[cfg(not(feature = "sec-zeroize"))]
    buf.clear();
}

#[cfg(test)]
mod tests {
    use super::{S2k, SecretKey, SecretParams, UnlockedKey};
    use crate::error::PgpError;
    use crate::packet::PublicKey;
    use crate::passphrase::Passphrase;
    use crate::testkit;
    use cipher::DefaultRand;

    #[test]
    fn s2k_count_coding() {
        let mut rng = DefaultRand::default();
        assert_eq!(S2k::iterated(0x60, &mut rng).decoded_count(), 65536);
        assert_eq!(S2k::iterated(0xff, &mut rng).decoded_count(), 65011712);
        assert_eq!(S2k::iterated(0x00, &mut rng).decoded_count(), 1024);
    }

    #[test]
    fn s2k_is_deterministic_per_salt() {
        let mut rng = DefaultRand::default();
        let s2k = S2k::iterated(0x10, &mut rng);
        let p = Passphrase::from("correct-horse");
        assert_eq!(s2k.derive_key(&p).unwrap(), s2k.derive_key(&p).unwrap());
        assert_ne!(
            s2k.derive_key(&p).unwrap(),
            s2k.derive_key(&Passphrase::from("battery-staple")).unwrap()
        );
        assert_ne!(
            s2k.derive_key(&p).unwrap(),
            S2k::iterated(0x10, &mut rng).derive_key(&p).unwrap()
        );
    }

    #[test]
    fn s2k_known_answer() {
        // gpg --symmetric --s2k-mode 3 --s2k-digest-algo SHA256 --s2k-count 65536
        let s2k = S2k {
            kind: 3,
            hash_algo: 8,
            salt: [0x69, 0xe4, 0x18, 0xfb, 0x45, 0x24, 0x5f, 0x5b],
            count: 0x60,
        };
        let key = s2k.derive_key(&Passphrase::from("correct-horse")).unwrap();
        assert_eq!(
            key,
            [
                0x5c, 0x16, 0x71, 0xce, 0x89, 0x46, 0xbd, 0xd6, 0x22, 0xce, 0xfd, 0xd7, 0x23, 0x1c,
                0x2a, 0x8c
            ]
        );
    }

    #[test]
    fn protect_and_unlock() {
        let mut rng = DefaultRand::default();
        let key = testkit::rsa_1024();
        let public = PublicKey::from_rsa(1_700_000_000, key.public_key());
        let params = SecretParams::from_rsa(key).unwrap();
        let secret =
            SecretKey::protect(public, &params, &Passphrase::from("pw"), 0x10, &mut rng).unwrap();
        assert!(secret.is_protected());

        let parsed = SecretKey::from_body(&secret.to_body()).unwrap();
        assert_eq!(parsed, secret);

        match parsed.unlock(&Passphrase::from("pw")).unwrap() {
            UnlockedKey::Rsa(k) => assert_eq!(k.exponent(), key.exponent()),
            k => panic!("unexpected key {k:?}"),
        }

        let err = parsed.unlock(&Passphrase::from("wrong")).unwrap_err();
        assert!(matches!(err, PgpError::BadPassphrase(id) if id == secret.public_key().key_id()));
    }
}
