use super::{read_mpi, read_u32, read_u8, write_mpi};
use crate::error::{PgpError, Result};
use chrono::{DateTime, TimeZone, Utc};
use cipher::{dsa, elgamal, rsa};
use num_bigint::BigUint;
use sha1::{Digest, Sha1};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicKeyAlgorithm {
    RsaEncryptSign,
    RsaEncrypt,
    RsaSign,
    ElGamalEncrypt,
    Dsa,
    Ecdh,
    Ecdsa,
    ElGamalEncryptSign,
    EdDsa,
    Other(u8),
}

impl PublicKeyAlgorithm {
    pub fn id(self) -> u8 {
        match self {
            Self::RsaEncryptSign => 1,
            Self::RsaEncrypt => 2,
            Self::RsaSign => 3,
            Self::ElGamalEncrypt => 16,
            Self::Dsa => 17,
            Self::Ecdh => 18,
            Self::Ecdsa => 19,
            Self::ElGamalEncryptSign => 20,
            Self::EdDsa => 22,
            Self::Other(x) => x,
        }
    }

    pub fn can_encrypt(self) -> bool {
        matches!(
            self,
            Self::RsaEncryptSign
                | Self::RsaEncrypt
                | Self::ElGamalEncrypt
                | Self::ElGamalEncryptSign
                | Self::Ecdh
        )
    }
}

impl From<u8> for PublicKeyAlgorithm {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::RsaEncryptSign,
            2 => Self::RsaEncrypt,
            3 => Self::RsaSign,
            16 => Self::ElGamalEncrypt,
            17 => Self::Dsa,
            18 => Self::Ecdh,
            19 => Self::Ecdsa,
            20 => Self::ElGamalEncryptSign,
            22 => Self::EdDsa,
            x => Self::Other(x),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMaterial {
    Rsa { n: BigUint, e: BigUint },
    Dsa { p: BigUint, q: BigUint, g: BigUint, y: BigUint },
    ElGamal { p: BigUint, g: BigUint, y: BigUint },
    /// algorithms this crate cannot operate on, kept verbatim so fingerprints stay right
    Opaque(Vec<u8>),
}

impl KeyMaterial {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Rsa { n, e } => {
                write_mpi(out, n);
                write_mpi(out, e);
            }
            Self::Dsa { p, q, g, y } => {
                for x in [p, q, g, y] {
                    write_mpi(out, x);
                }
            }
            Self::ElGamal { p, g, y } => {
                for x in [p, g, y] {
                    write_mpi(out, x);
                }
            }
            Self::Opaque(raw) => out.extend_from_slice(raw),
        }
    }
}

/// V4 public key (or subkey) packet body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    created: u32,
    algorithm: PublicKeyAlgorithm,
    material: KeyMaterial,
}

impl PublicKey {
    pub fn new(created: u32, algorithm: PublicKeyAlgorithm, material: KeyMaterial) -> Self {
        Self {
            created,
            algorithm,
            material,
        }
    }

    pub fn from_rsa(created: u32, key: &rsa::PublicKey) -> Self {
        Self::new(
            created,
            PublicKeyAlgorithm::RsaEncryptSign,
            KeyMaterial::Rsa {
                n: key.modules().clone(),
                e: key.exponent().clone(),
            },
        )
    }

    pub fn from_dsa(created: u32, key: &dsa::PublicKey) -> Self {
        let dp = key.domain();
        Self::new(
            created,
            PublicKeyAlgorithm::Dsa,
            KeyMaterial::Dsa {
                p: dp.p().clone(),
                q: dp.q().clone(),
                g: dp.g().clone(),
                y: key.y().clone(),
            },
        )
    }

    pub fn from_elgamal(created: u32, key: &elgamal::PublicKey) -> Self {
        Self::new(
            created,
            PublicKeyAlgorithm::ElGamalEncrypt,
            KeyMaterial::ElGamal {
                p: key.p().clone(),
                g: key.g().clone(),
                y: key.y().clone(),
            },
        )
    }

    /// Parse a packet body, `buf` is advanced past the public part so secret key packets
    /// can continue from there.
    pub fn parse(buf: &mut &[u8]) -> Result<Self> {
        let version = read_u8(buf)?;
        if version != 4 {
            return Err(PgpError::parse(format!(
                "unsupported key packet version `{version}`"
            )));
        }

        let created = read_u32(buf)?;
        let algorithm = PublicKeyAlgorithm::from(read_u8(buf)?);
        let material = match algorithm {
            PublicKeyAlgorithm::RsaEncryptSign
            | PublicKeyAlgorithm::RsaEncrypt
            | PublicKeyAlgorithm::RsaSign => KeyMaterial::Rsa {
                n: read_mpi(buf)?,
                e: read_mpi(buf)?,
            },
            PublicKeyAlgorithm::Dsa => KeyMaterial::Dsa {
                p: read_mpi(buf)?,
                q: read_mpi(buf)?,
                g: read_mpi(buf)?,
                y: read_mpi(buf)?,
            },
            PublicKeyAlgorithm::ElGamalEncrypt | PublicKeyAlgorithm::ElGamalEncryptSign => {
                KeyMaterial::ElGamal {
                    p: read_mpi(buf)?,
                    g: read_mpi(buf)?,
                    y: read_mpi(buf)?,
                }
            }
            // public keys only, nothing follows in a public packet
            _ => {
                let raw = buf.to_vec();
                *buf = &[];
                KeyMaterial::Opaque(raw)
            }
        };

        Ok(Self {
            created,
            algorithm,
            material,
        })
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        Self::parse(&mut &body[..])
    }

    pub fn to_body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);
        out.push(4);
        out.extend_from_slice(&self.created.to_be_bytes());
        out.push(self.algorithm.id());
        self.material.write(&mut out);
        out
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn created(&self) -> u32 {
        self.created
    }

    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created as i64, 0).single()
    }

    /// `0x99 || len16 || body`, the form keys take inside fingerprints and signature hashes
    pub fn hash_prefix_bytes(&self) -> Vec<u8> {
        let body = self.to_body();
        let mut out = Vec::with_capacity(body.len() + 3);
        out.push(0x99);
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend(body);
        out
    }

    pub fn fingerprint(&self) -> [u8; 20] {
        Sha1::digest(self.hash_prefix_bytes()).into()
    }

    /// low 64 bits of the fingerprint
    pub fn key_id(&self) -> u64 {
        let fp = self.fingerprint();
        let mut id = [0u8; 8];
        id.copy_from_slice(&fp[12..]);
        u64::from_be_bytes(id)
    }

    /// modulus (or prime) size in bits
    pub fn bits(&self) -> usize {
        match &self.material {
            KeyMaterial::Rsa { n, .. } => n.bits() as usize,
            KeyMaterial::Dsa { p, .. } | KeyMaterial::ElGamal { p, .. } => p.bits() as usize,
            KeyMaterial::Opaque(_) => 0,
        }
    }

    pub fn rsa_key(&self) -> Option<rsa::PublicKey> {
        match &self.material {
            KeyMaterial::Rsa { n, e } => Some(rsa::PublicKey::new_uncheck(n.clone(), e.clone())),
            _ => None,
        }
    }

    pub fn elgamal_key(&self) -> Option<elgamal::PublicKey> {
        match &self.material {
            KeyMaterial::ElGamal { p, g, y } => Some(elgamal::PublicKey::new_uncheck(
                p.clone(),
                g.clone(),
                y.clone(),
            )),
            _ => None,
        }
    }

    pub fn dsa_key(&self) -> Option<dsa::PublicKey> {
        match &self.material {
            KeyMaterial::Dsa { p, q, g, y } => Some(dsa::PublicKey::new_uncheck(
                dsa::DomainParameters::new_uncheck(p.clone(), q.clone(), g.clone()),
                y.clone(),
            )),
            _ => None,
        }
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}/{} {:016X}",
            self.algorithm,
            self.bits(),
            self.key_id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyMaterial, PublicKey, PublicKeyAlgorithm};
    use num_bigint::BigUint;

    #[test]
    fn v4_fingerprint_layout() {
        let key = PublicKey::new(
            0x5f00_0000,
            PublicKeyAlgorithm::RsaEncryptSign,
            KeyMaterial::Rsa {
                n: BigUint::from(0xc5u32),
                e: BigUint::from(3u32),
            },
        );
        let body = key.to_body();
        assert_eq!(body, vec![4, 0x5f, 0, 0, 0, 1, 0, 8, 0xc5, 0, 2, 3]);
        assert_eq!(&key.hash_prefix_bytes()[..3], &[0x99, 0, 12]);

        let fp = key.fingerprint();
        assert_eq!(key.key_id().to_be_bytes(), fp[12..]);
        assert_eq!(PublicKey::from_body(&body).unwrap(), key);
        assert_eq!(key.creation_time().unwrap().timestamp(), 0x5f00_0000);
    }

    #[test]
    fn opaque_keys_keep_their_bytes() {
        // curve oid and point are not interpreted
        let body = vec![4, 0, 0, 0, 1, 22, 9, 0x2b, 6, 1, 4, 1, 0xda, 0x47, 0x0f, 1, 0, 7, 0x40];
        let key = PublicKey::from_body(&body).unwrap();
        assert_eq!(key.algorithm(), PublicKeyAlgorithm::EdDsa);
        assert_eq!(key.to_body(), body);
        assert!(!key.algorithm().can_encrypt());

        assert!(PublicKey::from_body(&[3, 0, 0]).is_err());
    }
}
