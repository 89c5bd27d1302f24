//! V4 signature packets, limited to the self certifications a freshly generated key ring carries.

use super::key::{PublicKey, PublicKeyAlgorithm};
use super::{read_mpi, read_u16, read_u8, take, write_mpi, HASH_SHA1, HASH_SHA256, SYM_AES128};
use crate::error::{PgpError, Result};
use cipher::rsa::PKCS1Decrypt;
use cipher::{dsa, CipherError, Rand};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// key flags subpacket bits (RFC 4880 §5.2.3.21)
pub mod key_flags {
    pub const CERTIFY: u8 = 0x01;
    pub const SIGN: u8 = 0x02;
    pub const ENCRYPT_COMMUNICATIONS: u8 = 0x04;
    pub const ENCRYPT_STORAGE: u8 = 0x08;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigType {
    GenericCertification,
    PersonaCertification,
    CasualCertification,
    PositiveCertification,
    SubkeyBinding,
    DirectKey,
    Other(u8),
}

impl SigType {
    pub fn id(self) -> u8 {
        match self {
            Self::GenericCertification => 0x10,
            Self::PersonaCertification => 0x11,
            Self::CasualCertification => 0x12,
            Self::PositiveCertification => 0x13,
            Self::SubkeyBinding => 0x18,
            Self::DirectKey => 0x1f,
            Self::Other(x) => x,
        }
    }

    /// signatures whose key flags describe the primary key
    pub fn is_primary_binding(self) -> bool {
        matches!(
            self,
            Self::GenericCertification
                | Self::PersonaCertification
                | Self::CasualCertification
                | Self::PositiveCertification
                | Self::DirectKey
        )
    }
}

impl From<u8> for SigType {
    fn from(value: u8) -> Self {
        match value {
            0x10 => Self::GenericCertification,
            0x11 => Self::PersonaCertification,
            0x12 => Self::CasualCertification,
            0x13 => Self::PositiveCertification,
            0x18 => Self::SubkeyBinding,
            0x1f => Self::DirectKey,
            x => Self::Other(x),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subpacket {
    pub kind: u8,
    pub data: Vec<u8>,
}

impl Subpacket {
    pub const CREATION_TIME: u8 = 2;
    pub const PREFERRED_SYMMETRIC: u8 = 11;
    pub const ISSUER: u8 = 16;
    pub const PREFERRED_HASH: u8 = 21;
    pub const PREFERRED_COMPRESSION: u8 = 22;
    pub const PRIMARY_USER_ID: u8 = 25;
    pub const KEY_FLAGS: u8 = 27;
    pub const FEATURES: u8 = 30;

    pub fn new(kind: u8, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    fn write(&self, out: &mut Vec<u8>) {
        // subpacket lengths share the packet length encoding and count the type octet
        out.extend(super::encode_length(self.data.len() + 1));
        out.push(self.kind);
        out.extend_from_slice(&self.data);
    }

    fn parse_area(mut area: &[u8]) -> Result<Vec<Self>> {
        let mut v = Vec::new();
        while !area.is_empty() {
            let o1 = read_u8(&mut area)? as usize;
            let len = match o1 {
                0..=191 => o1,
                192..=254 => ((o1 - 192) << 8) + read_u8(&mut area)? as usize + 192,
                _ => super::read_u32(&mut area)? as usize,
            };
            if len == 0 {
                return Err(PgpError::parse("empty signature subpacket"));
            }

            let body = take(&mut area, len)?;
            // the critical bit does not change how the content is read
            v.push(Self::new(body[0] & 0x7f, body[1..].to_vec()));
        }
        Ok(v)
    }
}

fn write_area(subpackets: &[Subpacket]) -> Vec<u8> {
    let mut area = Vec::new();
    subpackets.iter().for_each(|s| s.write(&mut area));
    area
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    version: u8,
    sig_type: SigType,
    pub_algo: PublicKeyAlgorithm,
    hash_algo: u8,
    hashed: Vec<Subpacket>,
    unhashed: Vec<Subpacket>,
    hash_prefix: [u8; 2],
    mpis: Vec<BigUint>,
}

impl Signature {
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let buf = &mut &body[..];
        let version = read_u8(buf)?;
        match version {
            3 => {
                // hashed material length, always 5
                take(buf, 1)?;
                let sig_type = SigType::from(read_u8(buf)?);
                take(buf, 12)?;
                let pub_algo = PublicKeyAlgorithm::from(read_u8(buf)?);
                let hash_algo = read_u8(buf)?;
                let prefix = take(buf, 2)?;
                Ok(Self {
                    version,
                    sig_type,
                    pub_algo,
                    hash_algo,
                    hashed: vec![],
                    unhashed: vec![],
                    hash_prefix: [prefix[0], prefix[1]],
                    mpis: Self::read_mpis(buf)?,
                })
            }
            4 => {
                let sig_type = SigType::from(read_u8(buf)?);
                let pub_algo = PublicKeyAlgorithm::from(read_u8(buf)?);
                let hash_algo = read_u8(buf)?;
                let n = read_u16(buf)? as usize;
                let hashed = Subpacket::parse_area(take(buf, n)?)?;
                let n = read_u16(buf)? as usize;
                let unhashed = Subpacket::parse_area(take(buf, n)?)?;
                let prefix = take(buf, 2)?;
                Ok(Self {
                    version,
                    sig_type,
                    pub_algo,
                    hash_algo,
                    hashed,
                    unhashed,
                    hash_prefix: [prefix[0], prefix[1]],
                    mpis: Self::read_mpis(buf)?,
                })
            }
            v => Err(PgpError::parse(format!(
                "unsupported signature version `{v}`"
            ))),
        }
    }

    fn read_mpis(buf: &mut &[u8]) -> Result<Vec<BigUint>> {
        let mut mpis = Vec::with_capacity(2);
        while !buf.is_empty() {
            mpis.push(read_mpi(buf)?);
        }
        Ok(mpis)
    }

    /// hashed part of a V4 signature: version through the hashed subpackets
    fn hashed_header(
        sig_type: SigType,
        pub_algo: PublicKeyAlgorithm,
        hash_algo: u8,
        hashed: &[Subpacket],
    ) -> Vec<u8> {
        let area = write_area(hashed);
        let mut out = vec![4, sig_type.id(), pub_algo.id(), hash_algo];
        out.extend_from_slice(&(area.len() as u16).to_be_bytes());
        out.extend(area);
        out
    }

    /// final hash of a V4 signature over `data`, with the `04 FF len32` trailer
    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        let header = Self::hashed_header(self.sig_type, self.pub_algo, self.hash_algo, &self.hashed);
        digest_with_trailer(data, &header)
    }

    pub fn to_body(&self) -> Vec<u8> {
        let mut out =
            Self::hashed_header(self.sig_type, self.pub_algo, self.hash_algo, &self.hashed);
        let area = write_area(&self.unhashed);
        out.extend_from_slice(&(area.len() as u16).to_be_bytes());
        out.extend(area);
        out.extend_from_slice(&self.hash_prefix);
        self.mpis.iter().for_each(|x| write_mpi(&mut out, x));
        out
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn sig_type(&self) -> SigType {
        self.sig_type
    }

    pub fn pub_algo(&self) -> PublicKeyAlgorithm {
        self.pub_algo
    }

    pub fn hash_algo(&self) -> u8 {
        self.hash_algo
    }

    pub fn hash_prefix(&self) -> [u8; 2] {
        self.hash_prefix
    }

    pub fn mpis(&self) -> &[BigUint] {
        &self.mpis
    }

    pub fn hashed_subpackets(&self) -> &[Subpacket] {
        &self.hashed
    }

    fn hashed_subpacket(&self, kind: u8) -> Option<&Subpacket> {
        self.hashed.iter().find(|s| s.kind == kind)
    }

    /// first octet of the key flags subpacket, `None` when the signature carries none
    pub fn key_flags(&self) -> Option<u8> {
        self.hashed_subpacket(Subpacket::KEY_FLAGS)
            .map(|s| s.data.first().copied().unwrap_or(0))
    }

    pub fn issuer(&self) -> Option<u64> {
        self.unhashed
            .iter()
            .chain(self.hashed.iter())
            .find(|s| s.kind == Subpacket::ISSUER && s.data.len() == 8)
            .map(|s| {
                let mut id = [0u8; 8];
                id.copy_from_slice(&s.data);
                u64::from_be_bytes(id)
            })
    }
}

fn digest_with_trailer(data: &[u8], header: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.update(header);
    h.update([0x04, 0xff]);
    h.update((header.len() as u32).to_be_bytes());
    h.finalize().into()
}

/// hash input of a user id certification
pub fn certification_data(primary: &PublicKey, uid: &str) -> Vec<u8> {
    let mut data = primary.hash_prefix_bytes();
    data.push(0xb4);
    data.extend_from_slice(&(uid.len() as u32).to_be_bytes());
    data.extend_from_slice(uid.as_bytes());
    data
}

/// hash input of a subkey binding
pub fn subkey_binding_data(primary: &PublicKey, subkey: &PublicKey) -> Vec<u8> {
    let mut data = primary.hash_prefix_bytes();
    data.extend(subkey.hash_prefix_bytes());
    data
}

/// The private half a self signature is made with.
pub enum SigningKey<'a> {
    Rsa(&'a cipher::rsa::PrivateKey),
    Dsa(&'a dsa::PrivateKey),
}

impl<'a> SigningKey<'a> {
    fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            Self::Rsa(_) => PublicKeyAlgorithm::RsaEncryptSign,
            Self::Dsa(_) => PublicKeyAlgorithm::Dsa,
        }
    }

    fn sign<R: Rand>(&self, digest: &[u8], rng: &mut R) -> std::result::Result<Vec<BigUint>, CipherError> {
        match self {
            Self::Rsa(key) => Ok(vec![PKCS1Decrypt::new((*key).clone()).sign_sha256(digest)?]),
            Self::Dsa(key) => {
                let sig = key.sign(digest, rng)?;
                Ok(vec![sig.r().clone(), sig.s().clone()])
            }
        }
    }
}

/// Builds the V4 SHA-256 self signatures of a new key ring.
pub struct SignatureBuilder {
    sig_type: SigType,
    hashed: Vec<Subpacket>,
}

impl SignatureBuilder {
    pub fn new(sig_type: SigType, created: u32) -> Self {
        Self {
            sig_type,
            hashed: vec![Subpacket::new(
                Subpacket::CREATION_TIME,
                created.to_be_bytes().to_vec(),
            )],
        }
    }

    pub fn key_flags(mut self, flags: u8) -> Self {
        self.hashed.push(Subpacket::new(Subpacket::KEY_FLAGS, vec![flags]));
        self
    }

    /// algorithm preferences and the MDC feature flag, carried by user id certifications
    pub fn preferences(mut self) -> Self {
        self.hashed.extend([
            Subpacket::new(Subpacket::PREFERRED_SYMMETRIC, vec![9, 8, SYM_AES128]),
            Subpacket::new(Subpacket::PREFERRED_HASH, vec![HASH_SHA256, 10, HASH_SHA1]),
            Subpacket::new(Subpacket::PREFERRED_COMPRESSION, vec![2, 1]),
            Subpacket::new(Subpacket::FEATURES, vec![0x01]),
        ]);
        self
    }

    pub fn primary_user_id(mut self) -> Self {
        self.hashed.push(Subpacket::new(Subpacket::PRIMARY_USER_ID, vec![1]));
        self
    }

    pub fn sign<R: Rand>(
        self,
        signer: &SigningKey,
        issuer: u64,
        data: &[u8],
        rng: &mut R,
    ) -> std::result::Result<Signature, CipherError> {
        let pub_algo = signer.algorithm();
        let header = Signature::hashed_header(self.sig_type, pub_algo, HASH_SHA256, &self.hashed);
        let digest = digest_with_trailer(data, &header);
        let mpis = signer.sign(&digest, rng)?;

        Ok(Signature {
            version: 4,
            sig_type: self.sig_type,
            pub_algo,
            hash_algo: HASH_SHA256,
            hashed: self.hashed,
            unhashed: vec![Subpacket::new(
                Subpacket::ISSUER,
                issuer.to_be_bytes().to_vec(),
            )],
            hash_prefix: [digest[0], digest[1]],
            mpis,
        })
    }
}
