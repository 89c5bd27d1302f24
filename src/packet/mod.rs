//! RFC 4880 packet framing.
//!
//! Output always uses new format headers. Streaming packets go through [`PartialBodyWriter`],
//! which never holds more than one chunk of the body in memory.

mod key;
mod reader;
mod secret;
mod signature;

pub use key::{KeyMaterial, PublicKey, PublicKeyAlgorithm};
pub use reader::{Packet, PacketReader};
pub use secret::{S2k, SecretKey, SecretParams, UnlockedKey};
pub use signature::{
    certification_data, key_flags, subkey_binding_data, SigType, Signature, SignatureBuilder,
    SigningKey, Subpacket,
};

use crate::error::{PgpError, Result};
use num_bigint::BigUint;
use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    PublicKeyEncryptedSessionKey,
    Signature,
    SecretKey,
    PublicKey,
    SecretSubkey,
    CompressedData,
    SymmetricallyEncryptedData,
    Marker,
    LiteralData,
    Trust,
    UserId,
    PublicSubkey,
    UserAttribute,
    SymEncryptedIntegrityProtectedData,
    ModificationDetectionCode,
    Other(u8),
}

impl Tag {
    pub fn id(self) -> u8 {
        match self {
            Tag::PublicKeyEncryptedSessionKey => 1,
            Tag::Signature => 2,
            Tag::SecretKey => 5,
            Tag::PublicKey => 6,
            Tag::SecretSubkey => 7,
            Tag::CompressedData => 8,
            Tag::SymmetricallyEncryptedData => 9,
            Tag::Marker => 10,
            Tag::LiteralData => 11,
            Tag::Trust => 12,
            Tag::UserId => 13,
            Tag::PublicSubkey => 14,
            Tag::UserAttribute => 17,
            Tag::SymEncryptedIntegrityProtectedData => 18,
            Tag::ModificationDetectionCode => 19,
            Tag::Other(x) => x,
        }
    }
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            1 => Tag::PublicKeyEncryptedSessionKey,
            2 => Tag::Signature,
            5 => Tag::SecretKey,
            6 => Tag::PublicKey,
            7 => Tag::SecretSubkey,
            8 => Tag::CompressedData,
            9 => Tag::SymmetricallyEncryptedData,
            10 => Tag::Marker,
            11 => Tag::LiteralData,
            12 => Tag::Trust,
            13 => Tag::UserId,
            14 => Tag::PublicSubkey,
            17 => Tag::UserAttribute,
            18 => Tag::SymEncryptedIntegrityProtectedData,
            19 => Tag::ModificationDetectionCode,
            x => Tag::Other(x),
        }
    }
}

/// symmetric algorithm id of AES-128
pub const SYM_AES128: u8 = 7;
/// hash algorithm ids
pub const HASH_SHA1: u8 = 2;
pub const HASH_SHA256: u8 = 8;
/// compression algorithm id of ZIP (raw deflate)
pub const COMPRESSION_ZIP: u8 = 1;

/// new format body length, 1, 2 or 5 octets
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 192 {
        vec![len as u8]
    } else if len < 8384 {
        let x = len - 192;
        vec![((x >> 8) as u8) + 192, x as u8]
    } else {
        let mut v = vec![0xff];
        v.extend_from_slice(&(len as u32).to_be_bytes());
        v
    }
}

/// write a complete packet with a definite length
pub fn write_packet<W: Write>(w: &mut W, tag: Tag, body: &[u8]) -> std::io::Result<()> {
    w.write_all(&[0xc0 | tag.id()])?;
    w.write_all(&encode_length(body.len()))?;
    w.write_all(body)
}

pub fn packet_bytes(tag: Tag, body: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(body.len() + 6);
    v.push(0xc0 | tag.id());
    v.extend(encode_length(body.len()));
    v.extend_from_slice(body);
    v
}

/// Streams a packet body as partial body lengths of `1 << chunk_bits` octets,
/// the last piece is written with a definite length by [`PartialBodyWriter::finish`].
pub struct PartialBodyWriter<W: Write> {
    inner: W,
    chunk_bits: u8,
    buf: Vec<u8>,
}

impl<W: Write> PartialBodyWriter<W> {
    pub fn new(mut inner: W, tag: Tag, chunk_bits: u8) -> std::io::Result<Self> {
        // the first partial chunk has to be at least 512 octets
        let chunk_bits = chunk_bits.clamp(9, 30);
        inner.write_all(&[0xc0 | tag.id()])?;
        Ok(Self {
            inner,
            chunk_bits,
            buf: Vec::with_capacity(1 << chunk_bits),
        })
    }

    fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }

    fn flush_chunk(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&[0xe0 | self.chunk_bits])?;
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        self.inner.write_all(&encode_length(self.buf.len()))?;
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        Ok(self.inner)
    }
}

impl<W: Write> Write for PartialBodyWriter<W> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        // a full chunk stays buffered until more data shows up, the last one needs a definite length
        if self.buf.len() == self.chunk_size() {
            self.flush_chunk()?;
        }

        let n = data.len().min(self.chunk_size() - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

pub fn write_mpi(out: &mut Vec<u8>, n: &BigUint) {
    out.extend_from_slice(&(n.bits() as u16).to_be_bytes());
    if n.bits() > 0 {
        out.extend(n.to_bytes_be());
    }
}

pub fn read_mpi(buf: &mut &[u8]) -> Result<BigUint> {
    let bits = read_u16(buf)? as usize;
    let bytes = take(buf, (bits + 7) >> 3)?;
    Ok(BigUint::from_bytes_be(bytes))
}

pub(crate) fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(PgpError::parse(format!(
            "truncated packet, need `{n}` bytes but `{}` left",
            buf.len()
        )));
    }

    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

pub(crate) fn read_u8(buf: &mut &[u8]) -> Result<u8> {
    Ok(take(buf, 1)?[0])
}

pub(crate) fn read_u16(buf: &mut &[u8]) -> Result<u16> {
    let b = take(buf, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(buf: &mut &[u8]) -> Result<u32> {
    let b = take(buf, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::{encode_length, read_mpi, write_mpi, PartialBodyWriter, PacketReader, Tag};
    use num_bigint::BigUint;
    use std::io::Write;

    #[test]
    fn body_lengths() {
        assert_eq!(encode_length(100), vec![100]);
        assert_eq!(encode_length(1723), vec![197, 251]);
        assert_eq!(encode_length(8383), vec![223, 255]);
        assert_eq!(encode_length(100000), vec![0xff, 0x00, 0x01, 0x86, 0xa0]);
    }

    #[test]
    fn partial_body_chunks() {
        let data: Vec<u8> = (0..2000u32).map(|x| x as u8).collect();
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 9).unwrap();
        for piece in data.chunks(333) {
            w.write_all(piece).unwrap();
        }
        let out = w.finish().unwrap();

        assert_eq!(out[0], 0xcb);
        assert_eq!(out[1], 0xe9);
        // three full 512 chunks, then 464 left with a two octet length
        assert_eq!(out[2 + 512], 0xe9);
        assert_eq!(out[3 * 513 + 1..3 * 513 + 3], encode_length(464)[..]);

        let packets = PacketReader::new(&out).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].tag, Tag::LiteralData);
        assert_eq!(packets[0].body, data);
    }

    #[test]
    fn exact_chunk_multiple_ends_with_definite_length() {
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::CompressedData, 9).unwrap();
        w.write_all(&[1u8; 1024]).unwrap();
        let out = w.finish().unwrap();
        let packets = PacketReader::new(&out).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(packets[0].body.len(), 1024);
        assert_eq!(out[1], 0xe9);
    }

    #[test]
    fn mpi_encoding() {
        let mut out = Vec::new();
        write_mpi(&mut out, &BigUint::from(0x1ffu32));
        assert_eq!(out, vec![0, 9, 1, 0xff]);

        let mut buf = out.as_slice();
        assert_eq!(read_mpi(&mut buf).unwrap(), BigUint::from(0x1ffu32));
        assert!(buf.is_empty());
        assert!(read_mpi(&mut [0u8, 16, 1].as_slice()).is_err());
    }
}
