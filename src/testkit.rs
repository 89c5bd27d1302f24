//! Shared fixtures and the decryption side of the pipeline, only built for tests.

use crate::armor::{dearmor, is_armored};
use crate::error::{PgpError, Result};
use crate::group::GroupParameterStore;
use crate::packet::{read_mpi, PacketReader, PublicKey, Tag, UnlockedKey, SYM_AES128};
use cipher::block_cipher::AES128;
use cipher::cfb::Aes128Cfb;
use cipher::rsa::PKCS1Decrypt;
use cipher::{elgamal, rsa, DefaultRand};
use flate2::read::DeflateDecoder;
use sha1::{Digest, Sha1};
use std::io::Read;
use std::sync::OnceLock;

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rsa_1024() -> &'static rsa::PrivateKey {
    static KEY: OnceLock<rsa::PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| rsa::PrivateKey::generate_key(1024, 13, &mut DefaultRand::default()).unwrap())
}

fn elgamal_1024() -> &'static elgamal::PrivateKey {
    static KEY: OnceLock<elgamal::PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let group = GroupParameterStore::lookup(1024).unwrap();
        elgamal::PrivateKey::generate(group.p().clone(), group.g().clone(), &mut DefaultRand::default())
            .unwrap()
    })
}

pub fn rsa_public() -> PublicKey {
    PublicKey::from_rsa(1_700_000_000, rsa_1024().public_key())
}

pub fn elgamal_public() -> PublicKey {
    PublicKey::from_elgamal(1_700_000_000, elgamal_1024().public_key())
}

pub fn rsa_pair() -> (PublicKey, &'static UnlockedKey) {
    static KEY: OnceLock<UnlockedKey> = OnceLock::new();
    (rsa_public(), KEY.get_or_init(|| UnlockedKey::Rsa(rsa_1024().clone())))
}

pub fn elgamal_pair() -> (PublicKey, &'static UnlockedKey) {
    static KEY: OnceLock<UnlockedKey> = OnceLock::new();
    (
        elgamal_public(),
        KEY.get_or_init(|| UnlockedKey::ElGamal(elgamal_1024().clone())),
    )
}

fn unwrap_session_key(body: &[u8], key: &UnlockedKey) -> Result<[u8; 16]> {
    let mut buf = &body[10..];
    let payload = match key {
        UnlockedKey::Rsa(k) => PKCS1Decrypt::new(k.clone()).decrypt(&read_mpi(&mut buf)?),
        UnlockedKey::ElGamal(k) => {
            let c1 = read_mpi(&mut buf)?;
            let c2 = read_mpi(&mut buf)?;
            k.decrypt_pkcs1v15(&c1, &c2)
        }
        UnlockedKey::Dsa(_) => return Err(PgpError::argument("dsa keys cannot decrypt")),
    }
    .map_err(PgpError::Encryption)?;

    if payload.len() != 19 || payload[0] != SYM_AES128 {
        return Err(PgpError::parse("unexpected session key payload"));
    }
    let sum = payload[1..17]
        .iter()
        .fold(0u16, |acc, &x| acc.wrapping_add(x as u16));
    if sum.to_be_bytes() != payload[17..] {
        return Err(PgpError::parse("session key checksum"));
    }

    let mut session = [0u8; 16];
    session.copy_from_slice(&payload[1..17]);
    Ok(session)
}

fn decrypt_body(tag: Tag, body: &[u8], session: &[u8; 16]) -> Result<Vec<u8>> {
    let mut cfb = Aes128Cfb::with_zero_iv(AES128::new(session));
    let mut data = match tag {
        Tag::SymEncryptedIntegrityProtectedData if body.first() == Some(&1) => body[1..].to_vec(),
        Tag::SymmetricallyEncryptedData => body.to_vec(),
        t => return Err(PgpError::parse(format!("not an encrypted packet {t:?}"))),
    };
    if data.len() < 18 {
        return Err(PgpError::parse("encrypted packet too short"));
    }

    let (prefix, rest) = data.split_at_mut(18);
    cfb.decrypt(prefix);
    if prefix[14..16] != prefix[16..18] {
        return Err(PgpError::parse("quick check failed, wrong session key"));
    }

    if tag == Tag::SymmetricallyEncryptedData {
        cfb.resync().map_err(PgpError::Encryption)?;
        cfb.decrypt(rest);
        return Ok(rest.to_vec());
    }

    cfb.decrypt(rest);
    let n = data.len();
    if n < 18 + 22 || data[n - 22..n - 20] != [0xd3, 0x14] {
        return Err(PgpError::parse("missing modification detection code"));
    }
    if Sha1::digest(&data[..n - 20]).as_slice() != &data[n - 20..] {
        return Err(PgpError::parse("modification detected"));
    }
    Ok(data[18..n - 22].to_vec())
}

fn unwrap_literal(data: &[u8]) -> Result<Vec<u8>> {
    let packet = PacketReader::new(data)
        .next()
        .ok_or_else(|| PgpError::parse("empty payload"))??;
    match packet.tag {
        Tag::CompressedData => {
            if packet.body.first() != Some(&1) {
                return Err(PgpError::parse("unexpected compression algorithm"));
            }
            let mut inflated = Vec::new();
            DeflateDecoder::new(&packet.body[1..]).read_to_end(&mut inflated)?;
            unwrap_literal(&inflated)
        }
        Tag::LiteralData => {
            let body = &packet.body;
            let name_len = *body.get(1).ok_or_else(|| PgpError::parse("literal header"))? as usize;
            Ok(body[2 + name_len + 4..].to_vec())
        }
        t => Err(PgpError::parse(format!("unexpected packet {t:?}"))),
    }
}

/// Decrypt a message (binary or armored) with the session key addressed to `public`.
pub fn decrypt_message(msg: &[u8], public: &PublicKey, key: &UnlockedKey) -> Result<Vec<u8>> {
    let data = if is_armored(msg) {
        dearmor(msg)?.1
    } else {
        msg.to_vec()
    };

    let mut session = None;
    for packet in PacketReader::new(&data) {
        let packet = packet?;
        match packet.tag {
            Tag::PublicKeyEncryptedSessionKey => {
                if packet.body.len() > 10 && packet.body[1..9] == public.key_id().to_be_bytes() {
                    session = Some(unwrap_session_key(&packet.body, key)?);
                }
            }
            tag => {
                let session =
                    session.ok_or_else(|| PgpError::NotFound("no session key for us".to_string()))?;
                return unwrap_literal(&decrypt_body(tag, &packet.body, &session)?);
            }
        }
    }

    Err(PgpError::parse("no encrypted data packet"))
}

#[cfg(test)]
mod tests {
    use super::{decrypt_message, rsa_pair};
    use crate::pipeline::EncryptPipeline;

    #[test]
    fn tampering_is_detected() {
        let (public, secret) = rsa_pair();
        let mut msg = EncryptPipeline::default()
            .encrypt_bytes(&[public.clone()], b"integrity protected")
            .unwrap();
        let n = msg.len();
        msg[n - 30] ^= 0x01;
        assert!(decrypt_message(&msg, &public, secret).is_err());
    }
}
