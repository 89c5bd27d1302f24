//! PKCS#1 v1.5 encodings (RFC 8017 §7.2 and §9.2), shared by RSA and ElGamal in OpenPGP.

use crate::{CipherError, Rand};
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

/// DigestInfo DER prefix for SHA-256
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// EME-PKCS1-v1_5 encoding: `0x00 || 0x02 || PS || 0x00 || msg`, PS is at least 8 nonzero random octets.
pub fn eme_pkcs1_encode<R: Rand>(
    msg: &[u8],
    k: usize,
    rng: &mut R,
) -> Result<Vec<u8>, CipherError> {
    if k < 11 || msg.len() > k - 11 {
        return Err(CipherError::MessageTooLong {
            max: k.saturating_sub(11),
            real: msg.len(),
        });
    }

    let ps_len = k - msg.len() - 3;
    let mut em = vec![0u8; k];
    em[1] = 2;
    rng.rand_nonzero(&mut em[2..2 + ps_len]);
    em[k - msg.len()..].copy_from_slice(msg);
    Ok(em)
}

/// Inverse of [`eme_pkcs1_encode`], `em` must already be left padded to the modulus length.
pub fn eme_pkcs1_decode(em: &[u8]) -> Result<Vec<u8>, CipherError> {
    if em.len() < 11 || em[0] != 0 || em[1] != 2 {
        return Err(CipherError::Decryption(
            "eme-pkcs1-v1_5: invalid block type".to_string(),
        ));
    }

    let sep = em[2..]
        .iter()
        .position(|&x| x == 0)
        .ok_or_else(|| CipherError::Decryption("eme-pkcs1-v1_5: missing separator".to_string()))?;
    if sep < 8 {
        return Err(CipherError::Decryption(
            "eme-pkcs1-v1_5: padding string too short".to_string(),
        ));
    }

    Ok(em[2 + sep + 1..].to_vec())
}

/// EMSA-PKCS1-v1_5 encoding of a SHA-256 digest: `0x00 || 0x01 || 0xFF.. || 0x00 || DigestInfo`
pub fn emsa_pkcs1_sha256(digest: &[u8], k: usize) -> Result<Vec<u8>, CipherError> {
    if digest.len() != 32 {
        return Err(CipherError::Other(format!(
            "emsa-pkcs1-v1_5: expect a 32 bytes sha256 digest, got `{}` bytes",
            digest.len()
        )));
    }

    let t_len = SHA256_DIGEST_INFO.len() + digest.len();
    if k < t_len + 11 {
        return Err(CipherError::MessageTooLong {
            max: k.saturating_sub(11),
            real: t_len,
        });
    }

    let mut em = vec![0xffu8; k];
    em[0] = 0;
    em[1] = 1;
    em[k - t_len - 1] = 0;
    em[k - t_len..k - digest.len()].copy_from_slice(&SHA256_DIGEST_INFO);
    em[k - digest.len()..].copy_from_slice(digest);
    Ok(em)
}

/// scrub an encoded block once it has been turned into an integer
pub(crate) fn scrub(em: &mut Vec<u8>) {
    #[cfg(feature = "sec-zeroize")]
    em.zeroize();
    #[cfg(not(feature = "sec-zeroize"))]
    em.clear();
}
