use crate::error::{PgpError, Result};
use crate::packet::{write_mpi, write_packet, KeyMaterial, PartialBodyWriter, PublicKey, Tag, SYM_AES128};
use cipher::block_cipher::AES128;
use cipher::cfb::Aes128Cfb;
use cipher::rsa::PKCS1Encrypt;
use cipher::{CipherError, Rand};
use sha1::{Digest, Sha1};
use std::io::Write;
#[cfg(feature = "sec-zeroize")]
use zeroize::Zeroize;

/// one-time AES-128 key shared by every recipient of a message
pub(crate) struct SessionKey([u8; 16]);

impl SessionKey {
    pub(crate) fn generate<R: Rand>(rng: &mut R) -> Self {
        let mut key = [0u8; 16];
        rng.rand(&mut key);
        Self(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// `algo || key || sum16(key)`, the value every recipient key wraps
    fn payload(&self) -> Vec<u8> {
        let sum = self.0.iter().fold(0u16, |acc, &x| acc.wrapping_add(x as u16));
        let mut v = Vec::with_capacity(19);
        v.push(SYM_AES128);
        v.extend_from_slice(&self.0);
        v.extend_from_slice(&sum.to_be_bytes());
        v
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        #[cfg(feature = "sec-zeroize")]
        self.0.zeroize();
    }
}

/// Version 3 public-key encrypted session key packet body for `recipient`.
pub(crate) fn wrap_session_key<R: Rand>(
    recipient: &PublicKey,
    session: &SessionKey,
    rng: &mut R,
) -> std::result::Result<Vec<u8>, CipherError> {
    if !recipient.algorithm().can_encrypt() {
        return Err(CipherError::NotSupport(format!(
            "{:?} keys cannot encrypt",
            recipient.algorithm()
        )));
    }

    let mut body = vec![3];
    body.extend_from_slice(&recipient.key_id().to_be_bytes());
    body.push(recipient.algorithm().id());

    let mut payload = session.payload();
    let wrapped = match recipient.material() {
        KeyMaterial::Rsa { n, e } => {
            let key = cipher::rsa::PublicKey::new_uncheck(n.clone(), e.clone());
            PKCS1Encrypt::new(key)
                .and_then(|k| k.encrypt(&payload, rng))
                .map(|c| vec![c])
        }
        KeyMaterial::ElGamal { p, g, y } => {
            cipher::elgamal::PublicKey::new_uncheck(p.clone(), g.clone(), y.clone())
                .encrypt_pkcs1v15(&payload, rng)
                .map(|(c1, c2)| vec![c1, c2])
        }
        _ => Err(CipherError::NotSupport(format!(
            "session key wrapping for {:?}",
            recipient.algorithm()
        ))),
    };
    #[cfg(feature = "sec-zeroize")]
    payload.zeroize();
    #[cfg(not(feature = "sec-zeroize"))]
    payload.clear();

    wrapped?.iter().for_each(|x| write_mpi(&mut body, x));
    Ok(body)
}

/// Writes one session key packet per recipient, then encrypts everything written to it into a
/// single shared body. With `integrity` the body is an integrity protected packet closed by an
/// MDC, otherwise a plain symmetrically encrypted packet.
pub struct EncryptWriter<W: Write> {
    inner: PartialBodyWriter<W>,
    cfb: Aes128Cfb,
    mdc: Option<Sha1>,
    scratch: Vec<u8>,
}

impl<W: Write> EncryptWriter<W> {
    pub fn new<R: Rand>(
        mut inner: W,
        recipients: &[PublicKey],
        integrity: bool,
        chunk_bits: u8,
        rng: &mut R,
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(PgpError::argument("at least one recipient is required"));
        }

        let session = SessionKey::generate(rng);
        for recipient in recipients {
            let body = wrap_session_key(recipient, &session, rng).map_err(PgpError::Encryption)?;
            write_packet(&mut inner, Tag::PublicKeyEncryptedSessionKey, &body)?;
            log::debug!("session key wrapped for {recipient}");
        }

        let tag = if integrity {
            Tag::SymEncryptedIntegrityProtectedData
        } else {
            Tag::SymmetricallyEncryptedData
        };
        let mut inner = PartialBodyWriter::new(inner, tag, chunk_bits)?;
        if integrity {
            inner.write_all(&[1])?;
        }

        // random block followed by a repeat of its last two octets
        let mut prefix = [0u8; 18];
        rng.rand(&mut prefix[..16]);
        prefix[16] = prefix[14];
        prefix[17] = prefix[15];

        let mut cfb = Aes128Cfb::with_zero_iv(AES128::new(session.as_bytes()));
        let mut mdc = integrity.then(Sha1::new);
        if let Some(h) = mdc.as_mut() {
            h.update(prefix);
        }
        cfb.encrypt(&mut prefix);
        if !integrity {
            cfb.resync().map_err(PgpError::Encryption)?;
        }
        inner.write_all(&prefix)?;

        log::debug!(
            "encryption stage open, {} recipient(s), integrity {}",
            recipients.len(),
            integrity
        );

        Ok(Self {
            inner,
            cfb,
            mdc,
            scratch: Vec::new(),
        })
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(mut h) = self.mdc.take() {
            h.update([0xd3, 0x14]);
            let mut trailer = vec![0xd3, 0x14];
            trailer.extend_from_slice(&h.finalize());
            self.cfb.encrypt(&mut trailer);
            self.inner.write_all(&trailer)?;
        }

        let inner = self.inner.finish()?;
        log::debug!("encryption stage closed");
        Ok(inner)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(h) = self.mdc.as_mut() {
            h.update(buf);
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cfb.encrypt(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
