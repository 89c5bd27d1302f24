//! Key ring parsing and recipient selection.

use crate::armor::{dearmor_all, is_armored};
use crate::error::{PgpError, Result};
use crate::packet::{key_flags, PacketReader, PublicKey, SecretKey, SigType, Signature, Tag};
use std::io::Read;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingKey {
    public: PublicKey,
    secret: Option<SecretKey>,
    flags: Option<u8>,
    is_subkey: bool,
}

impl RingKey {
    fn new(public: PublicKey, secret: Option<SecretKey>, is_subkey: bool) -> Self {
        Self {
            public,
            secret,
            flags: None,
            is_subkey,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        self.secret.as_ref()
    }

    /// flags from the first binding signature that carried any
    pub fn flags(&self) -> Option<u8> {
        self.flags
    }

    pub fn is_subkey(&self) -> bool {
        self.is_subkey
    }

    pub fn key_id(&self) -> u64 {
        self.public.key_id()
    }

    /// Key flags decide when present, otherwise the algorithm does.
    pub fn is_encryption_key(&self) -> bool {
        let algo_ok = self.public.algorithm().can_encrypt();
        match self.flags {
            Some(f) => {
                algo_ok
                    && f & (key_flags::ENCRYPT_COMMUNICATIONS | key_flags::ENCRYPT_STORAGE) != 0
            }
            None => algo_ok,
        }
    }
}

/// A primary key with its subkeys and user ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRing {
    keys: Vec<RingKey>,
    user_ids: Vec<String>,
}

impl KeyRing {
    fn new(primary: RingKey) -> Self {
        Self {
            keys: vec![primary],
            user_ids: vec![],
        }
    }

    /// never empty
    pub fn keys(&self) -> &[RingKey] {
        &self.keys
    }

    pub fn primary(&self) -> &RingKey {
        &self.keys[0]
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    pub fn is_secret(&self) -> bool {
        self.keys[0].secret.is_some()
    }

    pub fn encryption_key(&self) -> Option<&RingKey> {
        self.keys.iter().find(|k| k.is_encryption_key())
    }

    fn apply_signature(&mut self, sig: &Signature) {
        let Some(flags) = sig.key_flags() else {
            return;
        };

        let target = match sig.sig_type() {
            SigType::SubkeyBinding => self.keys.last_mut().filter(|k| k.is_subkey),
            t if t.is_primary_binding() => self.keys.first_mut(),
            _ => None,
        };

        if let Some(k) = target {
            k.flags.get_or_insert(flags);
        }
    }
}

/// All key rings of one serialized stream, in the order they were found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRingBundle {
    rings: Vec<KeyRing>,
}

impl KeyRingBundle {
    /// Binary or armored input, armor is detected automatically. Concatenated armored blocks
    /// are read as one stream.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if is_armored(data) {
            Self::from_armored_bytes(data)
        } else {
            Self::from_binary(data)
        }
    }

    pub fn from_armored(text: &str) -> Result<Self> {
        Self::from_armored_bytes(text.as_bytes())
    }

    fn from_armored_bytes(data: &[u8]) -> Result<Self> {
        let blocks = dearmor_all(data)?;
        if blocks.len() > 1 {
            log::debug!("joining {} armored blocks", blocks.len());
        }
        let bin = blocks.into_iter().flat_map(|(_, body)| body).collect::<Vec<_>>();
        Self::from_binary(&bin)
    }

    /// the reader is consumed to its end and dropped before returning
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::with_capacity(4096);
        reader.read_to_end(&mut data)?;
        drop(reader);
        Self::from_bytes(&data)
    }

    fn from_binary(data: &[u8]) -> Result<Self> {
        let mut rings: Vec<KeyRing> = Vec::new();
        for packet in PacketReader::new(data) {
            let packet = packet?;
            match packet.tag {
                Tag::PublicKey => rings.push(KeyRing::new(RingKey::new(
                    PublicKey::from_body(&packet.body)?,
                    None,
                    false,
                ))),
                Tag::SecretKey => {
                    let secret = SecretKey::from_body(&packet.body)?;
                    rings.push(KeyRing::new(RingKey::new(
                        secret.public_key().clone(),
                        Some(secret),
                        false,
                    )))
                }
                Tag::Marker => {}
                tag => {
                    let ring = rings.last_mut().ok_or_else(|| {
                        PgpError::parse(format!("packet {tag:?} before any primary key"))
                    })?;
                    match tag {
                        Tag::PublicSubkey => ring.keys.push(RingKey::new(
                            PublicKey::from_body(&packet.body)?,
                            None,
                            true,
                        )),
                        Tag::SecretSubkey => {
                            let secret = SecretKey::from_body(&packet.body)?;
                            ring.keys.push(RingKey::new(
                                secret.public_key().clone(),
                                Some(secret),
                                true,
                            ))
                        }
                        Tag::UserId => ring
                            .user_ids
                            .push(String::from_utf8_lossy(&packet.body).into_owned()),
                        Tag::Signature => ring.apply_signature(&Signature::from_body(&packet.body)?),
                        Tag::Trust | Tag::UserAttribute => {}
                        t => {
                            return Err(PgpError::parse(format!(
                                "unexpected packet {t:?} inside a key ring"
                            )))
                        }
                    }
                }
            }
        }

        if rings.is_empty() {
            return Err(PgpError::parse("no key ring found"));
        }

        log::debug!("parsed {} key ring(s)", rings.len());
        Ok(Self { rings })
    }

    pub fn rings(&self) -> &[KeyRing] {
        &self.rings
    }

    pub fn into_rings(self) -> Vec<KeyRing> {
        self.rings
    }

    pub fn find_key(&self, key_id: u64) -> Option<&RingKey> {
        self.rings
            .iter()
            .flat_map(|r| r.keys.iter())
            .find(|k| k.key_id() == key_id)
    }

    /// first encryption capable key, rings and keys in the order they were read
    pub fn select_encryption_key(&self) -> Result<&PublicKey> {
        self.rings
            .iter()
            .find_map(KeyRing::encryption_key)
            .map(RingKey::public_key)
            .ok_or_else(|| PgpError::NotFound("no encryption capable key in the key ring".to_string()))
    }
}

/// Parse a key ring stream (binary or armored) and return its first encryption capable key.
pub fn select_encryption_key<R: Read>(input: R) -> Result<PublicKey> {
    let bundle = KeyRingBundle::from_reader(input)?;
    let key = bundle.select_encryption_key()?;
    log::debug!("selected encryption key {key}");
    Ok(key.clone())
}
