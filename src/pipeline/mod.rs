//! Streaming message encryption.
//!
//! The stages nest as `literal -> compress -> encrypt -> [armor] -> output`, each one owns the
//! next and hands it back from `finish`. Stages are finished innermost first; when anything fails
//! the whole chain is dropped and the partial output must be discarded by the caller.

mod compress;
mod encrypt;
mod literal;

pub use compress::CompressWriter;
pub use encrypt::EncryptWriter;
pub use literal::LiteralWriter;

use crate::armor::{ArmorWriter, BlockType};
use crate::config::PgpConfig;
use crate::error::{PgpError, Result};
use crate::packet::PublicKey;
use cipher::DefaultRand;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EncryptConfig {
    /// ASCII armor around the binary message
    pub armor: bool,
    /// integrity protected packet with a trailing modification detection code
    pub integrity_check: bool,
}

impl Default for EncryptConfig {
    fn default() -> Self {
        Self {
            armor: false,
            integrity_check: true,
        }
    }
}

/// Final destination of the encrypted packets.
pub enum Sink<W: Write> {
    Plain(W),
    Armored(ArmorWriter<W>),
}

impl<W: Write> Sink<W> {
    pub fn new(output: W, armor: bool) -> std::io::Result<Self> {
        if armor {
            Ok(Self::Armored(ArmorWriter::new(output, BlockType::Message)?))
        } else {
            Ok(Self::Plain(output))
        }
    }

    pub fn finish(self) -> std::io::Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Armored(w) => w.finish(),
        }
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Armored(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Armored(w) => w.flush(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EncryptPipeline {
    config: EncryptConfig,
}

impl EncryptPipeline {
    pub fn new(config: EncryptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EncryptConfig {
        self.config
    }

    /// Encrypt everything `input` yields to all `recipients`, the finished output is handed back.
    pub fn encrypt<R: Read, W: Write>(
        &self,
        recipients: &[PublicKey],
        input: R,
        output: W,
    ) -> Result<W> {
        Self::run(self.config, recipients, input, output)
    }

    /// Always armored, whatever the stored configuration says.
    pub fn encrypt_text(&self, recipients: &[PublicKey], plaintext: &str) -> Result<String> {
        let config = EncryptConfig {
            armor: true,
            ..self.config
        };

        let out = Self::run(config, recipients, plaintext.as_bytes(), Vec::new())?;
        String::from_utf8(out).map_err(|e| PgpError::parse(e.to_string()))
    }

    pub fn encrypt_bytes(&self, recipients: &[PublicKey], data: &[u8]) -> Result<Vec<u8>> {
        Self::run(self.config, recipients, data, Vec::with_capacity(data.len() + 1024))
    }

    fn run<R: Read, W: Write>(
        config: EncryptConfig,
        recipients: &[PublicKey],
        mut input: R,
        output: W,
    ) -> Result<W> {
        if recipients.is_empty() {
            return Err(PgpError::argument("at least one recipient is required"));
        }

        let pgp = PgpConfig::config();
        let chunk_bits = pgp.partial_chunk_bits;
        let mut rng = DefaultRand::default();

        let sink = Sink::new(output, config.armor)?;
        let encrypt = EncryptWriter::new(
            sink,
            recipients,
            config.integrity_check,
            chunk_bits,
            &mut rng,
        )?;
        let compress = CompressWriter::new(encrypt, chunk_bits)?;
        let mut literal = LiteralWriter::new(compress, chunk_bits)?;

        let mut buf = pgp.io_buf();
        let mut total = 0usize;
        loop {
            let n = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            literal.write_all(&buf[..n])?;
            total += n;
        }
        drop(input);

        let output = literal.finish()?.finish()?.finish()?.finish()?;
        log::debug!("encrypted {total} bytes for {} recipient(s)", recipients.len());
        Ok(output)
    }
}
