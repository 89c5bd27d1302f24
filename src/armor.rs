//! ASCII armor (RFC 4880 §6): base64 in 64 column lines between BEGIN/END delimiters,
//! followed by a CRC-24 checksum line.

use crate::config::PgpConfig;
use crate::error::{PgpError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::io::Write;

const CRC24_INIT: u32 = 0xb704ce;
const CRC24_POLY: u32 = 0x1864cfb;

// 48 input octets make one 64 column line
const LINE_OCTETS: usize = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Message,
    PublicKey,
    PrivateKey,
}

impl BlockType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Message => "PGP MESSAGE",
            Self::PublicKey => "PGP PUBLIC KEY BLOCK",
            Self::PrivateKey => "PGP PRIVATE KEY BLOCK",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "PGP MESSAGE" => Some(Self::Message),
            "PGP PUBLIC KEY BLOCK" => Some(Self::PublicKey),
            "PGP PRIVATE KEY BLOCK" | "PGP SECRET KEY BLOCK" => Some(Self::PrivateKey),
            _ => None,
        }
    }
}

pub fn crc24(crc: u32, data: &[u8]) -> u32 {
    data.iter().fold(crc, |mut crc, &x| {
        crc ^= (x as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x1000000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
        crc & 0xffffff
    })
}

/// Streaming armor encoder, the output is only complete after [`ArmorWriter::finish`].
pub struct ArmorWriter<W: Write> {
    inner: W,
    kind: BlockType,
    buf: Vec<u8>,
    crc: u32,
}

impl<W: Write> ArmorWriter<W> {
    pub fn new(mut inner: W, kind: BlockType) -> std::io::Result<Self> {
        writeln!(inner, "-----BEGIN {}-----", kind.label())?;
        writeln!(inner, "Version: pgpflow {}", env!("CARGO_PKG_VERSION"))?;
        if let Some(comment) = PgpConfig::config().armor_comment.as_deref() {
            writeln!(inner, "Comment: {comment}")?;
        }
        writeln!(inner)?;

        Ok(Self {
            inner,
            kind,
            buf: Vec::with_capacity(LINE_OCTETS),
            crc: CRC24_INIT,
        })
    }

    fn write_line(&mut self) -> std::io::Result<()> {
        let line = BASE64.encode(&self.buf);
        self.buf.clear();
        writeln!(self.inner, "{line}")
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        if !self.buf.is_empty() {
            self.write_line()?;
        }

        let crc = self.crc.to_be_bytes();
        writeln!(self.inner, "={}", BASE64.encode(&crc[1..]))?;
        writeln!(self.inner, "-----END {}-----", self.kind.label())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ArmorWriter<W> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let n = data.len().min(LINE_OCTETS - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        self.crc = crc24(self.crc, &data[..n]);
        if self.buf.len() == LINE_OCTETS {
            self.write_line()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

pub fn armor(kind: BlockType, data: &[u8]) -> Result<String> {
    let mut w = ArmorWriter::new(Vec::with_capacity(data.len() * 4 / 3 + 128), kind)?;
    w.write_all(data)?;
    let out = w.finish()?;
    String::from_utf8(out).map_err(|e| PgpError::parse(e.to_string()))
}

/// leading whitespace is skipped before looking for the BEGIN delimiter
pub fn is_armored(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|x| !x.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"-----BEGIN PGP ")
}

/// Decode the first armored block in `data`, the checksum line is verified when present.
pub fn dearmor(data: &[u8]) -> Result<(BlockType, Vec<u8>)> {
    let text = std::str::from_utf8(data).map_err(|e| PgpError::parse(e.to_string()))?;
    let mut lines = text.lines().map(str::trim_end);
    next_block(&mut lines)?.ok_or_else(|| PgpError::parse("missing armor header line"))
}

/// Decode every armored block in `data`, in order. Text between blocks is ignored.
pub fn dearmor_all(data: &[u8]) -> Result<Vec<(BlockType, Vec<u8>)>> {
    let text = std::str::from_utf8(data).map_err(|e| PgpError::parse(e.to_string()))?;
    let mut lines = text.lines().map(str::trim_end);
    let mut blocks = Vec::new();
    while let Some(block) = next_block(&mut lines)? {
        blocks.push(block);
    }

    if blocks.is_empty() {
        return Err(PgpError::parse("missing armor header line"));
    }
    Ok(blocks)
}

// None once no BEGIN delimiter is left
fn next_block<'a, I>(lines: &mut I) -> Result<Option<(BlockType, Vec<u8>)>>
where
    I: Iterator<Item = &'a str>,
{
    let Some(label) = lines
        .by_ref()
        .find_map(|l| l.strip_prefix("-----BEGIN ")?.strip_suffix("-----"))
    else {
        return Ok(None);
    };
    let kind = BlockType::from_label(label)
        .ok_or_else(|| PgpError::parse(format!("unknown armor block `{label}`")))?;

    // armor headers run up to the first blank line
    for l in lines.by_ref() {
        if l.is_empty() {
            break;
        }
        if !l.contains(": ") {
            return Err(PgpError::parse(format!("invalid armor header `{l}`")));
        }
    }

    let (mut b64, mut checksum, mut ended) = (String::new(), None, false);
    for l in lines {
        if let Some(end) = l.strip_prefix("-----END ") {
            if end.strip_suffix("-----") != Some(label) {
                return Err(PgpError::parse(format!("mismatched armor tail `{l}`")));
            }
            ended = true;
            break;
        } else if let Some(c) = l.strip_prefix('=') {
            checksum = Some(c.to_string());
        } else {
            b64.push_str(l.trim());
        }
    }

    if !ended {
        return Err(PgpError::parse("missing armor tail line"));
    }

    let body = BASE64
        .decode(b64.as_bytes())
        .map_err(|e| PgpError::parse(format!("armor body: {e}")))?;

    if let Some(c) = checksum {
        let crc = BASE64
            .decode(c.as_bytes())
            .map_err(|e| PgpError::parse(format!("armor checksum: {e}")))?;
        let expect = crc24(CRC24_INIT, &body).to_be_bytes();
        if crc.as_slice() != &expect[1..] {
            return Err(PgpError::parse("armor checksum mismatch"));
        }
    }

    Ok(Some((kind, body)))
}
