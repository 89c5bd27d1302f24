use crate::packet::{PartialBodyWriter, Tag, COMPRESSION_ZIP};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

/// Compressed data packet, ZIP (raw deflate) over a partial body stream.
pub struct CompressWriter<W: Write> {
    inner: DeflateEncoder<PartialBodyWriter<W>>,
}

impl<W: Write> CompressWriter<W> {
    pub fn new(inner: W, chunk_bits: u8) -> std::io::Result<Self> {
        let mut body = PartialBodyWriter::new(inner, Tag::CompressedData, chunk_bits)?;
        body.write_all(&[COMPRESSION_ZIP])?;
        log::debug!("compression stage open");
        Ok(Self {
            inner: DeflateEncoder::new(body, Compression::default()),
        })
    }

    pub fn finish(self) -> std::io::Result<W> {
        let inner = self.inner.finish()?.finish()?;
        log::debug!("compression stage closed");
        Ok(inner)
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
