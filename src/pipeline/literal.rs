use crate::packet::{PartialBodyWriter, Tag};
use std::io::Write;

/// Literal data packet framing: binary mode, no file name, zero date.
pub struct LiteralWriter<W: Write> {
    inner: PartialBodyWriter<W>,
}

impl<W: Write> LiteralWriter<W> {
    pub fn new(inner: W, chunk_bits: u8) -> std::io::Result<Self> {
        let mut inner = PartialBodyWriter::new(inner, Tag::LiteralData, chunk_bits)?;
        inner.write_all(&[b'b', 0, 0, 0, 0, 0])?;
        log::debug!("literal stage open");
        Ok(Self { inner })
    }

    pub fn finish(self) -> std::io::Result<W> {
        let inner = self.inner.finish()?;
        log::debug!("literal stage closed");
        Ok(inner)
    }
}

impl<W: Write> Write for LiteralWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::LiteralWriter;
    use crate::packet::{PacketReader, Tag};
    use std::io::Write;

    #[test]
    fn anonymous_binary_frame() {
        let mut w = LiteralWriter::new(Vec::new(), 9).unwrap();
        w.write_all(b"hello world").unwrap();
        let out = w.finish().unwrap();

        let p = PacketReader::new(&out).next().unwrap().unwrap();
        assert_eq!(p.tag, Tag::LiteralData);
        assert_eq!(&p.body[..6], &[b'b', 0, 0, 0, 0, 0]);
        assert_eq!(&p.body[6..], b"hello world");
    }
}
