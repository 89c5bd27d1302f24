use super::{read_u16, read_u32, read_u8, take, Tag};
use crate::error::{PgpError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub tag: Tag,
    pub body: Vec<u8>,
}

/// Iterates over the packets of a binary stream, old and new format headers both accepted.
/// Partial body lengths are joined into one body.
pub struct PacketReader<'a> {
    data: &'a [u8],
    failed: bool,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            failed: false,
        }
    }

    fn next_packet(&mut self) -> Result<Packet> {
        let buf = &mut self.data;
        let head = read_u8(buf)?;
        if head & 0x80 == 0 {
            return Err(PgpError::parse(format!(
                "invalid packet header octet {head:#04x}"
            )));
        }

        if head & 0x40 == 0 {
            let tag = Tag::from((head >> 2) & 0x0f);
            let len = match head & 0x03 {
                0 => read_u8(buf)? as usize,
                1 => read_u16(buf)? as usize,
                2 => read_u32(buf)? as usize,
                // indeterminate length runs to the end of the data
                _ => buf.len(),
            };

            let body = take(buf, len)?.to_vec();
            return Ok(Packet { tag, body });
        }

        let tag = Tag::from(head & 0x3f);
        let mut body = Vec::new();
        loop {
            let o1 = read_u8(buf)? as usize;
            let len = match o1 {
                0..=191 => o1,
                192..=223 => ((o1 - 192) << 8) + read_u8(buf)? as usize + 192,
                255 => read_u32(buf)? as usize,
                _ => {
                    body.extend_from_slice(take(buf, 1 << (o1 & 0x1f))?);
                    continue;
                }
            };

            body.extend_from_slice(take(buf, len)?);
            break;
        }

        Ok(Packet { tag, body })
    }
}

impl<'a> Iterator for PacketReader<'a> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }

        let p = self.next_packet();
        self.failed = p.is_err();
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::PacketReader;
    use crate::packet::Tag;

    #[test]
    fn old_format_headers() {
        // tag 13 with one octet length, tag 6 with two octet length
        let mut data = vec![0xb4, 3, b'a', b'b', b'c'];
        data.extend([0x99, 0x00, 0x02, 4, 5]);
        let packets = PacketReader::new(&data).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].tag, Tag::UserId);
        assert_eq!(packets[0].body, b"abc");
        assert_eq!(packets[1].tag, Tag::PublicKey);
        assert_eq!(packets[1].body, vec![4, 5]);
    }

    #[test]
    fn garbage_stops_the_iterator() {
        let mut it = PacketReader::new(b"not a packet");
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());

        // truncated body
        let mut it = PacketReader::new(&[0xcd, 10, 1, 2]);
        assert!(it.next().unwrap().is_err());
    }
}
