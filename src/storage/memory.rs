//! Read-only cursor over the embedded story image.
//!
//! The image is shared (`Arc<[u8]>`) between the storage layer and every
//! open handle; a cursor only owns its read position.

use std::sync::Arc;

use super::Whence;

#[derive(Debug, Clone)]
pub struct MemoryCursor {
    data: Arc<[u8]>,
    pos: usize,
}

impl MemoryCursor {
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Copies up to `buf.len()` bytes and advances. Returns 0 at end of image.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = &self.data[self.pos..];
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        n
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    /// Repositions the cursor. Targets outside `[0, len]` are rejected and
    /// leave the cursor where it was.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Option<usize> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        let target = base.checked_add(offset)?;
        if target < 0 || target as usize > self.data.len() {
            return None;
        }
        self.pos = target as usize;
        Some(self.pos)
    }

    /// Steps back one byte for single-character pushback.
    pub fn unread(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(bytes: &[u8]) -> MemoryCursor {
        MemoryCursor::new(Arc::from(bytes))
    }

    #[test]
    fn test_read_stops_at_end() {
        let mut c = cursor(b"abcde");
        let mut buf = [0u8; 3];
        assert_eq!(c.read(&mut buf), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(c.read(&mut buf), 2);
        assert_eq!(&buf[..2], b"de");
        assert_eq!(c.read(&mut buf), 0);
        assert_eq!(c.read_byte(), None);
    }

    #[test]
    fn test_seek_rejects_out_of_range_and_keeps_position() {
        let mut c = cursor(b"0123456789");
        assert_eq!(c.seek(4, Whence::Start), Some(4));

        assert_eq!(c.seek(-5, Whence::Current), None);
        assert_eq!(c.position(), 4);

        assert_eq!(c.seek(1, Whence::End), None);
        assert_eq!(c.position(), 4);

        assert_eq!(c.seek(0, Whence::End), Some(10));
        assert_eq!(c.read_byte(), None);
        assert_eq!(c.seek(-1, Whence::End), Some(9));
        assert_eq!(c.read_byte(), Some(b'9'));
    }

    #[test]
    fn test_unread_steps_back_once() {
        let mut c = cursor(b"xy");
        assert!(!c.unread());
        assert_eq!(c.read_byte(), Some(b'x'));
        assert!(c.unread());
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_byte(), Some(b'x'));
    }

    #[test]
    fn test_clones_share_image_not_position() {
        let mut a = cursor(b"hello");
        let mut b = a.clone();
        a.read_byte();
        assert_eq!(a.position(), 1);
        assert_eq!(b.position(), 0);
        assert_eq!(b.read_byte(), Some(b'h'));
    }
}
