//! Byte buffer with the nat and long encodings of the pickle format
//!
//! Writes append and need `&mut self`. Reads move a cursor kept in a `Cell`,
//! so a reader shared behind an `Rc` can jump around the buffer while
//! decoding nested entries.

use super::error::{DecodeError, DecodeResult};
use std::cell::Cell;

#[derive(Debug, Clone, Default)]
pub struct PickleBuffer {
    bytes: Vec<u8>,
    read_index: Cell<usize>,
}

impl PickleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer over `bytes` with the cursor at `offset`
    pub fn from_bytes(bytes: Vec<u8>, offset: usize) -> Self {
        Self {
            bytes,
            read_index: Cell::new(offset),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read_index(&self) -> usize {
        self.read_index.get()
    }

    pub fn set_read_index(&self, index: usize) {
        self.read_index.set(index);
    }

    // ---------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------

    pub fn write_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_nat(&mut self, x: u32) {
        self.write_long_nat(x as u64);
    }

    /// Seven bits per byte, most significant group first; every byte but
    /// the last has its high bit set
    pub fn write_long_nat(&mut self, x: u64) {
        let mut groups = [0u8; 10];
        let mut n = 0;
        let mut rest = x;
        loop {
            groups[n] = (rest & 0x7f) as u8;
            n += 1;
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        for i in (1..n).rev() {
            self.write_byte(groups[i] | 0x80);
        }
        self.write_byte(groups[0]);
    }

    /// Minimal big-endian two's complement
    pub fn write_long(&mut self, x: i64) {
        let y = x >> 8;
        let z = x & 0xff;
        if -y != (z >> 7) {
            self.write_long(y);
        }
        self.write_byte(z as u8);
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    pub fn peek_byte(&self, at: usize) -> DecodeResult<u8> {
        self.bytes.get(at).copied().ok_or(DecodeError::Truncated { at })
    }

    pub fn read_byte(&self) -> DecodeResult<u8> {
        let at = self.read_index.get();
        let b = self.peek_byte(at)?;
        self.read_index.set(at + 1);
        Ok(b)
    }

    pub fn read_nat(&self) -> DecodeResult<u32> {
        let x = self.read_long_nat()?;
        u32::try_from(x).map_err(|_| DecodeError::Malformed(format!("nat {} out of range", x)))
    }

    pub fn read_long_nat(&self) -> DecodeResult<u64> {
        let mut x: u64 = 0;
        loop {
            let b = self.read_byte()?;
            if x >> 57 != 0 {
                return Err(DecodeError::Malformed("nat overflows 64 bits".to_string()));
            }
            x = (x << 7) | (b & 0x7f) as u64;
            if b & 0x80 == 0 {
                return Ok(x);
            }
        }
    }

    /// Read a `len`-byte two's complement value, sign-extended
    pub fn read_long(&self, len: usize) -> DecodeResult<i64> {
        if len > 8 {
            return Err(DecodeError::Malformed(format!("long of {} bytes", len)));
        }
        let mut x: i64 = 0;
        for _ in 0..len {
            x = (x << 8) | self.read_byte()? as i64;
        }
        if len == 0 {
            return Ok(0);
        }
        let leading = 64 - (len as u32 * 8);
        Ok((x << leading) >> leading)
    }

    /// Read an entry length and return the index just past the entry
    pub fn read_end(&self) -> DecodeResult<usize> {
        let len = self.read_nat()? as usize;
        Ok(self.read_index.get() + len)
    }

    pub fn read_slice(&self, len: usize) -> DecodeResult<&[u8]> {
        let start = self.read_index.get();
        let slice = self
            .bytes
            .get(start..start + len)
            .ok_or(DecodeError::Truncated { at: start + len })?;
        self.read_index.set(start + len);
        Ok(slice)
    }

    /// Collect `op` results until the cursor reaches `end`
    pub fn until<T>(&self, end: usize, mut op: impl FnMut() -> DecodeResult<T>) -> DecodeResult<Vec<T>> {
        let mut out = Vec::new();
        while self.read_index.get() < end {
            out.push(op()?);
        }
        Ok(out)
    }

    /// Read `count` entries starting at the cursor, returning the offset of
    /// each entry's tag byte
    pub fn create_index(&self, count: usize) -> DecodeResult<Vec<usize>> {
        let mut index = Vec::with_capacity(count);
        for _ in 0..count {
            let start = self.read_index.get();
            index.push(start);
            self.read_byte()?;
            let end = self.read_end()?;
            if end > self.bytes.len() {
                return Err(DecodeError::Truncated { at: end });
            }
            self.read_index.set(end);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut PickleBuffer)) -> Vec<u8> {
        let mut buf = PickleBuffer::new();
        f(&mut buf);
        buf.into_bytes()
    }

    #[test]
    fn test_nat_encoding() {
        assert_eq!(written(|b| b.write_nat(0)), vec![0x00]);
        assert_eq!(written(|b| b.write_nat(127)), vec![0x7f]);
        assert_eq!(written(|b| b.write_nat(128)), vec![0x81, 0x00]);
        assert_eq!(written(|b| b.write_nat(300)), vec![0x82, 0x2c]);

        let buf = PickleBuffer::from_bytes(vec![0x82, 0x2c, 0x05], 0);
        assert_eq!(buf.read_nat().unwrap(), 300);
        assert_eq!(buf.read_nat().unwrap(), 5);
        assert!(matches!(buf.read_nat(), Err(DecodeError::Truncated { at: 3 })));
    }

    #[test]
    fn test_long_encoding_is_minimal() {
        assert_eq!(written(|b| b.write_long(0)), vec![0x00]);
        assert_eq!(written(|b| b.write_long(-1)), vec![0xff]);
        assert_eq!(written(|b| b.write_long(127)), vec![0x7f]);
        assert_eq!(written(|b| b.write_long(128)), vec![0x00, 0x80]);
        assert_eq!(written(|b| b.write_long(-129)), vec![0xff, 0x7f]);
        assert_eq!(written(|b| b.write_long(i64::MIN)).len(), 8);
    }

    #[test]
    fn test_read_long_sign_extends() {
        for value in [0i64, 1, -1, 255, -256, 65_535, i32::MIN as i64, i64::MAX, i64::MIN] {
            let bytes = written(|b| b.write_long(value));
            let len = bytes.len();
            let buf = PickleBuffer::from_bytes(bytes, 0);
            assert_eq!(buf.read_long(len).unwrap(), value, "value {}", value);
        }
    }

    #[test]
    fn test_create_index() {
        // two entries: [1][2]['a' 'b'] and [2][0]
        let buf = PickleBuffer::from_bytes(vec![9, 1, 2, b'a', b'b', 2, 0], 1);
        let index = buf.create_index(2).unwrap();
        assert_eq!(index, vec![1, 5]);
        assert_eq!(buf.read_index(), 7);

        let short = PickleBuffer::from_bytes(vec![1, 5, b'a'], 0);
        assert!(short.create_index(1).is_err());
    }

    #[test]
    fn test_until_stops_at_end() {
        let buf = PickleBuffer::from_bytes(vec![1, 2, 3, 4], 0);
        let got = buf.until(3, || buf.read_byte()).unwrap();
        assert_eq!(got, vec![1, 2, 3]);
    }
}
