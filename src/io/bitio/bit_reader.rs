use std::io::SeekFrom;

use log::{debug, warn};

use crate::error::{error_if, Error, Result, StickyError};
use crate::io::{read_full, InputStream};
use super::{low_bits, sign_extend, MarkStack, BITS_PER_BYTE, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};

/// Reads bit fields and little-endian integers from an input stream.
///
/// Bits are taken starting from the most significant bit of each byte.
/// Multi-byte integers are little-endian and are read at the current byte
/// index; call `align_to_byte` first when a bit field came before them.
///
/// Every `read_*` method has a `scan_*` twin that returns the same value
/// without moving the cursor.
///
/// The first error is kept: every later read returns it again without
/// touching the stream.
pub struct BitReader<S: InputStream> {
    stream: S,
    origin: u64,
    buffer: Vec<u8>,
    /// Valid bytes in `buffer`.
    filled: usize,
    /// Offset of `buffer[0]` from `origin`.
    position: u64,
    index: usize,
    offset: usize,
    marks: MarkStack,
    error: StickyError,
}

impl<S: InputStream> BitReader<S> {
    pub fn new(stream: S) -> BitReader<S> {
        BitReader::with_capacity(stream, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a reader with a `capacity` byte read-ahead buffer.
    ///
    /// Positions reported by the reader count from wherever `stream`
    /// stands now.
    pub fn with_capacity(stream: S, capacity: usize) -> BitReader<S> {
        let origin = stream.tell();
        BitReader {
            stream,
            origin,
            buffer: vec![0; std::cmp::max(capacity, MIN_BUFFER_SIZE)],
            filled: 0,
            position: 0,
            index: 0,
            offset: 0,
            marks: MarkStack::default(),
            error: StickyError::new("BitReader"),
        }
    }

    pub fn error(&self) -> Option<Error> {
        self.error.get()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Byte position of the cursor.
    pub fn position(&self) -> u64 {
        self.position + self.index as u64
    }

    /// Bits already consumed from the byte at `position()`, in `0..8`.
    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Returns a mutable reference to the underlying stream.
    ///
    /// The reader seeks the stream before every refill, so moving it does
    /// not disturb the reader.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Moves the unread tail of the buffer to the front and tops the
    /// buffer up from the stream.
    fn fill(&mut self) -> Result<()> {
        let residue = self.filled.saturating_sub(self.index);
        if residue > 0 {
            self.buffer.copy_within(self.index..self.filled, 0);
        }
        self.position += self.index as u64;
        self.index = 0;
        self.filled = residue;

        let target = self.origin.saturating_add(self.position + residue as u64);
        if self.stream.tell() != target {
            self.stream.seek(SeekFrom::Start(target))?;
        }
        let count = read_full(&mut self.stream, &mut self.buffer[residue..])?;
        self.filled += count;
        debug!("BitReader: refilled {} bytes at {}", count, target);
        Ok(())
    }

    /// Makes sure `bits` bits from the cursor are buffered.
    fn require_bits(&mut self, bits: usize) -> Result<()> {
        let end = self.index * BITS_PER_BYTE + bits;
        if end > self.filled * BITS_PER_BYTE {
            let filled = self.fill();
            self.error.track(filled)?;
            let end = self.index * BITS_PER_BYTE + bits;
            if end > self.filled * BITS_PER_BYTE {
                return Err(self.error.fail(Error::ArrayIndexOutOfBounds));
            }
        }
        Ok(())
    }

    fn discard_buffer(&mut self) {
        self.position += self.index as u64;
        self.index = 0;
        self.filled = 0;
    }

    fn scan_bits(&mut self, count: usize, advance: bool) -> Result<u32> {
        self.error.check()?;
        let checked = error_if(count > 32, Error::BadArguments);
        self.error.track(checked)?;
        if count == 0 {
            return Ok(0);
        }

        let needed = self.offset + count;
        self.require_bits(needed)?;

        let byte_count = (needed + 7) / BITS_PER_BYTE;
        let mut window = 0u64;
        for &byte in &self.buffer[self.index..self.index + byte_count] {
            window = (window << 8) | byte as u64;
        }
        let value = (window >> (byte_count * BITS_PER_BYTE - needed)) as u32 & low_bits(count);

        if advance {
            let pointer = self.index * BITS_PER_BYTE + needed;
            self.index = pointer / BITS_PER_BYTE;
            self.offset = pointer % BITS_PER_BYTE;
        }
        Ok(value)
    }

    /// Reads a `width` byte little-endian integer at the byte index.
    fn scan_le(&mut self, width: usize, advance: bool) -> Result<u32> {
        self.error.check()?;
        self.require_bits(width * BITS_PER_BYTE)?;

        let mut value = 0u32;
        for (i, &byte) in self.buffer[self.index..self.index + width].iter().enumerate() {
            value |= (byte as u32) << (i * BITS_PER_BYTE);
        }
        if advance {
            self.index += width;
        }
        Ok(value)
    }

    /// Reads up to 32 bits.
    ///
    /// The first bit read ends up as the most significant bit of the
    /// `count` bit result.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// let input = IoInput::new(std::io::Cursor::new([0xabu8, 0xcd, 0xef]));
    /// let mut reader = BitReader::new(input);
    ///
    /// assert_eq!(reader.read_unsigned_bits(4), Ok(0xa));
    /// assert_eq!(reader.read_unsigned_bits(8), Ok(0xbc));
    /// assert_eq!(reader.read_unsigned_bits(12), Ok(0xdef));
    /// ```
    pub fn read_unsigned_bits(&mut self, count: usize) -> Result<u32> {
        self.scan_bits(count, true)
    }

    /// Reads up to 32 bits, sign-extending from the first bit.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// let input = IoInput::new(std::io::Cursor::new([0b1110_0111u8]));
    /// let mut reader = BitReader::new(input);
    ///
    /// assert_eq!(reader.read_signed_bits(4), Ok(-2));
    /// assert_eq!(reader.read_signed_bits(4), Ok(7));
    /// ```
    pub fn read_signed_bits(&mut self, count: usize) -> Result<i32> {
        Ok(sign_extend(self.scan_bits(count, true)?, count))
    }

    /// Like `read_unsigned_bits`, without moving the cursor.
    pub fn scan_unsigned_bits(&mut self, count: usize) -> Result<u32> {
        self.scan_bits(count, false)
    }

    /// Like `read_signed_bits`, without moving the cursor.
    pub fn scan_signed_bits(&mut self, count: usize) -> Result<i32> {
        Ok(sign_extend(self.scan_bits(count, false)?, count))
    }

    pub fn read_unsigned_byte(&mut self) -> Result<u8> {
        Ok(self.scan_le(1, true)? as u8)
    }

    pub fn scan_unsigned_byte(&mut self) -> Result<u8> {
        Ok(self.scan_le(1, false)? as u8)
    }

    pub fn read_signed_byte(&mut self) -> Result<i8> {
        Ok(self.scan_le(1, true)? as i8)
    }

    pub fn scan_signed_byte(&mut self) -> Result<i8> {
        Ok(self.scan_le(1, false)? as i8)
    }

    pub fn read_unsigned_short(&mut self) -> Result<u16> {
        Ok(self.scan_le(2, true)? as u16)
    }

    pub fn scan_unsigned_short(&mut self) -> Result<u16> {
        Ok(self.scan_le(2, false)? as u16)
    }

    pub fn read_signed_short(&mut self) -> Result<i16> {
        Ok(self.scan_le(2, true)? as i16)
    }

    pub fn scan_signed_short(&mut self) -> Result<i16> {
        Ok(self.scan_le(2, false)? as i16)
    }

    pub fn read_unsigned_int(&mut self) -> Result<u32> {
        self.scan_le(4, true)
    }

    pub fn scan_unsigned_int(&mut self) -> Result<u32> {
        self.scan_le(4, false)
    }

    pub fn read_signed_int(&mut self) -> Result<i32> {
        Ok(self.scan_le(4, true)? as i32)
    }

    pub fn scan_signed_int(&mut self) -> Result<i32> {
        Ok(self.scan_le(4, false)? as i32)
    }

    /// Discards the rest of a partially read byte.
    pub fn align_to_byte(&mut self) {
        if self.offset > 0 {
            self.index += 1;
            self.offset = 0;
        }
    }

    /// Moves the cursor `count` bytes forward, keeping the bit offset.
    ///
    /// Skipping past the buffered bytes drops the buffer; the next read
    /// refills it from the new position.
    pub fn skip(&mut self, count: usize) {
        if self.error.get().is_some() || count == 0 {
            return;
        }

        if count < self.filled.saturating_sub(self.index) {
            self.index += count;
        } else {
            let target = self.position().saturating_add(count as u64);
            self.discard_buffer();
            self.position = target;
        }
    }

    /// Moves the cursor `count` bits forward.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// let input = IoInput::new(std::io::Cursor::new([0xabu8, 0xcd, 0xef]));
    /// let mut reader = BitReader::new(input);
    ///
    /// reader.skip_bits(12);
    /// assert_eq!(reader.read_unsigned_bits(8), Ok(0xde));
    /// ```
    pub fn skip_bits(&mut self, count: usize) {
        if self.error.get().is_some() {
            return;
        }

        let current = self.position();
        let pointer = current * BITS_PER_BYTE as u64 + self.offset as u64 + count as u64;
        let target = pointer / BITS_PER_BYTE as u64;
        self.skip((target - current) as usize);
        self.offset = (pointer % BITS_PER_BYTE as u64) as usize;
    }

    /// Pushes the current byte position and returns it.
    pub fn mark(&mut self) -> u64 {
        let current = self.position();
        self.marks.push(current);
        current
    }

    /// Drops the most recent mark.
    pub fn unmark(&mut self) -> Option<u64> {
        self.marks.pop()
    }

    pub fn mark_depth(&self) -> usize {
        self.marks.depth()
    }

    /// Moves the cursor back to the most recent mark, or to the start when
    /// there is none. The mark stays on the stack.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// let input = IoInput::new(std::io::Cursor::new([1u8, 2, 3, 4]));
    /// let mut reader = BitReader::new(input);
    ///
    /// reader.read_unsigned_byte().unwrap();
    /// reader.mark();
    /// assert_eq!(reader.read_unsigned_short(), Ok(0x0302));
    /// reader.reset();
    /// assert_eq!(reader.read_unsigned_byte(), Ok(2));
    /// ```
    pub fn reset(&mut self) {
        let last = self.marks.last().unwrap_or(0);
        if last < self.position {
            self.discard_buffer();
            self.position = last;
        } else {
            self.index = (last - self.position) as usize;
        }
        self.offset = 0;
    }

    /// Bytes read since the last mark minus `expected`; zero when the
    /// structure had exactly the declared length.
    pub fn check(&self, expected: u64) -> i64 {
        self.marks.check(self.position(), expected)
    }

    /// Bytes read since the last mark, `None` without a mark.
    pub fn bytes_read(&self) -> Option<u64> {
        self.marks.last().map(|last| self.position() - last)
    }

    /// Copies bytes into `dest` and returns how many were copied.
    ///
    /// A count below `dest.len()` means the stream ran out; the reader is
    /// then left with `ReachedEndOfFile`.
    pub fn read_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        self.error.check()?;

        let mut read = 0;
        while read < dest.len() {
            if self.index >= self.filled {
                let filled = self.fill();
                self.error.track(filled)?;
            }
            let available = self.filled.saturating_sub(self.index);
            if available == 0 {
                self.error.fail(Error::ReachedEndOfFile);
                break;
            }

            let n = std::cmp::min(available, dest.len() - read);
            dest[read..read + n].copy_from_slice(&self.buffer[self.index..self.index + n]);
            read += n;
            self.index += n;
        }

        Ok(read)
    }

    /// Reads a `length` byte string field. A NUL in the last byte is not
    /// part of the string.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// let input = IoInput::new(std::io::Cursor::new(b"abc\0defg".to_vec()));
    /// let mut reader = BitReader::new(input);
    ///
    /// assert_eq!(reader.read_fixed_string(4).unwrap(), "abc");
    /// assert_eq!(reader.read_fixed_string(4).unwrap(), "defg");
    /// ```
    pub fn read_fixed_string(&mut self, length: usize) -> Result<String> {
        decode(self.read_fixed_string_bytes(length)?)
    }

    /// Like `read_fixed_string`, returning the raw bytes.
    pub fn read_fixed_string_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        let count = self.read_bytes(&mut bytes)?;
        if count < length {
            return Err(Error::ReachedEndOfFile);
        }
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(bytes)
    }

    /// Reads a NUL-terminated string; the terminator is consumed.
    ///
    /// If the stream ends first, whatever was read is returned. A string
    /// that is not UTF-8 fails with `InvalidData`, but the field is still
    /// consumed and the reader stays usable.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitReader, IoInput};
    /// # use bitcoder::Error;
    /// let input = IoInput::new(std::io::Cursor::new(b"caf\xe9\0ok\0".to_vec()));
    /// let mut reader = BitReader::new(input);
    ///
    /// assert_eq!(reader.read_string(), Err(Error::InvalidData));
    /// assert_eq!(reader.read_string().unwrap(), "ok");
    /// ```
    pub fn read_string(&mut self) -> Result<String> {
        decode(self.read_string_bytes()?)
    }

    /// Like `read_string`, returning the raw bytes without the terminator.
    pub fn read_string_bytes(&mut self) -> Result<Vec<u8>> {
        self.error.check()?;

        let mut bytes = Vec::new();
        loop {
            if self.index >= self.filled {
                let filled = self.fill();
                self.error.track(filled)?;
                if self.index >= self.filled {
                    warn!("BitReader: string not terminated before end of stream");
                    break;
                }
            }

            let window = &self.buffer[self.index..self.filled];
            match window.iter().position(|&byte| byte == 0) {
                Some(end) => {
                    bytes.extend_from_slice(&window[..end]);
                    self.index += end + 1;
                    break;
                },
                None => {
                    bytes.extend_from_slice(window);
                    self.index = self.filled;
                },
            }
        }

        Ok(bytes)
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Error::InvalidData)
}

mod bitreader_tests {
    #[cfg(test)]
    fn reader(bytes: &[u8], capacity: usize)
    -> crate::io::BitReader<crate::io::IoInput<std::io::Cursor<Vec<u8>>>> {
        let input = crate::io::IoInput::new(std::io::Cursor::new(bytes.to_vec()));
        crate::io::BitReader::with_capacity(input, capacity)
    }

    #[test]
    fn test_read_bits_32() {
        let vec: Vec<u8> = (0..=255).collect();
        let mut reader = reader(&vec, 16);

        // read 0x0 - 0x11, by 32, 28, 24 ... bits at a time
        assert_eq!(reader.read_unsigned_bits(32), Ok(0x00010203));
        assert_eq!(reader.read_unsigned_bits(28), Ok(0x0405060));
        assert_eq!(reader.read_unsigned_bits(24), Ok(0x708090));
        assert_eq!(reader.read_unsigned_bits(20), Ok(0xa0b0c));
        assert_eq!(reader.read_unsigned_bits(16), Ok(0x0d0e));
        assert_eq!(reader.read_unsigned_bits(12), Ok(0x0f1));
        assert_eq!(reader.read_unsigned_bits(8), Ok(0x01));
        assert_eq!(reader.read_unsigned_bits(4), Ok(0x1));
        assert_eq!(reader.read_unsigned_bits(0), Ok(0x0));

        // 0x121314 = 000 100 100 001 001 100 010 100
        for &expected in &[0b000, 0b100, 0b100, 0b001, 0b001, 0b100, 0b010, 0b100] {
            assert_eq!(reader.read_unsigned_bits(3), Ok(expected));
        }

        // 0x15161718 191a1b1c 1d1e1f20
        assert_eq!(reader.read_unsigned_bits(8), Ok(0b00010101));
        assert_eq!(reader.read_unsigned_bits(9), Ok(0b000101100));
        assert_eq!(reader.read_unsigned_bits(10), Ok(0b0010111000));
        assert_eq!(reader.read_unsigned_bits(11), Ok(0b11000000110));
        assert_eq!(reader.read_unsigned_bits(12), Ok(0b010001101000));
        assert_eq!(reader.read_unsigned_bits(13), Ok(0b0110110001110));
        assert_eq!(reader.read_unsigned_bits(14), Ok(0b00001110100011));
        assert_eq!(reader.read_unsigned_bits(15), Ok(0b110000111110010));
        assert_eq!(reader.read_unsigned_bits(4), Ok(0b0000));
        assert_eq!(reader.position(), 33);
    }

    #[test]
    fn test_unaligned_32_bits() {
        let mut reader = reader(&[0xff, 0x12, 0x34, 0x56, 0x78, 0xff], 8);
        assert_eq!(reader.read_unsigned_bits(4), Ok(0xf));
        assert_eq!(reader.read_unsigned_bits(32), Ok(0xf1234567));
        assert_eq!(reader.bit_offset(), 4);
        assert_eq!(reader.read_unsigned_bits(12), Ok(0x8ff));
    }

    #[test]
    fn test_scan_does_not_advance() {
        let mut reader = reader(&[0xab, 0xcd, 0xef, 0x01], 8);
        assert_eq!(reader.scan_unsigned_bits(12), Ok(0xabc));
        assert_eq!(reader.scan_signed_bits(4), Ok(-6));
        assert_eq!(reader.read_unsigned_bits(4), Ok(0xa));
        reader.align_to_byte();
        assert_eq!(reader.scan_unsigned_short(), Ok(0xefcd));
        assert_eq!(reader.scan_signed_byte(), Ok(-51));
        assert_eq!(reader.read_unsigned_byte(), Ok(0xcd));
        assert_eq!(reader.scan_unsigned_byte(), Ok(0xef));
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_little_endian_integers() {
        let bytes = [0x7b, 0x88, 0x13, 0x92, 0xbd, 0x98, 0x00, 0xfe, 0xff, 0xff, 0xff];
        let mut reader = reader(&bytes, 8);
        assert_eq!(reader.read_signed_byte(), Ok(123));
        assert_eq!(reader.read_signed_short(), Ok(5000));
        assert_eq!(reader.read_unsigned_int(), Ok(10010002));
        assert_eq!(reader.scan_signed_int(), Ok(-2));
        assert_eq!(reader.read_unsigned_int(), Ok(0xfffffffe));
    }

    #[test]
    fn test_out_of_bounds_is_sticky() {
        use crate::Error;

        let mut reader = reader(&[1, 2, 3], 8);
        assert_eq!(reader.read_unsigned_short(), Ok(0x0201));
        assert_eq!(reader.read_unsigned_int(), Err(Error::ArrayIndexOutOfBounds));
        assert_eq!(reader.error(), Some(Error::ArrayIndexOutOfBounds));

        // the byte is still there, but the reader is done
        assert_eq!(reader.read_unsigned_byte(), Err(Error::ArrayIndexOutOfBounds));
        assert_eq!(reader.read_unsigned_bits(1), Err(Error::ArrayIndexOutOfBounds));
    }

    #[test]
    fn test_too_many_bits() {
        use crate::Error;

        let mut reader = reader(&[0; 8], 8);
        assert_eq!(reader.read_unsigned_bits(33), Err(Error::BadArguments));
        assert_eq!(reader.error(), Some(Error::BadArguments));
    }

    #[test]
    fn test_refill_keeps_residue() {
        let vec: Vec<u8> = (0..64).collect();
        let mut reader = reader(&vec, 8);
        for expected in 0..16u32 {
            let low = expected * 4;
            let value = low | (low + 1) << 8 | (low + 2) << 16 | (low + 3) << 24;
            assert_eq!(reader.read_unsigned_bits(4), Ok(low >> 4));
            assert_eq!(reader.read_unsigned_bits(28), Ok(value.swap_bytes() & 0x0fff_ffff));
        }
    }

    #[test]
    fn test_skip() {
        let vec: Vec<u8> = (0..100).collect();
        let mut reader = reader(&vec, 8);

        reader.skip(3);
        assert_eq!(reader.read_unsigned_byte(), Ok(3));
        reader.skip(50);
        assert_eq!(reader.position(), 54);
        assert_eq!(reader.read_unsigned_byte(), Ok(54));

        reader.skip_bits(4);
        assert_eq!(reader.read_unsigned_bits(8), Ok(0x73));
        reader.skip_bits(8 * 20 + 4);
        assert_eq!(reader.position(), 77);
        assert_eq!(reader.bit_offset(), 0);
        assert_eq!(reader.read_unsigned_byte(), Ok(77));
    }

    #[test]
    fn test_skip_past_everything() {
        use crate::Error;

        let mut reader = reader(&[1, 2, 3], 8);
        assert_eq!(reader.read_unsigned_byte(), Ok(1));
        reader.skip(usize::MAX);
        assert_eq!(reader.position(), 1u64.saturating_add(usize::MAX as u64));
        assert_eq!(reader.read_unsigned_byte(), Err(Error::ArrayIndexOutOfBounds));
    }

    #[test]
    fn test_mark_reset_check() {
        let vec: Vec<u8> = (0..40).collect();
        let mut reader = reader(&vec, 8);

        reader.skip(2);
        assert_eq!(reader.mark(), 2);
        assert_eq!(reader.bytes_read(), Some(0));
        for expected in 2..22 {
            assert_eq!(reader.read_unsigned_byte(), Ok(expected));
        }
        assert_eq!(reader.check(20), 0);
        assert_eq!(reader.check(18), 2);
        assert_eq!(reader.bytes_read(), Some(20));

        // mark is behind the buffer by now
        reader.reset();
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_unsigned_byte(), Ok(2));

        assert_eq!(reader.mark(), 3);
        reader.read_unsigned_bits(4).unwrap();
        reader.reset();
        assert_eq!(reader.bit_offset(), 0);
        assert_eq!(reader.read_unsigned_byte(), Ok(3));

        assert_eq!(reader.unmark(), Some(3));
        assert_eq!(reader.unmark(), Some(2));
        assert_eq!(reader.unmark(), None);
        assert_eq!(reader.bytes_read(), None);

        reader.reset();
        assert_eq!(reader.read_unsigned_byte(), Ok(0));
    }

    #[test]
    fn test_read_bytes() {
        use crate::Error;

        let vec: Vec<u8> = (0..30).collect();
        let mut reader = reader(&vec, 8);
        reader.read_unsigned_byte().unwrap();

        let mut dest = [0u8; 20];
        assert_eq!(reader.read_bytes(&mut dest), Ok(20));
        assert_eq!(&dest[..], &vec[1..21]);

        assert_eq!(reader.read_bytes(&mut dest), Ok(9));
        assert_eq!(&dest[..9], &vec[21..30]);
        assert_eq!(reader.error(), Some(Error::ReachedEndOfFile));
        assert_eq!(reader.read_bytes(&mut dest), Err(Error::ReachedEndOfFile));
    }

    #[test]
    fn test_strings() {
        let mut bytes = b"first\0".to_vec();
        bytes.extend_from_slice(b"a longer string crossing buffers\0");
        bytes.extend_from_slice(b"fix\0ed");
        bytes.extend_from_slice(b"tail");
        let mut reader = reader(&bytes, 8);

        assert_eq!(reader.read_string().unwrap(), "first");
        assert_eq!(reader.read_string().unwrap(), "a longer string crossing buffers");
        assert_eq!(reader.read_fixed_string(4).unwrap(), "fix");
        assert_eq!(reader.read_fixed_string(2).unwrap(), "ed");
        assert_eq!(reader.read_fixed_string(0).unwrap(), "");

        // unterminated at end of stream
        assert_eq!(reader.read_string().unwrap(), "tail");
        assert_eq!(reader.error(), None);
    }

    #[test]
    fn test_fixed_string_short_read() {
        use crate::Error;

        let mut reader = reader(b"", 8);
        assert_eq!(reader.read_fixed_string(3), Err(Error::ReachedEndOfFile));
        assert_eq!(reader.error(), Some(Error::ReachedEndOfFile));
    }

    #[test]
    fn test_invalid_utf8_keeps_reader_usable() {
        use crate::Error;

        let mut reader = reader(&[b'c', 0xe9, 0, 42, b'n', 0xe9, 7], 8);
        assert_eq!(reader.read_string(), Err(Error::InvalidData));
        assert_eq!(reader.error(), None);
        assert_eq!(reader.read_unsigned_byte(), Ok(42));

        assert_eq!(reader.read_fixed_string(2), Err(Error::InvalidData));
        assert_eq!(reader.read_unsigned_byte(), Ok(7));
        assert_eq!(reader.error(), None);
    }

    #[test]
    fn test_string_bytes() {
        let mut reader = reader(&[b'c', 0xe9, 0, b'n', 0xe9, 0, 0xff], 8);
        assert_eq!(reader.read_string_bytes(), Ok(vec![b'c', 0xe9]));
        assert_eq!(reader.read_fixed_string_bytes(3), Ok(vec![b'n', 0xe9]));
        assert_eq!(reader.read_string_bytes(), Ok(vec![0xff]));
    }

    #[test]
    fn test_stream_not_at_start() {
        use crate::io::{BitReader, InputStream, IoInput};

        let mut input = IoInput::new(std::io::Cursor::new(vec![9u8, 9, 9, 0x12, 0x34]));
        input.seek(std::io::SeekFrom::Start(3)).unwrap();
        let mut reader = BitReader::new(&mut input);
        assert_eq!(reader.read_unsigned_short(), Ok(0x3412));
        assert_eq!(reader.position(), 2);
    }
}
