use log::debug;

use crate::error::{error_if, Error, Result, StickyError};
use crate::io::{write_full, OutputStream};
use super::{low_bits, MarkStack, BITS_PER_BYTE, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};

/// Writes bit fields and little-endian integers to an output stream.
///
/// Bits fill each byte starting from the most significant bit. Integer and
/// byte writes go to the current byte index and replace a partially
/// written byte there; call `align_to_byte` first to keep its bits.
///
/// Output is buffered. Nothing reaches the stream until the buffer runs
/// over or `flush` is called, and dropping the writer does not flush.
pub struct BitWriter<S: OutputStream> {
    stream: S,
    buffer: Vec<u8>,
    /// Bytes already handed to the stream.
    position: u64,
    index: usize,
    offset: usize,
    marks: MarkStack,
    error: StickyError,
}

impl<S: OutputStream> BitWriter<S> {
    pub fn new(stream: S) -> BitWriter<S> {
        BitWriter::with_capacity(stream, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(stream: S, capacity: usize) -> BitWriter<S> {
        BitWriter {
            stream,
            buffer: vec![0; std::cmp::max(capacity, MIN_BUFFER_SIZE)],
            position: 0,
            index: 0,
            offset: 0,
            marks: MarkStack::default(),
            error: StickyError::new("BitWriter"),
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

    /// Bits already written into the byte at `position()`, in `0..8`.
    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Flushes and returns the underlying stream.
    pub fn into_inner(mut self) -> Result<S> {
        self.flush()?;
        Ok(self.stream)
    }

    /// Hands the complete bytes to the stream. A partially written byte
    /// moves to the front of the buffer and keeps collecting bits.
    fn spill(&mut self) -> Result<()> {
        write_full(&mut self.stream, &self.buffer[..self.index])?;
        self.stream.flush()?;
        debug!("BitWriter: flushed {} bytes at {}", self.index, self.position);

        let carried = match self.offset {
            0 => 0,
            _ => {
                self.buffer[0] = self.buffer[self.index];
                1
            },
        };
        for byte in &mut self.buffer[carried..] {
            *byte = 0;
        }

        self.position += self.index as u64;
        self.index = 0;
        Ok(())
    }

    /// Makes room for `count` bytes from the byte index.
    fn reserve(&mut self, count: usize) -> Result<()> {
        if self.index + count > self.buffer.len() {
            let spilled = self.spill();
            self.error.track(spilled)?;
        }
        Ok(())
    }

    /// Writes the low `count` bits of `value`, most significant first.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitWriter, IoOutput};
    /// let mut writer = BitWriter::new(IoOutput::new(Vec::new()));
    /// writer.write_bits(0xabc, 12).unwrap();
    /// writer.write_bits(0xd, 4).unwrap();
    /// writer.flush().unwrap();
    /// assert_eq!(writer.get_ref().get_ref(), &[0xab, 0xcd]);
    /// ```
    pub fn write_bits(&mut self, value: u32, count: usize) -> Result<()> {
        self.error.check()?;
        let checked = error_if(count > 32, Error::BadArguments);
        self.error.track(checked)?;
        if count == 0 {
            return Ok(());
        }

        let needed = self.offset + count;
        let byte_count = (needed + 7) / BITS_PER_BYTE;
        self.reserve(byte_count)?;

        let kept = self.buffer[self.index] & !(0xffu8 >> self.offset);
        let mut window = (kept as u64) << 56;
        window |= ((value & low_bits(count)) as u64) << (64 - needed);
        for i in 0..byte_count {
            self.buffer[self.index + i] = (window >> (56 - i * BITS_PER_BYTE)) as u8;
        }

        let pointer = self.index * BITS_PER_BYTE + needed;
        self.index = pointer / BITS_PER_BYTE;
        self.offset = pointer % BITS_PER_BYTE;
        Ok(())
    }

    /// Writes the low `count` bits of a two's complement value.
    pub fn write_signed_bits(&mut self, value: i32, count: usize) -> Result<()> {
        self.write_bits(value as u32, count)
    }

    fn write_le(&mut self, value: u32, width: usize) -> Result<()> {
        self.error.check()?;
        self.offset = 0;
        self.reserve(width)?;
        for i in 0..width {
            self.buffer[self.index + i] = (value >> (i * BITS_PER_BYTE)) as u8;
        }
        self.index += width;
        Ok(())
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write_le(value as u32, 1)
    }

    /// Writes a 16-bit integer, least significant byte first.
    pub fn write_short(&mut self, value: u16) -> Result<()> {
        self.write_le(value as u32, 2)
    }

    /// Writes a 32-bit integer, least significant byte first.
    pub fn write_int(&mut self, value: u32) -> Result<()> {
        self.write_le(value, 4)
    }

    /// Writes raw bytes.
    ///
    /// Data that does not fit the buffer goes straight to the stream after
    /// a `flush`.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.error.check()?;
        if bytes.is_empty() {
            return Ok(0);
        }

        self.offset = 0;
        if self.index + bytes.len() <= self.buffer.len() {
            self.buffer[self.index..self.index + bytes.len()].copy_from_slice(bytes);
            self.index += bytes.len();
        } else {
            self.flush()?;
            let written = write_full(&mut self.stream, bytes);
            self.error.track(written)?;
            self.position += bytes.len() as u64;
        }
        Ok(bytes.len())
    }

    /// Writes the bytes of `value` and a NUL terminator.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_byte(0)
    }

    /// Moves to the next byte boundary; the skipped bits stay zero.
    pub fn align_to_byte(&mut self) {
        if self.offset > 0 {
            self.index += 1;
            self.offset = 0;
        }
    }

    /// Hands everything written so far to the stream.
    ///
    /// A partially written byte goes out padded with zero bits, and the
    /// cursor moves on to the next byte boundary.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitWriter, IoOutput};
    /// let mut writer = BitWriter::new(IoOutput::new(Vec::new()));
    /// writer.write_bits(0x7, 4).unwrap();
    /// writer.flush().unwrap();
    /// writer.write_bits(0x5, 4).unwrap();
    /// writer.flush().unwrap();
    /// assert_eq!(writer.get_ref().get_ref(), &[0x70, 0x50]);
    /// ```
    pub fn flush(&mut self) -> Result<()> {
        self.error.check()?;
        self.align_to_byte();
        let spilled = self.spill();
        self.error.track(spilled)
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

    /// Bytes written since the last mark minus `expected`.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{BitWriter, IoOutput};
    /// let mut writer = BitWriter::new(IoOutput::new(Vec::new()));
    /// writer.mark();
    /// writer.write_short(7).unwrap();
    /// writer.write_int(9).unwrap();
    /// assert_eq!(writer.check(6), 0);
    /// assert_eq!(writer.check(8), -2);
    /// ```
    pub fn check(&self, expected: u64) -> i64 {
        self.marks.check(self.position(), expected)
    }
}

mod bitwriter_tests {
    #[cfg(test)]
    type VecWriter = crate::io::BitWriter<crate::io::IoOutput<Vec<u8>>>;

    #[cfg(test)]
    fn writer(capacity: usize) -> VecWriter {
        crate::io::BitWriter::with_capacity(crate::io::IoOutput::new(Vec::new()), capacity)
    }

    #[cfg(test)]
    fn output(writer: &VecWriter) -> &[u8] {
        writer.get_ref().get_ref()
    }

    #[test]
    fn test_write_bit() {
        let mut writer = writer(8);
        let bits = [
            0, 0, 0, 0, 0, 0, 0, 1,
            0, 0, 1, 0, 0, 0, 1, 1,
            0, 1, 0, 0, 0, 1, 0, 1,
            0, 1, 1, 0, 0, 1, 1, 1,
            1, 0, 0, 0, 1, 0, 0, 1,
            1, 0, 1, 0, 1, 0, 1, 1,
            1, 1, 0, 0, 1, 1, 0, 1,
            1, 1, 1, 0, 1, 1, 1, 1,
        ];

        for b in bits.iter() {
            assert_eq!(writer.write_bits(*b, 1), Ok(()));
        }
        writer.flush().unwrap();

        assert_eq!(output(&writer), &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]);
    }

    #[test]
    fn test_write_bits_32() {
        use crate::io::{BitReader, IoInput};

        let fibonacci = generate_fibonacci();
        let mut writer = writer(8);
        for x in fibonacci.iter() {
            assert_eq!(writer.write_bits(*x, count_bits(*x)), Ok(()));
        }
        writer.flush().unwrap();

        let input = IoInput::new(std::io::Cursor::new(output(&writer).to_vec()));
        let mut reader = BitReader::with_capacity(input, 8);
        for x in fibonacci.iter() {
            assert_eq!(reader.read_unsigned_bits(count_bits(*x)), Ok(*x));
        }
    }

    #[test]
    fn test_overflow_carries_partial_byte() {
        // 3 + 63 * 9 bits never land on a byte boundary while the small
        // buffer overflows
        let mut writer = writer(8);
        writer.write_bits(0b101, 3).unwrap();
        for _ in 0..9 {
            writer.write_bits(0xffff_ffff, 32).unwrap();
            writer.write_bits(0, 31).unwrap();
        }
        writer.flush().unwrap();

        let mut expected = vec![0u8; (3 + 9 * 63 + 7) / 8];
        let mut pointer = 0;
        let mut put = |value: u64, count: usize| {
            for i in (0..count).rev() {
                if value >> i & 1 != 0 {
                    expected[pointer / 8] |= 0x80 >> (pointer % 8);
                }
                pointer += 1;
            }
        };
        put(0b101, 3);
        for _ in 0..9 {
            put(0xffff_ffff, 32);
            put(0, 31);
        }

        assert_eq!(output(&writer), &expected[..]);
    }

    #[test]
    fn test_little_endian_integers() {
        let mut writer = writer(8);
        writer.write_byte(123).unwrap();
        writer.write_short(5000).unwrap();
        writer.write_int(10010002).unwrap();
        writer.write_int(-2i32 as u32).unwrap();
        writer.flush().unwrap();

        assert_eq!(
            output(&writer),
            &[0x7b, 0x88, 0x13, 0x92, 0xbd, 0x98, 0x00, 0xfe, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_signed_bits() {
        let mut writer = writer(8);
        writer.write_signed_bits(-2, 4).unwrap();
        writer.write_signed_bits(7, 4).unwrap();
        writer.write_signed_bits(-1, 8).unwrap();
        writer.flush().unwrap();
        assert_eq!(output(&writer), &[0b1110_0111, 0xff]);
    }

    #[test]
    fn test_align_to_byte() {
        let mut writer = writer(8);
        writer.write_bits(0b1, 1).unwrap();
        writer.align_to_byte();
        assert_eq!(writer.position(), 1);
        writer.align_to_byte();
        assert_eq!(writer.position(), 1);
        writer.write_byte(0x42).unwrap();
        writer.flush().unwrap();
        assert_eq!(output(&writer), &[0x80, 0x42]);
    }

    #[test]
    fn test_byte_writes_replace_partial_byte() {
        let payload: Vec<u8> = (1..=8).collect();

        {
            let mut writer = writer(8);
            writer.write_bits(1, 1).unwrap();
            writer.write_int(0x0403_0201).unwrap();
            writer.write_int(0x0807_0605).unwrap();
            assert_eq!(writer.bit_offset(), 0);
            writer.write_byte(9).unwrap();
            writer.flush().unwrap();
            assert_eq!(output(&writer), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        }

        {
            let mut writer = writer(8);
            writer.write_bits(1, 1).unwrap();
            assert_eq!(writer.write_bytes(&payload), Ok(8));
            writer.flush().unwrap();
            assert_eq!(output(&writer), &payload[..]);
            assert_eq!(writer.position(), 8);
        }

        {
            let mut writer = writer(8);
            writer.write_bits(0x7f, 7).unwrap();
            assert_eq!(writer.write_bytes(&payload[..2]), Ok(2));
            writer.write_bits(0x3, 2).unwrap();
            writer.flush().unwrap();
            assert_eq!(output(&writer), &[1, 2, 0xc0]);
        }
    }

    #[test]
    fn test_write_bytes_bypasses_buffer() {
        let mut writer = writer(8);
        let payload: Vec<u8> = (0..20).collect();

        writer.write_byte(0xaa).unwrap();
        assert_eq!(writer.write_bytes(&payload[..4]), Ok(4));
        assert!(output(&writer).is_empty());

        assert_eq!(writer.write_bytes(&payload), Ok(20));
        assert_eq!(output(&writer).len(), 25);
        assert_eq!(writer.position(), 25);

        writer.write_string("hi").unwrap();
        writer.flush().unwrap();

        let mut expected = vec![0xaa];
        expected.extend_from_slice(&payload[..4]);
        expected.extend_from_slice(&payload);
        expected.extend_from_slice(b"hi\0");
        assert_eq!(output(&writer), &expected[..]);
    }

    #[test]
    fn test_mark_check() {
        let mut writer = writer(8);
        writer.write_byte(1).unwrap();
        assert_eq!(writer.mark(), 1);
        for _ in 0..5 {
            writer.write_int(0).unwrap();
        }
        assert_eq!(writer.check(20), 0);

        assert_eq!(writer.mark(), 21);
        writer.write_bits(0x3, 2).unwrap();
        assert_eq!(writer.check(0), 0);
        writer.align_to_byte();
        assert_eq!(writer.check(1), 0);
        assert_eq!(writer.mark_depth(), 2);

        assert_eq!(writer.unmark(), Some(21));
        assert_eq!(writer.check(21), 0);
        assert_eq!(writer.unmark(), Some(1));
        assert_eq!(writer.unmark(), None);
        assert_eq!(writer.check(22), 0);
    }

    #[test]
    fn test_closed_stream_is_sticky() {
        use crate::io::OutputStream;
        use crate::Error;

        let mut writer = writer(8);
        writer.get_mut().seal().unwrap();
        writer.write_int(1).unwrap();
        assert_eq!(writer.flush(), Err(Error::StreamIsClosed));
        assert_eq!(writer.error(), Some(Error::StreamIsClosed));
        assert_eq!(writer.write_byte(2), Err(Error::StreamIsClosed));
        assert_eq!(writer.write_bits(2, 3), Err(Error::StreamIsClosed));
    }

    #[test]
    fn test_too_many_bits() {
        use crate::Error;

        let mut writer = writer(8);
        assert_eq!(writer.write_bits(0, 33), Err(Error::BadArguments));
        assert_eq!(writer.write_bits(0, 3), Err(Error::BadArguments));
    }

    #[cfg(test)]
    fn count_bits(n: u32) -> usize {
        (32 - n.leading_zeros()) as usize
    }

    #[cfg(test)]
    fn generate_fibonacci() -> Vec<u32> {
        let mut fib = Vec::new();
        let mut parents: [u32;2] = [0, 1];
        let mut index = 0;
        loop {
            let i = index % 2;
            let j = (index + 1) % 2;
            fib.push(parents[i]);
            if parents[j].leading_zeros() == 0 {
                break;
            }
            parents[index % 2] += parents[(index + 1) % 2];
            index += 1;
        }
        fib
    }
}
