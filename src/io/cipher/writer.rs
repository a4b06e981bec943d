use log::{debug, warn};

use crate::crypto::{BlockCipher, Des, Key, BLOCK_SIZE};
use crate::error::{Error, Result, StickyError};
use crate::io::{write_full, OutputStream};

const DEFAULT_CAPACITY: usize = 4096;
const MIN_PREFERRED_CAPACITY: usize = 64;

/// Encrypts plaintext in 8-byte blocks on its way to an underlying stream.
///
/// Only whole blocks leave the buffer on a `flush`; up to 7 trailing bytes
/// wait for more data. `seal` zero-pads and emits that last partial block
/// and closes the writer for good. Dropping an unsealed writer seals it.
pub struct CipherWriter<S: OutputStream, C: BlockCipher = Des> {
    stream: S,
    cipher: C,
    buffer: Vec<u8>,
    filled: usize,
    sealed: bool,
    error: StickyError,
}

impl<S: OutputStream> CipherWriter<S, Des> {
    /// Encrypts into `stream` with DES under `key`.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{CipherWriter, IoOutput, OutputStream};
    /// let mut output = IoOutput::new(Vec::new());
    /// {
    ///     let mut writer = CipherWriter::des(&mut output, b"abcdefgh");
    ///     writer.write(b"hello, world").unwrap();
    ///     writer.seal().unwrap();
    /// }
    /// let opened = bitcoder::crypto::decrypt(b"abcdefgh", output.get_ref()).unwrap();
    /// assert_eq!(&opened, b"hello, world\0\0\0\0");
    /// ```
    pub fn des(stream: S, key: &Key) -> CipherWriter<S, Des> {
        CipherWriter::new(stream, Des::encryptor(key))
    }
}

impl<S: OutputStream, C: BlockCipher> CipherWriter<S, C> {
    pub fn new(stream: S, cipher: C) -> CipherWriter<S, C> {
        CipherWriter::with_capacity(stream, cipher, DEFAULT_CAPACITY)
    }

    /// Uses a plaintext buffer of about `preferred` bytes.
    ///
    /// The size is rounded up to whole blocks. Requests under 64 bytes get
    /// the default of 4096.
    pub fn with_capacity(stream: S, cipher: C, preferred: usize) -> CipherWriter<S, C> {
        CipherWriter {
            stream,
            cipher,
            buffer: vec![0; block_capacity(preferred)],
            filled: 0,
            sealed: false,
            error: StickyError::new("CipherWriter"),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Plaintext bytes accepted but not yet encrypted.
    pub fn buffered(&self) -> usize {
        self.filled
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Encrypts and forwards the buffered whole blocks. With `seal`, a
    /// trailing partial block is zero-padded and forwarded as well.
    fn flush_blocks(&mut self, seal: bool) -> Result<()> {
        let mut whole = self.filled & !(BLOCK_SIZE - 1);
        let mut remains = self.filled - whole;

        if seal && remains > 0 {
            for byte in &mut self.buffer[self.filled..whole + BLOCK_SIZE] {
                *byte = 0;
            }
            whole += BLOCK_SIZE;
            remains = 0;
        }

        if whole > 0 {
            self.cipher.transform_blocks(&mut self.buffer[..whole]);
            debug!("CipherWriter: forwarding {} bytes", whole);
            write_full(&mut self.stream, &self.buffer[..whole])?;
            self.stream.flush()?;

            self.buffer.copy_within(whole..whole + remains, 0);
            self.filled = remains;
        }

        Ok(())
    }
}

/// Buffer size for a requested capacity, in whole blocks.
fn block_capacity(preferred: usize) -> usize {
    if preferred < MIN_PREFERRED_CAPACITY {
        return DEFAULT_CAPACITY;
    }
    preferred.checked_next_multiple_of(BLOCK_SIZE)
        .unwrap_or(usize::MAX & !(BLOCK_SIZE - 1))
}

impl<S: OutputStream, C: BlockCipher> OutputStream for CipherWriter<S, C> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.error.check()?;
        if self.sealed {
            return Err(self.error.fail(Error::StreamIsClosed));
        }

        let mut written = 0;
        loop {
            if self.filled >= self.buffer.len() {
                let flushed = self.flush_blocks(false);
                self.error.track(flushed)?;
            }
            if written == buf.len() {
                break;
            }

            let n = std::cmp::min(buf.len() - written, self.buffer.len() - self.filled);
            self.buffer[self.filled..self.filled + n].copy_from_slice(&buf[written..written + n]);
            self.filled += n;
            written += n;
        }

        Ok(written)
    }

    /// Forwards every whole block; 0 to 7 bytes stay buffered.
    fn flush(&mut self) -> Result<()> {
        self.error.check()?;
        let flushed = self.flush_blocks(false);
        self.error.track(flushed)
    }

    /// Forwards everything, padding the last block, and closes the writer.
    /// Sealing again does nothing.
    fn seal(&mut self) -> Result<()> {
        if self.sealed {
            return Ok(());
        }
        self.error.check()?;
        let flushed = self.flush_blocks(true);
        self.sealed = true;
        debug!("CipherWriter: sealed");
        self.error.track(flushed)
    }

    fn error(&self) -> Option<Error> {
        self.error.get()
    }
}

impl<S: OutputStream, C: BlockCipher> Drop for CipherWriter<S, C> {
    fn drop(&mut self) {
        if !self.sealed {
            if let Err(e) = self.seal() {
                warn!("CipherWriter: sealing on drop failed: {}", e);
            }
        }
    }
}

mod tests {
    #[test]
    fn test_partial_block_waits_for_seal() {
        use crate::io::{CipherWriter, IoOutput, OutputStream};

        let mut output = IoOutput::new(Vec::new());
        let mut writer = CipherWriter::des(&mut output, b"abcdefgh");
        assert_eq!(writer.write(&[1u8; 13]), Ok(13));
        writer.flush().unwrap();
        assert_eq!(writer.buffered(), 5);
        assert_eq!(writer.get_ref().get_ref().len(), 8);

        writer.seal().unwrap();
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.get_ref().get_ref().len(), 16);
    }

    #[test]
    fn test_write_after_seal() {
        use crate::io::{CipherWriter, IoOutput, OutputStream};
        use crate::Error;

        let mut output = IoOutput::new(Vec::new());
        let mut writer = CipherWriter::des(&mut output, b"abcdefgh");
        writer.write(b"abc").unwrap();
        writer.seal().unwrap();
        writer.seal().unwrap();
        assert_eq!(writer.get_ref().get_ref().len(), 8);

        assert_eq!(writer.write(b"d"), Err(Error::StreamIsClosed));
        assert_eq!(writer.error(), Some(Error::StreamIsClosed));
        assert_eq!(writer.get_ref().get_ref().len(), 8);
    }

    #[test]
    fn test_drop_seals() {
        use crate::io::{CipherWriter, IoOutput, OutputStream};

        let mut output = IoOutput::new(Vec::new());
        {
            let mut writer = CipherWriter::des(&mut output, b"abcdefgh");
            writer.write(b"twelve bytes").unwrap();
        }
        let opened = crate::crypto::decrypt(b"abcdefgh", output.get_ref()).unwrap();
        assert_eq!(&opened, b"twelve bytes\0\0\0\0");
    }

    #[test]
    fn test_capacity() {
        use crate::crypto::Des;
        use crate::io::{CipherWriter, IoOutput};

        let key = b"abcdefgh";
        let writer = CipherWriter::with_capacity(IoOutput::new(Vec::new()), Des::encryptor(key), 100);
        assert_eq!(writer.capacity(), 104);
        let writer = CipherWriter::with_capacity(IoOutput::new(Vec::new()), Des::encryptor(key), 10);
        assert_eq!(writer.capacity(), 4096);
    }

    #[test]
    fn test_block_capacity() {
        use super::block_capacity;

        assert_eq!(block_capacity(0), 4096);
        assert_eq!(block_capacity(63), 4096);
        assert_eq!(block_capacity(64), 64);
        assert_eq!(block_capacity(65), 72);
        assert_eq!(block_capacity(usize::MAX), usize::MAX - 7);
        assert_eq!(block_capacity(usize::MAX - 7), usize::MAX - 7);
    }

    #[test]
    fn test_buffer_overflow_flushes_whole_blocks() {
        use crate::crypto::Des;
        use crate::io::{CipherWriter, IoOutput, OutputStream};

        let plain: Vec<u8> = (0..200u32).map(|x| (x * 7) as u8).collect();
        let mut output = IoOutput::new(Vec::new());
        {
            let mut writer = CipherWriter::with_capacity(&mut output, Des::encryptor(b"abcdefgh"), 64);
            for chunk in plain.chunks(9) {
                assert_eq!(writer.write(chunk), Ok(chunk.len()));
                assert!(writer.buffered() <= 64);
            }
            assert_eq!(writer.get_ref().get_ref().len() % 8, 0);
            writer.seal().unwrap();
        }

        assert_eq!(output.get_ref().len(), 200);
        let opened = crate::crypto::decrypt(b"abcdefgh", output.get_ref()).unwrap();
        assert_eq!(opened, plain);
    }
}
