use std::io::SeekFrom;

use log::debug;

use crate::crypto::{Block, BlockCipher, Des, Key, BLOCK_SIZE};
use crate::error::{Error, Result, StickyError};
use crate::io::{read_full, resolve_seek, InputStream};

/// The decrypted block currently held, if any.
///
/// Only reusable while `!dirty && index == position >> 3`.
struct CachedBlock {
    index: u64,
    dirty: bool,
    data: Block,
}

/// Decrypts an underlying stream block by block as it is read.
///
/// Positions are relative to where the underlying stream stood when the
/// reader was built. Seeking is free; the next read notices that the
/// cached block no longer matches and fetches the right one.
pub struct CipherReader<S: InputStream, C: BlockCipher = Des> {
    stream: S,
    cipher: C,
    start: u64,
    length: u64,
    position: u64,
    block: CachedBlock,
    error: StickyError,
}

impl<S: InputStream> CipherReader<S, Des> {
    /// Decrypts `stream` with DES under `key`.
    ///
    /// # Example
    /// ```
    /// # use bitcoder::io::{CipherReader, InputStream, IoInput};
    /// let sealed = bitcoder::crypto::encrypt(b"abcdefgh", b"secret message");
    /// let mut reader = CipherReader::des(IoInput::new(std::io::Cursor::new(sealed)), b"abcdefgh");
    ///
    /// let mut buf = [0; 14];
    /// assert_eq!(reader.read(&mut buf), Ok(14));
    /// assert_eq!(&buf, b"secret message");
    /// ```
    pub fn des(stream: S, key: &Key) -> CipherReader<S, Des> {
        CipherReader::new(stream, Des::decryptor(key))
    }
}

impl<S: InputStream, C: BlockCipher> CipherReader<S, C> {
    /// Decrypts everything from the current position of `stream` to its end.
    pub fn new(stream: S, cipher: C) -> CipherReader<S, C> {
        CipherReader::with_limit(stream, cipher, u64::MAX)
    }

    /// Decrypts at most `encrypted_bytes` bytes starting at the current
    /// position of `stream`.
    pub fn with_limit(mut stream: S, cipher: C, encrypted_bytes: u64)
    -> CipherReader<S, C> {
        let mut error = StickyError::new("CipherReader");
        let start = stream.tell();
        let end = stream.seek(SeekFrom::End(0))
            .and_then(|end| stream.seek(SeekFrom::Start(start)).map(|_| end));
        let length = match end {
            Ok(end) => std::cmp::min(encrypted_bytes, end.saturating_sub(start)),
            Err(e) => {
                error.fail(e);
                0
            },
        };
        debug!("CipherReader: start {}, length {}", start, length);

        CipherReader {
            stream,
            cipher,
            start,
            length,
            position: 0,
            block: CachedBlock { index: 0, dirty: true, data: [0; BLOCK_SIZE] },
            error,
        }
    }

    /// Number of decryptable bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Makes the cached block the one holding `self.position`.
    fn load_block(&mut self) -> Result<()> {
        let index = self.position >> 3;
        if !self.block.dirty && self.block.index == index {
            return Ok(());
        }

        self.block.index = index;
        self.block.dirty = true;

        let offset = self.start + (index << 3);
        if self.stream.tell() != offset {
            self.stream.seek(SeekFrom::Start(offset))?;
        }
        debug!("CipherReader: fetching block {}", index);
        let count = read_full(&mut self.stream, &mut self.block.data)?;
        if count < BLOCK_SIZE {
            return Err(Error::InvalidData);
        }

        self.cipher.transform(&mut self.block.data);
        self.block.dirty = false;
        Ok(())
    }
}

impl<S: InputStream, C: BlockCipher> InputStream for CipherReader<S, C> {
    /// Moves the position indicator without touching the underlying stream.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.error.check()?;
        let target = resolve_seek(pos, self.position, self.length);
        self.position = self.error.track(target)?;
        Ok(self.position)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.error.check()?;

        let mut copied = 0;
        while copied < buf.len() && self.position < self.length {
            let loaded = self.load_block();
            self.error.track(loaded)?;

            let offset = (self.position & 7) as usize;
            let in_block = BLOCK_SIZE - offset;
            let remaining = (self.length - self.position) as usize;
            let n = in_block.min(buf.len() - copied).min(remaining);

            buf[copied..copied + n].copy_from_slice(&self.block.data[offset..offset + n]);
            copied += n;
            self.position += n as u64;
        }

        Ok(copied)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn eof(&self) -> bool {
        self.position >= self.length
    }

    fn error(&self) -> Option<Error> {
        self.error.get()
    }
}

mod tests {
    #[cfg(test)]
    fn reader_over(plain: &[u8]) -> crate::io::CipherReader<crate::io::IoInput<std::io::Cursor<Vec<u8>>>> {
        let sealed = crate::crypto::encrypt(b"abcdefgh", plain);
        crate::io::CipherReader::des(crate::io::IoInput::new(std::io::Cursor::new(sealed)), b"abcdefgh")
    }

    #[test]
    fn test_read_across_blocks() {
        use crate::io::InputStream;

        let plain: Vec<u8> = (0..40).collect();
        let mut reader = reader_over(&plain);
        assert_eq!(reader.len(), 40);

        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            match reader.read(&mut buf).unwrap() {
                0 => break,
                n => out.extend_from_slice(&buf[..n]),
            }
        }
        assert_eq!(out, plain);
        assert!(reader.eof());
        assert_eq!(reader.error(), None);
    }

    #[test]
    fn test_seek_then_read_mid_block() {
        use crate::io::InputStream;
        use std::io::SeekFrom;

        let plain: Vec<u8> = (100..132).collect();
        let mut reader = reader_over(&plain);

        let mut buf = [0u8; 4];
        assert_eq!(reader.seek(SeekFrom::Start(13)), Ok(13));
        assert_eq!(reader.read(&mut buf), Ok(4));
        assert_eq!(buf, [113, 114, 115, 116]);

        assert_eq!(reader.seek(SeekFrom::Current(-10)), Ok(7));
        assert_eq!(reader.read(&mut buf), Ok(4));
        assert_eq!(buf, [107, 108, 109, 110]);

        assert_eq!(reader.seek(SeekFrom::End(-2)), Ok(30));
        assert_eq!(reader.read(&mut buf), Ok(2));
        assert_eq!(&buf[..2], &[130, 131]);
        assert_eq!(reader.read(&mut buf), Ok(0));
    }

    #[test]
    fn test_negative_seek() {
        use crate::io::InputStream;
        use crate::Error;
        use std::io::SeekFrom;

        let mut reader = reader_over(b"abc");
        assert_eq!(reader.seek(SeekFrom::Current(-1)), Err(Error::BadArguments));
        assert_eq!(reader.error(), Some(Error::BadArguments));
    }

    #[test]
    fn test_truncated_ciphertext() {
        use crate::io::{CipherReader, InputStream, IoInput};
        use crate::Error;

        let mut sealed = crate::crypto::encrypt(b"abcdefgh", &[7u8; 16]);
        sealed.truncate(13);
        let mut reader = CipherReader::des(IoInput::new(std::io::Cursor::new(sealed)), b"abcdefgh");

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf), Ok(8));
        assert_eq!(buf, [7u8; 8]);
        assert_eq!(reader.read(&mut buf), Err(Error::InvalidData));
        assert_eq!(reader.read(&mut buf), Err(Error::InvalidData));
        assert_eq!(reader.error(), Some(Error::InvalidData));
    }

    #[test]
    fn test_limit_and_offset_start() {
        use crate::crypto::Des;
        use crate::io::{CipherReader, InputStream, IoInput};
        use std::io::SeekFrom;

        let mut data = b"HEADER".to_vec();
        data.extend(crate::crypto::encrypt(b"abcdefgh", b"0123456789abcdef"));
        data.extend_from_slice(b"TRAILER");

        let mut input = IoInput::new(std::io::Cursor::new(data));
        input.seek(SeekFrom::Start(6)).unwrap();
        let mut reader = CipherReader::with_limit(&mut input, Des::decryptor(b"abcdefgh"), 16);
        assert_eq!(reader.len(), 16);

        let mut buf = [0u8; 32];
        assert_eq!(reader.read(&mut buf), Ok(16));
        assert_eq!(&buf[..16], b"0123456789abcdef");
        assert!(reader.eof());
    }
}
