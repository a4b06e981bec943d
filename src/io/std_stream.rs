use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result, StickyError};
use super::{InputStream, OutputStream};

/// Adapts a `std::io` reader (a `File`, a `Cursor`, ...) to `InputStream`.
pub struct IoInput<R: Read + Seek> {
    inner: R,
    position: u64,
    at_end: bool,
    error: StickyError,
}

impl<R: Read + Seek> IoInput<R> {
    pub fn new(mut inner: R) -> IoInput<R> {
        let mut error = StickyError::new("IoInput");
        let position = match inner.stream_position() {
            Ok(position) => position,
            Err(e) => {
                debug!("IoInput: cannot query position: {}", e);
                error.fail(Error::InvalidFile);
                0
            }
        };
        IoInput { inner, position, at_end: false, error }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> InputStream for IoInput<R> {
    /// # Example
    /// ```
    /// # use bitcoder::io::{InputStream, IoInput};
    /// # use std::io::SeekFrom;
    /// let mut input = IoInput::new(std::io::Cursor::new(vec![1u8, 2, 3, 4]));
    /// assert_eq!(input.seek(SeekFrom::End(-1)), Ok(3));
    /// let mut buf = [0; 4];
    /// assert_eq!(input.read(&mut buf), Ok(1));
    /// assert_eq!(buf[0], 4);
    /// ```
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.error.check()?;
        match self.inner.seek(pos) {
            Ok(position) => {
                self.position = position;
                self.at_end = false;
                Ok(position)
            },
            Err(e) => {
                debug!("IoInput: seek to {:?} failed: {}", pos, e);
                let err = match e.kind() {
                    std::io::ErrorKind::InvalidInput => Error::BadArguments,
                    _ => Error::FailedToRead,
                };
                Err(self.error.fail(err))
            },
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.error.check()?;
        let mut total = 0;
        while total < buf.len() {
            match self.inner.read(&mut buf[total..]) {
                Ok(0) => {
                    self.at_end = true;
                    break;
                },
                Ok(n) => total += n,
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => (),
                Err(e) => {
                    debug!("IoInput: read failed: {}", e);
                    return Err(self.error.fail(Error::FailedToRead));
                },
            }
        }
        self.position += total as u64;
        Ok(total)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn eof(&self) -> bool {
        self.at_end
    }

    fn error(&self) -> Option<Error> {
        self.error.get()
    }
}

/// Adapts a `std::io` writer to `OutputStream`.
///
/// Sealing flushes the writer and closes the stream for further writes.
pub struct IoOutput<W: Write> {
    inner: W,
    sealed: bool,
    error: StickyError,
}

impl<W: Write> IoOutput<W> {
    pub fn new(inner: W) -> IoOutput<W> {
        IoOutput { inner, sealed: false, error: StickyError::new("IoOutput") }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputStream for IoOutput<W> {
    /// # Example
    /// ```
    /// # use bitcoder::io::{OutputStream, IoOutput};
    /// # use bitcoder::Error;
    /// let mut output = IoOutput::new(Vec::new());
    /// assert_eq!(output.write(b"abc"), Ok(3));
    /// output.seal().unwrap();
    /// assert_eq!(output.write(b"d"), Err(Error::StreamIsClosed));
    /// assert_eq!(output.get_ref(), b"abc");
    /// ```
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.error.check()?;
        if self.sealed {
            return Err(self.error.fail(Error::StreamIsClosed));
        }
        match self.inner.write_all(buf) {
            Ok(()) => Ok(buf.len()),
            Err(e) => {
                debug!("IoOutput: write failed: {}", e);
                Err(self.error.fail(Error::FailedToWrite))
            },
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.error.check()?;
        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("IoOutput: flush failed: {}", e);
                Err(self.error.fail(Error::FailedToWrite))
            },
        }
    }

    fn seal(&mut self) -> Result<()> {
        if self.sealed {
            return Ok(());
        }
        self.flush()?;
        self.sealed = true;
        Ok(())
    }

    fn error(&self) -> Option<Error> {
        self.error.get()
    }
}

/// Opens a file for reading.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<IoInput<File>> {
    match File::open(path.as_ref()) {
        Ok(file) => Ok(IoInput::new(file)),
        Err(e) => {
            debug!("cannot open {}: {}", path.as_ref().display(), e);
            Err(Error::FailedToOpen)
        },
    }
}

/// Creates (or truncates) a file for writing.
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<IoOutput<File>> {
    match File::create(path.as_ref()) {
        Ok(file) => Ok(IoOutput::new(file)),
        Err(e) => {
            debug!("cannot create {}: {}", path.as_ref().display(), e);
            Err(Error::FailedToOpen)
        },
    }
}

mod tests {
    #[test]
    fn test_read_tracks_position_and_eof() {
        use crate::io::{InputStream, IoInput};

        let mut input = IoInput::new(std::io::Cursor::new(vec![1u8, 2, 3, 4, 5]));
        let mut buf = [0u8; 3];
        assert_eq!(input.read(&mut buf), Ok(3));
        assert_eq!(input.tell(), 3);
        assert!(!input.eof());

        assert_eq!(input.read(&mut buf), Ok(2));
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(input.tell(), 5);
        assert!(input.eof());

        assert_eq!(input.seek(std::io::SeekFrom::Start(1)), Ok(1));
        assert!(!input.eof());
        assert_eq!(input.read(&mut buf), Ok(3));
        assert_eq!(buf, [2, 3, 4]);
    }

    #[test]
    fn test_negative_seek_is_sticky() {
        use crate::io::{InputStream, IoInput};
        use crate::Error;

        let mut input = IoInput::new(std::io::Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(input.seek(std::io::SeekFrom::Current(-1)), Err(Error::BadArguments));
        assert_eq!(input.error(), Some(Error::BadArguments));

        let mut buf = [0u8; 1];
        assert_eq!(input.read(&mut buf), Err(Error::BadArguments));
    }

    #[test]
    fn test_open_missing_file() {
        use crate::Error;

        let path = std::env::temp_dir().join("bitcoder-no-such-dir").join("missing.bin");
        assert_eq!(crate::io::open_input(&path).err(), Some(Error::FailedToOpen));
    }

    #[test]
    fn test_file_round_trip() {
        use crate::io::{InputStream, OutputStream};

        let path = std::env::temp_dir().join(format!("bitcoder-std-{}.bin", std::process::id()));
        {
            let mut output = crate::io::create_output(&path).unwrap();
            assert_eq!(output.write(b"hello"), Ok(5));
            output.seal().unwrap();
            assert!(output.is_sealed());
        }

        let mut input = crate::io::open_input(&path).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf), Ok(5));
        assert_eq!(&buf[..5], b"hello");
        assert!(input.eof());

        std::fs::remove_file(&path).unwrap();
    }
}
