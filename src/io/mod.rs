use std::io::SeekFrom;
use crate::error::{Error, Result};

mod bitio;
pub use self::bitio::{
    BitReader, BitWriter,
    DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE
};

pub mod cipher;
pub use self::cipher::{CipherReader, CipherWriter};

mod std_stream;
pub use self::std_stream::{IoInput, IoOutput, open_input, create_output};

/// A readable, seekable byte source.
///
/// Errors are sticky: after the first failure every call reports it again
/// and `error()` returns it.
pub trait InputStream {
    /// Moves the position indicator and returns the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Reads up to `buf.len()` bytes. `Ok(0)` with a non-empty `buf`
    /// means the end of the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Current position indicator.
    fn tell(&self) -> u64;

    /// True once the position indicator reached the end of the data.
    fn eof(&self) -> bool;

    /// The first error this stream ran into, if any.
    fn error(&self) -> Option<Error>;
}

/// A writable byte sink with explicit flushing and one-shot sealing.
pub trait OutputStream {
    /// Writes up to `buf.len()` bytes and returns how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Pushes buffered data further down.
    fn flush(&mut self) -> Result<()>;

    /// Finishes the stream. Later writes fail with `StreamIsClosed`.
    fn seal(&mut self) -> Result<()>;

    /// The first error this stream ran into, if any.
    fn error(&self) -> Option<Error>;
}

/// Keeps reading until `buf` is full or the stream runs dry.
pub(crate) fn read_full<S: InputStream + ?Sized>(stream: &mut S, buf: &mut [u8])
-> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

/// Writes the whole of `buf` or fails with `FailedToWrite`.
pub(crate) fn write_full<S: OutputStream + ?Sized>(stream: &mut S, buf: &[u8])
-> Result<()> {
    let mut total = 0;
    while total < buf.len() {
        match stream.write(&buf[total..])? {
            0 => return Err(Error::FailedToWrite),
            n => total += n,
        }
    }
    Ok(())
}

impl<S: InputStream + ?Sized> InputStream for &mut S {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> { (**self).seek(pos) }
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> { (**self).read(buf) }
    fn tell(&self) -> u64 { (**self).tell() }
    fn eof(&self) -> bool { (**self).eof() }
    fn error(&self) -> Option<Error> { (**self).error() }
}

impl<S: InputStream + ?Sized> InputStream for Box<S> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> { (**self).seek(pos) }
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> { (**self).read(buf) }
    fn tell(&self) -> u64 { (**self).tell() }
    fn eof(&self) -> bool { (**self).eof() }
    fn error(&self) -> Option<Error> { (**self).error() }
}

impl<S: OutputStream + ?Sized> OutputStream for &mut S {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { (**self).write(buf) }
    fn flush(&mut self) -> Result<()> { (**self).flush() }
    fn seal(&mut self) -> Result<()> { (**self).seal() }
    fn error(&self) -> Option<Error> { (**self).error() }
}

impl<S: OutputStream + ?Sized> OutputStream for Box<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { (**self).write(buf) }
    fn flush(&mut self) -> Result<()> { (**self).flush() }
    fn seal(&mut self) -> Result<()> { (**self).seal() }
    fn error(&self) -> Option<Error> { (**self).error() }
}

/// Resolves a seek request against the current position and the length.
pub(crate) fn resolve_seek(pos: SeekFrom, current: u64, length: u64)
-> Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => return Ok(n),
        SeekFrom::Current(delta) => current as i128 + delta as i128,
        SeekFrom::End(delta) => length as i128 + delta as i128,
    };
    crate::error::error_if(target < 0, Error::BadArguments)?;
    Ok(target as u64)
}
