//! Streams that encrypt or decrypt 8-byte blocks on the fly.
//!
//! `CipherReader` presents decrypted bytes through `InputStream`, and
//! `CipherWriter` takes plaintext through `OutputStream`, so the bit
//! coders work the same whether the bytes underneath are encrypted or not.
//! The ciphertext layout is plain ECB: consecutive blocks, the last one
//! zero-padded.

mod reader;
pub use self::reader::CipherReader;

mod writer;
pub use self::writer::CipherWriter;
