mod des;
pub use self::des::Des;

use crate::error::{error_if_not, Error, Result};

/// Size in bytes of one cipher block.
pub const BLOCK_SIZE: usize = 8;

pub type Block = [u8; BLOCK_SIZE];

pub type Key = [u8; 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// A 64-bit block cipher with its key schedule already derived.
///
/// The direction is fixed when the schedule is derived, so `transform`
/// either only encrypts or only decrypts.
pub trait BlockCipher {
    fn derive_schedule(key: &Key, direction: Direction) -> Self where Self: Sized;

    fn direction(&self) -> Direction;

    /// Transforms one block in place.
    fn transform(&self, block: &mut Block);

    /// Transforms every block of `data` in place.
    ///
    /// # Panics
    /// Panics if `data.len()` is not a multiple of `BLOCK_SIZE`.
    fn transform_blocks(&self, data: &mut [u8]) {
        assert_eq!(data.len() % BLOCK_SIZE, 0, "partial cipher block");
        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.transform(&mut block);
            chunk.copy_from_slice(&block);
        }
    }
}

/// Encrypts `data` in one go, zero-padding the last block.
///
/// # Example
/// ```
/// let sealed = bitcoder::crypto::encrypt(b"abcdefgh", b"hello, world");
/// assert_eq!(sealed.len(), 16);
/// let opened = bitcoder::crypto::decrypt(b"abcdefgh", &sealed).unwrap();
/// assert_eq!(&opened[..12], b"hello, world");
/// assert_eq!(&opened[12..], &[0u8; 4]);
/// ```
pub fn encrypt(key: &Key, data: &[u8]) -> Vec<u8> {
    let cipher = Des::encryptor(key);
    let padded_len = (data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE * BLOCK_SIZE;
    let mut output = Vec::with_capacity(padded_len);
    output.extend_from_slice(data);
    output.resize(padded_len, 0);
    cipher.transform_blocks(&mut output);
    output
}

/// Decrypts `data` in one go. The length must be a whole number of blocks.
pub fn decrypt(key: &Key, data: &[u8]) -> Result<Vec<u8>> {
    error_if_not(data.len() % BLOCK_SIZE == 0, Error::InvalidData)?;
    let cipher = Des::decryptor(key);
    let mut output = data.to_vec();
    cipher.transform_blocks(&mut output);
    Ok(output)
}

mod tests {
    #[test]
    fn test_one_shot_round_trip() {
        let key = b"abcdefgh";
        for len in 0..=24 {
            let plain: Vec<u8> = (0..len as u8).collect();
            let sealed = crate::crypto::encrypt(key, &plain);
            assert_eq!(sealed.len() % 8, 0);
            assert!(sealed.len() >= plain.len());

            let opened = crate::crypto::decrypt(key, &sealed).unwrap();
            assert_eq!(&opened[..len], &plain[..]);
            assert!(opened[len..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_decrypt_partial_block() {
        assert_eq!(
            crate::crypto::decrypt(b"abcdefgh", &[0; 13]),
            Err(crate::Error::InvalidData)
        );
    }
}
