use ::des::cipher::generic_array::GenericArray;
use ::des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use log::trace;

use super::{Block, BlockCipher, Direction, Key};

/// DES with a 64-bit key (56 bits used, parity bits ignored).
pub struct Des {
    cipher: ::des::Des,
    direction: Direction,
}

impl Des {
    pub fn encryptor(key: &Key) -> Des {
        Des::derive_schedule(key, Direction::Encrypt)
    }

    pub fn decryptor(key: &Key) -> Des {
        Des::derive_schedule(key, Direction::Decrypt)
    }
}

impl BlockCipher for Des {
    fn derive_schedule(key: &Key, direction: Direction) -> Des {
        Des {
            cipher: ::des::Des::new(GenericArray::from_slice(&key[..])),
            direction,
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn transform(&self, block: &mut Block) {
        trace!("des {:?} block", self.direction);
        let block = GenericArray::from_mut_slice(&mut block[..]);
        match self.direction {
            Direction::Encrypt => self.cipher.encrypt_block(block),
            Direction::Decrypt => self.cipher.decrypt_block(block),
        }
    }
}

impl std::fmt::Debug for Des {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Des").field("direction", &self.direction).finish()
    }
}

mod tests {
    #[test]
    fn test_known_vector() {
        use crate::crypto::{BlockCipher, Des};

        // FIPS 81 / classic DES test vector
        let key = [0x13, 0x34, 0x57, 0x79, 0x9b, 0xbc, 0xdf, 0xf1];
        let mut block = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];

        Des::encryptor(&key).transform(&mut block);
        assert_eq!(block, [0x85, 0xe8, 0x13, 0x54, 0x0f, 0x0a, 0xb4, 0x05]);

        Des::decryptor(&key).transform(&mut block);
        assert_eq!(block, [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]);
    }

    #[test]
    fn test_direction() {
        use crate::crypto::{BlockCipher, Des, Direction};

        assert_eq!(Des::encryptor(b"abcdefgh").direction(), Direction::Encrypt);
        assert_eq!(Des::decryptor(b"abcdefgh").direction(), Direction::Decrypt);
    }
}
