use std::io::Cursor;

use proptest::prelude::*;

use bitcoder::io::{
    BitReader, BitWriter, CipherReader, CipherWriter,
    InputStream, IoInput, IoOutput, OutputStream,
};

fn arb_fields() -> impl Strategy<Value = Vec<(u32, usize)>> {
    prop::collection::vec((any::<u32>(), 1usize..=32), 0..200)
}

fn mask(value: u32, count: usize) -> u32 {
    match count {
        32 => value,
        _ => value & ((1 << count) - 1),
    }
}

fn sign_extend(value: i32, count: usize) -> i32 {
    (value << (32 - count)) >> (32 - count)
}

proptest! {
    #[test]
    fn prop_bit_fields_round_trip(fields in arb_fields(), capacity in 8usize..64) {
        let mut writer = BitWriter::with_capacity(IoOutput::new(Vec::new()), capacity);
        for &(value, count) in &fields {
            prop_assert_eq!(writer.write_bits(value, count), Ok(()));
        }

        let total: usize = fields.iter().map(|&(_, count)| count).sum();
        let bytes = writer.into_inner().unwrap().into_inner();
        prop_assert_eq!(bytes.len(), (total + 7) / 8);

        let mut reader = BitReader::with_capacity(IoInput::new(Cursor::new(bytes)), capacity);
        for &(value, count) in &fields {
            prop_assert_eq!(reader.scan_unsigned_bits(count), Ok(mask(value, count)));
            prop_assert_eq!(reader.read_unsigned_bits(count), Ok(mask(value, count)));
        }
    }

    #[test]
    fn prop_signed_fields_round_trip(fields in prop::collection::vec((any::<i32>(), 1usize..=32), 0..200)) {
        let mut writer = BitWriter::with_capacity(IoOutput::new(Vec::new()), 8);
        for &(value, count) in &fields {
            writer.write_signed_bits(value, count).unwrap();
        }

        let bytes = writer.into_inner().unwrap().into_inner();
        let mut reader = BitReader::with_capacity(IoInput::new(Cursor::new(bytes)), 8);
        for &(value, count) in &fields {
            prop_assert_eq!(reader.read_signed_bits(count), Ok(sign_extend(value, count)));
        }
    }

    #[test]
    fn prop_negative_fields_round_trip(count in 1usize..=32, low in any::<u32>()) {
        // top bit of the field set
        let value = (mask(low, count) | 1 << (count - 1)) as i32;
        let mut writer = BitWriter::with_capacity(IoOutput::new(Vec::new()), 8);
        writer.write_signed_bits(value, count).unwrap();

        let bytes = writer.into_inner().unwrap().into_inner();
        let mut reader = BitReader::with_capacity(IoInput::new(Cursor::new(bytes)), 8);
        let expected = sign_extend(value, count);
        prop_assert!(expected < 0);
        prop_assert_eq!(reader.read_signed_bits(count), Ok(expected));
    }

    #[test]
    fn prop_cipher_round_trip(plain in prop::collection::vec(any::<u8>(), 0..300), chunk in 1usize..40) {
        let mut output = IoOutput::new(Vec::new());
        {
            let mut writer = CipherWriter::des(&mut output, b"abcdefgh");
            for piece in plain.chunks(chunk) {
                prop_assert_eq!(writer.write(piece), Ok(piece.len()));
            }
            writer.seal().unwrap();
        }

        let sealed = output.into_inner();
        prop_assert_eq!(sealed.len(), (plain.len() + 7) / 8 * 8);

        let mut reader = CipherReader::des(IoInput::new(Cursor::new(sealed)), b"abcdefgh");
        let mut opened = vec![0u8; reader.len() as usize];
        prop_assert_eq!(reader.read(&mut opened), Ok(opened.len()));
        prop_assert_eq!(&opened[..plain.len()], &plain[..]);
        prop_assert!(opened[plain.len()..].iter().all(|&byte| byte == 0));
    }
}
