use std::io::Cursor;

use bitcoder::io::{
    BitReader, BitWriter, CipherReader, CipherWriter,
    InputStream, IoInput, IoOutput, OutputStream,
};
use bitcoder::Error;

const KEY: &[u8; 8] = b"abcdefgh";

fn write_record<S: OutputStream>(writer: &mut BitWriter<S>) {
    writer.write_byte(123).unwrap();
    writer.write_short(5000).unwrap();
    writer.write_bits(0x07, 4).unwrap();
    writer.align_to_byte();
    writer.write_int(10010002).unwrap();
    writer.write_string("hello, world").unwrap();
}

fn read_record<S: InputStream>(reader: &mut BitReader<S>) {
    assert_eq!(reader.read_unsigned_byte(), Ok(123));
    assert_eq!(reader.read_unsigned_short(), Ok(5000));
    assert_eq!(reader.read_unsigned_bits(4), Ok(0x07));
    reader.align_to_byte();
    assert_eq!(reader.read_unsigned_int(), Ok(10010002));
    assert_eq!(reader.read_string().as_deref(), Ok("hello, world"));
}

#[test]
fn record_through_des() {
    let mut output = IoOutput::new(Vec::new());
    {
        let mut writer = BitWriter::new(CipherWriter::des(&mut output, KEY));
        write_record(&mut writer);
        writer.into_inner().unwrap().seal().unwrap();
    }
    assert!(!output.is_sealed());

    // 21 plaintext bytes pad out to 3 blocks
    let sealed = output.into_inner();
    assert_eq!(sealed.len(), 24);
    assert_ne!(sealed[0], 123);

    let cipher = CipherReader::des(IoInput::new(Cursor::new(sealed)), KEY);
    let mut reader = BitReader::new(cipher);
    read_record(&mut reader);
    assert_eq!(reader.position(), 21);
    assert_eq!(reader.error(), None);
}

#[test]
fn record_through_des_small_buffers() {
    let mut output = IoOutput::new(Vec::new());
    {
        let mut writer = BitWriter::with_capacity(CipherWriter::des(&mut output, KEY), 8);
        for _ in 0..50 {
            write_record(&mut writer);
        }
        writer.flush().unwrap();
    }

    let cipher = CipherReader::des(IoInput::new(Cursor::new(output.into_inner())), KEY);
    let mut reader = BitReader::with_capacity(cipher, 8);
    for i in 0..50 {
        assert_eq!(reader.position(), i * 21);
        read_record(&mut reader);
    }
}

#[test]
fn record_through_file() {
    let path = std::env::temp_dir().join(format!("bitcoder-round-trip-{}.bin", std::process::id()));

    {
        let file = bitcoder::io::create_output(&path).unwrap();
        let mut writer = BitWriter::new(CipherWriter::des(file, KEY));
        write_record(&mut writer);
        let mut cipher = writer.into_inner().unwrap();
        cipher.seal().unwrap();
        assert!(cipher.is_sealed());
    }

    {
        let file = bitcoder::io::open_input(&path).unwrap();
        let mut reader = BitReader::new(CipherReader::des(file, KEY));
        read_record(&mut reader);
    }

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_file() {
    let path = std::env::temp_dir().join("bitcoder-missing").join("nothing.bin");
    assert_eq!(bitcoder::io::open_input(&path).err(), Some(Error::FailedToOpen));
}

#[test]
fn wrong_key_reads_garbage() {
    let mut output = IoOutput::new(Vec::new());
    {
        let mut writer = BitWriter::new(CipherWriter::des(&mut output, KEY));
        write_record(&mut writer);
        writer.flush().unwrap();
    }

    let cipher = CipherReader::des(IoInput::new(Cursor::new(output.into_inner())), b"hgfedcba");
    let mut reader = BitReader::new(cipher);
    assert_ne!(reader.read_unsigned_int(), Ok(0x7013_887b));
}

#[test]
fn thirteen_bytes_through_des() {
    let plain = b"thirteen byte";
    let mut output = IoOutput::new(Vec::new());
    {
        let mut writer = CipherWriter::des(&mut output, KEY);
        assert_eq!(writer.write(plain), Ok(13));
        writer.seal().unwrap();
        assert_eq!(writer.write(b"x"), Err(Error::StreamIsClosed));
    }
    assert_eq!(output.get_ref().len(), 16);

    let mut reader = CipherReader::des(IoInput::new(Cursor::new(output.into_inner())), KEY);
    assert_eq!(reader.len(), 16);
    let mut buf = [0xffu8; 16];
    assert_eq!(reader.read(&mut buf), Ok(16));
    assert_eq!(&buf[..13], plain);
    assert_eq!(&buf[13..], &[0u8, 0, 0]);
    assert!(reader.eof());
}

#[test]
fn structure_length_checks() {
    let mut output = IoOutput::new(Vec::new());
    let mut writer = BitWriter::new(&mut output);
    writer.mark();
    write_record(&mut writer);
    assert_eq!(writer.check(21), 0);
    writer.unmark();
    writer.flush().unwrap();
    drop(writer);

    let mut reader = BitReader::new(IoInput::new(Cursor::new(output.into_inner())));
    reader.mark();
    read_record(&mut reader);
    assert_eq!(reader.check(21), 0);
    assert_eq!(reader.bytes_read(), Some(21));

    reader.reset();
    assert_eq!(reader.position(), 0);
    read_record(&mut reader);
    assert_eq!(reader.unmark(), Some(0));
    assert_eq!(reader.bytes_read(), None);
}
