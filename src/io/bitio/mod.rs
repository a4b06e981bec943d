mod bit_reader;
pub use self::bit_reader::BitReader;

mod bit_writer;
pub use self::bit_writer::BitWriter;

/// Buffer size used by `BitReader::new` and `BitWriter::new`.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Smallest buffer either coder will run with.
pub const MIN_BUFFER_SIZE: usize = 8;

const BITS_PER_BYTE: usize = 8;

/// Saved byte positions for structure length checks.
#[derive(Debug, Default)]
struct MarkStack {
    locations: Vec<u64>,
}

impl MarkStack {
    fn push(&mut self, location: u64) {
        self.locations.push(location);
    }

    fn pop(&mut self) -> Option<u64> {
        self.locations.pop()
    }

    fn last(&self) -> Option<u64> {
        self.locations.last().copied()
    }

    fn depth(&self) -> usize {
        self.locations.len()
    }

    /// Bytes covered since the last mark (or the start) minus `expected`.
    fn check(&self, current: u64, expected: u64) -> i64 {
        let last = self.last().unwrap_or(0);
        (current as i64 - last as i64) - expected as i64
    }
}

/// Bit mask with the low `count` bits set, for `count` in `0..=32`.
fn low_bits(count: usize) -> u32 {
    match count {
        32 => u32::MAX,
        _ => (1u32 << count) - 1,
    }
}

fn sign_extend(value: u32, count: usize) -> i32 {
    match count {
        0 => 0,
        _ => ((value << (32 - count)) as i32) >> (32 - count),
    }
}

mod tests {
    #[test]
    fn test_sign_extend() {
        use super::sign_extend;

        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(0b1000, 4), -8);
        assert_eq!(sign_extend(0b1111, 4), -1);
        assert_eq!(sign_extend(1, 1), -1);
        assert_eq!(sign_extend(0xffff_ffff, 32), -1);
        assert_eq!(sign_extend(0x7fff_ffff, 32), i32::MAX);
    }

    #[test]
    fn test_mark_stack_check() {
        let mut marks = super::MarkStack::default();
        assert_eq!(marks.check(10, 10), 0);

        marks.push(4);
        marks.push(6);
        assert_eq!(marks.depth(), 2);
        assert_eq!(marks.check(9, 3), 0);
        assert_eq!(marks.check(9, 5), -2);

        assert_eq!(marks.pop(), Some(6));
        assert_eq!(marks.check(9, 3), 2);
    }
}
