/// Turns raw chunks into text without breaking multi-byte characters that
/// straddle a chunk boundary.
///
/// An incomplete UTF-8 sequence at the end of a chunk is held back and put in
/// front of the next chunk. Anything else that is not valid UTF-8 is replaced
/// with U+FFFD, same as `String::from_utf8_lossy`.
#[derive(Debug, Default)]
pub(crate) struct Utf8Carry {
    held: Vec<u8>,
}

impl Utf8Carry {
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.held);
        bytes.extend_from_slice(chunk);

        let keep = incomplete_tail_len(&bytes);
        let split = bytes.len() - keep;
        self.held = bytes.split_off(split);

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// decodes whatever is still held, used at end of stream
    pub(crate) fn finish(&mut self) -> String {
        let held = std::mem::take(&mut self.held);
        String::from_utf8_lossy(&held).into_owned()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

// number of trailing bytes forming a sequence that is started but not finished
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    // continuation bytes look like 0b10xx_xxxx
    const CONT_MASK: u8 = 0xc0;
    const CONT: u8 = 0x80;

    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & CONT_MASK == CONT {
            continue;
        }
        let needed = match byte {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(b"plain text"), "plain text");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_split_character_is_joined() {
        let bytes = "héllo ❤".as_bytes();
        let mut carry = Utf8Carry::default();

        // split inside the two-byte é
        let first = carry.decode(&bytes[..2]);
        assert_eq!(first, "h");
        assert!(!carry.is_empty());

        // split inside the three-byte heart
        let second = carry.decode(&bytes[2..bytes.len() - 1]);
        assert_eq!(second, "éllo ");

        let third = carry.decode(&bytes[bytes.len() - 1..]);
        assert_eq!(third, "❤");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(b"a\xffb"), "a\u{fffd}b");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_finish_flushes_dangling_bytes() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(b"ok\xe2\x9d"), "ok");
        assert_eq!(carry.finish(), "\u{fffd}");
        assert!(carry.is_empty());
        assert_eq!(carry.finish(), "");
    }
}
