use crc32fast::Hasher;

// Streaming crc, fed the chunk type then the data
//
// This is the CRC-32/ISO-HDLC variant (reflected 0xEDB88320, seed and final
// xor of 0xFFFFFFFF) that PNG stamps on every chunk.
pub struct Checksum(Hasher);

impl Checksum {
    pub fn new() -> Checksum {
        Checksum(Hasher::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> u32 {
        self.0.finalize()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::new()
    }
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut hash = Checksum::new();
    hash.update(data);
    hash.finalize()
}

// PNG chunk crc covers `type || data` but never the length
pub fn chunk_crc(typ: &[u8; 4], data: &[u8]) -> u32 {
    let mut hash = Checksum::new();
    hash.update(typ);
    hash.update(data);
    hash.finalize()
}

#[cfg(test)]
mod test_checksum {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn check_value() {
        // Standard check value for CRC-32/ISO-HDLC
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn iend_chunk() {
        assert_eq!(chunk_crc(b"IEND", &[]), 0xAE42_6082);
    }

    #[test]
    fn split_updates_match_oneshot() {
        let mut hash = Checksum::new();
        hash.update(b"tEXt");
        hash.update(b"Author\0Jane");

        assert_eq!(hash.finalize(), crc32(b"tEXtAuthor\0Jane"));
        assert_eq!(chunk_crc(b"tEXt", b"Author\0Jane"), crc32(b"tEXtAuthor\0Jane"));
    }
}
