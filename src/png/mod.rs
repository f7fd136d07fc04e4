//! PNG chunk container
//!
//! A PNG file is treated here as an opaque container of chunks, the
//! compressed image stream is never decoded. Only the container is parsed,
//! edited and written back.
//!
//! # Top Level
//!
//! A file is the 8 byte signature followed by a collection of chunks (see:
//! [`raw::PngChunkRaw`]). Unlike most of the formats around here
//! everything is stored in Big Endian (network order).
//!
//! | Type    | Name     | Description |
//! | ------: | -------- | ----------- |
//! | u32     | length   | The length of the data section of a chunk, is allowed to be 0 bytes |
//! | [u8; 4] | type     | The type of the chunk, ASCII letters such as `IHDR` |
//! | [u8; N] | data     | The content of the chunk, interpret according to the chunk type |
//! | u32     | crc      | CRC-32 of <code>type \|\| data</code>, the length is not covered |
//!
//! # Chunk Types
//!
//! Only two chunk types are interpreted, every other chunk is copied
//! through byte for byte.
//!
//! | Chunk Type | Name              | Description |
//! | :--------: | ----------------- | ----------- |
//! | tEXt       | Textual metadata  | Keyword and text pair, see [`text::TextEntry`] |
//! | IEND       | Image trailer     | Always the last chunk and always 0 bytes long |
//!
//! ## tEXt
//!
//! | Type    | Name    | Description |
//! | ------: | ------- | ----------- |
//! | [u8; N] | keyword | 1 to 79 bytes, no NUL |
//! | u8      | sep     | `0x00` |
//! | [u8; M] | text    | 0 or more bytes, runs to the end of the chunk |
//!
//! ## Type code bits
//!
//! Bit 5 (`0x20`, the ASCII lowercase bit) of each of the four type bytes
//! carries a property, see [`ChunkType`]. These bits are never rewritten
//! when a chunk is copied through.
use std::fmt;

pub mod builder;
pub mod edit;
pub mod raw;
pub mod reader;
pub mod text;

/// Fixed magic at the start of every PNG file
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Largest chunk length permitted by the PNG format (2^31 - 1)
pub const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

/// Length field + type + crc
pub const CHUNK_OVERHEAD: usize = 12;

pub const IEND: ChunkType = ChunkType(*b"IEND");
pub const TEXT: ChunkType = ChunkType(*b"tEXt");

const PROPERTY_BIT: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// All four bytes must be ASCII letters
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(u8::is_ascii_alphabetic)
    }

    /// Uppercase first letter, a decoder must understand it to render the image
    pub fn is_critical(&self) -> bool {
        self.0[0] & PROPERTY_BIT == 0
    }

    /// Uppercase second letter, registered in the PNG standard
    pub fn is_public(&self) -> bool {
        self.0[1] & PROPERTY_BIT == 0
    }

    /// Third letter must be uppercase in the current PNG version
    pub fn is_reserved_valid(&self) -> bool {
        self.0[2] & PROPERTY_BIT == 0
    }

    /// Lowercase fourth letter, editors may copy it without knowing it
    pub fn is_safe_to_copy(&self) -> bool {
        self.0[3] & PROPERTY_BIT != 0
    }
}

impl From<[u8; 4]> for ChunkType {
    fn from(bytes: [u8; 4]) -> Self {
        ChunkType(bytes)
    }
}

impl TryFrom<&str> for ChunkType {
    type Error = String;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        let bytes: [u8; 4] = code
            .as_bytes()
            .try_into()
            .map_err(|_| format!("chunk type '{}' is not 4 bytes long", code))?;

        let typ = ChunkType(bytes);
        if typ.is_valid() {
            Ok(typ)
        } else {
            Err(format!("chunk type '{}' must be 4 ASCII letters", code))
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
