use std::fmt;

use thiserror::Error;

use crate::png::raw::PngChunkRaw;
use crate::png::TEXT;

pub const MAX_KEYWORD_LEN: usize = 79;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TextError {
    #[error("malformed text chunk: {0}")]
    Malformed(&'static str),
    #[error("invalid keyword '{keyword}': {reason}")]
    InvalidKeyword {
        keyword: String,
        reason: &'static str,
    },
    #[error("invalid text for keyword '{keyword}': {reason}")]
    InvalidText {
        keyword: String,
        reason: &'static str,
    },
}

/// Decoded `tEXt` payload.
///
/// Both halves are raw bytes, PNG says Latin-1 but nothing here depends on
/// the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub keyword: Vec<u8>,
    pub text: Vec<u8>,
}

impl TextEntry {
    pub fn new(keyword: impl Into<Vec<u8>>, text: impl Into<Vec<u8>>) -> Self {
        TextEntry {
            keyword: keyword.into(),
            text: text.into(),
        }
    }

    pub fn keyword_lossy(&self) -> String {
        String::from_utf8_lossy(&self.keyword).into_owned()
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }

    /// Check the keyword and text against the rules [`encode`] enforces
    pub fn validate(&self) -> Result<(), TextError> {
        validate_keyword(&self.keyword)?;
        if self.text.contains(&0) {
            return Err(TextError::InvalidText {
                keyword: self.keyword_lossy(),
                reason: "contains a NUL byte",
            });
        }
        Ok(())
    }
}

impl fmt::Display for TextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.keyword_lossy(), self.text_lossy())
    }
}

fn validate_keyword(keyword: &[u8]) -> Result<(), TextError> {
    let reason = if keyword.is_empty() {
        "is empty"
    } else if keyword.len() > MAX_KEYWORD_LEN {
        "is longer than 79 bytes"
    } else if keyword.contains(&0) {
        "contains a NUL byte"
    } else if keyword.first() == Some(&b' ') || keyword.last() == Some(&b' ') {
        "has a leading or trailing space"
    } else {
        return Ok(());
    };

    Err(TextError::InvalidKeyword {
        keyword: String::from_utf8_lossy(keyword).into_owned(),
        reason,
    })
}

/// Split a `tEXt` chunk on its first NUL, the text half is taken verbatim.
///
/// Decoding is more lenient than [`encode`]: spaces around the keyword are
/// tolerated so existing files can still be dumped.
pub fn decode(chunk: &PngChunkRaw) -> Result<TextEntry, TextError> {
    if chunk.typ != TEXT {
        return Err(TextError::Malformed("not a tEXt chunk"));
    }

    let sep = chunk
        .data
        .iter()
        .position(|&b| b == 0)
        .ok_or(TextError::Malformed("no NUL separator after the keyword"))?;

    match sep {
        0 => Err(TextError::Malformed("empty keyword")),
        x if x > MAX_KEYWORD_LEN => Err(TextError::Malformed("keyword longer than 79 bytes")),
        _ => Ok(TextEntry::new(&chunk.data[..sep], &chunk.data[sep + 1..])),
    }
}

pub fn encode(entry: &TextEntry) -> Result<PngChunkRaw, TextError> {
    entry.validate()?;

    let mut data = Vec::with_capacity(entry.keyword.len() + 1 + entry.text.len());
    data.extend_from_slice(&entry.keyword);
    data.push(0);
    data.extend_from_slice(&entry.text);

    Ok(PngChunkRaw::new(TEXT, data))
}

#[cfg(test)]
mod test_text_codec {
    use super::*;
    use crate::hash::chunk_crc;
    use crate::png::IEND;

    #[test]
    fn encode_author() {
        let chunk = encode(&TextEntry::new("Author", "Jane")).unwrap();

        assert_eq!(chunk.typ, TEXT);
        assert_eq!(chunk.data, b"Author\0Jane".to_vec());
        assert_eq!(chunk.length(), 11);
        assert_eq!(chunk.crc, chunk_crc(b"tEXt", b"Author\0Jane"));
    }

    #[test]
    fn encode_empty_text() {
        let chunk = encode(&TextEntry::new("Comment", "")).unwrap();
        assert_eq!(chunk.data, b"Comment\0".to_vec());
    }

    #[test]
    fn encode_rejects_bad_keywords() {
        for keyword in ["", " Author", "Author ", "Au\0thor"] {
            assert!(matches!(
                encode(&TextEntry::new(keyword, "x")),
                Err(TextError::InvalidKeyword { .. })
            ));
        }

        let long = "k".repeat(MAX_KEYWORD_LEN + 1);
        assert!(matches!(
            encode(&TextEntry::new(long, "x")),
            Err(TextError::InvalidKeyword { .. })
        ));
        assert!(encode(&TextEntry::new("k".repeat(MAX_KEYWORD_LEN), "x")).is_ok());
    }

    #[test]
    fn encode_rejects_nul_in_text() {
        assert!(matches!(
            encode(&TextEntry::new("Author", "Ja\0ne")),
            Err(TextError::InvalidText { .. })
        ));
    }

    #[test]
    fn decode_author() {
        let chunk = PngChunkRaw::new(TEXT, b"Author\0Jane".to_vec());
        assert_eq!(decode(&chunk).unwrap(), TextEntry::new("Author", "Jane"));
    }

    #[test]
    fn decode_splits_on_first_nul() {
        let chunk = PngChunkRaw::new(TEXT, b"Key\0a\0b".to_vec());
        assert_eq!(decode(&chunk).unwrap(), TextEntry::new("Key", "a\0b"));

        let chunk = PngChunkRaw::new(TEXT, b"Key\0".to_vec());
        assert_eq!(decode(&chunk).unwrap(), TextEntry::new("Key", ""));
    }

    #[test]
    fn decode_malformed() {
        let no_nul = PngChunkRaw::new(TEXT, b"AuthorJane".to_vec());
        assert!(matches!(decode(&no_nul), Err(TextError::Malformed(_))));

        let no_keyword = PngChunkRaw::new(TEXT, b"\0Jane".to_vec());
        assert!(matches!(decode(&no_keyword), Err(TextError::Malformed(_))));

        let mut long = vec![b'k'; MAX_KEYWORD_LEN + 1];
        long.push(0);
        let long = PngChunkRaw::new(TEXT, long);
        assert!(matches!(decode(&long), Err(TextError::Malformed(_))));

        let iend = PngChunkRaw::new(IEND, vec![]);
        assert!(matches!(decode(&iend), Err(TextError::Malformed(_))));
    }

    #[test]
    fn display() {
        assert_eq!(TextEntry::new("K", "V").to_string(), "K: V");
    }
}
