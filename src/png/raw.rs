use std::io::{self, ErrorKind, Read};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use log::{debug, warn};
use thiserror::Error;

use crate::hash::chunk_crc;
use crate::png::{ChunkType, CHUNK_OVERHEAD, IEND, MAX_CHUNK_SIZE, SIGNATURE};

// Read until `buf` is full or the stream runs dry, returns (eof, bytes read)
fn fill_buf<R: Read>(data: &mut R, buf: &mut [u8]) -> io::Result<(bool, usize)> {
    let mut buf_read = 0;

    while buf_read < buf.len() {
        match data.read(&mut buf[buf_read..]) {
            Ok(0) => return Ok((true, buf_read)),
            Ok(x) => buf_read += x,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
    }
    Ok((false, buf_read))
}

#[derive(Error, Debug)]
pub enum PngError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("not a png file, signature mismatch")]
    BadSignature,
    #[error("truncated input, chunk {index} runs past the end of the file")]
    TruncatedInput { index: usize },
    #[error("chunk {index} ({typ}) is corrupt: stored crc {stored:08x}, computed {computed:08x}")]
    CorruptChunk {
        index: usize,
        typ: ChunkType,
        stored: u32,
        computed: u32,
    },
    #[error("chunk {index} exceeds the permitted max chunk length ({len} bytes)")]
    MaxLength { index: usize, len: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngChunkRaw {
    pub typ: ChunkType,
    pub data: Vec<u8>,
    // As found in the stream, freshly computed for built chunks
    pub crc: u32,
}

impl PngChunkRaw {
    /// Build a chunk and stamp it with a fresh crc
    pub fn new(typ: ChunkType, data: Vec<u8>) -> Self {
        let crc = chunk_crc(typ.as_bytes(), &data);
        PngChunkRaw { typ, data, crc }
    }

    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Bytes this chunk occupies in a file
    pub fn encoded_len(&self) -> usize {
        CHUNK_OVERHEAD + self.data.len()
    }

    pub fn computed_crc(&self) -> u32 {
        chunk_crc(self.typ.as_bytes(), &self.data)
    }

    pub fn is_crc_valid(&self) -> bool {
        self.crc == self.computed_crc()
    }
}

pub struct PngReaderRaw<R: Read> {
    inner: R,
    verify_crc: bool,
    index: usize,
    done: bool,
}

impl<R: Read> PngReaderRaw<R> {
    /// Consume and validate the signature, the reader is then positioned
    /// on the first chunk.
    pub fn new(mut reader: R) -> Result<Self, PngError> {
        let mut sig = [0u8; 8];
        match fill_buf(&mut reader, &mut sig)? {
            (false, _) if sig == SIGNATURE => (),
            _ => return Err(PngError::BadSignature),
        }

        Ok(PngReaderRaw {
            inner: reader,
            verify_crc: true,
            index: 0,
            done: false,
        })
    }

    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn truncated(&self, err: std::io::Error) -> PngError {
        if err.kind() == ErrorKind::UnexpectedEof {
            PngError::TruncatedInput { index: self.index }
        } else {
            PngError::IO(err)
        }
    }

    // None on a clean end of stream between two chunks
    fn read_len(&mut self) -> Result<Option<u32>, PngError> {
        let mut len = [0u8; 4];
        match fill_buf(&mut self.inner, &mut len)? {
            (true, 0) => Ok(None),
            (true, _) => Err(PngError::TruncatedInput { index: self.index }),
            (false, _) => Ok(Some(BigEndian::read_u32(&len))),
        }
    }

    fn read_entry(&mut self) -> Result<Option<PngChunkRaw>, PngError> {
        let len = match self.read_len()? {
            Some(len) => len,
            None => return Ok(None),
        };

        let typ = {
            let mut typ: [u8; 4] = [0; 4];
            self.inner.read_exact(&mut typ).map_err(|e| self.truncated(e))?;
            ChunkType(typ)
        };

        // An oversized chunk that also runs past the end is reported as
        // truncated, the data is drained without being buffered
        if len > MAX_CHUNK_SIZE {
            let avail = io::copy(&mut (&mut self.inner).take(len as u64), &mut io::sink())?;
            if avail < len as u64 {
                return Err(PngError::TruncatedInput { index: self.index });
            }
            return Err(PngError::MaxLength { index: self.index, len });
        }

        // Never trust the declared length for the allocation
        let data = {
            let mut data = Vec::new();
            (&mut self.inner).take(len as u64).read_to_end(&mut data)?;
            if data.len() != len as usize {
                return Err(PngError::TruncatedInput { index: self.index });
            }
            data
        };

        let crc = self
            .inner
            .read_u32::<BigEndian>()
            .map_err(|e| self.truncated(e))?;

        let entry = PngChunkRaw { typ, data, crc };
        if self.verify_crc && !entry.is_crc_valid() {
            return Err(PngError::CorruptChunk {
                index: self.index,
                typ,
                stored: crc,
                computed: entry.computed_crc(),
            });
        }

        if !typ.is_valid() || !typ.is_reserved_valid() {
            warn!("chunk {} has a non conforming type code {:?}", self.index, typ.as_bytes());
        }
        debug!(
            "chunk {}: {} ({} bytes, {}, {}, {})",
            self.index,
            typ,
            len,
            if typ.is_critical() { "critical" } else { "ancillary" },
            if typ.is_public() { "public" } else { "private" },
            if typ.is_safe_to_copy() { "safe to copy" } else { "unsafe to copy" },
        );
        Ok(Some(entry))
    }
}

impl<R: Read> Iterator for PngReaderRaw<R> {
    type Item = Result<PngChunkRaw, PngError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_entry() {
            Ok(Some(x)) => {
                // IEND is inclusive, nothing after it is a chunk
                self.done = x.typ == IEND;
                self.index += 1;
                Some(Ok(x))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(x) => {
                self.done = true;
                Some(Err(x))
            }
        }
    }
}
