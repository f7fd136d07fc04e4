use std::io::Cursor;

use log::{debug, warn};

use crate::png::raw::{PngChunkRaw, PngError, PngReaderRaw};
use crate::png::{IEND, SIGNATURE};

/// In memory view of one PNG file, owned chunk by chunk.
///
/// The signature is implicit: it was validated on parse and is always
/// [`SIGNATURE`] on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngContainer {
    pub chunks: Vec<PngChunkRaw>,
}

impl PngContainer {
    pub fn new(chunks: Vec<PngChunkRaw>) -> Self {
        PngContainer { chunks }
    }

    pub fn signature(&self) -> &[u8; 8] {
        &SIGNATURE
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Position of the terminal chunk, the last one in a well formed file
    pub fn terminal_index(&self) -> Option<usize> {
        self.chunks.iter().rposition(|c| c.typ == IEND)
    }

    pub fn has_terminal(&self) -> bool {
        self.chunks.last().map_or(false, |c| c.typ == IEND)
    }

    /// Size of the file this container serializes to
    pub fn encoded_len(&self) -> usize {
        SIGNATURE.len() + self.chunks.iter().map(PngChunkRaw::encoded_len).sum::<usize>()
    }
}

pub fn parse(bytes: &[u8]) -> Result<PngContainer, PngError> {
    parse_with(bytes, true)
}

/// Parse a whole file, `verify_crc` rejects any chunk whose stored crc
/// does not match its content.
pub fn parse_with(bytes: &[u8], verify_crc: bool) -> Result<PngContainer, PngError> {
    let mut reader = PngReaderRaw::new(Cursor::new(bytes))?.verify_crc(verify_crc);

    let chunks = reader.by_ref().collect::<Result<Vec<_>, _>>()?;
    let container = PngContainer::new(chunks);

    let consumed = reader.into_inner().position() as usize;
    if consumed < bytes.len() {
        warn!("ignoring {} trailing bytes after IEND", bytes.len() - consumed);
    }
    if !container.has_terminal() {
        warn!("no IEND chunk found, file ends after {} chunks", container.len());
    }

    debug!("parsed {} chunks", container.len());
    Ok(container)
}
