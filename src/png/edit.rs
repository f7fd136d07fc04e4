use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use thiserror::Error;

use crate::png::raw::PngChunkRaw;
use crate::png::reader::PngContainer;
use crate::png::text::{encode, TextEntry, TextError};
use crate::png::{ChunkType, IEND, TEXT};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error("chunk index {index} out of range, file has {len} chunks")]
    Index { index: usize, len: usize },
    #[error("chunk index {index} is the IEND chunk and cannot be removed")]
    TerminalChunk { index: usize },
}

// Chunk indices are positions among *all* chunks, the signature excluded.
impl PngContainer {
    /// Encode each entry and insert it right before IEND, in order.
    ///
    /// Every entry is encoded before the container is touched so a bad
    /// keyword leaves it unchanged. Without an IEND the chunks are appended.
    pub fn add_entries(&mut self, entries: &[TextEntry]) -> Result<usize, EditError> {
        let new_chunks = entries
            .iter()
            .map(encode)
            .collect::<Result<Vec<_>, _>>()?;
        let count = new_chunks.len();

        let at = self.terminal_index().unwrap_or(self.chunks.len());
        self.chunks.splice(at..at, new_chunks);

        debug!("added {} tEXt chunks at {}", count, at);
        Ok(count)
    }

    /// Drop every chunk whose type is in `types`, the rest keep their order.
    pub fn remove_by_type(&mut self, types: &HashSet<ChunkType>) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| !types.contains(&c.typ));

        let removed = before - self.chunks.len();
        debug!("removed {} chunks by type", removed);
        removed
    }

    /// Drop the chunks at `indices`, all resolved against the sequence as
    /// it was before this call.
    pub fn remove_by_index(&mut self, indices: &BTreeSet<usize>) -> Result<usize, EditError> {
        let len = self.chunks.len();
        for &index in indices {
            if index >= len {
                return Err(EditError::Index { index, len });
            }
            let typ = self.chunks[index].typ;
            if typ == IEND {
                return Err(EditError::TerminalChunk { index });
            }
            if typ.is_critical() {
                warn!("removing critical chunk {} at index {}", typ, index);
            }
        }

        let chunks = std::mem::take(&mut self.chunks);
        self.chunks = chunks
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, c)| c)
            .collect();

        let removed = len - self.chunks.len();
        debug!("removed {} chunks by index", removed);
        Ok(removed)
    }

    /// Strip every existing tEXt chunk then add `entries`
    pub fn exclusive_replace(&mut self, entries: &[TextEntry]) -> Result<(usize, usize), EditError> {
        // Validate first, nothing is stripped if an entry is bad
        for entry in entries {
            entry.validate()?;
        }

        let removed = self.remove_by_type(&HashSet::from([TEXT]));
        let added = self.add_entries(entries)?;
        Ok((removed, added))
    }

    pub fn text_chunks(&self) -> impl Iterator<Item = (usize, &PngChunkRaw)> {
        self.chunks.iter().enumerate().filter(|(_, c)| c.typ == TEXT)
    }
}
