use std::io::{Error, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::hash::chunk_crc;
use crate::png::raw::PngChunkRaw;
use crate::png::reader::PngContainer;
use crate::png::{ChunkType, SIGNATURE};

pub struct PngBuilder<W: Write> {
    inner: W,
}

// This is the high level writer interface
impl<W: Write> PngBuilder<W> {
    pub fn new(writer: W) -> Self {
        PngBuilder { inner: writer }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_signature(&mut self) -> Result<usize, Error> {
        self.inner.write_all(&SIGNATURE)?;
        Ok(SIGNATURE.len())
    }

    // The crc is always recomputed, a stored one may be stale after an edit
    fn write(&mut self, chunk_type: &ChunkType, data: &[u8]) -> Result<usize, Error> {
        let crc = chunk_crc(chunk_type.as_bytes(), data);

        self.inner.write_u32::<BigEndian>(data.len() as u32)?;
        self.inner.write_all(chunk_type.as_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_u32::<BigEndian>(crc)?;

        Ok(4 + 4 + data.len() + 4)
    }

    pub fn write_chunk(&mut self, chunk: &PngChunkRaw) -> Result<usize, Error> {
        self.write(&chunk.typ, &chunk.data)
    }

    pub fn write_container(&mut self, container: &PngContainer) -> Result<usize, Error> {
        let mut len = self.write_signature()?;
        for chunk in container.chunks.iter() {
            len += self.write_chunk(chunk)?;
        }
        Ok(len)
    }
}

pub fn serialize(container: &PngContainer) -> Result<Vec<u8>, Error> {
    let mut builder = PngBuilder::new(Vec::with_capacity(container.encoded_len()));
    builder.write_container(container)?;
    Ok(builder.into_inner())
}
