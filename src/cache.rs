use crate::error::Error;
use crate::layout::{CHUNK_SIZE, Layout, chunk_address};
use crate::platform::Platform;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Buffer for a single chunk. Callers touch the same one or two chunks over and over (the
/// current config record, both halves of a tip chunk), so remembering the last chunk avoids
/// most bus transfers without any eviction policy.
pub(crate) struct ChunkCache {
    data: [u8; CHUNK_SIZE],
    // None while the buffer does not mirror any chunk on the device
    index: Option<u16>,
    chunks: u16,
    settle_ms: u32,
}

impl ChunkCache {
    pub(crate) fn new(layout: &Layout) -> Self {
        Self {
            data: [0xFF; CHUNK_SIZE],
            index: None,
            chunks: layout.chunks,
            settle_ms: layout.settle_ms,
        }
    }

    pub(crate) fn read<T: Platform>(
        &mut self,
        hal: &mut T,
        index: u16,
    ) -> Result<&[u8; CHUNK_SIZE], Error> {
        if self.index == Some(index) {
            return Ok(&self.data);
        }
        if index >= self.chunks {
            return Err(Error::StorageError);
        }

        #[cfg(feature = "defmt")]
        trace!("read_chunk: {} @{:#06x}", index, chunk_address(index));

        #[cfg(feature = "debug-logs")]
        println!("  cache: read chunk {index} @0x{:04X}", chunk_address(index));

        self.index = None;
        hal.read(chunk_address(index), &mut self.data)
            .map_err(|_| Error::StorageError)?;
        self.index = Some(index);

        Ok(&self.data)
    }

    /// Writes the whole chunk. The buffer is invalidated up front, even for an index outside of
    /// the device, so a failed write never leaves a stale hit behind. The write cycle delay is
    /// observed after every write that reached the transport.
    pub(crate) fn write<T: Platform>(
        &mut self,
        hal: &mut T,
        index: u16,
        bytes: &[u8; CHUNK_SIZE],
    ) -> Result<(), Error> {
        self.index = None;
        if index >= self.chunks {
            return Err(Error::StorageError);
        }

        #[cfg(feature = "defmt")]
        trace!("write_chunk: {} @{:#06x}", index, chunk_address(index));

        #[cfg(feature = "debug-logs")]
        println!("  cache: write chunk {index} @0x{:04X}", chunk_address(index));

        self.data.copy_from_slice(bytes);
        let result = hal.write(chunk_address(index), &self.data);
        hal.settle(self.settle_ms);

        match result {
            Ok(()) => {
                self.index = Some(index);
                Ok(())
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                warn!("write_chunk: {} failed", index);

                #[cfg(feature = "debug-logs")]
                println!("  cache: write chunk {index} failed");

                Err(Error::StorageError)
            }
        }
    }
}
