use crate::error::Error;
use crate::raw::TIP_RECORD_SIZE;

/// Bytes per chunk, the atomic unit of bus I/O.
pub const CHUNK_SIZE: usize = 32;

/// Post-write settle time of the AT24C32 write cycle, with margin.
pub const DEFAULT_SETTLE_MS: u32 = 20;

const _: () = assert!(
    TIP_RECORD_SIZE <= slot_size(),
    "Tip record must fit into a single slot"
);

/// Static geometry of the device.
///
/// Chunks `0..config_chunks` hold the config log, chunks `config_chunks..chunks` hold the tip
/// slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub chunks: u16,
    pub config_chunks: u16,
    pub settle_ms: u32,
}

impl Layout {
    /// AT24C32: 128 chunks of 32 bytes, split evenly between config log and tip table.
    pub const REFERENCE: Layout = Layout {
        chunks: 128,
        config_chunks: 64,
        settle_ms: DEFAULT_SETTLE_MS,
    };

    pub(crate) fn validate(&self, capacity: usize) -> Result<(), Error> {
        if self.config_chunks == 0 || self.config_chunks >= self.chunks {
            return Err(Error::InvalidLayout);
        }
        // slot indices are u16
        if self.tip_chunks() as usize * slots_per_chunk() > u16::MAX as usize {
            return Err(Error::InvalidLayout);
        }
        if self.chunks as usize * CHUNK_SIZE > capacity {
            return Err(Error::InvalidCapacity);
        }
        Ok(())
    }

    /// Zero when the config region claims the whole device.
    pub fn tip_chunks(&self) -> u16 {
        self.chunks.saturating_sub(self.config_chunks)
    }

    /// First chunk of the tip region.
    pub fn tip_start(&self) -> u16 {
        self.config_chunks
    }

    /// Saturates at `u16::MAX` for layouts that `validate` would reject.
    pub fn total_tip_slots(&self) -> u16 {
        self.tip_chunks().saturating_mul(slots_per_chunk() as u16)
    }

    /// Chunk index and in-chunk byte offset of a tip slot.
    pub fn slot_address(&self, slot: u16) -> (u16, usize) {
        let per_chunk = slots_per_chunk() as u16;
        let chunk = slot / per_chunk + self.tip_start();
        let offset = (slot % per_chunk) as usize * slot_size();
        (chunk, offset)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Smallest power of two that fits a tip record, capped at the chunk size.
pub const fn slot_size() -> usize {
    let mut size = 1;
    while size <= CHUNK_SIZE {
        if size >= TIP_RECORD_SIZE {
            return size;
        }
        size <<= 1;
    }
    CHUNK_SIZE
}

pub const fn slots_per_chunk() -> usize {
    CHUNK_SIZE / slot_size()
}

#[inline(always)]
pub(crate) const fn chunk_address(index: u16) -> u32 {
    index as u32 * CHUNK_SIZE as u32
}
