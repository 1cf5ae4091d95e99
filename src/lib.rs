#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod cache;
pub mod error;
mod internal;
pub mod layout;
pub mod platform;
mod raw;

pub use layout::{CHUNK_SIZE, Layout};
pub use raw::{
    CONFIG_DATA_SIZE, CONFIG_RECORD_SIZE, ConfigRecord, TIP_NAME_SIZE, TIP_RECORD_SIZE, TipRecord,
};

extern crate alloc;

use crate::cache::ChunkCache;
use crate::error::Error;
use crate::internal::ConfigLog;
use crate::platform::Platform;
use alloc::vec::Vec;

/// Outcome of validating a single config chunk or tip slot.
#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordState {
    /// Checksum matches
    Valid,
    /// All bits set, never written since the last erase
    Erased,
    /// Written, but the checksum doesn't match
    Corrupt,
    /// The transport failed to read the chunk
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionStatistics {
    pub valid: u16,
    pub erased: u16,
    pub corrupt: u16,
    pub unreadable: u16,
}

impl RegionStatistics {
    pub(crate) fn count(&mut self, state: RecordState) {
        match state {
            RecordState::Valid => self.valid += 1,
            RecordState::Erased => self.erased += 1,
            RecordState::Corrupt => self.corrupt += 1,
            RecordState::Unreadable => self.unreadable += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EepromStatistics {
    /// Totals over all chunks of the config region
    pub config: RegionStatistics,
    /// State of every config chunk, in chunk order
    pub config_chunks: Vec<RecordState>,
    /// Totals over all tip slots
    pub tips: RegionStatistics,
}

/// The Eeprom struct owns the transport together with the single chunk buffer and the position
/// of the config log. All operations go through `&mut self`; callers on multiple threads have
/// to put the whole struct behind one lock.
pub struct Eeprom<T: Platform> {
    pub(crate) hal: T,
    pub(crate) layout: Layout,
    pub(crate) cache: ChunkCache,
    pub(crate) log: ConfigLog,
}

impl<T: Platform> Eeprom<T> {
    /// Validates the layout against the capacity of the device and scans the config region for
    /// the newest record.
    ///
    /// A config region that can't be read at all is treated like an empty one, the first
    /// `load_config` will report `NotFound`.
    pub fn new(layout: Layout, hal: T) -> Result<Eeprom<T>, Error> {
        let mut eeprom = Self::unscanned(layout, hal)?;
        eeprom.init();
        Ok(eeprom)
    }

    pub(crate) fn unscanned(layout: Layout, hal: T) -> Result<Eeprom<T>, Error> {
        layout.validate(hal.capacity())?;
        Ok(Self {
            hal,
            cache: ChunkCache::new(&layout),
            layout,
            log: ConfigLog::default(),
        })
    }

    /// Re-runs the initialization scan and re-establishes the read and write positions of
    /// the config log from what is currently on the device.
    pub fn init(&mut self) {
        self.load_log();
    }

    /// Number of tip slots. This is the capacity of the tip region, not the number of tips stored.
    pub fn total_tip_slots(&self) -> u16 {
        self.layout.total_tip_slots()
    }

    /// Loads the newest config record.
    ///
    /// Returns `NotFound` if nothing has been saved yet or the record can't be read or is corrupted.
    pub fn load_config(&mut self) -> Result<ConfigRecord, Error> {
        self.load_config_record()
    }

    /// Appends the record to the config log.
    ///
    /// The identifier is assigned by the log (newest identifier + 1) and written back to
    /// `record` on success. Whatever `record.id` held before is ignored, so a fresh record saved
    /// after a restart still continues the sequence instead of starting over at 1. On failure
    /// neither the record nor the log position changes.
    pub fn save_config(&mut self, record: &mut ConfigRecord) -> Result<(), Error> {
        self.save_config_record(record)
    }

    /// Loads the tip stored in `slot`.
    ///
    /// `ChecksumMismatch` means the slot was read fine but doesn't hold a valid record, e.g.
    /// because it was never written.
    pub fn load_tip(&mut self, slot: u16) -> Result<TipRecord, Error> {
        self.load_tip_record(slot)
    }

    /// Saves the tip to `slot`, preserving the other slots sharing the same chunk.
    pub fn save_tip(&mut self, slot: u16, record: &TipRecord) -> Result<(), Error> {
        self.save_tip_record(slot, record)
    }

    /// Overwrites every chunk of the config region with 0xFF and rescans.
    ///
    /// This is not atomic: if a write fails, the remaining chunks are left untouched and the
    /// error is returned. The log position is re-established in either case.
    pub fn erase_config_region(&mut self) -> Result<(), Error> {
        self.erase_config_chunks()
    }

    /// Reads both regions and classifies every config chunk and tip slot. Doesn't change the
    /// position of the config log.
    pub fn statistics(&mut self) -> EepromStatistics {
        let config_chunks = self.survey_config_region();
        let config = config_chunks
            .iter()
            .fold(RegionStatistics::default(), |mut acc, &state| {
                acc.count(state);
                acc
            });
        let tips = self.survey_tip_region();

        EepromStatistics {
            config,
            config_chunks,
            tips,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// False until the initialization scan has run.
    pub fn is_writable(&self) -> bool {
        self.log.writable
    }

    /// Chunk holding the newest config record.
    pub fn read_chunk_index(&self) -> u16 {
        self.log.read
    }

    /// Chunk the next config record will be written to.
    pub fn write_chunk_index(&self) -> u16 {
        self.log.write
    }

    pub fn hal(&self) -> &T {
        &self.hal
    }

    /// Direct access to the transport. The chunk buffer is not invalidated, call `init` after
    /// changing the device contents behind the store's back.
    pub fn hal_mut(&mut self) -> &mut T {
        &mut self.hal
    }

    pub fn release(self) -> T {
        self.hal
    }
}
