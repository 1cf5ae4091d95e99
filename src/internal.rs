use crate::error::Error;
use crate::layout::{CHUNK_SIZE, slot_size, slots_per_chunk};
use crate::platform::Platform;
use crate::raw::{ConfigRecord, TIP_RECORD_SIZE, TipRecord};
use crate::{Eeprom, RecordState, RegionStatistics};
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Position of the wear-leveled config log inside the config region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ConfigLog {
    /// Chunk holding the newest record.
    pub(crate) read: u16,
    /// Chunk the next record goes to.
    pub(crate) write: u16,
    /// Identifier of the newest record, 0 if there is none.
    pub(crate) last_id: u32,
    pub(crate) writable: bool,
}

struct ScanEntry {
    chunk: u16,
    id: u32,
}

impl<T: Platform> Eeprom<T> {
    /// Walks the config region from its first chunk and stops at the first chunk that can't be
    /// read or doesn't hold a valid record. Valid records are expected to form a contiguous
    /// prefix, so a damaged chunk in front of the newest record hides everything behind it.
    pub(crate) fn load_log(&mut self) {
        #[cfg(feature = "defmt")]
        trace!("load_log");

        #[cfg(feature = "debug-logs")]
        println!("internal: load_log");

        let capacity = self.layout.config_chunks;
        let mut oldest: Option<ScanEntry> = None;
        let mut newest: Option<ScanEntry> = None;
        let mut records: u16 = 0;

        self.log.writable = false;

        for chunk in 0..capacity {
            let record = match self.cache.read(&mut self.hal, chunk) {
                Ok(raw) => ConfigRecord::decode(raw),
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    warn!("load_log: chunk {} unreadable", chunk);
                    None
                }
            };
            let Some(record) = record else {
                break;
            };

            records += 1;
            if oldest.as_ref().is_none_or(|it| record.id < it.id) {
                oldest = Some(ScanEntry {
                    chunk,
                    id: record.id,
                });
            }
            if newest.as_ref().is_none_or(|it| record.id > it.id) {
                newest = Some(ScanEntry {
                    chunk,
                    id: record.id,
                });
            }
        }

        self.log = match (oldest, newest) {
            (Some(oldest), Some(newest)) => {
                let write = if records < capacity {
                    (newest.chunk + 1) % capacity
                } else {
                    oldest.chunk
                };
                ConfigLog {
                    read: newest.chunk,
                    write,
                    last_id: newest.id,
                    writable: true,
                }
            }
            _ => ConfigLog {
                read: 0,
                write: 0,
                last_id: 0,
                writable: true,
            },
        };

        #[cfg(feature = "defmt")]
        trace!(
            "load_log: {} records, read {} write {} last id {}",
            records, self.log.read, self.log.write, self.log.last_id
        );

        #[cfg(feature = "debug-logs")]
        println!(
            "internal: load_log: {records} records, read {} write {} last id {}",
            self.log.read, self.log.write, self.log.last_id
        );
    }

    pub(crate) fn load_config_record(&mut self) -> Result<ConfigRecord, Error> {
        #[cfg(feature = "defmt")]
        trace!("load_config_record: chunk {}", self.log.read);

        let raw = self
            .cache
            .read(&mut self.hal, self.log.read)
            .map_err(|_| Error::NotFound)?;
        ConfigRecord::decode(raw).ok_or(Error::NotFound)
    }

    pub(crate) fn save_config_record(&mut self, record: &mut ConfigRecord) -> Result<(), Error> {
        if !self.log.writable {
            return Err(Error::WriteDisabled);
        }

        #[cfg(feature = "defmt")]
        trace!("save_config_record: chunk {}", self.log.write);

        #[cfg(feature = "debug-logs")]
        println!("internal: save_config_record: chunk {}", self.log.write);

        let next = ConfigRecord {
            id: self.log.last_id.wrapping_add(1),
            ..*record
        };
        self.cache
            .write(&mut self.hal, self.log.write, &next.encode())?;

        record.id = next.id;
        self.log.last_id = next.id;
        self.log.read = self.log.write;
        self.log.write = (self.log.write + 1) % self.layout.config_chunks;

        Ok(())
    }

    fn check_slot(&self, slot: u16) -> Result<(u16, usize), Error> {
        if slot >= self.layout.total_tip_slots() {
            return Err(Error::IndexOutOfRange);
        }
        Ok(self.layout.slot_address(slot))
    }

    pub(crate) fn load_tip_record(&mut self, slot: u16) -> Result<TipRecord, Error> {
        let (chunk, offset) = self.check_slot(slot)?;

        #[cfg(feature = "defmt")]
        trace!("load_tip_record: slot {} @{}[{}]", slot, chunk, offset);

        let raw = self.cache.read(&mut self.hal, chunk)?;
        TipRecord::decode(&raw[offset..offset + slot_size()]).ok_or(Error::ChecksumMismatch)
    }

    /// Read-modify-write of the whole chunk, the other slots of the chunk are kept as they are.
    pub(crate) fn save_tip_record(&mut self, slot: u16, record: &TipRecord) -> Result<(), Error> {
        let (chunk, offset) = self.check_slot(slot)?;

        #[cfg(feature = "defmt")]
        trace!("save_tip_record: slot {} @{}[{}]", slot, chunk, offset);

        #[cfg(feature = "debug-logs")]
        println!("internal: save_tip_record: slot {slot} @{chunk}[{offset}]");

        let mut raw = *self.cache.read(&mut self.hal, chunk)?;
        raw[offset..offset + TIP_RECORD_SIZE].copy_from_slice(&record.encode());
        self.cache.write(&mut self.hal, chunk, &raw)
    }

    /// Best effort: stops at the first failed write and rescans the log either way.
    pub(crate) fn erase_config_chunks(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("erase_config_chunks");

        #[cfg(feature = "debug-logs")]
        println!("internal: erase_config_chunks");

        let blank = [0xFFu8; CHUNK_SIZE];
        let mut result = Ok(());
        for chunk in 0..self.layout.config_chunks {
            if let Err(e) = self.cache.write(&mut self.hal, chunk, &blank) {
                #[cfg(feature = "defmt")]
                warn!("erase_config_chunks: aborted at chunk {}", chunk);

                #[cfg(feature = "debug-logs")]
                println!("internal: erase_config_chunks: aborted at chunk {chunk}");

                result = Err(e);
                break;
            }
        }

        self.load_log();
        result
    }

    pub(crate) fn survey_config_region(&mut self) -> Vec<RecordState> {
        (0..self.layout.config_chunks)
            .map(|chunk| match self.cache.read(&mut self.hal, chunk) {
                Err(_) => RecordState::Unreadable,
                Ok(raw) if raw.iter().all(|&b| b == 0xFF) => RecordState::Erased,
                Ok(raw) if ConfigRecord::decode(raw).is_some() => RecordState::Valid,
                Ok(_) => RecordState::Corrupt,
            })
            .collect()
    }

    pub(crate) fn survey_tip_region(&mut self) -> RegionStatistics {
        let mut stats = RegionStatistics::default();
        for chunk in self.layout.tip_start()..self.layout.chunks {
            let raw = match self.cache.read(&mut self.hal, chunk) {
                Ok(raw) => raw,
                Err(_) => {
                    for _ in 0..slots_per_chunk() {
                        stats.count(RecordState::Unreadable);
                    }
                    continue;
                }
            };

            for slot in raw.chunks_exact(slot_size()) {
                let state = if slot.iter().all(|&b| b == 0xFF) {
                    RecordState::Erased
                } else if TipRecord::decode(slot).is_some() {
                    RecordState::Valid
                } else {
                    RecordState::Corrupt
                };
                stats.count(state);
            }
        }

        stats
    }
}
