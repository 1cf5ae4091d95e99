//! On-chip encodings of the config and tip records and their checksums.
//!
//! Both records are serialized field by field in little-endian order instead of reinterpreting
//! struct memory, so the layout does not depend on padding or the target's endianness.

use crate::layout::CHUNK_SIZE;

/// Folded into both checksums so that a blank (all zero) buffer never validates.
pub(crate) const CHECKSUM_SEED: u32 = 117;

/// Encoded config record. The rest of its chunk is padding and not covered by the checksum.
pub const CONFIG_RECORD_SIZE: usize = 24;
pub const CONFIG_DATA_SIZE: usize = CONFIG_RECORD_SIZE - 8;
pub const TIP_RECORD_SIZE: usize = 16;
pub const TIP_NAME_SIZE: usize = 5;

const CONFIG_ID: core::ops::Range<usize> = 0..4;
const CONFIG_DATA: core::ops::Range<usize> = 4..4 + CONFIG_DATA_SIZE;
const CONFIG_CRC: core::ops::Range<usize> = CONFIG_RECORD_SIZE - 4..CONFIG_RECORD_SIZE;

const TIP_NAME: core::ops::Range<usize> = 10..10 + TIP_NAME_SIZE;
const TIP_CRC: usize = TIP_RECORD_SIZE - 1;

const _: () = assert!(
    CONFIG_RECORD_SIZE <= CHUNK_SIZE,
    "Config record must fit into a single chunk"
);
// one shift per byte: the first byte and the seed must not be shifted out of the u32
const _: () = assert!(
    CONFIG_RECORD_SIZE + 7 <= u32::BITS as usize,
    "Config record too long for the checksum to cover every bit"
);
const _: () = assert!(
    TIP_CRC == TIP_NAME.end,
    "Tip checksum must directly follow the name"
);

/// The configuration record. Only the identifier has a meaning to the store, `data` is
/// opaque and laid out by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigRecord {
    /// Monotonically increasing record identifier, assigned by `save_config`.
    pub id: u32,
    pub data: [u8; CONFIG_DATA_SIZE],
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            id: 0,
            data: [0u8; CONFIG_DATA_SIZE],
        }
    }
}

impl ConfigRecord {
    pub fn new(data: [u8; CONFIG_DATA_SIZE]) -> Self {
        Self { id: 0, data }
    }

    /// Encodes the record with its checksum stamped, padded with zeros to a whole chunk.
    pub(crate) fn encode(&self) -> [u8; CHUNK_SIZE] {
        let mut raw = [0u8; CHUNK_SIZE];
        raw[CONFIG_ID].copy_from_slice(&self.id.to_le_bytes());
        raw[CONFIG_DATA].copy_from_slice(&self.data);
        let crc = config_checksum(&raw);
        raw[CONFIG_CRC].copy_from_slice(&crc.to_le_bytes());
        raw
    }

    /// Decodes a chunk, `None` if the stored checksum does not match.
    pub(crate) fn decode(raw: &[u8; CHUNK_SIZE]) -> Option<Self> {
        if !config_checksum_valid(raw) {
            return None;
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&raw[CONFIG_ID]);
        let mut data = [0u8; CONFIG_DATA_SIZE];
        data.copy_from_slice(&raw[CONFIG_DATA]);
        Some(Self {
            id: u32::from_le_bytes(id),
            data,
        })
    }
}

/// Shift-and-add sum over the encoded record with the checksum field taken as zero.
pub(crate) fn config_checksum(raw: &[u8; CHUNK_SIZE]) -> u32 {
    raw[..CONFIG_RECORD_SIZE]
        .iter()
        .enumerate()
        .map(|(i, &b)| if CONFIG_CRC.contains(&i) { 0 } else { b })
        .fold(CHECKSUM_SEED, |sum, b| {
            (sum << 1).wrapping_add(u32::from(b))
        })
}

pub(crate) fn config_checksum_valid(raw: &[u8; CHUNK_SIZE]) -> bool {
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&raw[CONFIG_CRC]);
    u32::from_le_bytes(stored) == config_checksum(raw)
}

/// Calibration record of a soldering tip: the heater readings at the four reference
/// temperatures plus a few flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TipRecord {
    pub t200: u16,
    pub t260: u16,
    pub t330: u16,
    pub t400: u16,
    pub mask: u8,
    pub ambient: i8,
    pub name: [u8; TIP_NAME_SIZE],
}

impl TipRecord {
    /// Encodes the record with its checksum stamped.
    pub(crate) fn encode(&self) -> [u8; TIP_RECORD_SIZE] {
        let mut raw = [0u8; TIP_RECORD_SIZE];
        raw[0..2].copy_from_slice(&self.t200.to_le_bytes());
        raw[2..4].copy_from_slice(&self.t260.to_le_bytes());
        raw[4..6].copy_from_slice(&self.t330.to_le_bytes());
        raw[6..8].copy_from_slice(&self.t400.to_le_bytes());
        raw[8] = self.mask;
        raw[9] = self.ambient.cast_unsigned();
        raw[TIP_NAME].copy_from_slice(&self.name);
        raw[TIP_CRC] = self.checksum();
        raw
    }

    /// Decodes a slot, `None` if the stored checksum does not match.
    pub(crate) fn decode(raw: &[u8]) -> Option<Self> {
        let raw: &[u8; TIP_RECORD_SIZE] = raw.get(..TIP_RECORD_SIZE)?.try_into().ok()?;
        let u16_at = |at: usize| u16::from_le_bytes([raw[at], raw[at + 1]]);

        let mut name = [0u8; TIP_NAME_SIZE];
        name.copy_from_slice(&raw[TIP_NAME]);
        let tip = Self {
            t200: u16_at(0),
            t260: u16_at(2),
            t330: u16_at(4),
            t400: u16_at(6),
            mask: raw[8],
            ambient: raw[9].cast_signed(),
            name,
        };

        (tip.checksum() == raw[TIP_CRC]).then_some(tip)
    }

    /// 8-bit shift-and-add sum over the fields in declaration order, seeded at the end.
    pub(crate) fn checksum(&self) -> u8 {
        let fields = [
            u32::from(self.t200),
            u32::from(self.t260),
            u32::from(self.t330),
            u32::from(self.t400),
            u32::from(self.mask),
            u32::from(self.ambient.cast_unsigned()),
        ];
        let sum = fields
            .into_iter()
            .chain(self.name.iter().map(|&b| u32::from(b)))
            .fold(0u32, |sum, field| (sum << 1).wrapping_add(field));
        (sum.wrapping_add(CHECKSUM_SEED) & 0xFF) as u8
    }

    /// The name with trailing padding stripped, if it is valid UTF-8.
    pub fn name_str(&self) -> Option<&str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0x00)
            .unwrap_or(TIP_NAME_SIZE);
        core::str::from_utf8(&self.name[..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_checksum_of_blank_record() {
        // the seed survives all shifts, so a zeroed chunk never validates
        let raw = [0u8; CHUNK_SIZE];
        assert_eq!(config_checksum(&raw), 117 << 24);
        assert_eq!(ConfigRecord::decode(&raw), None);

        let encoded = ConfigRecord::default().encode();
        assert_eq!(&encoded[20..24], &[0, 0, 0, 117]);
        assert_eq!(&encoded[24..], &[0u8; 8]);
    }

    #[test]
    fn config_checksum_ignores_stored_crc_and_padding() {
        let mut record = ConfigRecord::new([7u8; CONFIG_DATA_SIZE]);
        record.id = 3;
        let mut encoded = record.encode();
        let expected = config_checksum(&encoded);
        encoded[20..24].copy_from_slice(&[0xAB; 4]);
        encoded[24..].fill(0x5A);
        assert_eq!(config_checksum(&encoded), expected);

        encoded[20..24].copy_from_slice(&expected.to_le_bytes());
        assert_eq!(ConfigRecord::decode(&encoded), Some(record));
    }

    #[test]
    fn config_checksum_is_shift_and_add() {
        let mut raw = [0u8; CHUNK_SIZE];
        raw[23] = 0x55; // checksum field
        raw[31] = 0x77; // padding
        raw[19] = 1;
        // only the last data byte is set: 117 << 20, + 1, then four more shifts
        let expected = ((117u32 << 20) + 1) << 4;
        assert_eq!(config_checksum(&raw), expected);
    }

    #[test]
    fn config_checksum_covers_every_bit() {
        let mut record = ConfigRecord::new([0x3C; CONFIG_DATA_SIZE]);
        record.id = 0x0102_0304;
        let encoded = record.encode();

        for i in 0..CONFIG_RECORD_SIZE - 4 {
            for flip in [0x01u8, 0x20, 0x80, 0xFF] {
                let mut damaged = encoded;
                damaged[i] ^= flip;
                assert_eq!(ConfigRecord::decode(&damaged), None, "byte {i} ^ {flip:#04x}");
            }
        }
    }

    #[test]
    fn erased_chunk_is_not_a_config_record() {
        assert_eq!(ConfigRecord::decode(&[0xFF; CHUNK_SIZE]), None);
    }

    #[test]
    fn tip_checksum() {
        let tip = TipRecord {
            t200: 1,
            t260: 2,
            t330: 3,
            t400: 4,
            mask: 5,
            ambient: -1,
            name: *b"T12\0\0",
        };

        let mut sum = 0u32;
        for field in [1u32, 2, 3, 4, 5, 0xFF, b'T' as u32, b'1' as u32, b'2' as u32, 0, 0] {
            sum = (sum << 1).wrapping_add(field);
        }
        assert_eq!(tip.checksum(), ((sum + 117) & 0xFF) as u8);
    }

    #[test]
    fn blank_tip_slot_does_not_validate() {
        assert_eq!(TipRecord::decode(&[0u8; TIP_RECORD_SIZE]), None);
        assert_eq!(TipRecord::decode(&[0xFFu8; TIP_RECORD_SIZE]), None);
    }

    #[test]
    fn tip_encoding_layout() {
        let tip = TipRecord {
            t200: 0x0102,
            t260: 0x0304,
            t330: 0x0506,
            t400: 0x0708,
            mask: 0x09,
            ambient: -2,
            name: *b"BC2\0\0",
        };
        let raw = tip.encode();
        assert_eq!(
            &raw[..15],
            &[2, 1, 4, 3, 6, 5, 8, 7, 9, 0xFE, b'B', b'C', b'2', 0, 0]
        );
        assert_eq!(raw[15], tip.checksum());
        assert_eq!(tip.name_str(), Some("BC2"));
    }
}
