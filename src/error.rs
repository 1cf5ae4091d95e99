use thiserror::Error;

/// Errors that can occur during EEPROM store operations. Marked as non-exhaustive to allow for
/// future additions without breaking the API. A caller would typically only need to handle
/// NotFound and ChecksumMismatch as "nothing stored yet" and treat the rest as faults.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The config region has to hold at least one chunk and leave room for at least one tip chunk
    #[error("invalid layout")]
    InvalidLayout,

    /// The device reports less capacity than the layout requires
    #[error("invalid capacity")]
    InvalidCapacity,

    /// The transport failed or timed out while reading or writing a chunk
    #[error("storage error")]
    StorageError,

    /// No valid configuration record. Either nothing has been saved yet or the current
    /// record failed its checksum.
    #[error("config record not found")]
    NotFound,

    /// The tip slot was read but holds no valid record. Either it was never written or it is
    /// corrupted.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The tip slot index is outside of `0..total_tip_slots()`
    #[error("slot index out of range")]
    IndexOutOfRange,

    /// A config record was saved before the initialization scan established the write pointer
    #[error("write disabled")]
    WriteDisabled,
}
