#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use eeprom_store::platform::Settle;
use embedded_storage::{ReadStorage, Storage};

pub const CHUNK_SIZE: usize = 32;
pub const CHUNKS: usize = 128;
pub const CONFIG_CHUNKS: usize = 64;
pub const TIP_START: usize = CONFIG_CHUNKS;
pub const SLOT_SIZE: usize = 16;
pub const SETTLE_MS: u32 = 20;

/// In-memory AT24C32. Erased cells read as 0xFF, writes replace bytes as they are.
#[derive(Default)]
pub struct Device {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    /// Every read or write touching this byte address fails
    pub fail_offset: Option<u32>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Settle { ms: u32 },
}

impl Device {
    pub fn new(chunks: usize) -> Self {
        Self {
            buf: vec![0xffu8; CHUNK_SIZE * chunks],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn reference() -> Self {
        Self::new(CHUNKS)
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
        self.fail_offset = None;
    }

    pub fn chunk(&self, index: usize) -> &[u8] {
        &self.buf[index * CHUNK_SIZE..(index + 1) * CHUNK_SIZE]
    }

    pub fn reads(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Read { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn settled_ms(&self) -> u32 {
        self.operations
            .iter()
            .map(|op| match op {
                Operation::Settle { ms } => *ms,
                _ => 0,
            })
            .sum()
    }

    fn faulty(&self, offset: u32, len: usize) -> bool {
        if self.operations.len() >= self.fail_after_operation {
            return true;
        }
        match self.fail_offset {
            Some(fail) => (offset..offset + len as u32).contains(&fail),
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct DeviceError;

impl ReadStorage for Device {
    type Error = DeviceError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(CHUNK_SIZE as _));
        assert_eq!(bytes.len(), CHUNK_SIZE);

        println!(
            "    device: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.faulty(offset, bytes.len()) {
            println!("    device: FAULT");
            return Err(DeviceError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Device {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(CHUNK_SIZE as _));
        assert_eq!(bytes.len(), CHUNK_SIZE);

        println!(
            "    device: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.faulty(offset, bytes.len()) {
            println!("    device: FAULT");
            return Err(DeviceError);
        }
        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

// the write cycle is recorded instead of waited for
impl Settle for Device {
    fn settle(&mut self, ms: u32) {
        self.operations.push(Operation::Settle { ms });
    }
}

pub fn chunk_offset(index: usize) -> u32 {
    (index * CHUNK_SIZE) as u32
}
