use embedded_storage::Storage;

/// Everything the store needs from the hardware: byte addressed chunk reads and writes with a
/// bounded timeout (`Storage`) and the post-write wait of the EEPROM write cycle (`Settle`).
///
/// See README.md for an example implementation.
pub trait Platform: Settle + Storage {}

impl<T: Settle + Storage> Platform for T {}

pub trait Settle {
    /// Blocks until a previously issued write has been committed by the EEPROM.
    /// Called after every chunk write, including failed ones.
    fn settle(&mut self, ms: u32);
}

impl<T: Settle> Settle for &mut T {
    fn settle(&mut self, ms: u32) {
        T::settle(self, ms)
    }
}

#[cfg(feature = "at24")]
mod chip {
    use crate::platform::Settle;
    use embedded_hal::delay::DelayNs;
    use embedded_hal::i2c::I2c;
    use embedded_storage::{ReadStorage, Storage};

    /// Default bus address of AT24Cxx devices with all address pins tied low.
    pub const AT24_ADDRESS: u8 = 0x50;
    /// Write page of the AT24C32/AT24C64. A single write must not cross a page boundary.
    pub const AT24_PAGE_SIZE: usize = 32;

    #[derive(Debug, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum At24Error<E> {
        I2c(E),
        /// The requested range does not fit into a single write page or exceeds the capacity
        OutOfBounds,
    }

    /// AT24Cxx family EEPROM with 16-bit memory addressing, e.g. the 4 KiB AT24C32.
    pub struct At24<I, D> {
        i2c: I,
        delay: D,
        address: u8,
        capacity: usize,
    }

    impl<I: I2c, D: DelayNs> At24<I, D> {
        pub fn new(i2c: I, delay: D, address: u8, capacity: usize) -> Self {
            Self {
                i2c,
                delay,
                address,
                capacity,
            }
        }

        /// AT24C32 at the default bus address.
        pub fn at24c32(i2c: I, delay: D) -> Self {
            Self::new(i2c, delay, AT24_ADDRESS, 4096)
        }

        pub fn release(self) -> (I, D) {
            (self.i2c, self.delay)
        }

        fn check_bounds(&self, offset: u32, len: usize) -> Result<(), At24Error<I::Error>> {
            if offset as usize + len > self.capacity {
                return Err(At24Error::OutOfBounds);
            }
            Ok(())
        }
    }

    impl<I: I2c, D: DelayNs> ReadStorage for At24<I, D> {
        type Error = At24Error<I::Error>;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            self.check_bounds(offset, bytes.len())?;
            let mem_address = (offset as u16).to_be_bytes();
            self.i2c
                .write_read(self.address, &mem_address, bytes)
                .map_err(At24Error::I2c)
        }

        fn capacity(&self) -> usize {
            self.capacity
        }
    }

    impl<I: I2c, D: DelayNs> Storage for At24<I, D> {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            self.check_bounds(offset, bytes.len())?;
            let page_offset = offset as usize % AT24_PAGE_SIZE;
            if page_offset + bytes.len() > AT24_PAGE_SIZE {
                return Err(At24Error::OutOfBounds);
            }

            let mut buf = [0u8; 2 + AT24_PAGE_SIZE];
            buf[..2].copy_from_slice(&(offset as u16).to_be_bytes());
            buf[2..2 + bytes.len()].copy_from_slice(bytes);
            self.i2c
                .write(self.address, &buf[..2 + bytes.len()])
                .map_err(At24Error::I2c)
        }
    }

    impl<I, D: DelayNs> Settle for At24<I, D> {
        fn settle(&mut self, ms: u32) {
            self.delay.delay_ms(ms)
        }
    }

}

#[cfg(feature = "at24")]
pub use chip::*;
