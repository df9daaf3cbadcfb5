#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

pub mod bbm;
pub mod cmd;
mod device;
pub mod error;
pub mod registers;

pub use device::NandDevice;
pub use error::SpiNandError;

/// Contract a SPI NAND chip family must fulfil to drive [NandDevice].
///
/// `N` is the full page layout staged per page: `PAGE_SIZE` data bytes plus
/// `SPARE_SIZE` spare bytes. The command constants cover the de-facto
/// standard SPI NAND instruction set and can be overridden per family; the
/// wire behaviour lives in [crate::cmd::SpiNandCommands].
pub trait SpiNandChip<const N: usize> {
    // Device layout
    /// Bytes staged per page: data plus spare
    const LAYOUT_SIZE: u32 = N as u32;
    /// Data bytes per page
    const PAGE_SIZE: u32;
    /// Spare bytes per page
    const SPARE_SIZE: u32;
    /// Pages per erase block. Must be a power of two
    const PAGES_PER_BLOCK: u32;
    /// Number of erase blocks
    const BLOCK_COUNT: u32;
    /// Total pages on the device
    const PAGE_COUNT: u32 = Self::PAGES_PER_BLOCK * Self::BLOCK_COUNT;

    // Identification
    /// Expected JEDEC manufacturer ID
    const JEDEC_MANUFACTURER_ID: u8;
    /// Expected JEDEC device ID. MSB first on wire
    const JEDEC_DEVICE_ID: u16;

    // Multi-plane / multi-die layout
    /// Bits of a linear page address selecting the plane. Zero for
    /// single-plane parts
    const PLANE_MASK: u32 = 0;
    /// Bits of a linear page address selecting the die. Zero for
    /// single-die parts
    const DIE_MASK: u32 = 0;

    // Timings
    /// Settle time after a reset command
    const RESET_DELAY_US: u32 = 1_000;
    /// Yield interval between busy polls
    const BUSY_POLL_INTERVAL_US: u32 = 5;
    /// Wait before the first busy poll of an erase, which is orders of
    /// magnitude slower than reads and would waste bus traffic otherwise
    const ERASE_POLL_PRE_DELAY_US: u32 = 500;

    // Commands
    /// Reset the flash device
    const RESET_COMMAND: u8 = 0xFF;
    /// Read the JEDEC ID
    const JEDEC_COMMAND: u8 = 0x9F;
    /// Read a feature register
    const GET_FEATURE_COMMAND: u8 = 0x0F;
    /// Write a feature register
    const SET_FEATURE_COMMAND: u8 = 0x1F;
    /// Load a page from the array into the chip's cache register
    const PAGE_READ_COMMAND: u8 = 0x13;
    /// Read bytes out of the cache register
    const READ_FROM_CACHE_COMMAND: u8 = 0x03;
    /// Set the write-enable latch
    const WRITE_ENABLE_COMMAND: u8 = 0x06;
    /// Clear the write-enable latch
    const WRITE_DISABLE_COMMAND: u8 = 0x04;
    /// Load bytes into the cache register, resetting it to 0xFF first
    const PROGRAM_LOAD_COMMAND: u8 = 0x02;
    /// Load bytes into the cache register without resetting it
    const PROGRAM_RANDOM_LOAD_COMMAND: u8 = 0x84;
    /// Program the cache register into a page of the array
    const PROGRAM_EXECUTE_COMMAND: u8 = 0x10;
    /// Erase a block
    const BLOCK_ERASE_COMMAND: u8 = 0xD8;
    /// Enter deep power down
    const DEEP_POWER_DOWN_COMMAND: u8 = 0xB9;
    /// Exit deep power down
    const DEEP_POWER_DOWN_EXIT_COMMAND: u8 = 0xAB;
}

/// The JEDEC identification of a flash device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JedecId {
    /// Manufacturer byte
    manufacturer: u8,
    /// Device id. MSB first on wire
    device: u16,
}

impl JedecId {
    pub fn new(manufacturer: u8, device: u16) -> Self {
        JedecId {
            manufacturer,
            device,
        }
    }

    pub fn manufacturer(&self) -> u8 {
        self.manufacturer
    }

    pub fn device(&self) -> u16 {
        self.device
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for JedecId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "JedecId(manufacturer: {:02X}, device: {:04X})",
            self.manufacturer,
            self.device
        );
    }
}
