use embedded_hal::spi::SpiDevice;
use nand_core::EccStatus;
use nand_spi::cmd::utils::spi_transfer_in_place;
use nand_spi::cmd::SpiNandCommands;
use nand_spi::{SpiNandChip, SpiNandError};

/// Command to read the ECC status register, which holds the number of bits
/// corrected by the last page load.
const ECC_STATUS_READ_COMMAND: u8 = 0x7C;

/// Macronix MX35LF series SPI NAND.
///
/// Corrected-bit-count ECC family: after a page load the chip reports how
/// many bits its 8-bit BCH engine corrected, read out with the dedicated
/// 0x7C command. Counts at or below [`ECC_SAFE_BITS`](Mx35lf2ge4ad::ECC_SAFE_BITS)
/// are tolerated; above that the block is due for migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mx35lf2ge4ad();

/// 4 Gb part with 4096-byte pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mx35lf4ge4ad();

impl Mx35lf2ge4ad {
    /// Corrected-bit counts up to this are not considered a failing block.
    pub const ECC_SAFE_BITS: u8 = 4;
    /// The BCH engine corrects at most this many bits per sector.
    pub const ECC_MAX_BITS: u8 = 8;

    pub fn new() -> Self {
        Self()
    }
}

impl Mx35lf4ge4ad {
    /// Corrected-bit counts up to this are not considered a failing block.
    pub const ECC_SAFE_BITS: u8 = 4;
    /// The BCH engine corrects at most this many bits per sector.
    pub const ECC_MAX_BITS: u8 = 8;

    pub fn new() -> Self {
        Self()
    }
}

impl SpiNandChip<2176> for Mx35lf2ge4ad {
    const PAGE_SIZE: u32 = 2048;
    const SPARE_SIZE: u32 = 128;
    const PAGES_PER_BLOCK: u32 = 64;
    const BLOCK_COUNT: u32 = 2048;
    const JEDEC_MANUFACTURER_ID: u8 = 0xC2;
    const JEDEC_DEVICE_ID: u16 = 0x2620;
    // Two-plane part: odd and even blocks sit on different planes, so the
    // plane bit is the lowest block-address bit of the page address
    const PLANE_MASK: u32 = 1 << 6;
}

impl SpiNandChip<4352> for Mx35lf4ge4ad {
    const PAGE_SIZE: u32 = 4096;
    const SPARE_SIZE: u32 = 256;
    const PAGES_PER_BLOCK: u32 = 64;
    const BLOCK_COUNT: u32 = 2048;
    const JEDEC_MANUFACTURER_ID: u8 = 0xC2;
    const JEDEC_DEVICE_ID: u16 = 0x3720;
    const PLANE_MASK: u32 = 1 << 6;
}

/// Read the corrected-bit count of the last page load.
fn ecc_bit_count<SPI: SpiDevice>(spi: &mut SPI) -> Result<u8, SpiNandError<SPI::Error>> {
    let mut buf = [ECC_STATUS_READ_COMMAND, 0, 0];
    spi_transfer_in_place(spi, &mut buf)?;
    Ok(buf[2] & 0x0F)
}

impl<SPI: SpiDevice> SpiNandCommands<SPI, 2176> for Mx35lf2ge4ad {
    fn ecc_status(&self, spi: &mut SPI) -> Result<EccStatus, SpiNandError<SPI::Error>> {
        let status = self.status_cmd(spi)?;
        match status.ecc_code() {
            0b00 => Ok(EccStatus::Ok),
            0b10 => Ok(EccStatus::Failed),
            // Bits were corrected: let the counter decide whether the
            // block is failing
            _ => {
                let bits = ecc_bit_count(spi)?;
                Ok(EccStatus::from_bit_count(
                    bits,
                    Self::ECC_SAFE_BITS,
                    Self::ECC_MAX_BITS,
                ))
            }
        }
    }
}

impl<SPI: SpiDevice> SpiNandCommands<SPI, 4352> for Mx35lf4ge4ad {
    fn ecc_status(&self, spi: &mut SPI) -> Result<EccStatus, SpiNandError<SPI::Error>> {
        let status = self.status_cmd(spi)?;
        match status.ecc_code() {
            0b00 => Ok(EccStatus::Ok),
            0b10 => Ok(EccStatus::Failed),
            _ => {
                let bits = ecc_bit_count(spi)?;
                Ok(EccStatus::from_bit_count(
                    bits,
                    Self::ECC_SAFE_BITS,
                    Self::ECC_MAX_BITS,
                ))
            }
        }
    }
}
