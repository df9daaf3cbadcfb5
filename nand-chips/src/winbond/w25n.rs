use embedded_hal::spi::SpiDevice;
use nand_core::EccStatus;
use nand_spi::cmd::SpiNandCommands;
use nand_spi::{SpiNandChip, SpiNandError};

/// Winbond W25N series SPI NAND.
///
/// Status-code ECC family: the chip reports only a 2-bit code after each
/// page load, with no corrected-bit counter to refine it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct W25N<const B: u32, const ID: u16>();

/// Specific parts: block count and JEDEC device id.
pub type W25N512GV = W25N<512, 0xAA20>;
pub type W25N01GV = W25N<1024, 0xAA21>;
pub type W25N01KV = W25N<1024, 0xAE21>;
pub type W25N02KV = W25N<2048, 0xAA22>;

impl<const B: u32, const ID: u16> W25N<B, ID> {
    pub fn new() -> Self {
        Self()
    }
}

// All W25N parts have 2048 data bytes and 64 spare bytes per page
impl<const B: u32, const ID: u16> SpiNandChip<2112> for W25N<B, ID> {
    const PAGE_SIZE: u32 = 2048;
    const SPARE_SIZE: u32 = 64;
    const PAGES_PER_BLOCK: u32 = 64;
    const BLOCK_COUNT: u32 = B;
    const JEDEC_MANUFACTURER_ID: u8 = 0xEF;
    const JEDEC_DEVICE_ID: u16 = ID;
}

impl<SPI: SpiDevice, const B: u32, const ID: u16> SpiNandCommands<SPI, 2112> for W25N<B, ID> {
    /// ECCS1:ECCS0 of the status register, per the W25N datasheets:
    /// 00 = clean, 01 = corrected within limits, 10 = uncorrectable,
    /// 11 = corrected at the correction limit.
    fn ecc_status(&self, spi: &mut SPI) -> Result<EccStatus, SpiNandError<SPI::Error>> {
        let status = self.status_cmd(spi)?;
        Ok(match status.ecc_code() {
            0b00 => EccStatus::Ok,
            0b01 => EccStatus::Ok,
            0b10 => EccStatus::Failed,
            _ => EccStatus::Corrected,
        })
    }
}
