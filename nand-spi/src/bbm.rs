//! Bad-block marker handling.
//!
//! The marker lives in the first spare byte of page 0 of each block: 0xFF
//! means good, anything else means the block was retired at the factory or
//! at runtime.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use nand_core::{BlockIndex, ColumnAddress};

use crate::cmd::SpiNandCommands;
use crate::device::NandDevice;
use crate::error::SpiNandError;
use crate::registers::{self, Configuration};

/// Marker value of a good block.
pub const MARKER_GOOD: u8 = 0xFF;
/// Marker value written when retiring a block.
pub const MARKER_BAD: u8 = 0x00;

impl<SPI, C, D, const N: usize> NandDevice<SPI, C, D, N>
where
    SPI: SpiDevice,
    C: SpiNandCommands<SPI, N>,
    D: DelayNs,
{
    /// Read the block's bad-block marker byte.
    ///
    /// The marker is read with on-chip ECC suspended: a single flipped bit
    /// must never be "corrected" from bad to good. The previous ECC setting
    /// is restored afterwards, also when the read fails.
    pub fn read_bad_block_marker(
        &mut self,
        block: BlockIndex,
    ) -> Result<u8, SpiNandError<SPI::Error>> {
        let cfg = Configuration::from_bits(
            self.chip
                .get_feature_cmd(&mut self.spi, registers::CONFIGURATION)?,
        );
        if cfg.ecc_enabled() {
            self.chip.set_feature_cmd(
                &mut self.spi,
                registers::CONFIGURATION,
                cfg.with_ecc_enabled(false).bits(),
            )?;
        }

        let marker = self.raw_marker_read(block);

        if cfg.ecc_enabled() {
            self.chip
                .set_feature_cmd(&mut self.spi, registers::CONFIGURATION, cfg.bits())?;
        }
        marker
    }

    fn raw_marker_read(&mut self, block: BlockIndex) -> Result<u8, SpiNandError<SPI::Error>> {
        let page = block.first_page(C::PAGES_PER_BLOCK.trailing_zeros());
        self.chip.page_read_cmd(&mut self.spi, page)?;
        self.wait_ready()?;
        let mut marker = [0u8; 1];
        self.chip.read_from_cache_cmd(
            &mut self.spi,
            ColumnAddress::new(C::PAGE_SIZE as u16),
            &mut marker,
        )?;
        Ok(marker[0])
    }
}
