use embedded_hal::spi::{Operation, SpiDevice};
use nand_core::{ColumnAddress, EccStatus, PageIndex};
use utils::{spi_transaction, spi_transfer_in_place, spi_write};

use crate::{error::SpiNandError, registers, JedecId, SpiNandChip};

/// Wire-level command set of a SPI NAND chip.
///
/// Each function encodes exactly one chip command and runs it as a single
/// bus transaction: no retries, no polling, no hardware state. Page
/// addresses go out MSB first in three bytes, column addresses MSB first in
/// two; chips validate packet length and ordering strictly.
///
/// The default implementations follow the de-facto standard instruction
/// set. Families that deviate override the function, not the caller.
/// [SpiNandCommands::ecc_status] has no default: reporting diverges per
/// family (corrected-bit counters vs. fixed status codes) and each chip
/// maps its own scheme onto [EccStatus].
pub trait SpiNandCommands<SPI: SpiDevice, const N: usize>: SpiNandChip<N> {
    /// Issue a reset.
    fn reset_cmd(&self, spi: &mut SPI) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::RESET_COMMAND])
    }

    /// Read the JEDEC manufacturer and device id.
    fn read_jedec_cmd(&self, spi: &mut SPI) -> Result<JedecId, SpiNandError<SPI::Error>> {
        let mut buf = [Self::JEDEC_COMMAND, 0, 0, 0, 0];
        spi_transfer_in_place(spi, &mut buf)?;
        Ok(JedecId::new(buf[2], u16::from_be_bytes([buf[3], buf[4]])))
    }

    /// Read a feature register.
    fn get_feature_cmd(&self, spi: &mut SPI, reg: u8) -> Result<u8, SpiNandError<SPI::Error>> {
        let mut buf = [Self::GET_FEATURE_COMMAND, reg, 0];
        spi_transfer_in_place(spi, &mut buf)?;
        Ok(buf[2])
    }

    /// Write a feature register.
    fn set_feature_cmd(
        &self,
        spi: &mut SPI,
        reg: u8,
        value: u8,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::SET_FEATURE_COMMAND, reg, value])
    }

    /// Read the status register.
    fn status_cmd(&self, spi: &mut SPI) -> Result<registers::Status, SpiNandError<SPI::Error>> {
        Ok(registers::Status::from_bits(
            self.get_feature_cmd(spi, registers::STATUS)?,
        ))
    }

    /// Load a page from the array into the chip's cache register.
    fn page_read_cmd(
        &self,
        spi: &mut SPI,
        page: PageIndex,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let pa = page.as_u32();
        spi_write(
            spi,
            &[
                Self::PAGE_READ_COMMAND,
                (pa >> 16) as u8,
                (pa >> 8) as u8,
                pa as u8,
            ],
        )
    }

    /// Read bytes out of the cache register starting at `column`.
    fn read_from_cache_cmd(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        buf: &mut [u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let ca = column.as_u16();
        spi_transaction(
            spi,
            &mut [
                Operation::Write(&[
                    Self::READ_FROM_CACHE_COMMAND,
                    (ca >> 8) as u8,
                    ca as u8,
                    0,
                ]),
                Operation::Read(buf),
            ],
        )
    }

    /// Set the write-enable latch. Required before every program or erase.
    fn write_enable_cmd(&self, spi: &mut SPI) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::WRITE_ENABLE_COMMAND])
    }

    /// Clear the write-enable latch.
    fn write_disable_cmd(&self, spi: &mut SPI) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::WRITE_DISABLE_COMMAND])
    }

    /// Load bytes into the cache register at `column`, resetting the rest
    /// of the register to 0xFF.
    fn program_load_cmd(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        buf: &[u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let ca = column.as_u16();
        let header = [Self::PROGRAM_LOAD_COMMAND, (ca >> 8) as u8, ca as u8];
        spi_transaction(
            spi,
            &mut [Operation::Write(&header), Operation::Write(buf)],
        )
    }

    /// Load bytes into the cache register at `column` without resetting the
    /// other bytes, to build up a page image over several loads.
    fn program_random_load_cmd(
        &self,
        spi: &mut SPI,
        column: ColumnAddress,
        buf: &[u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let ca = column.as_u16();
        let header = [Self::PROGRAM_RANDOM_LOAD_COMMAND, (ca >> 8) as u8, ca as u8];
        spi_transaction(
            spi,
            &mut [Operation::Write(&header), Operation::Write(buf)],
        )
    }

    /// Program the cache register into the page at `page`.
    fn program_execute_cmd(
        &self,
        spi: &mut SPI,
        page: PageIndex,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let pa = page.as_u32();
        spi_write(
            spi,
            &[
                Self::PROGRAM_EXECUTE_COMMAND,
                (pa >> 16) as u8,
                (pa >> 8) as u8,
                pa as u8,
            ],
        )
    }

    /// Erase the block containing `page`. The address is the linear page
    /// address of any page in the block; the chip ignores the in-block
    /// bits.
    fn erase_block_cmd(
        &self,
        spi: &mut SPI,
        page: PageIndex,
    ) -> Result<(), SpiNandError<SPI::Error>> {
        let pa = page.as_u32();
        spi_write(
            spi,
            &[
                Self::BLOCK_ERASE_COMMAND,
                (pa >> 16) as u8,
                (pa >> 8) as u8,
                pa as u8,
            ],
        )
    }

    /// Enter deep power down. Only [SpiNandCommands::deep_power_down_exit_cmd]
    /// wakes the chip again.
    fn deep_power_down_cmd(&self, spi: &mut SPI) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::DEEP_POWER_DOWN_COMMAND])
    }

    /// Exit deep power down.
    fn deep_power_down_exit_cmd(&self, spi: &mut SPI) -> Result<(), SpiNandError<SPI::Error>> {
        spi_write(spi, &[Self::DEEP_POWER_DOWN_EXIT_COMMAND])
    }

    /// Classify the ECC outcome of the last page load.
    ///
    /// Chip-family specific: corrected-bit-count parts read the count from
    /// extra registers and compare against their thresholds, status-code
    /// parts map the two ECCS bits directly.
    fn ecc_status(&self, spi: &mut SPI) -> Result<EccStatus, SpiNandError<SPI::Error>>;
}

pub mod utils {
    use embedded_hal::spi::{Operation, SpiDevice};

    use super::SpiNandError;

    /// Wrapper around [SpiDevice::write] that maps errors
    pub fn spi_write<SPI: SpiDevice>(
        spi: &mut SPI,
        buf: &[u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi.write(buf).map_err(SpiNandError::Bus)
    }

    /// Wrapper around [SpiDevice::read] that maps errors
    pub fn spi_read<SPI: SpiDevice>(
        spi: &mut SPI,
        buf: &mut [u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi.read(buf).map_err(SpiNandError::Bus)
    }

    /// Wrapper around [SpiDevice::transfer_in_place] that maps errors
    pub fn spi_transfer_in_place<SPI: SpiDevice>(
        spi: &mut SPI,
        buf: &mut [u8],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi.transfer_in_place(buf).map_err(SpiNandError::Bus)
    }

    /// Wrapper around [SpiDevice::transaction] that maps errors
    pub fn spi_transaction<SPI: SpiDevice>(
        spi: &mut SPI,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), SpiNandError<SPI::Error>> {
        spi.transaction(operations).map_err(SpiNandError::Bus)
    }
}
