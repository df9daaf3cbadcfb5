use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use nand_core::{
    check_block, check_page_access, BlockIndex, BlockStatus, ColumnAddress, EccStatus, ErrorType,
    NandFlash, PageCache, PageIndex,
};

use crate::bbm;
use crate::cmd::SpiNandCommands;
use crate::error::SpiNandError;
use crate::registers::{self, Configuration, Protection, Status};
use crate::JedecId;

/// Page-level driver for a SPI NAND chip.
///
/// Composes the command codec into read/write/erase/copy operations, each
/// handling the chip's cache-register load/flush and busy polling. Busy
/// waits yield through the injected [DelayNs] between polls instead of
/// spinning on the bus; each poll is its own short bus transaction, so the
/// bus is never held across a wait. Polls are bounded by the chip's
/// documented worst-case operation times, not by a deadline.
///
/// Owns a one-page staging buffer (`N` = data + spare bytes) used by every
/// full-page transfer and doubling as an opportunistic one-page cache; the
/// tag tracks which page the buffer mirrors. One `NandDevice` exists per
/// chip and is owned by the single task with NAND access.
///
/// Exactly one type implements the chip contract per hardware variant, so
/// swapping families is a type parameter, not a build flag.
pub struct NandDevice<SPI, C, D, const N: usize> {
    pub spi: SPI,
    pub chip: C,
    delay: D,
    buf: [u8; N],
    cached: Option<PageIndex>,
}

// Manually implement Debug to avoid bounds on SPI and the delay
impl<SPI, C, D, const N: usize> Debug for NandDevice<SPI, C, D, N>
where
    C: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NandDevice")
            .field("chip", &self.chip)
            .field("cached", &self.cached)
            .finish()
    }
}

impl<SPI, C, D, const N: usize> NandDevice<SPI, C, D, N> {
    /// Create a new [NandDevice] from a SPI peripheral, a chip definition
    /// and a delay provider.
    pub fn new(spi: SPI, chip: C, delay: D) -> Self {
        NandDevice {
            spi,
            chip,
            delay,
            buf: [0xFF; N],
            cached: None,
        }
    }
}

impl<SPI, C, D, const N: usize> NandDevice<SPI, C, D, N>
where
    SPI: SpiDevice,
    C: SpiNandCommands<SPI, N>,
    D: DelayNs,
{
    /// Bring the chip up: reset, verify the JEDEC id, lift block
    /// protection and engage the on-chip ECC.
    pub fn init(&mut self) -> Result<JedecId, SpiNandError<SPI::Error>> {
        self.chip.reset_cmd(&mut self.spi)?;
        self.delay.delay_us(C::RESET_DELAY_US);

        let id = self.chip.read_jedec_cmd(&mut self.spi)?;
        let expected = JedecId::new(C::JEDEC_MANUFACTURER_ID, C::JEDEC_DEVICE_ID);
        if id != expected {
            error!(
                "JEDEC id mismatch: got {:04X}, expected {:04X}",
                id.device(),
                expected.device()
            );
            return Err(SpiNandError::IdMismatch);
        }

        let prot = Protection::from_bits(
            self.chip
                .get_feature_cmd(&mut self.spi, registers::PROTECTION)?,
        );
        if !prot.unlocked() {
            self.chip.set_feature_cmd(
                &mut self.spi,
                registers::PROTECTION,
                prot.unlock().bits(),
            )?;
        }

        let cfg = Configuration::from_bits(
            self.chip
                .get_feature_cmd(&mut self.spi, registers::CONFIGURATION)?,
        );
        if !cfg.ecc_enabled() {
            self.chip.set_feature_cmd(
                &mut self.spi,
                registers::CONFIGURATION,
                cfg.with_ecc_enabled(true).bits(),
            )?;
        }

        info!("NAND flash up, {} blocks", C::BLOCK_COUNT);
        Ok(id)
    }

    /// Read the JEDEC id.
    pub fn jedec(&mut self) -> Result<JedecId, SpiNandError<SPI::Error>> {
        self.chip.read_jedec_cmd(&mut self.spi)
    }

    /// Put the chip into deep power down.
    pub fn sleep(&mut self) -> Result<(), SpiNandError<SPI::Error>> {
        self.chip.deep_power_down_cmd(&mut self.spi)
    }

    /// Wake the chip from deep power down.
    pub fn wake(&mut self) -> Result<(), SpiNandError<SPI::Error>> {
        self.chip.deep_power_down_exit_cmd(&mut self.spi)?;
        self.delay.delay_us(C::RESET_DELAY_US);
        Ok(())
    }

    /// Poll the status register until the busy bit clears, yielding
    /// between polls.
    pub(crate) fn wait_ready(&mut self) -> Result<Status, SpiNandError<SPI::Error>> {
        loop {
            let status = self.chip.status_cmd(&mut self.spi)?;
            if !status.busy() {
                return Ok(status);
            }
            self.delay.delay_us(C::BUSY_POLL_INTERVAL_US);
        }
    }
}

impl<SPI, C, D, const N: usize> ErrorType for NandDevice<SPI, C, D, N>
where
    SPI: SpiDevice,
{
    type Error = SpiNandError<SPI::Error>;
}

impl<SPI, C, D, const N: usize> NandFlash for NandDevice<SPI, C, D, N>
where
    SPI: SpiDevice,
    C: SpiNandCommands<SPI, N>,
    D: DelayNs,
{
    const PAGE_SIZE: usize = C::PAGE_SIZE as usize;
    const SPARE_SIZE: usize = C::SPARE_SIZE as usize;
    const PAGES_PER_BLOCK: usize = C::PAGES_PER_BLOCK as usize;
    const BLOCK_COUNT: usize = C::BLOCK_COUNT as usize;
    const PLANE_MASK: u32 = C::PLANE_MASK;
    const DIE_MASK: u32 = C::DIE_MASK;

    fn read_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &mut [u8],
    ) -> Result<EccStatus, Self::Error> {
        trace!(
            "Reading {} bytes of page {} at column {}",
            bytes.len(),
            page.as_u32(),
            column.as_u16()
        );
        check_page_access::<Self>(page, column, bytes.len())?;

        self.chip.page_read_cmd(&mut self.spi, page)?;
        self.wait_ready()?;
        let status = self.chip.ecc_status(&mut self.spi)?;
        // The requested range is read out regardless of the ECC outcome, so
        // callers can inspect best-effort bytes after a failure.
        self.chip
            .read_from_cache_cmd(&mut self.spi, column, bytes)?;
        Ok(status)
    }

    fn write_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        trace!(
            "Writing {} bytes to page {} at column {}",
            bytes.len(),
            page.as_u32(),
            column.as_u16()
        );
        check_page_access::<Self>(page, column, bytes.len())?;
        if self.cached == Some(page) {
            self.cached = None;
        }

        self.chip.write_enable_cmd(&mut self.spi)?;
        self.chip.program_load_cmd(&mut self.spi, column, bytes)?;
        self.chip.program_execute_cmd(&mut self.spi, page)?;
        let status = self.wait_ready()?;
        if status.program_failed() {
            return Err(SpiNandError::ProgramFailed);
        }
        Ok(())
    }

    fn erase_block(&mut self, block: BlockIndex) -> Result<(), Self::Error> {
        trace!("Erasing block {}", block.as_u16());
        check_block::<Self>(block)?;
        if let Some(cached) = self.cached {
            if cached.block(C::PAGES_PER_BLOCK.trailing_zeros()) == block {
                self.cached = None;
            }
        }

        self.chip.write_enable_cmd(&mut self.spi)?;
        self.chip
            .erase_block_cmd(&mut self.spi, block.first_page(C::PAGES_PER_BLOCK.trailing_zeros()))?;
        // Erases run for milliseconds; waiting before the first poll keeps
        // the bus quiet.
        self.delay.delay_us(C::ERASE_POLL_PRE_DELAY_US);
        let status = self.wait_ready()?;
        if status.erase_failed() {
            return Err(SpiNandError::EraseFailed);
        }
        Ok(())
    }

    fn copy_page(&mut self, src: PageIndex, dst: PageIndex) -> Result<EccStatus, Self::Error> {
        trace!("Copying page {} to {}", src.as_u32(), dst.as_u32());
        check_page_access::<Self>(src, ColumnAddress::new(0), 0)?;
        check_page_access::<Self>(dst, ColumnAddress::new(0), 0)?;

        // Load the source into the chip's cache register and check it
        // before committing anything.
        self.chip.page_read_cmd(&mut self.spi, src)?;
        self.wait_ready()?;
        let ecc = self.chip.ecc_status(&mut self.spi)?;
        if ecc == EccStatus::Failed {
            return Err(SpiNandError::EccFailed);
        }

        if self.cached == Some(dst) {
            self.cached = None;
        }
        self.chip.write_enable_cmd(&mut self.spi)?;
        self.chip.program_execute_cmd(&mut self.spi, dst)?;
        let status = self.wait_ready()?;
        if status.program_failed() {
            return Err(SpiNandError::ProgramFailed);
        }
        Ok(ecc)
    }

    fn block_status(&mut self, block: BlockIndex) -> Result<BlockStatus, Self::Error> {
        check_block::<Self>(block)?;
        match self.read_bad_block_marker(block) {
            Ok(bbm::MARKER_GOOD) => Ok(BlockStatus::Ok),
            Ok(_) => Ok(BlockStatus::Failed),
            Err(_) => {
                // A block whose marker cannot be read is not trusted
                warn!("marker read failed on block {}", block.as_u16());
                Ok(BlockStatus::Failed)
            }
        }
    }

    fn mark_block_bad(&mut self, block: BlockIndex) -> Result<(), Self::Error> {
        debug!("Marking block {} as bad", block.as_u16());
        check_block::<Self>(block)?;
        // The block may well be unerasable at this point; the marker write
        // is what counts.
        if self.erase_block(block).is_err() {
            warn!("erase of failing block {} failed", block.as_u16());
        }
        self.write_page(
            block.first_page(C::PAGES_PER_BLOCK.trailing_zeros()),
            ColumnAddress::new(C::PAGE_SIZE as u16),
            &[bbm::MARKER_BAD],
        )
    }
}

impl<SPI, C, D, const N: usize> PageCache for NandDevice<SPI, C, D, N>
where
    SPI: SpiDevice,
    C: SpiNandCommands<SPI, N>,
    D: DelayNs,
{
    fn cached_page(&self) -> Option<PageIndex> {
        self.cached
    }

    fn drop_cached_page(&mut self) {
        self.cached = None;
    }

    fn load_page(&mut self, page: PageIndex) -> Result<EccStatus, Self::Error> {
        check_page_access::<Self>(page, ColumnAddress::new(0), N)?;

        self.chip.page_read_cmd(&mut self.spi, page)?;
        self.wait_ready()?;
        let status = self.chip.ecc_status(&mut self.spi)?;
        self.chip
            .read_from_cache_cmd(&mut self.spi, ColumnAddress::new(0), &mut self.buf)?;
        // Suspect data is never served as a cache hit
        self.cached = if status == EccStatus::Failed {
            None
        } else {
            Some(page)
        };
        Ok(status)
    }

    fn cached_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn cached_bytes_mut(&mut self) -> &mut [u8] {
        self.cached = None;
        &mut self.buf
    }

    fn program_cached(&mut self, dst: PageIndex) -> Result<(), Self::Error> {
        check_page_access::<Self>(dst, ColumnAddress::new(0), N)?;
        self.cached = None;

        self.chip.write_enable_cmd(&mut self.spi)?;
        self.chip
            .program_load_cmd(&mut self.spi, ColumnAddress::new(0), &self.buf)?;
        self.chip.program_execute_cmd(&mut self.spi, dst)?;
        let status = self.wait_ready()?;
        if status.program_failed() {
            return Err(SpiNandError::ProgramFailed);
        }
        self.cached = Some(dst);
        Ok(())
    }
}
