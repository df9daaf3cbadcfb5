//! A simulated NAND flash for testing storage-stack code without hardware.
//!
//! Models page layouts with spare areas, AND-style programming, the
//! bad-block marker convention, and injectable ECC events and program/erase
//! failures. Wear and access counters let tests assert how many times the
//! media was actually touched.

use crate::{
    check_block, check_page_access, BlockIndex, BlockStatus, ColumnAddress, EccStatus,
    NandErrorKind, PageIndex,
};

/// First spare byte value of a good block's page 0.
const MARKER_GOOD: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    OutOfBounds,
    ProgramFailed,
    EraseFailed,
    /// Uncorrectable source page during an internal copy.
    EccFailed,
}

impl crate::NandFlashError for Error {
    fn kind(&self) -> NandErrorKind {
        match self {
            Error::OutOfBounds => NandErrorKind::OutOfBounds,
            Error::ProgramFailed => NandErrorKind::BadBlock(None),
            Error::EraseFailed => NandErrorKind::BadBlock(None),
            Error::EccFailed => NandErrorKind::EccFailed,
        }
    }
}

impl From<NandErrorKind> for Error {
    fn from(kind: NandErrorKind) -> Self {
        match kind {
            NandErrorKind::OutOfBounds => Error::OutOfBounds,
            NandErrorKind::EccFailed => Error::EccFailed,
            _ => Error::ProgramFailed,
        }
    }
}

/// Media access counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Page loads from the array (ranged reads and full-page loads alike).
    pub page_reads: u32,
    /// Program cycles.
    pub page_programs: u32,
    /// Internal page copies.
    pub page_copies: u32,
}

/// In-memory NAND flash with `BLOCKS` blocks of `PPB` pages, each `LAYOUT`
/// bytes long (`PAGE` data bytes followed by the spare area).
#[derive(Debug, Clone)]
pub struct SimNandFlash<
    const PAGE: usize,
    const LAYOUT: usize,
    const PPB: usize,
    const BLOCKS: usize,
    const PLANE_MASK: u32 = 0,
> {
    storage: [[[u8; LAYOUT]; PPB]; BLOCKS],
    /// ECC outcome reported for each page on its next read.
    ecc: [[EccStatus; PPB]; BLOCKS],
    program_fail: [bool; BLOCKS],
    erase_fail: [bool; BLOCKS],
    erase_count: [u32; BLOCKS],
    pub stats: Stats,
    buf: [u8; LAYOUT],
    cached: Option<PageIndex>,
}

impl<const PAGE: usize, const LAYOUT: usize, const PPB: usize, const BLOCKS: usize, const PLANE_MASK: u32>
    Default for SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, PLANE_MASK>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const PAGE: usize, const LAYOUT: usize, const PPB: usize, const BLOCKS: usize, const PLANE_MASK: u32>
    SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, PLANE_MASK>
{
    pub fn new() -> Self {
        SimNandFlash {
            storage: [[[0xFF; LAYOUT]; PPB]; BLOCKS],
            ecc: [[EccStatus::Ok; PPB]; BLOCKS],
            program_fail: [false; BLOCKS],
            erase_fail: [false; BLOCKS],
            erase_count: [0; BLOCKS],
            stats: Stats::default(),
            buf: [0xFF; LAYOUT],
            cached: None,
        }
    }

    fn locate(page: PageIndex) -> (usize, usize) {
        let (block, in_block) = page.split(PPB.trailing_zeros());
        (block.as_u16() as usize, in_block as usize)
    }

    /// Report `status` on the next reads of `page`.
    pub fn set_page_ecc(&mut self, page: PageIndex, status: EccStatus) {
        let (b, p) = Self::locate(page);
        self.ecc[b][p] = status;
    }

    /// Make program operations on `block` fail.
    pub fn set_program_fail(&mut self, block: BlockIndex, fail: bool) {
        self.program_fail[block.as_u16() as usize] = fail;
    }

    /// Make erase operations on `block` fail.
    pub fn set_erase_fail(&mut self, block: BlockIndex, fail: bool) {
        self.erase_fail[block.as_u16() as usize] = fail;
    }

    /// Number of times `block` has been erased.
    pub fn erase_count(&self, block: BlockIndex) -> u32 {
        self.erase_count[block.as_u16() as usize]
    }

    fn program(&mut self, page: PageIndex, column: usize, bytes: &[u8]) -> Result<(), Error> {
        let (b, p) = Self::locate(page);
        if self.program_fail[b] {
            return Err(Error::ProgramFailed);
        }
        self.stats.page_programs += 1;
        // NAND programming can only clear bits
        for (cell, byte) in self.storage[b][p][column..column + bytes.len()]
            .iter_mut()
            .zip(bytes)
        {
            *cell &= *byte;
        }
        Ok(())
    }
}

impl<const PAGE: usize, const LAYOUT: usize, const PPB: usize, const BLOCKS: usize, const PLANE_MASK: u32>
    crate::ErrorType for SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, PLANE_MASK>
{
    type Error = Error;
}

impl<const PAGE: usize, const LAYOUT: usize, const PPB: usize, const BLOCKS: usize, const PLANE_MASK: u32>
    crate::NandFlash for SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, PLANE_MASK>
{
    const PAGE_SIZE: usize = PAGE;
    const PLANE_MASK: u32 = PLANE_MASK;
    const SPARE_SIZE: usize = LAYOUT - PAGE;
    const PAGES_PER_BLOCK: usize = PPB;
    const BLOCK_COUNT: usize = BLOCKS;

    fn read_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &mut [u8],
    ) -> Result<EccStatus, Self::Error> {
        check_page_access::<Self>(page, column, bytes.len())?;
        let (b, p) = Self::locate(page);
        self.stats.page_reads += 1;
        let start = column.as_u16() as usize;
        bytes.copy_from_slice(&self.storage[b][p][start..start + bytes.len()]);
        Ok(self.ecc[b][p])
    }

    fn write_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        check_page_access::<Self>(page, column, bytes.len())?;
        if self.cached == Some(page) {
            self.cached = None;
        }
        self.program(page, column.as_u16() as usize, bytes)
    }

    fn erase_block(&mut self, block: BlockIndex) -> Result<(), Self::Error> {
        check_block::<Self>(block)?;
        trace!("Erasing block {}", block.as_u16());
        let b = block.as_u16() as usize;
        self.erase_count[b] += 1;
        if let Some(cached) = self.cached {
            if cached.block(PPB.trailing_zeros()) == block {
                self.cached = None;
            }
        }
        if self.erase_fail[b] {
            return Err(Error::EraseFailed);
        }
        self.storage[b].iter_mut().for_each(|page| page.fill(0xFF));
        self.ecc[b] = [EccStatus::Ok; PPB];
        Ok(())
    }

    fn copy_page(&mut self, src: PageIndex, dst: PageIndex) -> Result<EccStatus, Self::Error> {
        check_page_access::<Self>(src, ColumnAddress::new(0), LAYOUT)?;
        check_page_access::<Self>(dst, ColumnAddress::new(0), LAYOUT)?;
        let (sb, sp) = Self::locate(src);
        let status = self.ecc[sb][sp];
        self.stats.page_copies += 1;
        if status == EccStatus::Failed {
            return Err(Error::EccFailed);
        }
        if self.cached == Some(dst) {
            self.cached = None;
        }
        let image = self.storage[sb][sp];
        self.program(dst, 0, &image)?;
        Ok(status)
    }

    fn block_status(&mut self, block: BlockIndex) -> Result<BlockStatus, Self::Error> {
        check_block::<Self>(block)?;
        let marker = self.storage[block.as_u16() as usize][0][PAGE];
        if marker == MARKER_GOOD {
            Ok(BlockStatus::Ok)
        } else {
            Ok(BlockStatus::Failed)
        }
    }

    fn mark_block_bad(&mut self, block: BlockIndex) -> Result<(), Self::Error> {
        check_block::<Self>(block)?;
        debug!("Marking block {} as bad", block.as_u16());
        // The erase is allowed to fail, the marker write is what counts
        let _ = self.erase_block(block);
        let first = block.first_page(PPB.trailing_zeros());
        self.write_page(first, ColumnAddress::new(PAGE as u16), &[0x00])
    }
}

impl<const PAGE: usize, const LAYOUT: usize, const PPB: usize, const BLOCKS: usize, const PLANE_MASK: u32>
    crate::PageCache for SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, PLANE_MASK>
{
    fn cached_page(&self) -> Option<PageIndex> {
        self.cached
    }

    fn drop_cached_page(&mut self) {
        self.cached = None;
    }

    fn load_page(&mut self, page: PageIndex) -> Result<EccStatus, Self::Error> {
        check_page_access::<Self>(page, ColumnAddress::new(0), LAYOUT)?;
        let (b, p) = Self::locate(page);
        self.stats.page_reads += 1;
        self.buf.copy_from_slice(&self.storage[b][p]);
        let status = self.ecc[b][p];
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
        // The buffer no longer mirrors any page once the caller can write
        // to it
        self.cached = None;
        &mut self.buf
    }

    fn program_cached(&mut self, dst: PageIndex) -> Result<(), Self::Error> {
        check_page_access::<Self>(dst, ColumnAddress::new(0), LAYOUT)?;
        self.cached = None;
        let image = self.buf;
        self.program(dst, 0, &image)?;
        self.cached = Some(dst);
        Ok(())
    }
}
