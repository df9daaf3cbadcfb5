use nand_core::{
    BlockIndex, ColumnAddress, EccStatus, NandErrorKind, NandFlashError, PageCache, PageIndex,
};

use crate::cache::{MetaCache, META_SIZE};
use crate::hint::RelocationHint;
use crate::{FtlError, FtlNand};

/// Spare byte programmed alongside every journal page at the bad-block
/// marker position, so a programmed page 0 never reads as a retired block.
const SPARE_NOT_BAD: u8 = 0xFF;
/// Second spare byte, programmed to zero to seal the page as written.
const SEAL_PROGRAMMED: u8 = 0x00;
/// Value the seal byte reads back on an erased page.
const SEAL_ERASED: u8 = 0xFF;

/// Exposes a NAND driver through the journal's callback contract.
///
/// The chip cannot answer "has this page been programmed since erase"; it
/// only truthfully reads all-0xFF after an erase. The adapter fakes the
/// query by programming a seal byte into the spare area of every page it
/// writes, and [FtlNand::is_free] checks just that byte.
///
/// Journal metadata reads go through a small LRU cache and the driver's
/// one-page staging buffer, so walking the journal's bookkeeping rarely
/// touches the media. Reads that come back corrected-above-threshold raise
/// the shared [RelocationHint]; the writer task polls it and schedules a
/// relocation pass.
pub struct FtlAdapter<F: PageCache> {
    nand: F,
    cache: MetaCache,
    hint: &'static RelocationHint,
}

impl<F: PageCache> FtlAdapter<F> {
    pub fn new(nand: F, hint: &'static RelocationHint) -> Self {
        FtlAdapter {
            nand,
            cache: MetaCache::new(),
            hint,
        }
    }

    /// The raw driver, for diagnostics that bypass the journal.
    pub fn nand_mut(&mut self) -> &mut F {
        &mut self.nand
    }

    pub fn into_inner(self) -> F {
        self.nand
    }

    fn fail(e: F::Error) -> FtlError {
        match e.kind() {
            NandErrorKind::EccFailed => FtlError::Ecc,
            NandErrorKind::BadBlock(_) => FtlError::BadBlock,
            _ => FtlError::Io,
        }
    }

    fn drop_cached_if_in_block(&mut self, block: BlockIndex) {
        if let Some(page) = self.nand.cached_page() {
            if page.block(F::LOG2_PAGES_PER_BLOCK) == block {
                self.nand.drop_cached_page();
            }
        }
    }
}

impl<F: PageCache> FtlNand for FtlAdapter<F> {
    fn log2_page_size(&self) -> u8 {
        (F::PAGE_SIZE as u32).trailing_zeros() as u8
    }

    fn log2_pages_per_block(&self) -> u8 {
        F::LOG2_PAGES_PER_BLOCK as u8
    }

    fn num_blocks(&self) -> u32 {
        F::BLOCK_COUNT as u32
    }

    fn is_bad(&mut self, block: u32) -> bool {
        // A block whose marker cannot be read is treated as bad
        self.nand
            .block_is_bad(BlockIndex::new(block as u16))
            .unwrap_or(true)
    }

    fn mark_bad(&mut self, block: u32) {
        if self.nand.mark_block_bad(BlockIndex::new(block as u16)).is_err() {
            // Nothing more can be done for a block that cannot even be
            // marked
            warn!("failed to mark block {} bad", block);
        }
    }

    fn erase(&mut self, block: u32) -> Result<(), FtlError> {
        let block = BlockIndex::new(block as u16);
        let mask = (1u32 << F::LOG2_PAGES_PER_BLOCK) - 1;
        self.cache
            .invalidate(block.first_page(F::LOG2_PAGES_PER_BLOCK), mask);
        self.drop_cached_if_in_block(block);
        self.nand.erase_block(block).map_err(|_| {
            warn!("erase failed on block {}", block.as_u16());
            FtlError::BadBlock
        })
    }

    fn prog(&mut self, page: u32, data: &[u8]) -> Result<(), FtlError> {
        let page = PageIndex::new(page);
        self.cache.invalidate(page, 0);

        // Assemble the page image in the staging buffer: payload, then the
        // two invented spare bytes. The rest of the layout stays erased.
        let buf = self.nand.cached_bytes_mut();
        buf.fill(0xFF);
        buf[..data.len()].copy_from_slice(data);
        buf[F::PAGE_SIZE] = SPARE_NOT_BAD;
        buf[F::PAGE_SIZE + 1] = SEAL_PROGRAMMED;

        // On success the buffer keeps mirroring the freshly written page
        self.nand.program_cached(page).map_err(|_| FtlError::BadBlock)
    }

    fn is_free(&mut self, page: u32) -> bool {
        // Only the seal bytes are inspected; scanning the whole page for
        // 0xFF would cost a full page read per query. A bit flip landing
        // exactly in the seal byte can misreport, which the journal's
        // recovery path tolerates.
        let mut seal = [0u8; 2];
        match self.nand.read_page(
            PageIndex::new(page),
            ColumnAddress::new(F::PAGE_SIZE as u16),
            &mut seal,
        ) {
            Ok(_) => seal[1] == SEAL_ERASED,
            Err(_) => false,
        }
    }

    fn read(
        &mut self,
        page: u32,
        offset: usize,
        length: usize,
        data: &mut [u8],
    ) -> Result<(), FtlError> {
        let page = PageIndex::new(page);
        let column = ColumnAddress::new(offset as u16);
        let out = &mut data[..length];

        if length == META_SIZE {
            if let Some(record) = self.cache.get(page, column) {
                out.copy_from_slice(record);
                return Ok(());
            }
        }
        if self.nand.cached_page() == Some(page) {
            out.copy_from_slice(&self.nand.cached_bytes()[offset..offset + length]);
            return Ok(());
        }

        let status = if length == META_SIZE {
            // Metadata reads cluster on a few pages; pulling the whole page
            // into the staging buffer amortizes the next lookups
            let status = self.nand.load_page(page).map_err(Self::fail)?;
            if status.is_usable() {
                out.copy_from_slice(&self.nand.cached_bytes()[offset..offset + length]);
                self.cache.set(page, column, out);
            }
            status
        } else {
            self.nand.read_page(page, column, out).map_err(Self::fail)?
        };

        match status {
            EccStatus::Ok => Ok(()),
            EccStatus::Corrected => {
                warn!("corrected ECC event on page {}", page.as_u32());
                self.hint.set();
                Err(FtlError::EccWarning)
            }
            EccStatus::Failed => Err(FtlError::Ecc),
        }
    }

    fn copy(&mut self, src: u32, dst: u32) -> Result<(), FtlError> {
        let src_page = PageIndex::new(src);
        let dst_page = PageIndex::new(dst);

        if (src ^ dst) & (F::PLANE_MASK | F::DIE_MASK) == 0 {
            // Same plane and die: the chip copies cache-to-cache without
            // the data crossing the bus
            match self.nand.copy_page(src_page, dst_page) {
                Ok(EccStatus::Ok) => Ok(()),
                Ok(_) => {
                    warn!("corrected ECC event copying page {}", src);
                    self.nand.drop_cached_page();
                    self.hint.set();
                    Err(FtlError::EccWarning)
                }
                Err(e) => {
                    self.nand.drop_cached_page();
                    Err(Self::fail(e))
                }
            }
        } else {
            // The copy has to go through RAM; re-seal the spare bytes on
            // the way out
            let status = self.nand.load_page(src_page).map_err(Self::fail)?;
            if status == EccStatus::Failed {
                return Err(FtlError::Ecc);
            }
            let buf = self.nand.cached_bytes_mut();
            buf[F::PAGE_SIZE] = SPARE_NOT_BAD;
            buf[F::PAGE_SIZE + 1] = SEAL_PROGRAMMED;
            self.nand
                .program_cached(dst_page)
                .map_err(|_| FtlError::BadBlock)?;
            if status == EccStatus::Corrected {
                warn!("corrected ECC event copying page {}", src);
                self.nand.drop_cached_page();
                self.hint.set();
                return Err(FtlError::EccWarning);
            }
            Ok(())
        }
    }
}
