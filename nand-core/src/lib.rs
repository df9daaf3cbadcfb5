#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

mod address;
pub mod sim;

pub use address::{BlockIndex, ColumnAddress, PageIndex};

/// Conversion of implementation-specific errors into generic kinds.
///
/// Higher layers (the FTL adapter, the disk shim) make policy decisions on
/// the kind, not on the concrete error type.
pub trait NandFlashError {
    fn kind(&self) -> NandErrorKind;
}

/// A trait that NAND flash implementations can use to share an error type.
pub trait ErrorType {
    /// Errors returned by this NAND flash.
    type Error: NandFlashError;
}

/// Generic NAND flash error kinds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum NandErrorKind {
    /// The arguments are out of bounds.
    OutOfBounds,

    /// Bus/transport failure. Always fatal to the current operation and
    /// never retried at this layer.
    Bus,

    /// Uncorrectable ECC error. The returned data is suspect.
    EccFailed,

    /// The block failed during erase or program, or carries a bad-block
    /// marker. Contains the failed block if known.
    BadBlock(Option<BlockIndex>),

    /// Error specific to the implementation.
    Other,
}

/// Outcome of the on-chip error correction for a page read.
///
/// `Corrected` is not a failure: the data handed back is valid, but enough
/// bits flipped that the block should be migrated soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EccStatus {
    /// No errors, or few enough corrected bits that the block is not yet
    /// considered failing.
    Ok,
    /// Bits were corrected above the safe threshold. Data is valid, block
    /// should be migrated.
    Corrected,
    /// Errors detected but not corrected. Data is suspect.
    Failed,
}

impl EccStatus {
    /// Classify a corrected-bit count against the chip's thresholds.
    ///
    /// Counts at or below `safe` are tolerated silently. Counts above
    /// `safe` up to `max` (the chip's correction limit) flag the block for
    /// migration. Anything beyond `max` is uncorrectable.
    pub fn from_bit_count(bits: u8, safe: u8, max: u8) -> Self {
        if bits <= safe {
            EccStatus::Ok
        } else if bits <= max {
            EccStatus::Corrected
        } else {
            EccStatus::Failed
        }
    }

    /// Whether the returned data can be used.
    pub fn is_usable(&self) -> bool {
        !matches!(self, EccStatus::Failed)
    }
}

/// Bad-block state of an erase block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum BlockStatus {
    /// Usable.
    Ok,
    /// Marked bad at the factory or at runtime.
    Failed,
}

impl BlockStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, BlockStatus::Ok)
    }

    pub fn is_bad(&self) -> bool {
        matches!(self, BlockStatus::Failed)
    }
}

/// Page-granularity NAND flash.
///
/// One page is `PAGE_SIZE` data bytes followed by `SPARE_SIZE` spare bytes;
/// column addresses run over the whole layout, so the spare area is reached
/// by reading or writing at column `PAGE_SIZE`. By convention the first
/// spare byte of page 0 of each block is the factory/runtime bad-block
/// marker (0xFF = good).
///
/// Read operations report the on-chip ECC outcome as an [EccStatus] on
/// success; only transport failures and failed program/erase operations are
/// `Err`. Callers get best-effort bytes even for [EccStatus::Failed].
pub trait NandFlash: ErrorType {
    /// Data bytes per page.
    const PAGE_SIZE: usize;

    /// Spare bytes per page, beyond the data area.
    const SPARE_SIZE: usize;

    /// Pages per erase block. Must be a power of two.
    const PAGES_PER_BLOCK: usize;

    /// Number of erase blocks.
    const BLOCK_COUNT: usize;

    /// Bit offset of the block number within a linear page address.
    const LOG2_PAGES_PER_BLOCK: u32 = (Self::PAGES_PER_BLOCK as u32).trailing_zeros();

    /// Total pages on the device.
    const PAGE_COUNT: usize = Self::PAGES_PER_BLOCK * Self::BLOCK_COUNT;

    /// Bits of a linear page address selecting the plane.
    const PLANE_MASK: u32 = 0;

    /// Bits of a linear page address selecting the die.
    const DIE_MASK: u32 = 0;

    /// Read `bytes.len()` bytes of a page starting at `column`.
    ///
    /// The buffer is filled regardless of the ECC outcome so callers can
    /// inspect best-effort bytes after an uncorrectable error.
    fn read_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &mut [u8],
    ) -> Result<EccStatus, Self::Error>;

    /// Program part of a page starting at `column`.
    ///
    /// The page must have been erased since it was last programmed.
    fn write_page(
        &mut self,
        page: PageIndex,
        column: ColumnAddress,
        bytes: &[u8],
    ) -> Result<(), Self::Error>;

    /// Erase a block. All bytes of all its pages read 0xFF afterwards.
    fn erase_block(&mut self, block: BlockIndex) -> Result<(), Self::Error>;

    /// Copy a page to another using the chip's internal cache, without a
    /// round trip over the bus. Returns the ECC outcome of the source read;
    /// an uncorrectable source aborts the copy with an error.
    fn copy_page(&mut self, src: PageIndex, dst: PageIndex) -> Result<EccStatus, Self::Error>;

    /// Check the block's bad-block marker.
    fn block_status(&mut self, block: BlockIndex) -> Result<BlockStatus, Self::Error>;

    /// Check if the block is marked as bad.
    fn block_is_bad(&mut self, block: BlockIndex) -> Result<bool, Self::Error> {
        Ok(self.block_status(block)?.is_bad())
    }

    /// Mark the block as bad.
    fn mark_block_bad(&mut self, block: BlockIndex) -> Result<(), Self::Error>;

    /// Total pages on the device.
    fn page_count(&self) -> u32 {
        Self::PAGE_COUNT as u32
    }

    /// Total data capacity in bytes, spare areas excluded.
    fn capacity(&self) -> u32 {
        (Self::PAGE_COUNT * Self::PAGE_SIZE) as u32
    }
}

/// A one-page staging buffer with a cache tag.
///
/// Drivers stage full pages (data + spare) in RAM and remember which page
/// the buffer mirrors, letting callers with clustered access patterns skip
/// repeat reads. Writers assemble a page image in the buffer and program it
/// in one pass with [PageCache::program_cached]. The buffer is owned by the
/// driver and shared with exactly one caller at a time; it is not a
/// concurrent cache.
pub trait PageCache: NandFlash {
    /// Page the staging buffer currently mirrors, if any.
    fn cached_page(&self) -> Option<PageIndex>;

    /// Forget the staged page without touching the media.
    fn drop_cached_page(&mut self);

    /// Read a full page (data + spare) into the staging buffer and tag it.
    ///
    /// On [EccStatus::Failed] the buffer holds the raw bytes but the tag is
    /// cleared, so suspect data is never served as a cache hit.
    fn load_page(&mut self, page: PageIndex) -> Result<EccStatus, Self::Error>;

    /// Contents of the staging buffer (full page layout). Mirrors the media
    /// only while [PageCache::cached_page] is `Some`.
    fn cached_bytes(&self) -> &[u8];

    /// Mutable contents of the staging buffer, for assembling a page image
    /// before [PageCache::program_cached].
    fn cached_bytes_mut(&mut self) -> &mut [u8];

    /// Program the staged bytes to `dst` in one program cycle and re-tag
    /// the buffer with `dst`.
    fn program_cached(&mut self, dst: PageIndex) -> Result<(), Self::Error>;
}

/// Return whether a page-level access is within bounds of the layout.
pub fn check_page_access<T: NandFlash>(
    page: PageIndex,
    column: ColumnAddress,
    length: usize,
) -> Result<(), NandErrorKind> {
    if page.as_u32() >= T::PAGE_COUNT as u32 {
        return Err(NandErrorKind::OutOfBounds);
    }
    if column.as_u16() as usize + length > T::PAGE_SIZE + T::SPARE_SIZE {
        return Err(NandErrorKind::OutOfBounds);
    }
    Ok(())
}

/// Return whether a block index is within bounds.
pub fn check_block<T: NandFlash>(block: BlockIndex) -> Result<(), NandErrorKind> {
    if block.as_u16() as usize >= T::BLOCK_COUNT {
        return Err(NandErrorKind::OutOfBounds);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_count_classification_boundaries() {
        // At the safe threshold: tolerated silently
        assert_eq!(EccStatus::from_bit_count(4, 4, 8), EccStatus::Ok);
        // One above safe: block should migrate
        assert_eq!(EccStatus::from_bit_count(5, 4, 8), EccStatus::Corrected);
        // At the correction limit: still corrected
        assert_eq!(EccStatus::from_bit_count(8, 4, 8), EccStatus::Corrected);
        // Beyond the correction limit: unrecoverable
        assert_eq!(EccStatus::from_bit_count(9, 4, 8), EccStatus::Failed);
    }

    #[test]
    fn zero_bits_is_clean() {
        assert_eq!(EccStatus::from_bit_count(0, 4, 8), EccStatus::Ok);
        assert!(EccStatus::Ok.is_usable());
        assert!(EccStatus::Corrected.is_usable());
        assert!(!EccStatus::Failed.is_usable());
    }
}
