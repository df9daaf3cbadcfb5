#![no_std]
// Must be first to share macros across crate
pub(crate) mod fmt;

mod adapter;
pub mod cache;
pub mod disk;
pub mod hint;

pub use adapter::FtlAdapter;
pub use cache::{MetaCache, META_SIZE};
pub use disk::{DiskError, FlashDisk, FtlMap};
pub use hint::RelocationHint;

/// Errors of the journal callback contract.
///
/// `EccWarning` is deliberately not fatal: the operation completed and the
/// data is valid, but the source block is failing and its contents should
/// be relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FtlError {
    /// The block failed during erase or program, or is marked bad. The
    /// journal relocates the data and retires the block.
    #[error("bad block")]
    BadBlock,
    /// Uncorrectable ECC error; the data is lost.
    #[error("uncorrectable ECC error")]
    Ecc,
    /// Operation succeeded, but enough bits were corrected that the block
    /// should be migrated.
    #[error("ECC corrected above the safe threshold")]
    EccWarning,
    /// Transport failure underneath the NAND driver.
    #[error("I/O error")]
    Io,
}

/// The callback contract the external log-structured journal/map drives.
///
/// Pages are indexed linearly starting at 0. The number of pages per erase
/// block is a power of two, so a page number is the concatenation (in
/// binary) of a block number and the page number within the block. Blocks
/// are indexed starting at 0.
///
/// The journal programs pages sequentially within a block and never
/// reprograms a page before the block is erased.
pub trait FtlNand {
    /// Base-2 logarithm of the page size in bytes.
    fn log2_page_size(&self) -> u8;

    /// Base-2 logarithm of the number of pages per erase block.
    fn log2_pages_per_block(&self) -> u8;

    /// Total number of erase blocks.
    fn num_blocks(&self) -> u32;

    /// Is the given block bad?
    fn is_bad(&mut self, block: u32) -> bool;

    /// Mark the given block as bad (or attempt to). No return value:
    /// there is nothing to be done if it fails.
    fn mark_bad(&mut self, block: u32);

    /// Erase the given block. An erase that the chip reports as failed
    /// must come back as [FtlError::BadBlock].
    fn erase(&mut self, block: u32) -> Result<(), FtlError>;

    /// Program a full page. A program that the chip reports as failed must
    /// come back as [FtlError::BadBlock].
    fn prog(&mut self, page: u32, data: &[u8]) -> Result<(), FtlError>;

    /// Has the given page not been programmed since the last erase of its
    /// block?
    fn is_free(&mut self, page: u32) -> bool;

    /// Read a portion of a page, ECC included. An uncorrectable error is
    /// [FtlError::Ecc]; a corrected-above-threshold read fills `data` with
    /// valid bytes and reports [FtlError::EccWarning].
    fn read(
        &mut self,
        page: u32,
        offset: usize,
        length: usize,
        data: &mut [u8],
    ) -> Result<(), FtlError>;

    /// Read a page from one location and program it to another, through
    /// the chip's internal cache where the geometry allows. ECC applies to
    /// the source read as for [FtlNand::read].
    fn copy(&mut self, src: u32, dst: u32) -> Result<(), FtlError>;
}
