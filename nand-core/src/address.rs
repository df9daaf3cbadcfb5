use core::fmt::Display;
use core::ops::{Add, AddAssign};

/// Linear index of a page in the flash device.
///
/// Pages per block is a power of two, so a linear page address is the
/// concatenation (in binary) of a block number and the page number within
/// the block. The split point is the chip's `log2(pages per block)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageIndex(u32);

impl PageIndex {
    pub const fn new(index: u32) -> Self {
        PageIndex(index)
    }

    /// Compose a linear page address from a block and an in-block page.
    ///
    /// `page` is taken modulo `1 << log2_ppb`. No range validation is
    /// performed here; geometry checks are the caller's responsibility.
    pub fn from_block_page(block: BlockIndex, page: u32, log2_ppb: u32) -> Self {
        PageIndex(((block.as_u16() as u32) << log2_ppb) | (page & ((1 << log2_ppb) - 1)))
    }

    /// Split a linear page address back into (block, in-block page).
    ///
    /// Exact inverse of [PageIndex::from_block_page] for all in-geometry
    /// pairs.
    pub fn split(self, log2_ppb: u32) -> (BlockIndex, u32) {
        (
            BlockIndex((self.0 >> log2_ppb) as u16),
            self.0 & ((1 << log2_ppb) - 1),
        )
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn inc(&mut self) {
        self.0 += 1;
    }

    pub fn block(self, log2_ppb: u32) -> BlockIndex {
        self.split(log2_ppb).0
    }
}

impl From<PageIndex> for u32 {
    fn from(pa: PageIndex) -> Self {
        pa.as_u32()
    }
}

impl Display for PageIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Index of an erase block in the flash device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockIndex(pub(crate) u16);

impl BlockIndex {
    pub const fn new(index: u16) -> Self {
        BlockIndex(index)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Linear address of the first page of this block.
    pub fn first_page(&self, log2_ppb: u32) -> PageIndex {
        PageIndex((self.0 as u32) << log2_ppb)
    }
}

impl From<BlockIndex> for u16 {
    fn from(bi: BlockIndex) -> Self {
        bi.as_u16()
    }
}

impl Add<u16> for BlockIndex {
    type Output = Self;

    fn add(self, rhs: u16) -> Self::Output {
        BlockIndex(self.0 + rhs)
    }
}

impl AddAssign<u16> for BlockIndex {
    fn add_assign(&mut self, rhs: u16) {
        self.0 += rhs;
    }
}

impl Display for BlockIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Address of a byte within a page layout (data area plus spare area).
///
/// Columns `0..PAGE_SIZE` address the data region; `PAGE_SIZE..` address
/// the spare bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnAddress(pub(crate) u16);

impl ColumnAddress {
    pub const fn new(address: u16) -> Self {
        ColumnAddress(address)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl Display for ColumnAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
