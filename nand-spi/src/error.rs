use core::fmt::Debug;
use nand_core::{NandErrorKind, NandFlashError};

/// Error type of the SPI NAND driver.
///
/// Generic over the SPI error type `SE` so any
/// [`embedded_hal::spi::SpiDevice`] implementation can sit underneath.
///
/// ECC outcomes of a read are not errors at this layer: reads return an
/// [`nand_core::EccStatus`] on success and callers apply policy. The one
/// exception is an uncorrectable source page during an internal copy, which
/// aborts before anything is programmed.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiNandError<SE> {
    /// Error from the SPI bus. Fatal to the current operation, never
    /// retried here.
    #[error("SPI bus error: {0}")]
    Bus(SE),
    /// Block erase failed. The block has likely failed, or write-enable or
    /// block protection got in the way.
    #[error("erase failed")]
    EraseFailed,
    /// Page program failed. The block has likely failed, or write-enable
    /// or block protection got in the way.
    #[error("program failed")]
    ProgramFailed,
    /// Source page was uncorrectable during an internal copy; nothing was
    /// programmed.
    #[error("uncorrectable ECC error on copy source")]
    EccFailed,
    /// The chip did not identify as the expected part.
    #[error("unexpected JEDEC id")]
    IdMismatch,
    /// Requested bytes out of bounds.
    #[error("requested bytes out of bounds")]
    OutOfBounds,
    /// Other error. Should not happen.
    #[error("other error")]
    Other,
}

impl<SE: Debug> NandFlashError for SpiNandError<SE> {
    fn kind(&self) -> NandErrorKind {
        match self {
            SpiNandError::Bus(_) => NandErrorKind::Bus,
            SpiNandError::EraseFailed => NandErrorKind::BadBlock(None),
            SpiNandError::ProgramFailed => NandErrorKind::BadBlock(None),
            SpiNandError::EccFailed => NandErrorKind::EccFailed,
            SpiNandError::IdMismatch => NandErrorKind::Other,
            SpiNandError::OutOfBounds => NandErrorKind::OutOfBounds,
            SpiNandError::Other => NandErrorKind::Other,
        }
    }
}

// Auto conversion from the bounds-check helpers
impl<SE> From<NandErrorKind> for SpiNandError<SE> {
    fn from(kind: NandErrorKind) -> Self {
        match kind {
            NandErrorKind::OutOfBounds => SpiNandError::OutOfBounds,
            _ => SpiNandError::Other,
        }
    }
}
