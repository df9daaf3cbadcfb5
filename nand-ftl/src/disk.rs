use crate::FtlError;

/// Sector surface of the mounted journal/map, one sector per NAND page.
///
/// Implemented by the external map on top of [crate::FtlNand]; the disk
/// shim below is what the filesystem's disk-I/O layer talks to.
pub trait FtlMap {
    /// Bytes per sector. Equals the NAND page size.
    const SECTOR_SIZE: usize;

    /// Number of sectors the map can hold.
    fn capacity(&self) -> u32;

    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> Result<(), FtlError>;

    fn write_sector(&mut self, sector: u32, buf: &[u8]) -> Result<(), FtlError>;

    /// Flush journal state to the media.
    fn sync(&mut self) -> Result<(), FtlError>;
}

/// Errors surfaced to the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiskError {
    /// Request not sector aligned or beyond the reported capacity.
    #[error("sector range out of bounds")]
    OutOfRange,
    /// The operation failed underneath; the filesystem sees a generic disk
    /// error.
    #[error("disk I/O error")]
    Io,
}

/// Block-device shim between the filesystem and the journal/map.
///
/// Reports less capacity than the map raw holds: blocks fail over the
/// device's lifetime and the journal needs spare room to relocate their
/// contents, so a fixed fraction is held back from the filesystem.
pub struct FlashDisk<M> {
    map: M,
}

impl<M: FtlMap> FlashDisk<M> {
    /// Fraction of raw capacity held back as bad-block headroom.
    const HEADROOM_DIV: u32 = 16;

    pub fn new(map: M) -> Self {
        FlashDisk { map }
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn into_inner(self) -> M {
        self.map
    }

    /// Bytes per sector.
    pub const fn sector_size() -> usize {
        M::SECTOR_SIZE
    }

    /// Sector count reported to the filesystem.
    pub fn sector_count(&self) -> u32 {
        let raw = self.map.capacity();
        raw - raw / Self::HEADROOM_DIV
    }

    fn check(&self, sector: u32, len: usize) -> Result<u32, DiskError> {
        if len % M::SECTOR_SIZE != 0 {
            return Err(DiskError::OutOfRange);
        }
        let count = (len / M::SECTOR_SIZE) as u32;
        if sector + count > self.sector_count() {
            return Err(DiskError::OutOfRange);
        }
        Ok(count)
    }

    /// Read whole sectors starting at `sector`.
    pub fn read(&mut self, sector: u32, buf: &mut [u8]) -> Result<(), DiskError> {
        self.check(sector, buf.len())?;
        for (i, chunk) in buf.chunks_mut(M::SECTOR_SIZE).enumerate() {
            match self.map.read_sector(sector + i as u32, chunk) {
                Ok(()) => {}
                // Corrected reads still return good data; the writer task
                // picks up the relocation hint later
                Err(FtlError::EccWarning) => {
                    debug!("ECC warning reading sector {}", sector + i as u32);
                }
                Err(_) => return Err(DiskError::Io),
            }
        }
        Ok(())
    }

    /// Write whole sectors starting at `sector`.
    pub fn write(&mut self, sector: u32, buf: &[u8]) -> Result<(), DiskError> {
        self.check(sector, buf.len())?;
        for (i, chunk) in buf.chunks(M::SECTOR_SIZE).enumerate() {
            match self.map.write_sector(sector + i as u32, chunk) {
                Ok(()) | Err(FtlError::EccWarning) => {}
                Err(_) => return Err(DiskError::Io),
            }
        }
        Ok(())
    }

    /// Flush pending journal state.
    pub fn sync(&mut self) -> Result<(), DiskError> {
        self.map.sync().map_err(|_| DiskError::Io)
    }
}
