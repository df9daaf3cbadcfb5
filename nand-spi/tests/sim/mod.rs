//! A wire-level SPI NAND simulator.
//!
//! Implements [embedded_hal::spi::SpiDevice] and decodes the actual byte
//! stream the codec produces: commands, MSB-first addresses, feature
//! registers, the busy bit and the cache register. Driver tests therefore
//! exercise the full encode path, not a shortcut around it.

use std::collections::{HashMap, HashSet};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorType, Operation, SpiDevice};

const STATUS_BUSY: u8 = 0x01;
const STATUS_WEL: u8 = 0x02;
const STATUS_ERASE_FAIL: u8 = 0x04;
const STATUS_PROGRAM_FAIL: u8 = 0x08;
const CONFIG_ECC_ENABLE: u8 = 0x10;

const REG_PROTECTION: u8 = 0xA0;
const REG_CONFIGURATION: u8 = 0xB0;
const REG_STATUS: u8 = 0xC0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The simulator saw a byte sequence no chip would accept.
    Protocol,
}

impl spi::Error for SimError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// ECC outcome to report for a page on its next load.
#[derive(Debug, Clone, Copy, Default)]
pub struct EccInject {
    /// ECCS code placed in status bits 5:4.
    pub code: u8,
    /// Corrected-bit count returned by the 0x7C command.
    pub bits: u8,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimStats {
    pub resets: u32,
    pub page_loads: u32,
    pub programs: u32,
    pub erases: u32,
    /// Page loads issued while the on-chip ECC was disabled.
    pub raw_loads_ecc_off: u32,
}

pub struct SpiNandSim {
    page_size: usize,
    layout_size: usize,
    log2_ppb: u32,
    page_count: u32,
    mem: Vec<u8>,
    /// The chip's cache register.
    cache: Vec<u8>,
    jedec: [u8; 3],
    protection: u8,
    configuration: u8,
    status: u8,
    /// Status reads left that still report busy.
    busy_reads: u8,
    /// Corrected-bit count of the last load.
    ecc_bits: u8,
    inject: HashMap<u32, EccInject>,
    program_fail_blocks: HashSet<u32>,
    erase_fail_blocks: HashSet<u32>,
    pub powered_down: bool,
    pub stats: SimStats,
}

impl SpiNandSim {
    /// A powered-on chip: block protection engaged, ECC enabled, memory
    /// erased.
    pub fn new(
        page_size: usize,
        spare_size: usize,
        pages_per_block: usize,
        blocks: usize,
        jedec: [u8; 3],
    ) -> Self {
        let layout_size = page_size + spare_size;
        SpiNandSim {
            page_size,
            layout_size,
            log2_ppb: pages_per_block.trailing_zeros(),
            page_count: (blocks * pages_per_block) as u32,
            mem: vec![0xFF; blocks * pages_per_block * layout_size],
            cache: vec![0xFF; layout_size],
            jedec,
            protection: 0x38,
            configuration: CONFIG_ECC_ENABLE,
            status: 0,
            busy_reads: 0,
            ecc_bits: 0,
            inject: HashMap::new(),
            program_fail_blocks: HashSet::new(),
            erase_fail_blocks: HashSet::new(),
            powered_down: false,
            stats: SimStats::default(),
        }
    }

    pub fn inject_ecc(&mut self, page: u32, inject: EccInject) {
        self.inject.insert(page, inject);
    }

    pub fn fail_programs(&mut self, block: u32) {
        self.program_fail_blocks.insert(block);
    }

    pub fn fail_erases(&mut self, block: u32) {
        self.erase_fail_blocks.insert(block);
    }

    pub fn configuration(&self) -> u8 {
        self.configuration
    }

    pub fn protection(&self) -> u8 {
        self.protection
    }

    fn page_offset(&self, page: u32) -> usize {
        page as usize * self.layout_size
    }

    fn feature(&mut self, reg: u8) -> u8 {
        match reg {
            REG_PROTECTION => self.protection,
            REG_CONFIGURATION => self.configuration,
            REG_STATUS => {
                let mut status = self.status;
                if self.busy_reads > 0 {
                    self.busy_reads -= 1;
                    status |= STATUS_BUSY;
                }
                status
            }
            _ => 0,
        }
    }

    fn set_feature(&mut self, reg: u8, value: u8) {
        match reg {
            REG_PROTECTION => self.protection = value,
            REG_CONFIGURATION => self.configuration = value,
            _ => {}
        }
    }

    fn page_load(&mut self, page: u32) -> Result<(), SimError> {
        if page >= self.page_count {
            return Err(SimError::Protocol);
        }
        self.stats.page_loads += 1;
        let offset = self.page_offset(page);
        self.cache
            .copy_from_slice(&self.mem[offset..offset + self.layout_size]);
        self.busy_reads = 1;
        self.status &= !0x30;
        self.ecc_bits = 0;
        if self.configuration & CONFIG_ECC_ENABLE == 0 {
            // Raw read: no correction, no status
            self.stats.raw_loads_ecc_off += 1;
        } else if let Some(inject) = self.inject.get(&page) {
            self.status |= (inject.code & 0x03) << 4;
            self.ecc_bits = inject.bits;
        }
        Ok(())
    }

    fn program_execute(&mut self, page: u32) -> Result<(), SimError> {
        if page >= self.page_count {
            return Err(SimError::Protocol);
        }
        self.stats.programs += 1;
        self.busy_reads = 1;
        self.status &= !(STATUS_PROGRAM_FAIL | STATUS_WEL);
        if self.program_fail_blocks.contains(&(page >> self.log2_ppb)) {
            self.status |= STATUS_PROGRAM_FAIL;
            return Ok(());
        }
        let offset = self.page_offset(page);
        for (cell, byte) in self.mem[offset..offset + self.layout_size]
            .iter_mut()
            .zip(self.cache.iter())
        {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase(&mut self, page: u32) -> Result<(), SimError> {
        if page >= self.page_count {
            return Err(SimError::Protocol);
        }
        self.stats.erases += 1;
        self.busy_reads = 2;
        self.status &= !(STATUS_ERASE_FAIL | STATUS_WEL);
        let block = page >> self.log2_ppb;
        if self.erase_fail_blocks.contains(&block) {
            self.status |= STATUS_ERASE_FAIL;
            return Ok(());
        }
        let block_bytes = (1usize << self.log2_ppb) * self.layout_size;
        let offset = block as usize * block_bytes;
        self.mem[offset..offset + block_bytes].fill(0xFF);
        // Erased pages read clean again
        let first = block << self.log2_ppb;
        for page in first..first + (1 << self.log2_ppb) {
            self.inject.remove(&page);
        }
        Ok(())
    }

    fn exec_command(&mut self, cmd: &[u8]) -> Result<(), SimError> {
        match cmd[0] {
            0xFF => {
                self.stats.resets += 1;
                self.status = 0;
                self.busy_reads = 1;
                Ok(())
            }
            0x06 => {
                self.status |= STATUS_WEL;
                Ok(())
            }
            0x04 => {
                self.status &= !STATUS_WEL;
                Ok(())
            }
            0x1F if cmd.len() == 3 => {
                self.set_feature(cmd[1], cmd[2]);
                Ok(())
            }
            0x13 if cmd.len() == 4 => self.page_load(address24(cmd)),
            0x10 if cmd.len() == 4 => {
                if self.status & STATUS_WEL == 0 {
                    self.status |= STATUS_PROGRAM_FAIL;
                    return Ok(());
                }
                self.program_execute(address24(cmd))
            }
            0xD8 if cmd.len() == 4 => {
                if self.status & STATUS_WEL == 0 {
                    self.status |= STATUS_ERASE_FAIL;
                    return Ok(());
                }
                self.erase(address24(cmd))
            }
            0xB9 => {
                self.powered_down = true;
                Ok(())
            }
            0xAB => {
                self.powered_down = false;
                Ok(())
            }
            _ => Err(SimError::Protocol),
        }
    }
}

fn address24(cmd: &[u8]) -> u32 {
    ((cmd[1] as u32) << 16) | ((cmd[2] as u32) << 8) | cmd[3] as u32
}

fn column16(cmd: &[u8]) -> usize {
    (((cmd[1] as u16) << 8) | cmd[2] as u16) as usize
}

impl ErrorType for SpiNandSim {
    type Error = SimError;
}

impl SpiDevice for SpiNandSim {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        match operations {
            // Single-write commands
            [Operation::Write(cmd)] => self.exec_command(cmd),
            // Read from cache: command + column + dummy, then data out
            [Operation::Write(cmd), Operation::Read(buf)] if cmd[0] == 0x03 && cmd.len() == 4 => {
                let column = column16(cmd);
                buf.copy_from_slice(&self.cache[column..column + buf.len()]);
                Ok(())
            }
            // Program load: command + column, then data in
            [Operation::Write(cmd), Operation::Write(data)]
                if (cmd[0] == 0x02 || cmd[0] == 0x84) && cmd.len() == 3 =>
            {
                if cmd[0] == 0x02 {
                    self.cache.fill(0xFF);
                }
                let column = column16(cmd);
                self.cache[column..column + data.len()].copy_from_slice(data);
                Ok(())
            }
            // Register-style exchanges
            [Operation::TransferInPlace(buf)] => match (buf[0], buf.len()) {
                (0x0F, 3) => {
                    buf[2] = self.feature(buf[1]);
                    Ok(())
                }
                (0x9F, 5) => {
                    buf[2..5].copy_from_slice(&self.jedec);
                    Ok(())
                }
                (0x7C, 3) => {
                    buf[2] = self.ecc_bits;
                    Ok(())
                }
                _ => Err(SimError::Protocol),
            },
            _ => Err(SimError::Protocol),
        }
    }
}

/// Delay provider for tests: time does not pass, the simulator's busy
/// countdown drives the poll loops instead.
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
