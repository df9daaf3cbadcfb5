#![no_std]

//! Chip family definitions for [nand_spi::NandDevice].
//!
//! Each family is a zero-sized type carrying geometry, command and ECC
//! constants, selected at build time through the type system. The families
//! diverge in how they report ECC outcomes: Macronix MX35LF parts expose a
//! corrected-bit counter, Winbond W25N parts only a 2-bit status code.

pub mod macronix;
pub mod winbond;
