use nand_core::sim::SimNandFlash;
use nand_core::{BlockIndex, ColumnAddress, EccStatus, NandFlash, PageCache, PageIndex};
use nand_ftl::{FtlAdapter, FtlError, FtlNand, RelocationHint, META_SIZE};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

// Adds logging to the test automatically
// control with RUST_LOG="LEVEL"
// requires --features log passed to cargo test
use test_log::test;

const PAGE: usize = 256;
const LAYOUT: usize = 272;
const PPB: usize = 8;
const BLOCKS: usize = 32;

type Sim = SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS>;
// Same geometry with the plane selected by the lowest block-address bit
type SimTwoPlane = SimNandFlash<PAGE, LAYOUT, PPB, BLOCKS, 8>;

fn hint() -> &'static RelocationHint {
    Box::leak(Box::new(RelocationHint::new()))
}

fn page_pattern(seed: u64) -> [u8; PAGE] {
    let mut data = [0u8; PAGE];
    SmallRng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

#[test]
fn geometry_matches_the_chip() {
    let ftl = FtlAdapter::new(Sim::new(), hint());
    assert_eq!(ftl.log2_page_size(), 8);
    assert_eq!(ftl.log2_pages_per_block(), 3);
    assert_eq!(ftl.num_blocks(), 32);
}

#[test]
fn erase_prog_seal_cycle() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    ftl.erase(5).unwrap();
    for page in 40..48 {
        assert!(ftl.is_free(page), "page {} after erase", page);
    }

    let data = page_pattern(1);
    ftl.prog(40, &data).unwrap();
    assert!(!ftl.is_free(40));
    assert!(ftl.is_free(41));

    let mut back = [0u8; PAGE];
    ftl.read(40, 0, PAGE, &mut back).unwrap();
    assert_eq!(back, data);

    // prog appended the not-bad and seal bytes to the spare area
    let mut spare = [0u8; 2];
    ftl.nand_mut()
        .read_page(PageIndex::new(40), ColumnAddress::new(PAGE as u16), &mut spare)
        .unwrap();
    assert_eq!(spare, [0xFF, 0x00]);
}

#[test]
fn prog_on_first_page_keeps_block_good() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    ftl.erase(0).unwrap();
    ftl.prog(0, &page_pattern(2)).unwrap();
    // spare byte 0 stayed 0xFF, so the block does not read as retired
    assert!(!ftl.is_bad(0));
}

#[test]
fn bad_block_marking_round_trip() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    assert!(!ftl.is_bad(3));
    ftl.mark_bad(3);
    assert!(ftl.is_bad(3));
}

#[test]
fn failed_erase_reports_bad_block() {
    let mut sim = Sim::new();
    sim.set_erase_fail(BlockIndex::new(7), true);
    let mut ftl = FtlAdapter::new(sim, hint());
    assert_eq!(ftl.erase(7), Err(FtlError::BadBlock));
}

#[test]
fn failed_prog_reports_bad_block() {
    let mut sim = Sim::new();
    sim.set_program_fail(BlockIndex::new(2), true);
    let mut ftl = FtlAdapter::new(sim, hint());
    assert_eq!(ftl.prog(16, &page_pattern(3)), Err(FtlError::BadBlock));
}

#[test]
fn metadata_reads_come_from_the_caches() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    let mut data = page_pattern(4);
    data[..META_SIZE].copy_from_slice(&[0xC3; META_SIZE]);
    ftl.prog(16, &data).unwrap();
    ftl.nand_mut().drop_cached_page();

    // First lookup goes to the media and pulls the whole page in
    let mut record = [0u8; META_SIZE];
    ftl.read(16, 0, META_SIZE, &mut record).unwrap();
    assert_eq!(record, [0xC3; META_SIZE]);
    let reads = ftl.nand_mut().stats.page_reads;

    // Repeat lookup is served by the LRU cache
    let mut again = [0u8; META_SIZE];
    ftl.read(16, 0, META_SIZE, &mut again).unwrap();
    assert_eq!(again, record);
    assert_eq!(ftl.nand_mut().stats.page_reads, reads);

    // A lookup elsewhere in the same page hits the staging buffer
    let mut other = [0u8; META_SIZE];
    ftl.read(16, 100, META_SIZE, &mut other).unwrap();
    assert_eq!(ftl.nand_mut().stats.page_reads, reads);
    assert_eq!(&other[..], &data[100..100 + META_SIZE]);
}

#[test]
fn erase_invalidates_both_caches() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    let mut data = page_pattern(5);
    data[..META_SIZE].copy_from_slice(&[0x42; META_SIZE]);
    ftl.prog(16, &data).unwrap();
    ftl.nand_mut().drop_cached_page();

    let mut record = [0u8; META_SIZE];
    ftl.read(16, 0, META_SIZE, &mut record).unwrap();

    // Page 16 lives in block 2; after the erase nothing stale may serve
    ftl.erase(2).unwrap();
    let reads = ftl.nand_mut().stats.page_reads;
    ftl.read(16, 0, META_SIZE, &mut record).unwrap();
    assert!(ftl.nand_mut().stats.page_reads > reads);
    assert_eq!(record, [0xFF; META_SIZE]);
}

#[test]
fn corrected_read_warns_and_raises_the_hint() {
    let hint = hint();
    let mut ftl = FtlAdapter::new(Sim::new(), hint);
    let data = page_pattern(6);
    ftl.prog(24, &data).unwrap();
    ftl.nand_mut().drop_cached_page();
    ftl.nand_mut().set_page_ecc(PageIndex::new(24), EccStatus::Corrected);

    let mut back = [0u8; PAGE];
    assert_eq!(ftl.read(24, 0, PAGE, &mut back), Err(FtlError::EccWarning));
    // the warning is not a failure: the data is valid
    assert_eq!(back, data);
    assert!(hint.take());
    assert!(!hint.take());
}

#[test]
fn uncorrectable_read_is_a_hard_error() {
    let hint = hint();
    let mut ftl = FtlAdapter::new(Sim::new(), hint);
    ftl.prog(25, &page_pattern(7)).unwrap();
    ftl.nand_mut().drop_cached_page();
    ftl.nand_mut().set_page_ecc(PageIndex::new(25), EccStatus::Failed);

    let mut back = [0u8; PAGE];
    assert_eq!(ftl.read(25, 0, PAGE, &mut back), Err(FtlError::Ecc));
    assert!(!hint.take());
}

#[test]
fn same_plane_copy_uses_the_chip() {
    let mut ftl = FtlAdapter::new(Sim::new(), hint());
    let data = page_pattern(8);
    ftl.prog(8, &data).unwrap();
    ftl.copy(8, 16).unwrap();
    assert_eq!(ftl.nand_mut().stats.page_copies, 1);

    assert!(!ftl.is_free(16));
    let mut back = [0u8; PAGE];
    ftl.read(16, 0, PAGE, &mut back).unwrap();
    assert_eq!(back, data);
}

#[test]
fn cross_plane_copy_goes_through_ram_and_reseals() {
    let mut ftl = FtlAdapter::new(SimTwoPlane::new(), hint());
    let data = page_pattern(9);
    // blocks 1 and 2 differ in the plane bit
    ftl.prog(8, &data).unwrap();
    ftl.copy(8, 16).unwrap();
    assert_eq!(ftl.nand_mut().stats.page_copies, 0);

    let mut back = [0u8; PAGE];
    ftl.read(16, 0, PAGE, &mut back).unwrap();
    assert_eq!(back, data);
    let mut spare = [0u8; 2];
    ftl.nand_mut()
        .read_page(PageIndex::new(16), ColumnAddress::new(PAGE as u16), &mut spare)
        .unwrap();
    assert_eq!(spare, [0xFF, 0x00]);
}

#[test]
fn copy_surfaces_ecc_outcomes() {
    let hint = hint();
    let mut ftl = FtlAdapter::new(Sim::new(), hint);
    let data = page_pattern(10);
    ftl.prog(8, &data).unwrap();

    // Corrected source: the copy completes, with a warning and the hint
    ftl.nand_mut().set_page_ecc(PageIndex::new(8), EccStatus::Corrected);
    assert_eq!(ftl.copy(8, 16), Err(FtlError::EccWarning));
    assert!(hint.take());
    let mut back = [0u8; PAGE];
    ftl.read(16, 0, PAGE, &mut back).unwrap();
    assert_eq!(back, data);

    // Uncorrectable source: hard error, nothing programmed
    ftl.nand_mut().set_page_ecc(PageIndex::new(8), EccStatus::Failed);
    assert_eq!(ftl.copy(8, 24), Err(FtlError::Ecc));
    assert!(ftl.is_free(24));
    assert!(!hint.take());
}
