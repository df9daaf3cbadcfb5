use nand_core::{ColumnAddress, PageIndex};

/// Size of one metadata record of the journal.
pub const META_SIZE: usize = 132;

/// Number of cache slots. Matches the journal's metadata-node fan-out and
/// is not tunable independently of it.
const SLOTS: usize = 11;

#[derive(Clone, Copy)]
struct Entry {
    valid: bool,
    page: PageIndex,
    column: ColumnAddress,
    last_used: u32,
    data: [u8; META_SIZE],
}

const EMPTY: Entry = Entry {
    valid: false,
    page: PageIndex::new(0),
    column: ColumnAddress::new(0),
    last_used: 0,
    data: [0; META_SIZE],
};

/// Fixed-capacity LRU cache of journal metadata records, keyed by
/// (page, column).
///
/// Metadata reads cluster heavily on a handful of pages while the journal
/// walks its radix structure; caching the records avoids most of the NAND
/// traffic. Everything is pre-allocated; a linear scan over the 11 slots is
/// cheaper than any indexing structure at this size.
///
/// Owned and mutated by the single writer task only.
pub struct MetaCache {
    entries: [Entry; SLOTS],
    hits: u32,
}

impl MetaCache {
    pub const fn new() -> Self {
        MetaCache {
            entries: [EMPTY; SLOTS],
            hits: 0,
        }
    }

    /// Bump the recency counter. On wrap every stamp is reset to zero
    /// first, so relative recency survives (everything ties, then reorders
    /// as entries get touched again).
    fn touch(&mut self) -> u32 {
        if self.hits == u32::MAX {
            for entry in &mut self.entries {
                entry.last_used = 0;
            }
            self.hits = 0;
        }
        self.hits += 1;
        self.hits
    }

    /// Look up the record at (page, column), refreshing its recency on a
    /// hit.
    pub fn get(&mut self, page: PageIndex, column: ColumnAddress) -> Option<&[u8; META_SIZE]> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.valid && e.page == page && e.column == column)?;
        let stamp = self.touch();
        self.entries[idx].last_used = stamp;
        Some(&self.entries[idx].data)
    }

    /// Insert or refresh the record at (page, column), evicting the least
    /// recently used entry when all slots are taken.
    ///
    /// `data` must be exactly [META_SIZE] bytes.
    pub fn set(&mut self, page: PageIndex, column: ColumnAddress, data: &[u8]) {
        debug_assert_eq!(data.len(), META_SIZE);
        // A key is never present twice: reuse its slot, then any free one,
        // then the globally least recently used
        let idx = self
            .entries
            .iter()
            .position(|e| e.valid && e.page == page && e.column == column)
            .or_else(|| self.entries.iter().position(|e| !e.valid))
            .unwrap_or_else(|| {
                let mut lru = 0;
                for (i, entry) in self.entries.iter().enumerate() {
                    if entry.last_used < self.entries[lru].last_used {
                        lru = i;
                    }
                }
                lru
            });
        let stamp = self.touch();
        let entry = &mut self.entries[idx];
        entry.valid = true;
        entry.page = page;
        entry.column = column;
        entry.last_used = stamp;
        entry.data.copy_from_slice(data);
    }

    /// Drop every entry whose page matches `page` with the low `mask` bits
    /// ignored. `mask == 0` drops one page's entries; `mask == pages per
    /// block - 1` drops a whole block's in one call.
    pub fn invalidate(&mut self, page: PageIndex, mask: u32) {
        for entry in &mut self.entries {
            if entry.valid && (entry.page.as_u32() & !mask) == (page.as_u32() & !mask) {
                entry.valid = false;
            }
        }
    }
}

impl Default for MetaCache {
    fn default() -> Self {
        Self::new()
    }
}
