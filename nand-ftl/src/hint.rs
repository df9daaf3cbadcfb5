use core::sync::atomic::{AtomicBool, Ordering};

/// One-shot signal that a read hit a correctable-but-risky ECC event and a
/// relocation pass should run.
///
/// Any task or interrupt may [RelocationHint::set]; exactly one consumer
/// task calls [RelocationHint::take], typically after each write cycle.
/// `take` reads and clears in one atomic swap with acquire ordering against
/// the release store of `set`, so a signal raised concurrently with a
/// `take` is either observed by that `take` or left pending for the next,
/// never dropped. Two `set`s with no `take` in between coalesce into one,
/// which is fine: a single relocation pass serves both.
pub struct RelocationHint(AtomicBool);

impl RelocationHint {
    /// A cleared hint, usable in a `static`.
    pub const fn new() -> Self {
        RelocationHint(AtomicBool::new(false))
    }

    /// Raise the hint.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the hint, returning whether it was raised since the last
    /// `take`.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Acquire)
    }
}

impl Default for RelocationHint {
    fn default() -> Self {
        Self::new()
    }
}
