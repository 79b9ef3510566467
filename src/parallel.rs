//! Fork-join scheduling shims.
//!
//! The crate expresses all of its parallelism through two shapes: run two
//! closures side by side ([`par_do`]), or run a half-open index range with a
//! caller-chosen grain ([`parallel_for`]). Both bottom out in rayon's
//! work-stealing pool, which is free to run everything sequentially; no code
//! in this crate depends on true concurrency for correctness.

use rayon::prelude::*;

/// Executes `left` and `right`, possibly in parallel, and returns both
/// results. All writes performed by either closure are visible to the caller
/// once `par_do` returns.
pub fn par_do<A, B, RA, RB>(left: A, right: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(left, right)
}

/// Runs `body(i)` for every `i` in `lo..hi`, scheduling iterations in chunks
/// of at least `grain` so that tiny bodies amortize their scheduling cost.
pub fn parallel_for<F>(lo: usize, hi: usize, body: F, grain: usize)
where
    F: Fn(usize) + Send + Sync,
{
    (lo..hi)
        .into_par_iter()
        .with_min_len(grain.max(1))
        .for_each(|i| body(i));
}

/// Runs `body(i, start, end)` for each `block_size`-sized slice of `0..n` in
/// parallel. The last slice may be short.
pub(crate) fn sliced_for<F>(n: usize, block_size: usize, body: F)
where
    F: Fn(usize, usize, usize) + Send + Sync,
{
    let num_slices = n.div_ceil(block_size);
    parallel_for(
        0,
        num_slices,
        |i| {
            let start = i * block_size;
            let end = usize::min(start + block_size, n);
            body(i, start, end);
        },
        1,
    );
}

/// A raw base pointer that may cross thread boundaries.
///
/// Every parallel phase in this crate hands each task a disjoint region of a
/// single allocation. The wrapper carries the base address into the task
/// closures; each task only ever touches its own offsets.
pub(crate) struct Shared<T>(pub(crate) *mut T);

impl<T> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    /// Pointer to cell `i`.
    ///
    /// # Safety
    ///
    /// `i` must stay within the allocation the base pointer came from.
    #[inline]
    pub(crate) unsafe fn at(self, i: usize) -> *mut T {
        unsafe { self.0.add(i) }
    }
}
