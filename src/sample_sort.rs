//! Cache-oblivious parallel sample sort.
//!
//! The algorithm follows the low-depth cache-oblivious design of Blelloch,
//! Gibbons and Simhadri (SPAA 2010): split the input into about `sqrt(n)`
//! blocks, sort each block sequentially, count how each block distributes
//! over about `sqrt(n)` pivot-bounded buckets, relocate block-major data
//! into bucket-major order with one transpose, and finish each bucket with
//! the sequential base sort.
//!
//! Two variants share the machinery. [`sample_sort`] copies the input into
//! fresh storage and can be stable. [`sample_sort_inplace`] never copies an
//! element: it samples by swapping a pivot block to the front, relocate-sorts
//! blocks through a raw temporary, and transposes everything back into the
//! input storage, which makes it necessarily unstable.

use std::mem;
use std::slice;

use crate::parallel::{Shared, parallel_for, sliced_for};
use crate::relocate::{pointer_like, relocate_array};
use crate::seq_sort::{seq_sort_copy_into, seq_sort_inplace, seq_sort_relocate_into, to_ordering};
use crate::transpose::{Count, transpose_buckets};
use crate::uninit::UninitBuffer;
use crate::util::{hash64, log2_up};

/// Inputs below this size go straight to the sequential base sort.
const QUICKSORT_THRESHOLD: usize = 16_384;

/// Pivot candidates drawn per bucket by the copying variant.
const OVER_SAMPLE: usize = 8;

struct Geometry {
    num_blocks: usize,
    block_size: usize,
    num_buckets: usize,
}

/// Block and bucket shape for an input of `n` elements.
///
/// Larger quotients mean fewer, larger buckets: more comparisons in the
/// bucket-local finish, but less transpose overhead. Wide values and owning
/// handles shift toward more, smaller buckets. The block count rounds up to
/// a power of two, which keeps the transpose shape simple.
fn geometry<T>(n: usize) -> Geometry {
    let (bucket_quotient, block_quotient) = if pointer_like::<T>() {
        (2, 3)
    } else if mem::size_of::<T>() > 8 {
        (3, 3)
    } else {
        (4, 4)
    };
    let sqrt = n.isqrt();
    let num_blocks = 1 << log2_up(sqrt / block_quotient + 1);
    Geometry {
        num_blocks,
        block_size: n.div_ceil(num_blocks),
        num_buckets: sqrt / bucket_quotient + 1,
    }
}

/// Pivot cells shared read-only across the block pass.
struct Pivots<T> {
    ptrs: Vec<*const T>,
}

unsafe impl<T: Sync> Send for Pivots<T> {}
unsafe impl<T: Sync> Sync for Pivots<T> {}

impl<T> Pivots<T> {
    fn len(&self) -> usize {
        self.ptrs.len()
    }

    /// # Safety
    ///
    /// The cell behind pivot `i` must still hold a live value.
    unsafe fn get(&self, i: usize) -> &T {
        unsafe { &*self.ptrs[i] }
    }
}

/// Counts how many elements of one sorted block fall in each bucket.
///
/// Two-finger walk over the block and the sorted pivots, O(|block| +
/// |pivots|). Keys equal to a pivot belong to the bucket after it; when two
/// consecutive pivots compare equal, the walk fast-forwards the whole
/// equal-key run into that later bucket, so a block that begins with a value
/// equal to the first pivot counts into bucket 1, not bucket 0.
///
/// `counts` must hold one cell per bucket, i.e. `pivots.len() + 1`.
///
/// # Safety
///
/// All pivot cells must be live for the duration of the call.
unsafe fn get_bucket_counts<T, C, F>(block: &[T], pivots: &Pivots<T>, counts: &mut [C], less: &F)
where
    C: Count,
    F: Fn(&T, &T) -> bool,
{
    if block.is_empty() || pivots.len() == 0 {
        return;
    }
    for c in counts.iter_mut() {
        *c = C::ZERO;
    }
    let bump = |c: &mut C| *c = C::from_usize(c.as_usize() + 1);
    let (mut a, mut b, mut c) = (0, 0, 0);
    loop {
        while less(&block[a], unsafe { pivots.get(b) }) {
            bump(&mut counts[c]);
            a += 1;
            if a == block.len() {
                return;
            }
        }
        b += 1;
        c += 1;
        if b == pivots.len() {
            break;
        }
        if !less(unsafe { pivots.get(b - 1) }, unsafe { pivots.get(b) }) {
            // equal pivots: the run of keys equal to them skips ahead one bucket
            while !less(unsafe { pivots.get(b) }, &block[a]) {
                bump(&mut counts[c]);
                a += 1;
                if a == block.len() {
                    return;
                }
            }
            b += 1;
            c += 1;
            if b == pivots.len() {
                break;
            }
        }
    }
    counts[c] = C::from_usize(block.len() - a);
}

/// Copying engine. Writes the sorted permutation of `input` into the `n` raw
/// cells at `out`.
fn sample_sort_copying<C, T, F>(input: &[T], out: *mut T, less: &F, stable: bool)
where
    C: Count,
    T: Clone + Send + Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    let n = input.len();
    if n < QUICKSORT_THRESHOLD {
        unsafe { seq_sort_copy_into(input, out, less, stable) };
        return;
    }

    let Geometry { num_blocks, block_size, num_buckets } = geometry::<T>(n);
    let m = num_blocks * num_buckets;

    // oversampled pivot candidates, deterministic in the input
    let sample_set_size = num_buckets * OVER_SAMPLE;
    let mut sample_set: Vec<T> = (0..sample_set_size)
        .map(|i| input[hash64(i as u64) as usize % n].clone())
        .collect();
    sample_set.sort_unstable_by(|x, y| to_ordering(less, x, y));

    let pivot_values: Vec<T> = (0..num_buckets - 1)
        .map(|i| sample_set[OVER_SAMPLE * i].clone())
        .collect();
    let pivots = Pivots {
        ptrs: pivot_values.iter().map(|p| p as *const T).collect(),
    };

    let mut tmp = UninitBuffer::<T>::new(n);
    let mut counts = vec![C::ZERO; m + 1];

    // sort each block into Tmp and tally it against the pivots
    let tmp_base = Shared(tmp.as_mut_ptr());
    let counts_base = Shared(counts.as_mut_ptr());
    sliced_for(n, block_size, |i, start, end| unsafe {
        seq_sort_copy_into(&input[start..end], tmp_base.at(start), less, stable);
        let block = slice::from_raw_parts(tmp_base.at(start) as *const T, end - start);
        let row = slice::from_raw_parts_mut(counts_base.at(i * num_buckets), num_buckets);
        get_bucket_counts(block, &pivots, row, less);
    });

    let bucket_offsets = unsafe {
        transpose_buckets(
            tmp.as_mut_ptr(),
            out,
            &mut counts,
            n,
            block_size,
            num_blocks,
            num_buckets,
        )
    };

    // a bucket framed by two equal pivots holds a single key and is done
    let out_base = Shared(out);
    let offsets = &bucket_offsets;
    parallel_for(
        0,
        num_buckets,
        |i| {
            let needs_sort = i == 0
                || i == num_buckets - 1
                || unsafe { less(pivots.get(i - 1), pivots.get(i)) };
            if needs_sort {
                let bucket = unsafe {
                    slice::from_raw_parts_mut(out_base.at(offsets[i]), offsets[i + 1] - offsets[i])
                };
                seq_sort_inplace(bucket, less, stable);
            }
        },
        1,
    );
}

/// In-place engine for `n >= QUICKSORT_THRESHOLD`.
fn sample_sort_inplace_impl<C, T, F>(data: &mut [T], less: &F)
where
    C: Count,
    T: Send + Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    let n = data.len();
    let Geometry { num_blocks, block_size, num_buckets } = geometry::<T>(n);
    let m = num_blocks * num_buckets;

    // The sample occupies exactly one block, so the pivot stride needs the
    // block to cover the pivots.
    let sample_set_size = block_size;
    assert!(
        sample_set_size >= num_buckets - 1,
        "sample block too small for the pivot stride"
    );
    let stride = sample_set_size / (num_buckets - 1);
    debug_assert!(stride >= 1);

    // Partial Knuth shuffle: swap a uniform sample into the first block, so
    // sampling copies nothing.
    for i in 0..sample_set_size {
        let j = i + hash64(i as u64) as usize % (n - i);
        data.swap(i, j);
    }
    data[..sample_set_size].sort_unstable_by(|x, y| to_ordering(less, x, y));

    let base = Shared(data.as_mut_ptr());
    let pivots = Pivots {
        ptrs: (0..num_buckets - 1)
            .map(|i| unsafe { base.at(stride * i) } as *const T)
            .collect(),
    };

    let mut tmp = UninitBuffer::<T>::new(n);
    let mut counts = vec![C::ZERO; m + 1];
    let tmp_base = Shared(tmp.as_mut_ptr());
    let counts_base = Shared(counts.as_mut_ptr());

    // From here until the transpose lands, the values are split between the
    // input storage and Tmp; unwinding would hand the caller cells that were
    // already relocated out, so a panicking comparator is fatal.
    let guard = AbortOnUnwind;

    // every block but the sample block: relocate-sort into Tmp, then tally
    sliced_for(n - sample_set_size, block_size, |i, start, end| unsafe {
        let (start, end) = (start + sample_set_size, end + sample_set_size);
        seq_sort_relocate_into(base.at(start), tmp_base.at(start), end - start, less);
        let block = slice::from_raw_parts(tmp_base.at(start) as *const T, end - start);
        let row = slice::from_raw_parts_mut(counts_base.at((i + 1) * num_buckets), num_buckets);
        get_bucket_counts(block, &pivots, row, less);
    });

    // The sample block is already sorted: relocate it over verbatim, then
    // tally it with the pivots re-addressed inside Tmp (same cells, same
    // strides; their old home is raw now).
    unsafe {
        relocate_array(tmp_base.0, base.0 as *const T, sample_set_size);
        let pivots = Pivots {
            ptrs: (0..num_buckets - 1)
                .map(|i| tmp_base.at(stride * i) as *const T)
                .collect(),
        };
        let block = slice::from_raw_parts(tmp_base.0 as *const T, sample_set_size);
        let row = slice::from_raw_parts_mut(counts_base.0, num_buckets);
        get_bucket_counts(block, &pivots, row, less);
    }

    // everything returns to the input storage, bucket-major
    let bucket_offsets = unsafe {
        transpose_buckets(
            tmp.as_mut_ptr(),
            base.0,
            &mut counts,
            n,
            block_size,
            num_blocks,
            num_buckets,
        )
    };
    mem::forget(guard);

    // The pivots were merged back in with everything else, so no bucket can
    // be skipped as single-keyed here.
    let offsets = &bucket_offsets;
    parallel_for(
        0,
        num_buckets,
        |i| {
            let bucket = unsafe {
                slice::from_raw_parts_mut(base.at(offsets[i]), offsets[i + 1] - offsets[i])
            };
            seq_sort_inplace(bucket, less, false);
        },
        1,
    );
}

struct AbortOnUnwind;

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        // values are mid-relocation; no unwind can make them safe to drop
        std::process::abort();
    }
}

/// Sorts a slice into a newly allocated `Vec`, optionally stable.
///
/// `less` must be a pure strict weak order; it must not panic. The sampling
/// hash is fixed, so the same input always produces the same output. With
/// `stable == true`, elements that compare equal keep their input order.
///
/// # Examples
///
/// ```
/// use samplesort::sample_sort;
///
/// let sorted = sample_sort(&[3, 1, 4, 1, 5, 9, 2, 6], &|a: &i32, b: &i32| a < b, false);
/// assert_eq!(sorted, vec![1, 1, 2, 3, 4, 5, 6, 9]);
/// ```
///
/// Sorting by one field of a pair, stably:
///
/// ```
/// use samplesort::sample_sort;
///
/// let pairs = [(1, "a"), (0, "b"), (1, "c")];
/// let sorted = sample_sort(&pairs, &|a: &(i32, &str), b: &(i32, &str)| a.0 < b.0, true);
/// assert_eq!(sorted, vec![(0, "b"), (1, "a"), (1, "c")]);
/// ```
pub fn sample_sort<T, F>(input: &[T], less: F, stable: bool) -> Vec<T>
where
    T: Clone + Send + Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    let n = input.len();
    let mut out: Vec<T> = Vec::with_capacity(n);
    if n < u32::MAX as usize {
        sample_sort_copying::<u32, _, _>(input, out.as_mut_ptr(), &less, stable);
    } else {
        sample_sort_copying::<u64, _, _>(input, out.as_mut_ptr(), &less, stable);
    }
    // every cell of the spare capacity was written exactly once
    unsafe { out.set_len(n) };
    out
}

/// Sorts a slice in place without copying any element. Unstable.
///
/// The only storage proportional to the input is a raw temporary that
/// values are relocated through; no element is ever cloned. `less` must be
/// a pure strict weak order; a panicking comparator aborts the process
/// (values may be mid-relocation, so the sort cannot unwind safely).
///
/// # Examples
///
/// ```
/// use samplesort::sample_sort_inplace;
///
/// let mut data = vec![9u64, 3, 7, 1];
/// sample_sort_inplace(&mut data, &|a: &u64, b: &u64| a < b);
/// assert_eq!(data, vec![1, 3, 7, 9]);
/// ```
pub fn sample_sort_inplace<T, F>(data: &mut [T], less: F)
where
    T: Send + Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    let n = data.len();
    if n < QUICKSORT_THRESHOLD {
        seq_sort_inplace(data, &less, false);
        return;
    }
    if n < u32::MAX as usize {
        sample_sort_inplace_impl::<u32, _, _>(data, &less);
    } else {
        sample_sort_inplace_impl::<u64, _, _>(data, &less);
    }
}
