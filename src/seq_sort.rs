//! Sequential base sorts.
//!
//! Every leaf of the parallel engines lands in [`seq_sort_inplace`], which
//! dispatches on the element shape and the stability request: wide values
//! and owning handles take the standard unstable comparison sort, while
//! small values (and every stable request) take a comparator-derived
//! bucket sort that partitions on sampled pivots and scatters by
//! relocation, so it never clones an element.

use std::cmp::Ordering;
use std::mem;
use std::ptr;
use std::slice;

use cuneiform::cuneiform;

use crate::relocate::{pointer_like, relocate};
use crate::uninit::UninitBuffer;
use crate::util::hash64;

/// Partition fan-out per bucket round.
const BUCKET_BITS: usize = 4;
const NUM_BUCKETS: usize = 1 << BUCKET_BITS;
const NUM_PIVOTS: usize = NUM_BUCKETS - 1;

/// Below this many elements a partition round cannot pay for itself.
const BUCKET_THRESHOLD: usize = NUM_BUCKETS * 32;

// Cache-aligned scatter counts.
#[cuneiform]
struct BucketCounts {
    data: [usize; NUM_BUCKETS],
}

/// Total order induced by a strict-weak `less`.
#[inline]
pub(crate) fn to_ordering<T, F>(less: &F, a: &T, b: &T) -> Ordering
where
    F: Fn(&T, &T) -> bool,
{
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Sorts a slice with the sequential base sort.
pub(crate) fn seq_sort_inplace<T, F>(data: &mut [T], less: &F, stable: bool)
where
    F: Fn(&T, &T) -> bool,
{
    if !stable && (mem::size_of::<T>() > 8 || pointer_like::<T>()) {
        data.sort_unstable_by(|a, b| to_ordering(less, a, b));
    } else {
        bucket_sort(data, less, stable);
    }
}

/// Clone-sorts `src` into the raw cells at `dst`.
///
/// # Safety
///
/// `dst` must point to `src.len()` raw cells disjoint from `src`.
pub(crate) unsafe fn seq_sort_copy_into<T, F>(src: &[T], dst: *mut T, less: &F, stable: bool)
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    for (j, v) in src.iter().enumerate() {
        unsafe { ptr::write(dst.add(j), v.clone()) };
    }
    let out = unsafe { slice::from_raw_parts_mut(dst, src.len()) };
    seq_sort_inplace(out, less, stable);
}

/// Relocate-sorts `len` cells from `src` into the raw cells at `dst`,
/// leaving the source range raw. Unstable.
///
/// # Safety
///
/// `src..src+len` must hold live values, `dst..dst+len` must be raw, and
/// the two ranges must be disjoint. Afterwards the roles are swapped.
pub(crate) unsafe fn seq_sort_relocate_into<T, F>(src: *mut T, dst: *mut T, len: usize, less: &F)
where
    F: Fn(&T, &T) -> bool,
{
    unsafe { ptr::copy_nonoverlapping(src as *const T, dst, len) };
    let out = unsafe { slice::from_raw_parts_mut(dst, len) };
    seq_sort_inplace(out, less, false);
}

/// Comparator-derived bucket sort. Stable.
///
/// One round samples pivots, assigns each element a bucket id, and scatters
/// the elements bucket by bucket with a stable counting pass; buckets then
/// recurse. Rounds that fail to split (an all-equal sample, or every key in
/// one bucket) fall back to the comparison leaf, which also finishes any
/// partition too small to pay for another round.
pub(crate) fn bucket_sort<T, F>(data: &mut [T], less: &F, stable: bool)
where
    F: Fn(&T, &T) -> bool,
{
    let n = data.len();
    if n < BUCKET_THRESHOLD {
        leaf_sort(data, less, stable);
        return;
    }

    let mut bucket_ids = vec![0u8; n];
    if assign_buckets(data, &mut bucket_ids, less) {
        leaf_sort(data, less, stable);
        return;
    }

    let mut counts = BucketCounts {
        data: [0; NUM_BUCKETS],
    };
    let counts = &mut counts.data;
    for &b in bucket_ids.iter() {
        counts[b as usize] += 1;
    }
    if counts.iter().any(|&c| c == n) {
        // degenerate round: one bucket swallowed everything
        leaf_sort(data, less, stable);
        return;
    }

    let mut cursor = [0usize; NUM_BUCKETS];
    let mut sum = 0;
    for (pos, &c) in cursor.iter_mut().zip(counts.iter()) {
        *pos = sum;
        sum += c;
    }

    // stable counting scatter through raw scratch, then straight back
    let mut scratch = UninitBuffer::<T>::new(n);
    let base = data.as_mut_ptr();
    let out = scratch.as_mut_ptr();
    for (i, &b) in bucket_ids.iter().enumerate() {
        let pos = &mut cursor[b as usize];
        unsafe { relocate(out.add(*pos), base.add(i) as *const T) };
        *pos += 1;
    }
    unsafe { ptr::copy_nonoverlapping(out as *const T, base, n) };

    let mut start = 0;
    for &c in counts.iter() {
        let end = start + c;
        if end - start > 1 {
            bucket_sort(&mut data[start..end], less, stable);
        }
        start = end;
    }
}

/// Samples pivots and writes a bucket id per element.
///
/// Returns `true` when the sample holds a single key, in which case no ids
/// were assigned and the caller should fall back to the comparison leaf.
fn assign_buckets<T, F>(data: &[T], bucket_ids: &mut [u8], less: &F) -> bool
where
    F: Fn(&T, &T) -> bool,
{
    let n = data.len();
    let over_sample = 1 + n / (NUM_BUCKETS * 400);
    let sample_set_size = NUM_BUCKETS * over_sample;

    // sample indices, then order them by key
    let mut sample: Vec<usize> = (0..sample_set_size)
        .map(|i| hash64(i as u64) as usize % n)
        .collect();
    sample.sort_unstable_by(|&a, &b| to_ordering(less, &data[a], &data[b]));

    let pivots: Vec<usize> = (0..NUM_PIVOTS)
        .map(|i| sample[over_sample * (i + 1)])
        .collect();
    if !less(&data[pivots[0]], &data[pivots[NUM_PIVOTS - 1]]) {
        return true;
    }

    // implicit balanced search tree over the pivots (root at 0, children of
    // node j at 2j+1 and 2j+2); NUM_PIVOTS = 2^BUCKET_BITS - 1 keeps every
    // recursion odd-sized, so the tree is perfect
    let mut tree = [0usize; NUM_PIVOTS];
    build_pivot_tree(&pivots, &mut tree, 0, 0, NUM_PIVOTS);

    for (id, x) in bucket_ids.iter_mut().zip(data.iter()) {
        let mut j = 0;
        for _ in 0..BUCKET_BITS {
            j = 2 * j + 1 + usize::from(!less(x, &data[tree[j]]));
        }
        *id = (j - NUM_PIVOTS) as u8;
    }
    false
}

/// Lays `pivots[l..r)` out as a balanced implicit tree rooted at `root`.
fn build_pivot_tree(pivots: &[usize], tree: &mut [usize], root: usize, l: usize, r: usize) {
    let m = l + (r - l) / 2;
    tree[root] = pivots[m];
    if r - l == 1 {
        return;
    }
    build_pivot_tree(pivots, tree, 2 * root + 1, l, m);
    build_pivot_tree(pivots, tree, 2 * root + 2, m + 1, r);
}

fn leaf_sort<T, F>(data: &mut [T], less: &F, stable: bool)
where
    F: Fn(&T, &T) -> bool,
{
    if stable {
        data.sort_by(|a, b| to_ordering(less, a, b));
    } else {
        data.sort_unstable_by(|a, b| to_ordering(less, a, b));
    }
}
