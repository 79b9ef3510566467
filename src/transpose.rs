//! Block-major to bucket-major relocation.
//!
//! The sample sort leaves its data sorted within blocks, laid out block by
//! block, together with a `num_blocks x num_buckets` matrix counting how
//! many of each block's elements fall in each bucket. [`transpose_buckets`]
//! relocates everything into bucket-major order: each bucket contiguous,
//! its elements still in block order. Small inputs take a flat pass over
//! blocks; large ones take the cache-oblivious route: transpose the count
//! matrix, prefix-sum both layouts, then recursively split the (block,
//! bucket) rectangle along its larger dimension until a leaf relocates
//! whole runs.

use std::ptr;

use crate::parallel::{Shared, par_do, parallel_for};
use crate::util::log2_up;

/// Leaf size for the recursive splits.
const TRANSPOSE_THRESHOLD: usize = 500;

/// Inputs below this take the flat, non-cache-oblivious pass.
const FLAT_INPUT_THRESHOLD: usize = 1 << 22;
const FLAT_DIM_THRESHOLD: usize = 512;

/// Count cells are stored narrow when the input size allows it.
pub(crate) trait Count: Copy + Send + Sync {
    const ZERO: Self;
    fn from_usize(v: usize) -> Self;
    fn as_usize(self) -> usize;
}

macro_rules! impl_count {
    ($($t:ty),*) => {$(
        impl Count for $t {
            const ZERO: Self = 0;

            #[inline]
            fn from_usize(v: usize) -> Self {
                v as $t
            }

            #[inline]
            fn as_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_count!(u32, u64);

/// Exclusive prefix sum; returns the total.
pub(crate) fn scan_inplace<C: Count>(xs: &mut [C]) -> usize {
    let mut sum = 0usize;
    for x in xs.iter_mut() {
        let v = x.as_usize();
        *x = C::from_usize(sum);
        sum += v;
    }
    sum
}

/// Cache-oblivious transpose of the count matrix: `dst[j][i] = src[i][j]`.
///
/// `src` is `r x c` row-major with row stride `r_len`; `dst` is `c x r`
/// row-major with row stride `c_len`. Recursion splits the larger dimension
/// so every leaf touches a roughly square tile.
struct MatrixTranspose<C> {
    src: *const C,
    dst: *mut C,
}

unsafe impl<C: Send + Sync> Send for MatrixTranspose<C> {}
unsafe impl<C: Send + Sync> Sync for MatrixTranspose<C> {}

impl<C: Count> MatrixTranspose<C> {
    /// # Safety
    ///
    /// The `r x c` source tile and the `c x r` destination tile described by
    /// the offsets and strides must be in bounds, and the destination cells
    /// of concurrent calls must be disjoint (guaranteed by the splits).
    unsafe fn run(
        &self,
        r_start: usize,
        r_count: usize,
        r_len: usize,
        c_start: usize,
        c_count: usize,
        c_len: usize,
    ) {
        if r_count * c_count < TRANSPOSE_THRESHOLD {
            for i in r_start..r_start + r_count {
                for j in c_start..c_start + c_count {
                    unsafe { *self.dst.add(j * c_len + i) = *self.src.add(i * r_len + j) };
                }
            }
        } else if c_count > r_count {
            let half = c_count / 2;
            par_do(
                || unsafe { self.run(r_start, r_count, r_len, c_start, half, c_len) },
                || unsafe { self.run(r_start, r_count, r_len, c_start + half, c_count - half, c_len) },
            );
        } else {
            let half = r_count / 2;
            par_do(
                || unsafe { self.run(r_start, half, r_len, c_start, c_count, c_len) },
                || unsafe { self.run(r_start + half, r_count - half, r_len, c_start, c_count, c_len) },
            );
        }
    }
}

/// Recursive run relocation: for each (block, bucket) cell, moves that
/// block's slice of the bucket from its block-major position (`src_off`,
/// prefix sums in block-major order) to its bucket-major position
/// (`dst_off`, prefix sums in bucket-major order).
struct BlockRelocate<T, C> {
    from: *mut T,
    to: *mut T,
    src_off: *const C,
    dst_off: *const C,
}

unsafe impl<T: Send, C: Send + Sync> Send for BlockRelocate<T, C> {}
unsafe impl<T: Send, C: Send + Sync> Sync for BlockRelocate<T, C> {}

impl<T: Send, C: Count> BlockRelocate<T, C> {
    /// # Safety
    ///
    /// Offsets must be exclusive prefix sums of the same count matrix in the
    /// two layouts, bounded by the length of both arrays; `from` cells must
    /// be live, `to` cells raw, and the allocations disjoint.
    unsafe fn run(
        &self,
        r_start: usize,
        r_count: usize,
        r_len: usize,
        c_start: usize,
        c_count: usize,
        c_len: usize,
    ) {
        if r_count * c_count < TRANSPOSE_THRESHOLD * 16 {
            parallel_for(
                r_start,
                r_start + r_count,
                |i| {
                    for j in c_start..c_start + c_count {
                        unsafe {
                            let sa = (*self.src_off.add(i * r_len + j)).as_usize();
                            let sb = (*self.dst_off.add(j * c_len + i)).as_usize();
                            let len = (*self.src_off.add(i * r_len + j + 1)).as_usize() - sa;
                            ptr::copy_nonoverlapping(self.from.add(sa) as *const T, self.to.add(sb), len);
                        }
                    }
                },
                1,
            );
        } else if c_count > r_count {
            let half = c_count / 2;
            par_do(
                || unsafe { self.run(r_start, r_count, r_len, c_start, half, c_len) },
                || unsafe { self.run(r_start, r_count, r_len, c_start + half, c_count - half, c_len) },
            );
        } else {
            let half = r_count / 2;
            par_do(
                || unsafe { self.run(r_start, half, r_len, c_start, c_count, c_len) },
                || unsafe { self.run(r_start + half, r_count - half, r_len, c_start, c_count, c_len) },
            );
        }
    }
}

/// Relocates block-major data into bucket-major order.
///
/// `counts` holds `num_blocks * num_buckets + 1` cells: `counts[i *
/// num_buckets + j]` is the number of block-`i` elements belonging to bucket
/// `j`, and the final cell is a sentinel. The matrix may be overwritten.
/// Returns the bucket offsets: `num_buckets + 1` exclusive prefix sums of
/// the per-bucket totals, padded with `n`.
///
/// Every destination cell receives exactly one element and every source cell
/// is left raw.
///
/// # Safety
///
/// `from` must hold `n` live values, `to` must point to `n` raw cells, and
/// the two allocations must be disjoint.
pub(crate) unsafe fn transpose_buckets<T: Send, C: Count>(
    from: *mut T,
    to: *mut T,
    counts: &mut [C],
    n: usize,
    block_size: usize,
    num_blocks: usize,
    num_buckets: usize,
) -> Vec<usize> {
    let m = num_blocks * num_buckets;
    debug_assert_eq!(counts.len(), m + 1);
    assert!(
        num_blocks.is_power_of_two(),
        "transpose_buckets: num_blocks must be a power of two"
    );

    let dest_offsets: Vec<C>;

    if n < FLAT_INPUT_THRESHOLD
        || num_buckets <= FLAT_DIM_THRESHOLD
        || num_blocks <= FLAT_DIM_THRESHOLD
    {
        let block_bits = log2_up(num_blocks);
        let block_mask = num_blocks - 1;

        // gather the counts bucket-major, then prefix-sum into destinations
        let mut offsets: Vec<C> = (0..m)
            .map(|i| counts[(i >> block_bits) + num_buckets * (i & block_mask)])
            .collect();
        let total = scan_inplace(&mut offsets);
        assert_eq!(total, n, "transpose_buckets: internal bad count");

        let from = Shared(from);
        let to = Shared(to);
        let offsets_ref = &offsets;
        let counts_ref: &[C] = counts;
        parallel_for(
            0,
            num_blocks,
            |i| {
                let mut s_offset = i * block_size;
                for j in 0..num_buckets {
                    let len = counts_ref[i * num_buckets + j].as_usize();
                    if len > 0 {
                        let d_offset = offsets_ref[i + num_blocks * j].as_usize();
                        unsafe {
                            ptr::copy_nonoverlapping(
                                from.at(s_offset) as *const T,
                                to.at(d_offset),
                                len,
                            );
                        }
                    }
                    s_offset += len;
                }
            },
            1,
        );
        dest_offsets = offsets;
    } else {
        let mut offsets: Vec<C> = vec![C::ZERO; m];
        unsafe {
            MatrixTranspose { src: counts.as_ptr(), dst: offsets.as_mut_ptr() }
                .run(0, num_blocks, num_buckets, 0, num_buckets, num_blocks);
        }
        let total = scan_inplace(&mut offsets);
        let total2 = scan_inplace(&mut counts[..m]);
        assert!(
            total == n && total2 == n,
            "transpose_buckets: internal bad count"
        );
        counts[m] = C::from_usize(n);

        unsafe {
            BlockRelocate { from, to, src_off: counts.as_ptr(), dst_off: offsets.as_ptr() }
                .run(0, num_blocks, num_buckets, 0, num_buckets, num_blocks);
        }
        dest_offsets = offsets;
    }

    (0..=num_buckets)
        .map(|i| {
            if i == num_buckets {
                n
            } else {
                dest_offsets[i * num_blocks].as_usize()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uninit::UninitBuffer;
    use crate::util::hash64;

    // Fabricates a block-major layout where each element records its
    // (bucket, block, rank-in-run) triple, runs the transpose, and checks
    // the bucket-major result cell by cell.
    fn check_roundtrip(num_blocks: usize, num_buckets: usize, count_of: impl Fn(usize, usize) -> usize) {
        let m = num_blocks * num_buckets;
        let mut counts: Vec<u32> = vec![0; m + 1];
        for i in 0..num_blocks {
            for j in 0..num_buckets {
                counts[i * num_buckets + j] = count_of(i, j) as u32;
            }
        }
        let n: usize = counts.iter().map(|&c| c as usize).sum();
        let block_size = counts[..num_buckets]
            .iter()
            .map(|&c| c as usize)
            .sum::<usize>();
        // every block must be exactly block_size except possibly the last
        for i in 0..num_blocks - 1 {
            let b: usize = counts[i * num_buckets..(i + 1) * num_buckets]
                .iter()
                .map(|&c| c as usize)
                .sum();
            assert_eq!(b, block_size);
        }

        let mut from = UninitBuffer::<(u32, u32, u32)>::new(n);
        let mut pos = 0;
        for i in 0..num_blocks {
            for j in 0..num_buckets {
                for k in 0..counts[i * num_buckets + j] {
                    unsafe {
                        std::ptr::write(from.as_mut_ptr().add(pos), (j as u32, i as u32, k));
                    }
                    pos += 1;
                }
            }
        }
        assert_eq!(pos, n);

        let mut to = UninitBuffer::<(u32, u32, u32)>::new(n);
        let offsets = unsafe {
            transpose_buckets(
                from.as_mut_ptr(),
                to.as_mut_ptr(),
                &mut counts,
                n,
                block_size,
                num_blocks,
                num_buckets,
            )
        };

        assert_eq!(offsets.len(), num_buckets + 1);
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[num_buckets], n);

        for j in 0..num_buckets {
            let bucket = unsafe { to.slice_mut(offsets[j], offsets[j + 1]) };
            // bucket-major: all cells belong to bucket j, in block order,
            // runs intact
            let mut prev = (0u32, 0u32);
            for &(bj, bi, k) in bucket.iter() {
                assert_eq!(bj as usize, j);
                assert!((bi, k) >= prev, "block order broken in bucket {j}");
                prev = (bi, k + 1);
            }
        }
    }

    // Pseudo-random counts where every block still sums to `total`.
    fn balanced_counts(i: usize, j: usize, num_buckets: usize, total: usize) -> usize {
        let cell = |jj: usize| (hash64((i * 31 + jj) as u64) % 6) as usize;
        if j + 1 < num_buckets {
            cell(j)
        } else {
            total - (0..num_buckets - 1).map(cell).sum::<usize>()
        }
    }

    #[test]
    fn flat_path_small_matrix() {
        check_roundtrip(8, 5, |i, j| balanced_counts(i, j, 5, 32));
    }

    #[test]
    fn flat_path_with_empty_runs_and_blocks() {
        // trailing block empty, several empty runs
        check_roundtrip(4, 3, |i, j| match (i, j) {
            (3, _) => 0,
            (_, 1) => 0,
            _ => 4,
        });
    }

    #[test]
    fn cache_oblivious_path() {
        // 1024 blocks x 520 buckets, 8 per cell: n = 4,259,840 >= 2^22
        check_roundtrip(1024, 520, |_, _| 8);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_blocks() {
        let mut counts: Vec<u32> = vec![0; 3 * 2 + 1];
        let mut from = UninitBuffer::<u64>::new(0);
        let mut to = UninitBuffer::<u64>::new(0);
        unsafe {
            transpose_buckets(from.as_mut_ptr(), to.as_mut_ptr(), &mut counts, 0, 0, 3, 2);
        }
    }

    #[test]
    fn scan_returns_total_and_shifts() {
        let mut xs: Vec<u32> = vec![3, 0, 2, 5];
        let total = scan_inplace(&mut xs);
        assert_eq!(total, 10);
        assert_eq!(xs, vec![0, 3, 3, 5]);
    }
}
