//! # Samplesort
//!
//! `samplesort` is a parallel sorting library built around the
//! cache-oblivious, low-depth sample sort of Blelloch, Gibbons and Simhadri
//! (SPAA 2010), together with the small toolbox of parallel primitives the
//! algorithm is made of: fork-join loops, destructive moves between raw
//! cells, an uninitialized buffer, a bucket transpose, and lock-free
//! write-combining helpers.
//!
//! ## Key Features
//!
//! - **Two variants**: [`sample_sort()`] copies into fresh storage and can
//!   be stable; [`sample_sort_inplace()`] sorts without ever cloning an
//!   element. Values only move, once out into a raw temporary and once back.
//! - **Cache-oblivious layout**: data crosses memory a constant number of
//!   times regardless of cache size, via a block-local sort, one transpose
//!   from block-major to bucket-major order, and a bucket-local finish.
//! - **Low depth**: blocks and buckets are independent, so every wide phase
//!   is a flat parallel loop over a fork-join pool; the executor is free to
//!   run everything sequentially.
//! - **Deterministic**: pivot sampling is driven by a fixed integer hash,
//!   so equal inputs produce equal outputs, run to run and thread count to
//!   thread count.
//! - **Relocation, not assignment**: elements move between storage by
//!   destructive move ([`relocate()`]), which in Rust is always a byte copy;
//!   the temporary slab ([`UninitBuffer`]) frees without running element
//!   destructors, because by then every cell has been relocated out again.
//!
//! ## Usage
//!
//! ```rust
//! use samplesort::sample_sort;
//!
//! let data = vec![3u32, 1, 4, 1, 5, 9, 2, 6];
//! let sorted = sample_sort(&data, &|a: &u32, b: &u32| a < b, false);
//! assert_eq!(sorted, vec![1, 1, 2, 3, 4, 5, 6, 9]);
//! ```
//!
//! Sorting in place, without copies:
//!
//! ```rust
//! use samplesort::sample_sort_inplace;
//!
//! let mut handles: Vec<Box<u32>> = (0..1000u32).rev().map(Box::new).collect();
//! sample_sort_inplace(&mut handles, &|a: &Box<u32>, b: &Box<u32>| a < b);
//! assert!(handles.windows(2).all(|w| w[0] <= w[1]));
//! ```
//!
//! ## Performance Characteristics
//!
//! - **Work**: O(n log n) comparisons; inputs below the sequential
//!   threshold (16,384 elements) skip the parallel machinery entirely.
//! - **Span**: about sqrt(n) blocks and buckets each sort sequentially, in
//!   parallel with one another, giving polylogarithmic depth on top of the
//!   sequential leaves.
//! - **Memory**: one raw temporary of n cells plus a count matrix of about
//!   n/16 entries (32-bit until n reaches `u32::MAX`, 64-bit beyond).
//!
//! The comparator must be a pure strict weak order and must not panic: the
//! copying variant leaks its temporaries on a comparator panic, and the
//! in-place variant aborts the process, since values are mid-relocation.

pub mod atomic;
pub mod parallel;
pub mod relocate;
pub mod sample_sort;
mod seq_sort;
mod transpose;
pub mod uninit;
mod util;

pub use atomic::{write_add, write_max, write_min};
pub use parallel::{par_do, parallel_for};
pub use relocate::{is_trivially_relocatable, relocate, relocate_array};
pub use sample_sort::{sample_sort, sample_sort_inplace};
pub use uninit::UninitBuffer;

pub mod prelude {
    pub use crate::sample_sort::{sample_sort, sample_sort_inplace};
}
