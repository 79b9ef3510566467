//! Destructive move ("relocation") of values between raw cells.
//!
//! A relocation consumes the object at the source address and produces an
//! equal one at the destination; afterwards the source is raw storage and
//! must not be dropped. Rust moves never run user code, so a relocation is
//! always a plain byte copy: the move-construct-then-destroy path that
//! richer languages need for self-referential types collapses into
//! `ptr::copy_nonoverlapping`. What remains type-dependent is bookkeeping:
//! whether the source cell, once its bytes are gone, still owed a destructor
//! call ([`is_trivially_relocatable`]), and how the array form carves up the
//! work.

use std::mem;
use std::ptr;

use crate::parallel::{Shared, parallel_for};

/// Bytes relocated per task when the span is carved into cache-sized chunks.
const RELOCATE_CHUNK_BYTES: usize = 1024 * mem::size_of::<usize>();

/// Scheduling grain for the element-wise path.
const RELOCATE_GRAIN: usize = 2048;

/// Whether a value of `T` leaves nothing behind once its bytes are copied
/// out: no destructor would ever have run on the source cell.
///
/// `false` for owning types such as `Box`: their bytes still relocate
/// perfectly well, but the drop obligation travels with them, so the source
/// cell must be treated as raw afterwards rather than merely stale.
pub const fn is_trivially_relocatable<T>() -> bool {
    !mem::needs_drop::<T>()
}

/// Whether `T` is a word-sized owning handle (a `Box` or equivalent): its
/// entire state is one pointer, but it is not trivially relocatable because
/// it owns what it points at. The sort geometry treats such types like
/// machine words.
pub(crate) const fn pointer_like<T>() -> bool {
    mem::size_of::<T>() == mem::size_of::<usize>() && mem::needs_drop::<T>()
}

/// Relocates the value at `from` into the raw cell at `to`.
///
/// # Safety
///
/// `from` must point to a live `T`, `to` to raw storage for a `T`, and the
/// two cells must not overlap. Afterwards the roles are swapped: `to` is
/// live and `from` is raw, and the caller must not drop `from`'s cell.
#[inline]
pub unsafe fn relocate<T>(to: *mut T, from: *const T) {
    unsafe { ptr::copy_nonoverlapping(from, to, 1) };
}

/// Relocates `len` consecutive values from `from` into the raw cells at
/// `to`, in parallel.
///
/// Trivially relocatable elements are moved in chunks of roughly 8 KiB to
/// keep each task inside the cache; other types go element by element with a
/// coarse grain. Either way, every source cell is left raw.
///
/// # Safety
///
/// Same contract as [`relocate`], extended to the whole span: `from..from+len`
/// live, `to..to+len` raw, and the two ranges disjoint.
pub unsafe fn relocate_array<T: Send>(to: *mut T, from: *const T, len: usize) {
    let to = Shared(to);
    let from = Shared(from as *mut T);
    if is_trivially_relocatable::<T>() {
        let chunk = (RELOCATE_CHUNK_BYTES / mem::size_of::<T>().max(1)).max(1);
        parallel_for(
            0,
            len.div_ceil(chunk),
            |i| {
                let start = i * chunk;
                let n = usize::min(chunk, len - start);
                unsafe { ptr::copy_nonoverlapping(from.at(start) as *const T, to.at(start), n) };
            },
            1,
        );
    } else {
        parallel_for(
            0,
            len,
            |i| unsafe { relocate(to.at(i), from.at(i) as *const T) },
            RELOCATE_GRAIN,
        );
    }
}
