//! Lock-free write-combining helpers.
//!
//! CAS loops in the usual read-modify-write shape: load, compute, publish
//! with a weak compare-exchange, retry on interference. [`write_min`] and
//! [`write_max`] report whether the write occurred, so callers can chain
//! "did I improve the best so far" logic without a second load. On targets
//! with a native fetch-min these loops are not the fastest spelling, but the
//! return contract is the part callers rely on.
//!
//! The sort engines do not use these helpers (their phases write disjoint
//! ranges by construction), but they belong to the same toolbox of parallel
//! primitives.

use std::ops::Add;
use std::sync::atomic::{
    AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

/// A standard atomic cell usable with the write-combining helpers.
pub trait AtomicPrimitive {
    type Value: Copy;

    fn load_relaxed(&self) -> Self::Value;

    /// Weak compare-exchange; `true` when the store took effect.
    fn cas_weak(&self, current: Self::Value, new: Self::Value) -> bool;
}

macro_rules! impl_atomic_primitive {
    ($($atomic:ty => $value:ty),* $(,)?) => {$(
        impl AtomicPrimitive for $atomic {
            type Value = $value;

            #[inline]
            fn load_relaxed(&self) -> $value {
                self.load(Ordering::Relaxed)
            }

            #[inline]
            fn cas_weak(&self, current: $value, new: $value) -> bool {
                self.compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            }
        }
    )*};
}

impl_atomic_primitive! {
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize,
    AtomicI32 => i32,
    AtomicI64 => i64,
}

/// Atomically adds `delta` to `cell`.
pub fn write_add<A>(cell: &A, delta: A::Value)
where
    A: AtomicPrimitive,
    A::Value: Add<Output = A::Value>,
{
    loop {
        let old = cell.load_relaxed();
        if cell.cas_weak(old, old + delta) {
            return;
        }
    }
}

/// Atomically lowers `cell` to `value` if `less(value, current)`.
///
/// Returns whether the write occurred.
pub fn write_min<A, F>(cell: &A, value: A::Value, less: F) -> bool
where
    A: AtomicPrimitive,
    F: Fn(&A::Value, &A::Value) -> bool,
{
    loop {
        let current = cell.load_relaxed();
        if !less(&value, &current) {
            return false;
        }
        if cell.cas_weak(current, value) {
            return true;
        }
    }
}

/// Atomically raises `cell` to `value` if `less(current, value)`.
///
/// Returns whether the write occurred.
pub fn write_max<A, F>(cell: &A, value: A::Value, less: F) -> bool
where
    A: AtomicPrimitive,
    F: Fn(&A::Value, &A::Value) -> bool,
{
    loop {
        let current = cell.load_relaxed();
        if !less(&current, &value) {
            return false;
        }
        if cell.cas_weak(current, value) {
            return true;
        }
    }
}
