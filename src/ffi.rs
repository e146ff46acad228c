//! C ABI for embedding the allocator in a host written in another language.
//!
//! ```c
//! typedef void *ralloc_t;
//!
//! ralloc_t  ralloc_create(uintptr_t base, size_t length, size_t granularity);
//! void      ralloc_destroy(ralloc_t ralloc);
//! uintptr_t ralloc_allocate(ralloc_t ralloc, size_t length, int flags, uintptr_t hint);
//! void      ralloc_free(ralloc_t ralloc, uintptr_t base, size_t length);
//! size_t    ralloc_free_range_count(ralloc_t ralloc);
//! size_t    ralloc_dump_free_ranges(ralloc_t ralloc, ralloc_range_t *out, size_t capacity);
//! ```
//!
//! Failures never cross the boundary as anything but [`RALLOC_FAILED`] (or a
//! silent no-op for `ralloc_free`). The reason is reported through `tracing`.

use std::ptr;

use libc::{c_int, c_void, size_t, uintptr_t};
use tracing::warn;

use crate::{Placement, RangeAllocator};

/// Opaque handle returned by [`ralloc_create`].
pub type RallocHandle = *mut c_void;

/// Returned by [`ralloc_allocate`] when nothing was allocated.
pub const RALLOC_FAILED: uintptr_t = uintptr_t::MAX;

/// Placement flags as seen from C.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationFlags {
  Any = 0,
  Exact = 1,
  Above = 2,
  Below = 3,
}

impl AllocationFlags {
  pub fn from_raw(raw: c_int) -> Option<Self> {
    match raw {
      0 => Some(Self::Any),
      1 => Some(Self::Exact),
      2 => Some(Self::Above),
      3 => Some(Self::Below),
      _ => None,
    }
  }

  pub fn placement(
    self,
    hint: uintptr_t,
  ) -> Placement {
    match self {
      Self::Any => Placement::Any,
      Self::Exact => Placement::Exact(hint),
      Self::Above => Placement::Above(hint),
      Self::Below => Placement::Below(hint),
    }
  }
}

/// One free range, as written by [`ralloc_dump_free_ranges`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangeEntry {
  pub base: uintptr_t,
  pub length: size_t,
}

unsafe fn allocator_mut<'a>(handle: RallocHandle) -> Option<&'a mut RangeAllocator> {
  unsafe { handle.cast::<RangeAllocator>().as_mut() }
}

/// Creates an allocator for `[base, base + length)`. Returns null if
/// `granularity` is zero or the range runs past the top of the address space.
#[unsafe(no_mangle)]
pub extern "C" fn ralloc_create(
  base: uintptr_t,
  length: size_t,
  granularity: size_t,
) -> RallocHandle {
  if granularity == 0 {
    warn!(base, length, "refusing to create allocator with zero granularity");
    return ptr::null_mut();
  }

  if base.checked_add(length).is_none() {
    warn!(base, length, "refusing to create allocator past the end of the address space");
    return ptr::null_mut();
  }

  Box::into_raw(Box::new(RangeAllocator::new(base, length, granularity))).cast()
}

/// Releases an allocator created by [`ralloc_create`]. Null is ignored.
///
/// # Safety
///
/// `handle` must be null or a live handle from [`ralloc_create`], and must not
/// be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ralloc_destroy(handle: RallocHandle) {
  if handle.is_null() {
    return;
  }

  unsafe {
    drop(Box::from_raw(handle.cast::<RangeAllocator>()));
  }
}

/// Allocates `length` bytes with the placement given by `flags` and `hint`.
///
/// Returns [`RALLOC_FAILED`] on any failure, including a null handle or an
/// unknown flag.
///
/// # Safety
///
/// `handle` must be null or a live handle from [`ralloc_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ralloc_allocate(
  handle: RallocHandle,
  length: size_t,
  flags: c_int,
  hint: uintptr_t,
) -> uintptr_t {
  let Some(allocator) = (unsafe { allocator_mut(handle) }) else {
    return RALLOC_FAILED;
  };

  let Some(flags) = AllocationFlags::from_raw(flags) else {
    warn!(flags, "unknown allocation flags, no allocation performed");
    return RALLOC_FAILED;
  };

  allocator
    .allocate(length, flags.placement(hint))
    .unwrap_or(RALLOC_FAILED)
}

/// Frees `[base, base + length)`. Invalid requests are ignored.
///
/// # Safety
///
/// `handle` must be null or a live handle from [`ralloc_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ralloc_free(
  handle: RallocHandle,
  base: uintptr_t,
  length: size_t,
) {
  if let Some(allocator) = (unsafe { allocator_mut(handle) }) {
    // Already reported by the allocator.
    let _ = allocator.free(base, length);
  }
}

/// Number of entries in the free map, 0 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live handle from [`ralloc_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ralloc_free_range_count(handle: RallocHandle) -> size_t {
  (unsafe { allocator_mut(handle) }).map_or(0, |allocator| allocator.free_range_count())
}

/// Copies up to `capacity` free ranges, lowest address first, into `out` and
/// returns how many were written.
///
/// # Safety
///
/// `handle` must be null or a live handle from [`ralloc_create`]. `out` must be
/// null or valid for writing `capacity` entries.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ralloc_dump_free_ranges(
  handle: RallocHandle,
  out: *mut RangeEntry,
  capacity: size_t,
) -> size_t {
  if out.is_null() {
    return 0;
  }

  let Some(allocator) = (unsafe { allocator_mut(handle) }) else {
    return 0;
  };

  let mut written = 0;
  for range in allocator.free_ranges().take(capacity) {
    unsafe {
      out.add(written).write(RangeEntry {
        base: range.start,
        length: range.length,
      });
    }
    written += 1;
  }

  written
}
