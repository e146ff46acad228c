//! # rangealloc - Address Range Bookkeeping
//!
//! This crate keeps track of which parts of a fixed, contiguous address range
//! are free and hands out sub-ranges under a few placement policies. It never
//! touches the memory itself: it only manages numbers describing the range.
//!
//! ## Overview
//!
//! The allocator stores one thing, an ordered map of free ranges:
//!
//! ```text
//!   Free Map:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                       MANAGED ADDRESS SPACE                          │
//!   │                                                                      │
//!   │   ┌──────┬────────┬──────────────┬─────┬───────────────────────────┐ │
//!   │   │ free │  used  │     free     │used │           free            │ │
//!   │   └──────┴────────┴──────────────┴─────┴───────────────────────────┘ │
//!   │   ▲               ▲                    ▲                             │
//!   │   │               │                    │                             │
//!   │  base          start               start                             │
//!   │   └── { base: len, start: len, start: len } ──┘                      │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocated space is the complement of the map.
//!   Adjacent free ranges are always merged into one entry.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rangealloc
//!   ├── align      - Granularity rounding (align_to!, checked_align_to)
//!   ├── range      - FreeRange value type
//!   ├── space      - AddressSpace (base, length, granularity)
//!   ├── error      - AllocError
//!   ├── allocator  - RangeAllocator and Placement
//!   └── ffi        - C ABI (ralloc_create, ralloc_allocate, ...)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rangealloc::{Placement, RangeAllocator};
//!
//! let mut allocator = RangeAllocator::new(0x1000, 1312, 8);
//!
//! // 43 bytes round up to 48.
//! let first = allocator.allocate(43, Placement::Any).unwrap();
//! assert_eq!(first, 0x1000);
//!
//! // Pin an allocation to a known address.
//! let pinned = allocator.allocate(8, Placement::Exact(0x1100)).unwrap();
//! assert_eq!(pinned, 0x1100);
//!
//! // Hand them back; the free map collapses to a single range again.
//! allocator.free(first, 48).unwrap();
//! allocator.free(pinned, 8).unwrap();
//! assert_eq!(allocator.free_range_count(), 1);
//! ```
//!
//! ## Placement Policies
//!
//! ```text
//!   Any        first free range large enough, from its start
//!   Exact(h)   exactly [h, h + len), which must be entirely free
//!   Above(h)   tail of the highest range that fits, starting at or above h
//!   Below(h)   head of the lowest range that fits, ending at or below h
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded**: no internal locking, wrap it in a mutex to share it
//! - **No ownership tracking**: callers must remember what they allocated
//! - **One contiguous range**: the managed space is fixed at construction
//!
//! ## Logging
//!
//! Rejected requests are reported as `tracing` warnings, successful ones at
//! debug level. The crate never installs a subscriber.

mod align;
mod allocator;
mod error;
pub mod ffi;
mod range;
mod space;

/// An address inside the managed space.
pub type Address = usize;

/// A length in bytes.
pub type Size = usize;

pub use align::{checked_align_to, is_aligned};
pub use allocator::{Placement, RangeAllocator};
pub use error::AllocError;
pub use range::FreeRange;
pub use space::AddressSpace;
