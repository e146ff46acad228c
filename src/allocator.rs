use std::{
  collections::BTreeMap,
  fmt,
  ops::Bound::{Excluded, Unbounded},
};

use tracing::{debug, trace, warn};

use crate::{Address, Size, error::AllocError, range::FreeRange, space::AddressSpace};

/// Where an allocation may be placed.
///
/// ```text
///   base                                                   base + length
///    │                          hint                             │
///    ▼                           ▼                               ▼
///    ├───────────────────────────┼───────────────────────────────┤
///    │◄── Below: head of the ────│──── Above: tail of the ──────►│
///    │    lowest range that fits │     highest range that fits   │
///    │                           │                               │
///    │                  Exact: [hint, hint + len)                │
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
  /// First fit: the lowest free range that is large enough, carved from its
  /// start.
  Any,
  /// Exactly at the given address, which must be on the granularity grid and
  /// entirely free for the requested length.
  Exact(Address),
  /// At the tail of the highest free range that can hold the request while
  /// starting at or above the hint.
  Above(Address),
  /// At the head of the lowest free range that can hold the request while
  /// ending at or below the hint. The hint itself is exclusive, so an
  /// allocation may end exactly on it.
  Below(Address),
}

impl Placement {
  fn hint(&self) -> Option<Address> {
    match *self {
      Placement::Any => None,
      Placement::Exact(hint) | Placement::Above(hint) | Placement::Below(hint) => Some(hint),
    }
  }
}

/// Bookkeeping for a fixed address space.
///
/// The allocator only remembers what is free: a map from the start of every
/// free range to its length. Allocated space is whatever the map does not
/// cover, so callers must remember the spans they were given (rounded with
/// [`RangeAllocator::round_length`]) to hand them back.
///
/// The map never holds two ranges that overlap or touch. Freeing always
/// merges with adjacent free neighbours, allocating always carves a single
/// range.
///
/// ```text
///   free map: { B: 48, B+56: 1256 }
///
///   B        B+48  B+56                                           B+1312
///   ├─────────┼─────┼────────────────────────────────────────────────┤
///   │  free   │used │                    free                        │
///   └─────────┴─────┴────────────────────────────────────────────────┘
/// ```
///
/// There is no internal locking. Wrap the allocator in a mutex if it has to
/// be shared between threads.
pub struct RangeAllocator {
  space: AddressSpace,
  free: BTreeMap<Address, Size>,
}

impl RangeAllocator {
  /// Creates an allocator managing `[base, base + length)` with every
  /// address free.
  ///
  /// `length` is expected to be a multiple of `granularity`.
  ///
  /// # Panics
  ///
  /// Panics if `granularity` is zero or if `base + length` overflows.
  pub fn new(
    base: Address,
    length: Size,
    granularity: Size,
  ) -> Self {
    Self::with_space(AddressSpace::new(base, length, granularity))
  }

  /// Same as [`RangeAllocator::new`], from an existing [`AddressSpace`].
  ///
  /// # Panics
  ///
  /// Panics if the granularity of `space` is zero or if its end does not fit
  /// in an address.
  pub fn with_space(space: AddressSpace) -> Self {
    assert!(space.granularity > 0, "granularity must be non-zero");
    assert!(space.checked_end().is_some(), "address space end overflows");

    let mut free = BTreeMap::new();
    if space.length > 0 {
      free.insert(space.base, space.length);
    }

    debug!(
      base = space.base,
      length = space.length,
      granularity = space.granularity,
      "created range allocator"
    );

    Self { space, free }
  }

  pub fn space(&self) -> AddressSpace {
    self.space
  }

  /// Rounds `length` up to the granularity, which is the span an allocation
  /// of `length` actually occupies. `None` on overflow.
  pub fn round_length(
    &self,
    length: Size,
  ) -> Option<Size> {
    self.space.round_length(length)
  }

  /// Allocates `length` bytes, rounded up to the granularity, according to
  /// `placement`, and returns the start of the allocated span.
  ///
  /// On error the free map is left untouched.
  pub fn allocate(
    &mut self,
    length: Size,
    placement: Placement,
  ) -> Result<Address, AllocError> {
    let result = self.try_allocate(length, placement);

    match &result {
      Ok(address) => debug!(address, length, ?placement, "allocated range"),
      Err(error) => warn!(%error, length, ?placement, "no allocation performed"),
    }

    result
  }

  /// Returns `[address, address + length)` to the free map, merging it with
  /// the free ranges right below and above it.
  ///
  /// The span must be on the granularity grid and must not overlap any free
  /// range; in particular a span cannot be freed twice. On error the free map
  /// is left untouched.
  pub fn free(
    &mut self,
    address: Address,
    length: Size,
  ) -> Result<(), AllocError> {
    let result = self.try_free(address, length);

    match &result {
      Ok(()) => debug!(address, length, "freed range"),
      Err(error) => warn!(%error, address, length, "no allocation removed"),
    }

    result
  }

  /// Snapshot of the free map, start address to length.
  pub fn dump_free_ranges(&self) -> BTreeMap<Address, Size> {
    self.free.clone()
  }

  /// Free ranges in ascending address order.
  pub fn free_ranges(&self) -> impl DoubleEndedIterator<Item = FreeRange> + ExactSizeIterator + '_ {
    self.free.iter().map(|(&start, &length)| FreeRange::new(start, length))
  }

  pub fn free_range_count(&self) -> usize {
    self.free.len()
  }

  pub fn free_bytes(&self) -> Size {
    self.free.values().sum()
  }

  pub fn allocated_bytes(&self) -> Size {
    self.space.length - self.free_bytes()
  }

  /// The largest free range, the lowest one if several share the size.
  pub fn largest_free_range(&self) -> Option<FreeRange> {
    self
      .free_ranges()
      .reduce(|best, range| if range.length > best.length { range } else { best })
  }

  /// Whether every address of `[address, address + length)` is free.
  pub fn is_free(
    &self,
    address: Address,
    length: Size,
  ) -> bool {
    self
      .range_at_or_before(address)
      .is_some_and(|range| range.covers(address, length))
  }

  fn try_allocate(
    &mut self,
    length: Size,
    placement: Placement,
  ) -> Result<Address, AllocError> {
    if length == 0 {
      return Err(AllocError::ZeroLength);
    }

    let length = self
      .space
      .round_length(length)
      .ok_or(AllocError::NoSpace { length })?;

    if let Some(hint) = placement.hint() {
      if !self.space.contains(hint) {
        return Err(AllocError::OutOfRange {
          address: hint,
          length,
        });
      }
    }

    match placement {
      Placement::Any => self.allocate_any(length),
      Placement::Exact(hint) => {
        if !self.space.is_aligned(hint) {
          return Err(AllocError::MisalignedHint { hint });
        }
        self.allocate_exact(length, hint)
      }
      Placement::Above(hint) => self.allocate_above(length, hint),
      Placement::Below(hint) => self.allocate_below(length, hint),
    }
  }

  fn allocate_any(
    &mut self,
    length: Size,
  ) -> Result<Address, AllocError> {
    let range = self
      .free_ranges()
      .find(|range| range.length >= length)
      .ok_or(AllocError::NoSpace { length })?;

    self.carve(range, range.start, length);
    Ok(range.start)
  }

  fn allocate_exact(
    &mut self,
    length: Size,
    hint: Address,
  ) -> Result<Address, AllocError> {
    let range = self
      .range_at_or_before(hint)
      .filter(|range| range.covers(hint, length))
      .ok_or(AllocError::NotFree {
        address: hint,
        length,
      })?;

    self.carve(range, hint, length);
    Ok(hint)
  }

  fn allocate_above(
    &mut self,
    length: Size,
    hint: Address,
  ) -> Result<Address, AllocError> {
    let mut found = None;

    // Tail placements only get lower as we walk down, so the first one below
    // the hint ends the search.
    for range in self.free_ranges().rev() {
      match range.end().checked_sub(length) {
        Some(address) if address >= hint => {
          if range.length >= length {
            found = Some((range, address));
            break;
          }
        }
        _ => break,
      }
    }

    let (range, address) = found.ok_or(AllocError::NoSpace { length })?;
    self.carve(range, address, length);
    Ok(address)
  }

  fn allocate_below(
    &mut self,
    length: Size,
    hint: Address,
  ) -> Result<Address, AllocError> {
    let mut found = None;

    for range in self.free_ranges() {
      match range.start.checked_add(length) {
        Some(end) if end <= hint => {
          if range.length >= length {
            found = Some(range);
            break;
          }
        }
        _ => break,
      }
    }

    let range = found.ok_or(AllocError::NoSpace { length })?;
    self.carve(range, range.start, length);
    Ok(range.start)
  }

  fn try_free(
    &mut self,
    address: Address,
    length: Size,
  ) -> Result<(), AllocError> {
    if length == 0 {
      return Err(AllocError::ZeroLength);
    }

    if !self.space.contains_range(address, length) {
      return Err(AllocError::OutOfRange { address, length });
    }

    if length % self.space.granularity != 0 || !self.space.is_aligned(address) {
      return Err(AllocError::MisalignedRange { address, length });
    }

    let released = FreeRange::new(address, length);
    let below = self.range_at_or_before(address);
    let above = self
      .free
      .range((Excluded(address), Unbounded))
      .next()
      .map(|(&start, &length)| FreeRange::new(start, length));

    let overlaps_free = below.is_some_and(|range| range.overlaps(&released))
      || above.is_some_and(|range| range.overlaps(&released));
    if overlaps_free {
      return Err(AllocError::NotAllocated { address, length });
    }

    let mut merged = released;

    if let Some(below) = below.filter(|range| range.touches(&released)) {
      trace!(start = below.start, length = below.length, "merging with free range below");
      self.free.remove(&below.start);
      merged.start = below.start;
      merged.length += below.length;
    }

    if let Some(above) = above.filter(|range| range.touches(&released)) {
      trace!(start = above.start, length = above.length, "merging with free range above");
      self.free.remove(&above.start);
      merged.length += above.length;
    }

    self.free.insert(merged.start, merged.length);
    Ok(())
  }

  /// The free range starting at or before `address`, if any. It does not
  /// necessarily reach `address`.
  fn range_at_or_before(
    &self,
    address: Address,
  ) -> Option<FreeRange> {
    self
      .free
      .range(..=address)
      .next_back()
      .map(|(&start, &length)| FreeRange::new(start, length))
  }

  /// Removes `[address, address + length)` from `range`, which must be in the
  /// free map and cover it, keeping whatever is left on either side.
  fn carve(
    &mut self,
    range: FreeRange,
    address: Address,
    length: Size,
  ) {
    debug_assert!(range.covers(address, length));

    self.free.remove(&range.start);

    let head = address - range.start;
    if head > 0 {
      self.free.insert(range.start, head);
    }

    let tail_start = address + length;
    let tail = range.end() - tail_start;
    if tail > 0 {
      self.free.insert(tail_start, tail);
    }
  }
}

struct Hex(usize);

impl fmt::Debug for Hex {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}

struct FreeMap<'a>(&'a BTreeMap<Address, Size>);

impl fmt::Debug for FreeMap<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_map()
      .entries(self.0.iter().map(|(&start, &length)| (Hex(start), length)))
      .finish()
  }
}

impl fmt::Debug for RangeAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("RangeAllocator")
      .field("space", &self.space)
      .field("free", &FreeMap(&self.free))
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: Address = 0x10_0000;
  const LENGTH: Size = 1312;
  const GRANULARITY: Size = 8;

  fn allocator() -> RangeAllocator {
    RangeAllocator::new(BASE, LENGTH, GRANULARITY)
  }

  fn full() -> RangeAllocator {
    let mut allocator = allocator();
    allocator.allocate(LENGTH, Placement::Any).unwrap();
    assert_eq!(allocator.free_range_count(), 0);
    allocator
  }

  #[test]
  fn test_initial_free_map() {
    let allocator = allocator();

    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
    assert_eq!(allocator.free_bytes(), LENGTH);
    assert_eq!(allocator.allocated_bytes(), 0);
  }

  #[test]
  fn test_zero_length_allocation_is_rejected() {
    let mut allocator = allocator();

    for placement in [
      Placement::Any,
      Placement::Exact(BASE),
      Placement::Above(BASE),
      Placement::Below(BASE + 64),
    ] {
      assert_eq!(allocator.allocate(0, placement), Err(AllocError::ZeroLength));
    }

    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
  }

  #[test]
  fn test_allocate_any_rounds_to_granularity() {
    let mut allocator = allocator();

    assert_eq!(allocator.allocate(43, Placement::Any), Ok(BASE));
    assert_eq!(allocator.allocate(3, Placement::Any), Ok(BASE + 48));
    assert_eq!(allocator.allocate(100, Placement::Any), Ok(BASE + 56));

    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + 160, LENGTH - 160)])
    );
  }

  #[test]
  fn test_allocate_any_is_first_fit() {
    let mut allocator = full();
    allocator.free(BASE + 64, 64).unwrap();
    allocator.free(BASE + 256, 16).unwrap();
    allocator.free(BASE + 512, 256).unwrap();

    // The 16 byte hole would be the best fit; the 64 byte one comes first.
    assert_eq!(allocator.allocate(16, Placement::Any), Ok(BASE + 64));
    assert_eq!(allocator.allocate(100, Placement::Any), Ok(BASE + 512));
    assert_eq!(
      allocator.allocate(512, Placement::Any),
      Err(AllocError::NoSpace { length: 512 })
    );
  }

  #[test]
  fn test_allocate_any_after_exact() {
    let mut allocator = allocator();

    allocator.allocate(56, Placement::Exact(BASE + 48)).unwrap();

    assert_eq!(allocator.allocate(100, Placement::Any), Ok(BASE + 48 + 56));
  }

  #[test]
  fn test_allocate_exact_splits_range() {
    let mut allocator = allocator();

    assert_eq!(allocator.allocate(7, Placement::Exact(BASE + 48)), Ok(BASE + 48));

    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE, 48), (BASE + 56, LENGTH - 56)])
    );
    assert_eq!(allocator.free_bytes(), LENGTH - 8);
  }

  #[test]
  fn test_allocate_exact_misaligned_hint() {
    let mut allocator = allocator();

    assert_eq!(
      allocator.allocate(7, Placement::Exact(BASE + 50)),
      Err(AllocError::MisalignedHint { hint: BASE + 50 })
    );
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
  }

  #[test]
  fn test_allocate_exact_inside_allocation() {
    let mut allocator = allocator();

    allocator.allocate(LENGTH / 2, Placement::Exact(BASE)).unwrap();

    assert_eq!(
      allocator.allocate(8, Placement::Exact(BASE + LENGTH / 4)),
      Err(AllocError::NotFree {
        address: BASE + LENGTH / 4,
        length: 8,
      })
    );
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + LENGTH / 2, LENGTH / 2)])
    );
  }

  #[test]
  fn test_allocate_exact_partially_free() {
    let mut allocator = allocator();

    allocator
      .allocate(LENGTH / 2, Placement::Exact(BASE + LENGTH / 2))
      .unwrap();

    // The lower half of the target is free, the upper half is not.
    assert!(
      allocator
        .allocate(LENGTH / 2, Placement::Exact(BASE + LENGTH / 4))
        .is_err()
    );
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH / 2)]));
  }

  #[test]
  fn test_allocate_exact_past_the_end() {
    let mut allocator = allocator();

    assert_eq!(
      allocator.allocate(16, Placement::Exact(BASE + LENGTH - 8)),
      Err(AllocError::NotFree {
        address: BASE + LENGTH - 8,
        length: 16,
      })
    );
  }

  #[test]
  fn test_allocate_all_exact() {
    let mut allocator = allocator();

    allocator.allocate(LENGTH, Placement::Exact(BASE)).unwrap();
    assert_eq!(allocator.free_range_count(), 0);
    assert_eq!(allocator.allocated_bytes(), LENGTH);

    let mut allocator = self::allocator();
    allocator.allocate(LENGTH / 2, Placement::Exact(BASE)).unwrap();
    allocator
      .allocate(LENGTH / 2, Placement::Exact(BASE + LENGTH / 2))
      .unwrap();
    assert_eq!(allocator.free_range_count(), 0);
  }

  #[test]
  fn test_allocate_all_any() {
    let mut allocator = allocator();

    allocator.allocate(LENGTH / 2, Placement::Any).unwrap();
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + LENGTH / 2, LENGTH / 2)])
    );

    // 655 rounds up to the remaining 656.
    allocator.allocate((LENGTH - 1) / 2, Placement::Any).unwrap();
    assert_eq!(allocator.free_range_count(), 0);
  }

  #[test]
  fn test_allocate_above() {
    let mut allocator = allocator();

    let address = allocator.allocate(100, Placement::Above(BASE + 1000)).unwrap();

    assert_eq!(address, BASE + LENGTH - 104);
    assert!(address > BASE + 1000);
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE, LENGTH - 104)])
    );
  }

  #[test]
  fn test_allocate_above_skips_small_ranges() {
    let mut allocator = full();
    allocator.free(BASE + 128, 256).unwrap();
    allocator.free(BASE + 1024, 32).unwrap();

    // The top hole is too small, the next one down takes it at its tail.
    assert_eq!(allocator.allocate(64, Placement::Above(BASE + 64)), Ok(BASE + 320));
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + 128, 192), (BASE + 1024, 32)])
    );
  }

  #[test]
  fn test_allocate_above_respects_hint() {
    let mut allocator = full();
    allocator.free(BASE + 128, 256).unwrap();

    // A tail placement would start at 320, below the hint.
    assert_eq!(
      allocator.allocate(64, Placement::Above(BASE + 328)),
      Err(AllocError::NoSpace { length: 64 })
    );
    assert_eq!(allocator.allocate(64, Placement::Above(BASE + 320)), Ok(BASE + 320));
  }

  #[test]
  fn test_allocate_below() {
    let mut allocator = allocator();

    let address = allocator.allocate(100, Placement::Below(BASE + 1000)).unwrap();

    assert_eq!(address, BASE);
    assert!(address < BASE + 1000);
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + 104, LENGTH - 104)])
    );
  }

  #[test]
  fn test_allocate_below_respects_hint() {
    let mut allocator = full();
    allocator.free(BASE + 128, 256).unwrap();
    allocator.free(BASE + 1024, 32).unwrap();

    assert_eq!(
      allocator.allocate(64, Placement::Below(BASE + 184)),
      Err(AllocError::NoSpace { length: 64 })
    );
    assert_eq!(allocator.allocate(64, Placement::Below(BASE + 192)), Ok(BASE + 128));
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + 192, 192), (BASE + 1024, 32)])
    );
  }

  #[test]
  fn test_hint_outside_of_space() {
    let mut allocator = allocator();

    assert_eq!(
      allocator.allocate(100, Placement::Exact(BASE - 1)),
      Err(AllocError::OutOfRange {
        address: BASE - 1,
        length: 104,
      })
    );
    assert_eq!(
      allocator.allocate(100, Placement::Above(BASE + LENGTH)),
      Err(AllocError::OutOfRange {
        address: BASE + LENGTH,
        length: 104,
      })
    );
    // Inside the space, but nothing fits below the very first address.
    assert_eq!(
      allocator.allocate(100, Placement::Below(BASE)),
      Err(AllocError::NoSpace { length: 104 })
    );
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
  }

  #[test]
  fn test_allocate_overflowing_length() {
    let mut allocator = allocator();

    assert_eq!(
      allocator.allocate(usize::MAX, Placement::Any),
      Err(AllocError::NoSpace { length: usize::MAX })
    );
  }

  #[test]
  fn test_free_restores_single_range() {
    let mut allocator = allocator();

    allocator.allocate(7, Placement::Exact(BASE + 48)).unwrap();
    allocator.free(BASE + 48, 8).unwrap();

    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
  }

  #[test]
  fn test_free_from_full() {
    let mut allocator = full();
    allocator.free(BASE, LENGTH).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));

    let mut allocator = full();
    allocator.free(BASE + LENGTH / 2, LENGTH / 2).unwrap();
    assert_eq!(
      allocator.dump_free_ranges(),
      BTreeMap::from([(BASE + LENGTH / 2, LENGTH / 2)])
    );

    let mut allocator = full();
    allocator.free(BASE, LENGTH / 2).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH / 2)]));
  }

  #[test]
  fn test_free_merges_in_either_order() {
    let mut allocator = full();
    allocator.free(BASE + 48, 32).unwrap();
    allocator.free(BASE + 80, 48).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE + 48, 80)]));

    let mut allocator = full();
    allocator.free(BASE + 80, 48).unwrap();
    allocator.free(BASE + 48, 32).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE + 48, 80)]));
  }

  #[test]
  fn test_free_merges_both_sides() {
    let mut allocator = full();

    allocator.free(BASE + 80, 48).unwrap();
    allocator.free(BASE + 32, 16).unwrap();
    assert_eq!(allocator.free_range_count(), 2);

    allocator.free(BASE + 48, 32).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE + 32, 96)]));
  }

  #[test]
  fn test_free_outside_of_space() {
    let mut allocator = full();

    assert_eq!(
      allocator.free(BASE + 48, 2624),
      Err(AllocError::OutOfRange {
        address: BASE + 48,
        length: 2624,
      })
    );
    assert_eq!(
      allocator.free(BASE - 8, 16),
      Err(AllocError::OutOfRange {
        address: BASE - 8,
        length: 16,
      })
    );
    assert_eq!(allocator.free_range_count(), 0);
  }

  #[test]
  fn test_free_misaligned() {
    let mut allocator = full();

    assert_eq!(
      allocator.free(BASE + 48, 12),
      Err(AllocError::MisalignedRange {
        address: BASE + 48,
        length: 12,
      })
    );
    assert_eq!(
      allocator.free(BASE + 4, 8),
      Err(AllocError::MisalignedRange {
        address: BASE + 4,
        length: 8,
      })
    );
    assert_eq!(allocator.free(BASE, 0), Err(AllocError::ZeroLength));
    assert_eq!(allocator.free_range_count(), 0);
  }

  #[test]
  fn test_free_overlapping_free_space() {
    let mut allocator = full();
    allocator.free(BASE + 64, 64).unwrap();
    let before = allocator.dump_free_ranges();

    // Runs into the free range from below.
    assert_eq!(
      allocator.free(BASE + 32, 64),
      Err(AllocError::NotAllocated {
        address: BASE + 32,
        length: 64,
      })
    );
    // Starts inside the free range.
    assert!(allocator.free(BASE + 96, 64).is_err());
    // Strictly inside the free range.
    assert!(allocator.free(BASE + 72, 8).is_err());
    // Swallows the free range whole.
    assert!(allocator.free(BASE, 256).is_err());

    assert_eq!(allocator.dump_free_ranges(), before);
  }

  #[test]
  fn test_double_free() {
    let mut allocator = allocator();

    let address = allocator.allocate(24, Placement::Exact(BASE + 48)).unwrap();
    allocator.free(address, 24).unwrap();

    assert_eq!(
      allocator.free(address, 24),
      Err(AllocError::NotAllocated { address, length: 24 })
    );
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(BASE, LENGTH)]));
  }

  #[test]
  fn test_is_free_and_largest() {
    let mut allocator = full();
    allocator.free(BASE + 64, 64).unwrap();
    allocator.free(BASE + 256, 128).unwrap();
    allocator.free(BASE + 512, 128).unwrap();

    assert!(allocator.is_free(BASE + 64, 64));
    assert!(allocator.is_free(BASE + 72, 8));
    assert!(!allocator.is_free(BASE + 64, 72));
    assert!(!allocator.is_free(BASE, 8));

    assert_eq!(
      allocator.largest_free_range(),
      Some(FreeRange::new(BASE + 256, 128))
    );
    assert_eq!(allocator.free_bytes(), 320);
    assert_eq!(allocator.allocated_bytes(), LENGTH - 320);
  }

  #[test]
  fn test_odd_granularity_and_base() {
    let mut allocator = RangeAllocator::new(3, 96, 24);

    assert_eq!(allocator.allocate(1, Placement::Any), Ok(3));
    assert_eq!(allocator.allocate(25, Placement::Exact(51)), Ok(51));
    assert_eq!(
      allocator.allocate(1, Placement::Exact(48)),
      Err(AllocError::MisalignedHint { hint: 48 })
    );
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(27, 24)]));
  }

  #[test]
  fn test_debug_output() {
    let allocator = RangeAllocator::new(0x1000, 64, 8);

    let output = format!("{allocator:?}");

    assert!(output.contains("RangeAllocator"));
    assert!(output.contains("0x1000: 64"));
  }

  #[test]
  #[should_panic(expected = "granularity must be non-zero")]
  fn test_zero_granularity_panics() {
    RangeAllocator::new(0, 64, 0);
  }

  #[test]
  #[should_panic(expected = "address space end overflows")]
  fn test_overflowing_space_panics() {
    RangeAllocator::new(usize::MAX - 15, 16, 8);
  }

  #[test]
  fn test_space_ending_at_top_of_addresses() {
    let base = usize::MAX - 16;
    let mut allocator = RangeAllocator::new(base, 16, 8);

    assert_eq!(allocator.allocate(8, Placement::Above(base)), Ok(base + 8));
    assert_eq!(allocator.allocate(8, Placement::Exact(base)), Ok(base));
    assert_eq!(allocator.free_range_count(), 0);

    allocator.free(base, 16).unwrap();
    assert_eq!(allocator.dump_free_ranges(), BTreeMap::from([(base, 16)]));
  }

  #[test]
  fn test_allocate_below_may_end_on_hint() {
    let mut allocator = RangeAllocator::new(0x1000, 64, 8);

    assert_eq!(allocator.allocate(8, Placement::Below(0x1008)), Ok(0x1000));
    assert_eq!(
      allocator.allocate(8, Placement::Below(0x1008)),
      Err(AllocError::NoSpace { length: 8 })
    );
  }
}
