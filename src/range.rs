use crate::{Address, Size};

/// A maximal run of unallocated addresses, as stored in the free map.
///
/// ```text
///     start                          end()
///       │                              │
///       ▼                              ▼
///   ────┬──────────────────────────────┬────
///       │        length bytes          │
///   ────┴──────────────────────────────┴────
/// ```
///
/// `end()` is exclusive, so two ranges touch when one's `end()` equals the
/// other's `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FreeRange {
  pub start: Address,
  pub length: Size,
}

impl FreeRange {
  pub fn new(
    start: Address,
    length: Size,
  ) -> Self {
    Self { start, length }
  }

  /// One past the last address of the range.
  pub fn end(&self) -> Address {
    self.start + self.length
  }

  /// Whether `[address, address + length)` lies entirely inside this range.
  pub fn covers(
    &self,
    address: Address,
    length: Size,
  ) -> bool {
    match address.checked_add(length) {
      Some(end) => address >= self.start && end <= self.end(),
      None => false,
    }
  }

  /// Whether the two ranges share at least one address.
  pub fn overlaps(
    &self,
    other: &FreeRange,
  ) -> bool {
    self.start < other.end() && other.start < self.end()
  }

  /// Whether the ranges are adjacent without overlapping.
  pub fn touches(
    &self,
    other: &FreeRange,
  ) -> bool {
    self.end() == other.start || other.end() == self.start
  }
}
