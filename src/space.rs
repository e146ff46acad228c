use crate::{Address, Size, align};

/// The fixed interval an allocator manages: `[base, base + length)`, carved
/// in units of `granularity`.
///
/// All addresses handed out or accepted back lie on the grid
/// `base + k * granularity`. The space itself never changes after the
/// allocator is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressSpace {
  pub base: Address,
  pub length: Size,
  pub granularity: Size,
}

impl AddressSpace {
  pub fn new(
    base: Address,
    length: Size,
    granularity: Size,
  ) -> Self {
    Self {
      base,
      length,
      granularity,
    }
  }

  /// One past the highest managed address.
  pub fn end(&self) -> Address {
    self.base + self.length
  }

  /// [`AddressSpace::end`], or `None` if the space runs past `usize::MAX`.
  pub fn checked_end(&self) -> Option<Address> {
    self.base.checked_add(self.length)
  }

  pub fn contains(
    &self,
    address: Address,
  ) -> bool {
    address >= self.base && address < self.end()
  }

  /// Whether `[address, address + length)` fits inside the space.
  pub fn contains_range(
    &self,
    address: Address,
    length: Size,
  ) -> bool {
    match address.checked_add(length) {
      Some(end) => address >= self.base && end <= self.end(),
      None => false,
    }
  }

  /// Whether `address` lies on the granularity grid anchored at `base`.
  pub fn is_aligned(
    &self,
    address: Address,
  ) -> bool {
    align::is_aligned(address, self.base, self.granularity)
  }

  /// Rounds a request up to whole granularity units, `None` on overflow.
  pub fn round_length(
    &self,
    length: Size,
  ) -> Option<Size> {
    align::checked_align_to(length, self.granularity)
  }
}
