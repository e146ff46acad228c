use crate::{Address, Size};

/// Why an allocate or free request was turned down.
///
/// Every variant is reported before the free map is touched, so a failed call
/// leaves the allocator exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  /// A zero-length request. Nothing is allocated or freed.
  #[error("zero-length request")]
  ZeroLength,

  /// The hint, or the span being freed, falls outside the managed space.
  #[error("range {address:#x}+{length:#x} is outside of the managed address space")]
  OutOfRange {
    address: Address,
    length: Size,
  },

  /// An exact-placement hint is not on the granularity grid.
  #[error("hint {hint:#x} does not match the granularity grid")]
  MisalignedHint { hint: Address },

  /// The address or length given to `free` is not on the granularity grid.
  #[error("range {address:#x}+{length:#x} does not match the granularity grid")]
  MisalignedRange {
    address: Address,
    length: Size,
  },

  /// No free range satisfies the placement constraint.
  #[error("no free range can hold {length:#x} bytes")]
  NoSpace { length: Size },

  /// An exact-placement target is not entirely free.
  #[error("range {address:#x}+{length:#x} is not entirely free")]
  NotFree {
    address: Address,
    length: Size,
  },

  /// The span being freed overlaps memory that is already free, either
  /// because it was never allocated or because it was freed before.
  #[error("range {address:#x}+{length:#x} is not entirely allocated")]
  NotAllocated {
    address: Address,
    length: Size,
  },
}
