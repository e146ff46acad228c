/// Rounds `value` up to the next multiple of `granularity`.
///
/// Unlike a power-of-two mask this works for any non-zero granularity, which
/// is what an address space carved in e.g. 24 byte units needs. The caller is
/// responsible for overflow; use [`checked_align_to`] when `value` comes from
/// outside.
///
/// # Examples
///
/// ```rust
/// use rangealloc::align_to;
///
/// assert_eq!(align_to!(43, 8), 48);
/// assert_eq!(align_to!(48, 8), 48);
/// assert_eq!(align_to!(0, 8), 0);
/// assert_eq!(align_to!(25, 24), 48);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $granularity:expr) => {
    (($value + $granularity - 1) / $granularity) * $granularity
  };
}

/// Overflow-checked version of [`align_to!`].
pub fn checked_align_to(
  value: usize,
  granularity: usize,
) -> Option<usize> {
  value.checked_add(granularity - 1)?;
  Some(align_to!(value, granularity))
}

/// Whether `address` sits on the grid of `granularity` units starting at `base`.
///
/// Addresses below `base` are never aligned.
pub fn is_aligned(
  address: usize,
  base: usize,
  granularity: usize,
) -> bool {
  address >= base && (address - base) % granularity == 0
}
