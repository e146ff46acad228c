use rangealloc::{Placement, RangeAllocator};
use tracing_subscriber::EnvFilter;

/// Prints every free range, lowest address first.
fn print_free_map(
  label: &str,
  allocator: &RangeAllocator,
) {
  println!("[{}] {} free range(s), {} bytes free", label, allocator.free_range_count(), allocator.free_bytes());
  for range in allocator.free_ranges() {
    println!("    {:#x}..{:#x} ({} bytes)", range.start, range.end(), range.length);
  }
}

fn main() {
  // RUST_LOG=rangealloc=trace shows the merges too.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
    .init();

  // The same space the tests use: 1312 bytes carved in 8 byte units.
  let base = 0x10_0000;
  let mut allocator = RangeAllocator::new(base, 1312, 8);
  print_free_map("start", &allocator);

  // --------------------------------------------------------------------
  // 1) First fit. 43, 3 and 100 bytes round up to 48, 8 and 104.
  // --------------------------------------------------------------------
  let mut spans = Vec::new();
  for length in [43, 3, 100] {
    if let Ok(address) = allocator.allocate(length, Placement::Any) {
      spans.push((address, allocator.round_length(length).unwrap_or(length)));
    }
  }
  print_free_map("1: any", &allocator);

  // --------------------------------------------------------------------
  // 2) Pin 7 bytes at base + 512, splitting the remaining range in two.
  // --------------------------------------------------------------------
  if let Ok(address) = allocator.allocate(7, Placement::Exact(base + 512)) {
    spans.push((address, 8));
  }
  print_free_map("2: exact", &allocator);

  // --------------------------------------------------------------------
  // 3) A misaligned exact request is refused and changes nothing.
  // --------------------------------------------------------------------
  if let Err(error) = allocator.allocate(7, Placement::Exact(base + 50)) {
    println!("[3: exact] refused: {error}");
  }

  // --------------------------------------------------------------------
  // 4) Above and below a hint: the first lands at the top of the space,
  //    the second at the bottom of the lowest range that fits.
  // --------------------------------------------------------------------
  for placement in [Placement::Above(base + 1000), Placement::Below(base + 512)] {
    if let Ok(address) = allocator.allocate(100, placement) {
      println!("[4] {placement:?} -> {address:#x}");
      spans.push((address, 104));
    }
  }
  print_free_map("4: above/below", &allocator);

  // --------------------------------------------------------------------
  // 5) Free everything in reverse; neighbours merge back into one range.
  // --------------------------------------------------------------------
  for (address, length) in spans.into_iter().rev() {
    if let Err(error) = allocator.free(address, length) {
      println!("[5] free {address:#x}+{length} refused: {error}");
    }
  }
  print_free_map("5: freed", &allocator);

  // --------------------------------------------------------------------
  // 6) Freeing it again is a double free.
  // --------------------------------------------------------------------
  if let Err(error) = allocator.free(base, 48) {
    println!("[6] double free refused: {error}");
  }

  println!("\n{allocator:?}");
}
