use getset::CopyGetters;

pub const DEFAULT_ALLOC_LOOPS: u32 = 3;

/// Runtime knobs of a heap, fixed at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
pub struct HeapConfig {
  /// Entries of the exact bucket tried before falling back to a larger one.
  #[getset(get_copy = "pub")]
  alloc_loops: u32,
}

impl HeapConfig {
  pub const fn new() -> Self {
    Self {
      alloc_loops: DEFAULT_ALLOC_LOOPS,
    }
  }

  /// Values below one are raised to one.
  pub const fn with_alloc_loops(mut self, loops: u32) -> Self {
    self.alloc_loops = if loops == 0 { 1 } else { loops };
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}
