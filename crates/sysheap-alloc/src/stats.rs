use getset::CopyGetters;

use crate::chunk::{
  CHUNK_UNIT,
  ChunkSz,
};

/// Byte counters in whole chunk units, so `free + allocated` stays constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct MemoryStats {
  free_bytes: usize,
  allocated_bytes: usize,
  max_allocated_bytes: usize,
}

impl MemoryStats {
  pub(crate) const fn new(free_chunks: ChunkSz) -> Self {
    Self {
      free_bytes: free_chunks * CHUNK_UNIT,
      allocated_bytes: 0,
      max_allocated_bytes: 0,
    }
  }

  pub(crate) fn claim(&mut self, chunks: ChunkSz) {
    let bytes = chunks * CHUNK_UNIT;
    self.free_bytes -= bytes;
    self.allocated_bytes += bytes;
    self.max_allocated_bytes = self.max_allocated_bytes.max(self.allocated_bytes);
  }

  pub(crate) fn release(&mut self, chunks: ChunkSz) {
    let bytes = chunks * CHUNK_UNIT;
    self.free_bytes += bytes;
    self.allocated_bytes -= bytes;
  }

  pub(crate) fn reset_max(&mut self) {
    self.max_allocated_bytes = self.allocated_bytes;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_claim_release() {
    let mut stats = MemoryStats::new(10);
    stats.claim(4);
    stats.claim(2);
    stats.release(4);

    assert_eq!(stats.free_bytes(), 8 * CHUNK_UNIT);
    assert_eq!(stats.allocated_bytes(), 2 * CHUNK_UNIT);
    assert_eq!(stats.max_allocated_bytes(), 6 * CHUNK_UNIT);

    stats.reset_max();
    assert_eq!(stats.max_allocated_bytes(), 2 * CHUNK_UNIT);
  }
}
