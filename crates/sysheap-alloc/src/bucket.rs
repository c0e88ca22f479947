use sysheap_list::List;
use sysheap_sys::math::floor_log2;

use crate::{
  chunk::{
    ChunkId,
    ChunkSz,
    HeaderWidth,
  },
  raw::RawHeap,
};

/// Size class of a chunk of `size` units: `floor(log2(size - min + 1))`, so
/// bucket 0 starts at the smallest chunk that can carry links.
pub(crate) const fn bucket_index(width: HeaderWidth, size: ChunkSz) -> usize {
  let usable = size + 1 - width.min_chunk_size();
  match floor_log2(usable) {
    Some(log) => log as usize,
    None => 0,
  }
}

/// Smallest chunk size that lands in bucket `bidx`.
pub(crate) const fn bucket_min_size(width: HeaderWidth, bidx: usize) -> ChunkSz {
  (1 << bidx) + width.min_chunk_size() - 1
}

impl RawHeap {
  #[inline]
  pub(crate) fn bucket_idx(&self, size: ChunkSz) -> usize {
    debug_assert!(size >= self.min_chunk_size());
    bucket_index(self.width(), size)
  }

  pub(crate) fn free_list_add(&mut self, c: ChunkId) {
    if !self.is_solo(c) {
      let bidx = self.bucket_idx(self.size(c));
      self.free_list_add_bidx(c, bidx);
    }
  }

  pub(crate) fn free_list_add_bidx(&mut self, c: ChunkId, bidx: usize) {
    match self.bucket_head(bidx) {
      None => {
        debug_assert!(!self.avail().get(bidx));
        self.avail_mut().set(bidx);
        self.set_bucket_head(bidx, Some(c));
        List::ring(self.chunks_mut(), c);
      }
      Some(head) => {
        debug_assert!(self.avail().get(bidx));
        // New entries go just before the head, i.e. last in scan order.
        List::insert_before(self.chunks_mut(), c, head);
      }
    }
  }

  pub(crate) fn free_list_remove(&mut self, c: ChunkId) {
    if !self.is_solo(c) {
      let bidx = self.bucket_idx(self.size(c));
      self.free_list_remove_bidx(c, bidx);
    }
  }

  pub(crate) fn free_list_remove_bidx(&mut self, c: ChunkId, bidx: usize) {
    debug_assert!(!self.used(c));
    debug_assert!(self.bucket_head(bidx).is_some());
    debug_assert!(self.avail().get(bidx));

    match List::remove(self.chunks_mut(), c) {
      None => {
        self.avail_mut().clear(bidx);
        self.set_bucket_head(bidx, None);
      }
      Some(next) => self.set_bucket_head(bidx, Some(next)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bucket_index_narrow() {
    let w = HeaderWidth::Narrow;
    assert_eq!(bucket_index(w, 1), 0);
    assert_eq!(bucket_index(w, 2), 1);
    assert_eq!(bucket_index(w, 3), 1);
    assert_eq!(bucket_index(w, 4), 2);
    assert_eq!(bucket_index(w, 511), 8);
    assert_eq!(bucket_index(w, 0x7fff), 14);
  }

  #[test]
  fn test_bucket_index_wide() {
    let w = HeaderWidth::Wide;
    assert_eq!(bucket_index(w, 2), 0);
    assert_eq!(bucket_index(w, 3), 1);
    assert_eq!(bucket_index(w, 4), 1);
    assert_eq!(bucket_index(w, 5), 2);
    assert_eq!(bucket_index(w, 0x7fff_ffff), 30);
  }

  #[test]
  fn test_bucket_bounds_are_contiguous() {
    for w in [HeaderWidth::Narrow, HeaderWidth::Wide] {
      for b in 0..12 {
        let lo = bucket_min_size(w, b);
        let hi = bucket_min_size(w, b + 1) - 1;
        assert_eq!(bucket_index(w, lo), b);
        assert_eq!(bucket_index(w, hi), b);
      }
    }
  }
}
