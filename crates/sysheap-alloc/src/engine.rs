use crate::{
  chunk::{
    ChunkId,
    ChunkSz,
  },
  raw::RawHeap,
};

impl RawHeap {
  /// Cuts free chunk `lc` at `rc`. Both halves end up free and unlisted.
  pub(crate) fn split_chunks(&mut self, lc: ChunkId, rc: ChunkId) {
    debug_assert!(rc > lc);
    debug_assert!(rc - lc < self.size(lc));

    let sz0 = self.size(lc);
    let lsz = rc - lc;
    let rsz = sz0 - lsz;

    self.set_size(lc, lsz);
    self.set_size(rc, rsz);
    self.set_left_size(rc, lsz);
    let next = self.right(rc);
    self.set_left_size(next, rsz);
  }

  /// Joins adjacent chunks; neither may be on a free list.
  pub(crate) fn merge_chunks(&mut self, lc: ChunkId, rc: ChunkId) {
    debug_assert_eq!(self.right(lc), rc);

    let newsz = self.size(lc) + self.size(rc);
    let next = self.right(rc);

    self.set_size(lc, newsz);
    self.set_left_size(next, newsz);
  }

  /// Coalesces free chunk `c` with free neighbors and files the result.
  pub(crate) fn free_chunk(&mut self, mut c: ChunkId) {
    let rc = self.right(c);
    if !self.used(rc) {
      self.free_list_remove(rc);
      self.merge_chunks(c, rc);
    }

    let lc = self.left(c);
    if !self.used(lc) {
      self.free_list_remove(lc);
      self.merge_chunks(lc, c);
      c = lc;
    }

    self.free_list_add(c);
  }

  /// Takes a free chunk of at least `sz` units off its list.
  ///
  /// Up to `loops` entries of the matching bucket are tried, rotating the head
  /// past each miss. After that the head of the next non-empty bucket fits by
  /// construction.
  pub(crate) fn alloc_chunk(&mut self, sz: ChunkSz, loops: u32) -> Option<ChunkId> {
    if sz >= self.end_chunk() {
      return None;
    }

    let bi = self.bucket_idx(sz);
    if bi >= self.nb_buckets() {
      return None;
    }

    if let Some(first) = self.bucket_head(bi) {
      let mut left = loops.max(1);
      loop {
        let c = self.bucket_head(bi)?;
        if self.size(c) >= sz {
          self.free_list_remove_bidx(c, bi);
          return Some(c);
        }

        let next = self.free_next(c);
        self.set_bucket_head(bi, Some(next));
        left -= 1;
        if left == 0 || next == first {
          break;
        }
      }
    }

    let bi = self
      .avail()
      .find_fs_from(bi + 1)
      .filter(|&b| b < self.nb_buckets())?;
    let c = self.bucket_head(bi)?;
    debug_assert!(self.size(c) >= sz);
    self.free_list_remove_bidx(c, bi);
    Some(c)
  }
}
