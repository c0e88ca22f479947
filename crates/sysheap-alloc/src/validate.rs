use sysheap_bitmap::Bitmap;
use sysheap_list::List;

use crate::{
  chunk::ChunkId,
  error::{
    ValidateError,
    ValidateResult,
  },
  heap::SysHeap,
  raw::RawHeap,
};

/// Entries marked per bucket during the list pass.
type Marks = [usize; Bitmap::BITS];

impl RawHeap {
  /// Bounds and boundary tags of a chunk that should sit inside the chunk
  /// region. Nothing outside the span is read.
  fn valid_chunk(&self, c: ChunkId) -> bool {
    let end = self.end_chunk();
    if c < self.first_chunk() || c >= end {
      return false;
    }

    let size = self.size(c);
    let left = self.left_size(c);
    if size == 0 || c + size > end || left == 0 || left > c {
      return false;
    }
    self.left_size(c + size) == size && self.size(c - left) == left
  }

  /// Walks every chunk once, left to right.
  fn check_layout(&self) -> ValidateResult<()> {
    let end = self.end_chunk();
    let chunk0 = self.size(0);
    if !self.used(0) || chunk0 == 0 || chunk0 >= end {
      return Err(ValidateError::BadChunk { chunk: 0 });
    }

    let mut prev = 0;
    let mut c = chunk0;
    while c < end {
      let size = self.size(c);
      if size == 0 {
        return Err(ValidateError::BadChunk { chunk: c });
      }
      if c + size > end {
        return Err(ValidateError::Overrun { end });
      }
      if self.left_size(c) != c - prev || !self.valid_chunk(c) {
        return Err(ValidateError::BadChunk { chunk: c });
      }
      if !self.used(c) && !self.used(prev) {
        return Err(ValidateError::AdjacentFree { chunk: c });
      }
      prev = c;
      c += size;
    }

    if c != end {
      return Err(ValidateError::Overrun { end });
    }
    if self.size(end) != 0 || !self.used(end) || self.left_size(end) != end - prev {
      return Err(ValidateError::BadChunk { chunk: end });
    }
    Ok(())
  }

  /// Walks each bucket ring, marking every entry used so duplicates and
  /// stray chunks stand out.
  fn check_buckets(&mut self, marks: &mut Marks) -> ValidateResult<()> {
    let avail = self.avail();
    let nb_buckets = self.nb_buckets();
    if let Some(bucket) = avail.find_fs_from(nb_buckets) {
      return Err(ValidateError::BucketMismatch { bucket });
    }

    for bucket in 0..nb_buckets {
      let head = self.bucket_head(bucket);
      if avail.get(bucket) != head.is_some() {
        return Err(ValidateError::BucketMismatch { bucket });
      }
      let Some(head) = head else {
        continue;
      };

      let mut c = head;
      loop {
        if !self.valid_chunk(c) {
          return Err(ValidateError::BadChunk { chunk: c });
        }
        if self.used(c) || self.is_solo(c) {
          return Err(ValidateError::DuplicateOrUsed { bucket, chunk: c });
        }
        if self.bucket_idx(self.size(c)) != bucket {
          return Err(ValidateError::WrongBucket { bucket, chunk: c });
        }

        let next = self.free_next(c);
        for link in [next, self.free_prev(c)] {
          if !self.valid_chunk(link) || self.is_solo(link) {
            return Err(ValidateError::BadChunk { chunk: link });
          }
        }
        if !List::is_consistent(self.chunks(), c) {
          return Err(ValidateError::DuplicateOrUsed { bucket, chunk: c });
        }

        self.set_used(c, true);
        marks[bucket] += 1;

        c = next;
        if c == head {
          break;
        }
      }
    }
    Ok(())
  }

  /// After marking, any free chunk left is one no bucket knows about.
  fn check_listed(&self) -> ValidateResult<()> {
    let end = self.end_chunk();
    let mut c = self.first_chunk();
    while c < end {
      if !self.used(c) && !self.is_solo(c) {
        return Err(ValidateError::MissingFromList { chunk: c });
      }
      c = self.right(c);
    }
    Ok(())
  }

  /// Undoes exactly the marks `check_buckets` made, retracing the same links.
  fn unmark(&mut self, marks: &Marks) {
    let nb_buckets = self.nb_buckets();
    for (bucket, &count) in marks.iter().enumerate().take(nb_buckets) {
      if count == 0 {
        continue;
      }
      let Some(mut c) = self.bucket_head(bucket) else {
        continue;
      };
      for _ in 0..count {
        self.set_used(c, false);
        c = self.free_next(c);
      }
    }
  }
}

impl SysHeap<'_> {
  /// Full consistency check of the chunk layout and the buckets.
  ///
  /// Runs in linear time and briefly flips used bits of free chunks as visit
  /// marks; they are always restored before returning.
  pub fn check(&mut self) -> ValidateResult<()> {
    let raw = self.raw_mut();
    let mut result = raw.check_layout();

    if result.is_ok() {
      let mut marks = [0; Bitmap::BITS];
      result = raw.check_buckets(&mut marks).and_then(|()| raw.check_listed());
      raw.unmark(&marks);
    }

    if let Err(err) = result {
      log::warn!("sys_heap validation failed: {err}");
    }
    result
  }

  pub fn validate(&mut self) -> bool {
    self.check().is_ok()
  }
}
