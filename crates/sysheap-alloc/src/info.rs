use getset::CopyGetters;
use sysheap_bitmap::Bitmap;
use sysheap_list::ListIter;

use crate::{
  bucket::bucket_min_size,
  chunk::{
    CHUNK_UNIT,
    ChunkBuf,
    ChunkId,
    ChunkState,
    ChunkSz,
  },
  heap::SysHeap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ChunkInfo {
  id: ChunkId,
  size: ChunkSz,
  left_size: ChunkSz,
  state: ChunkState,
}

impl ChunkInfo {
  pub fn used(&self) -> bool {
    self.state == ChunkState::Used
  }
}

/// Iterates the chunks after the control chunk in address order.
pub struct ChunkWalk<'heap> {
  chunks: &'heap ChunkBuf,
  next: ChunkId,
}

impl Iterator for ChunkWalk<'_> {
  type Item = ChunkInfo;

  fn next(&mut self) -> Option<ChunkInfo> {
    let c = self.next;
    let end = self.chunks.end();
    if c >= end {
      return None;
    }

    let size = self.chunks.size(c);
    // A zero size would never advance; stop at the end instead.
    self.next = if size == 0 { end } else { (c + size).min(end) };
    Some(ChunkInfo {
      id: c,
      size,
      left_size: self.chunks.left_size(c),
      state: self.chunks.state(c),
    })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BucketInfo {
  /// Smallest chunk size filed here, in units.
  min_size: ChunkSz,
  entries: usize,
  /// Largest chunk in the bucket, in units.
  largest: ChunkSz,
  free_bytes: usize,
}

/// Snapshot of a heap's free lists and totals.
///
/// Byte totals count payload only; header and control bytes go to
/// `overhead_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
pub struct HeapInfo {
  #[getset(get_copy = "pub")]
  nb_buckets: usize,
  buckets: [BucketInfo; Bitmap::BITS],
  #[getset(get_copy = "pub")]
  free_bytes: usize,
  #[getset(get_copy = "pub")]
  allocated_bytes: usize,
  #[getset(get_copy = "pub")]
  overhead_bytes: usize,
}

impl HeapInfo {
  pub fn buckets(&self) -> &[BucketInfo] {
    &self.buckets[..self.nb_buckets]
  }
}

impl SysHeap<'_> {
  pub fn chunks(&self) -> ChunkWalk<'_> {
    let raw = self.raw();
    ChunkWalk {
      chunks: raw.chunks(),
      next: raw.first_chunk(),
    }
  }

  pub fn info(&self) -> HeapInfo {
    let raw = self.raw();
    let width = raw.width();
    let end = raw.end_chunk();
    let nb_buckets = raw.nb_buckets();

    let mut buckets = [BucketInfo::default(); Bitmap::BITS];
    for (b, info) in buckets.iter_mut().enumerate().take(nb_buckets) {
      info.min_size = bucket_min_size(width, b);
      // A damaged ring may never return to its head.
      for c in ListIter::new(raw.chunks(), raw.bucket_head(b)).take(end) {
        let size = raw.size(c);
        info.entries += 1;
        info.largest = info.largest.max(size);
        info.free_bytes += raw.chunksz_to_bytes(size);
      }
    }

    let mut free_bytes = 0;
    let mut allocated_bytes = 0;
    for chunk in self.chunks() {
      match chunk.state() {
        ChunkState::Used => allocated_bytes += raw.chunksz_to_bytes(chunk.size()),
        ChunkState::Free { .. } => free_bytes += raw.chunksz_to_bytes(chunk.size()),
        ChunkState::SoloFree => {}
      }
    }

    HeapInfo {
      nb_buckets,
      buckets,
      free_bytes,
      allocated_bytes,
      overhead_bytes: end * CHUNK_UNIT - free_bytes - allocated_bytes,
    }
  }

  /// Logs the bucket census and totals, and optionally every chunk.
  pub fn print_info(&self, dump_chunks: bool) {
    let raw = self.raw();
    let info = self.info();
    let total = raw.end_chunk() * CHUNK_UNIT;

    log::info!(
      "heap at {:p} contains {} units in {} buckets",
      raw.base(),
      raw.end_chunk(),
      info.nb_buckets()
    );
    log::info!("  bucket#    min units    total chunks    largest units    largest bytes");
    for (b, bucket) in info.buckets().iter().enumerate() {
      if bucket.entries() == 0 {
        continue;
      }
      log::info!(
        "  {:7} {:12} {:15} {:16} {:16}",
        b,
        bucket.min_size(),
        bucket.entries(),
        bucket.largest(),
        raw.chunksz_to_bytes(bucket.largest())
      );
    }

    let overhead = info.overhead_bytes();
    let permille = if total == 0 { 0 } else { 1000 * overhead / total };
    log::info!(
      "{} free bytes, {} allocated bytes, overhead = {} bytes ({}.{}%)",
      info.free_bytes(),
      info.allocated_bytes(),
      overhead,
      permille / 10,
      permille % 10
    );

    if dump_chunks {
      for chunk in self.chunks() {
        log::info!(
          "chunk {:4}: [{}] size={:<4} left={:<4} right={}",
          chunk.id(),
          if chunk.used() { '*' } else { '-' },
          chunk.size(),
          chunk.left_size(),
          chunk.id() + chunk.size()
        );
      }
    }
  }
}
