use core::{
  marker::PhantomData,
  ptr::{
    self,
    NonNull,
  },
};

use getset::CopyGetters;
use sysheap_bitmap::Bitmap;
use sysheap_sys::math::{
  align_offset,
  align_ptr,
};

use crate::{
  bucket::bucket_index,
  chunk::{
    CHUNK_UNIT,
    ChunkId,
    ChunkSz,
    HeaderWidth,
    chunksz,
  },
  config::HeapConfig,
  error::{
    HeapError,
    HeapResult,
  },
  raw::{
    RawHeap,
    control_bytes,
  },
  stats::MemoryStats,
};

/// A heap carved out of one borrowed span.
///
/// All bookkeeping lives inside the span itself; the handle only caches the
/// header width, the configuration and the byte counters. Calls must be
/// serialized by the owner, see `sysheap-sync` for a locked wrapper.
#[derive(Debug, CopyGetters)]
pub struct SysHeap<'mem> {
  raw: RawHeap,
  #[getset(get_copy = "pub")]
  config: HeapConfig,
  stats: MemoryStats,
  _mem: PhantomData<&'mem mut [u8]>,
}

unsafe impl Send for SysHeap<'_> {}

impl<'mem> SysHeap<'mem> {
  pub fn new(mem: &'mem mut [u8]) -> HeapResult<Self> {
    Self::with_config(mem, HeapConfig::default())
  }

  pub fn with_config(mem: &'mem mut [u8], config: HeapConfig) -> HeapResult<Self> {
    let bytes = mem.len();
    let base = NonNull::from(mem).cast::<u8>();
    unsafe { Self::from_raw(base, bytes, config) }
  }

  /// Lays a heap over `bytes` bytes at `mem`.
  ///
  /// The start is rounded up to a chunk boundary and the tail keeps room for
  /// the end marker, so any span works as long as it is large enough.
  ///
  /// # Safety
  ///
  /// `mem` must be valid for reads and writes of `bytes` bytes for `'mem` and
  /// must not be accessed through any other path while the heap lives.
  pub unsafe fn from_raw(mem: NonNull<u8>, bytes: usize, config: HeapConfig) -> HeapResult<Self> {
    let addr = mem.as_ptr() as usize;
    let footer = HeaderWidth::for_chunks(bytes / CHUNK_UNIT).header_bytes();
    let start = align_offset(addr, CHUNK_UNIT).ok_or(HeapError::InvalidPointer)?;

    let heap_sz = bytes.saturating_sub(start + footer) / CHUNK_UNIT;
    let width = HeaderWidth::for_chunks(heap_sz);
    if heap_sz > width.max_chunks() {
      return Err(HeapError::TooBig { chunks: heap_sz });
    }

    let nb_buckets = bucket_index(width, heap_sz) + 1;
    Bitmap::check(nb_buckets)?;

    let chunk0_size = chunksz(control_bytes(nb_buckets));
    let min_chunks = chunk0_size + width.min_chunk_size();
    if heap_sz < min_chunks {
      return Err(HeapError::TooSmall {
        have: bytes,
        need: start + min_chunks * CHUNK_UNIT + footer,
      });
    }

    let base = unsafe { mem.add(start) };
    let raw = unsafe { RawHeap::format(base, heap_sz, chunk0_size, nb_buckets, width) };
    let free = heap_sz - chunk0_size;
    log::debug!("sys_heap at {base:p}: {heap_sz} units, {width:?} headers, {nb_buckets} buckets, {free} free");

    Ok(Self {
      raw,
      config,
      stats: MemoryStats::new(free),
      _mem: PhantomData,
    })
  }

  pub(crate) fn raw(&self) -> &RawHeap {
    &self.raw
  }

  pub(crate) fn raw_mut(&mut self) -> &mut RawHeap {
    &mut self.raw
  }

  pub fn header_width(&self) -> HeaderWidth {
    self.raw.width()
  }

  /// Chunk units taken by the control structure.
  pub fn overhead_chunks(&self) -> ChunkSz {
    self.raw.first_chunk()
  }

  /// Chunk units available to allocations on an empty heap.
  pub fn capacity_chunks(&self) -> ChunkSz {
    self.raw.end_chunk() - self.overhead_chunks()
  }

  pub fn runtime_stats(&self) -> MemoryStats {
    self.stats
  }

  pub fn reset_max(&mut self) {
    self.stats.reset_max();
  }

  fn size_too_big(&self, bytes: usize) -> bool {
    bytes / CHUNK_UNIT >= self.raw.end_chunk()
  }

  fn take_chunk(&mut self, sz: ChunkSz) -> Option<ChunkId> {
    let c = self.raw.alloc_chunk(sz, self.config.alloc_loops());
    if c.is_none() {
      log::trace!("sys_heap: no chunk of {sz} units");
    }
    c
  }

  fn mark_used(&mut self, c: ChunkId) {
    self.raw.set_used(c, true);
    self.stats.claim(self.raw.size(c));
  }

  fn release_chunk(&mut self, c: ChunkId) {
    let sz = self.raw.size(c);
    self.raw.set_used(c, false);
    self.raw.free_chunk(c);
    self.stats.release(sz);
  }

  pub fn alloc(&mut self, bytes: usize) -> Option<NonNull<u8>> {
    if bytes == 0 || self.size_too_big(bytes) {
      return None;
    }

    let chunk_sz = self.raw.bytes_to_chunksz(bytes);
    let c = self.take_chunk(chunk_sz)?;

    if self.raw.size(c) > chunk_sz {
      self.raw.split_chunks(c, c + chunk_sz);
      self.raw.free_list_add(c + chunk_sz);
    }

    self.mark_used(c);
    self.paranoid_check();
    Some(self.raw.mem(c))
  }

  /// Allocates `bytes` at a multiple of `align`, which must be a power of two.
  pub fn aligned_alloc(&mut self, align: usize, bytes: usize) -> Option<NonNull<u8>> {
    if !align.is_power_of_two() {
      log::warn!("sys_heap: alignment {align} is not a power of two");
      return None;
    }

    let hdr = self.raw.header_bytes();
    if align <= hdr {
      return self.alloc(bytes);
    }
    if bytes == 0 || self.size_too_big(bytes) {
      return None;
    }

    // Worst case the payload lands `align - hdr` bytes into the chunk.
    let padded = bytes.checked_add(align - hdr)?;
    if self.size_too_big(padded) {
      return None;
    }

    let c0 = self.take_chunk(self.raw.bytes_to_chunksz(padded))?;
    let Some(mem) = (unsafe { align_ptr(self.raw.mem(c0), align) }) else {
      self.raw.free_list_add(c0);
      return None;
    };

    let c = self.raw.mem_to_chunkid(mem.as_ptr() as usize);
    let end_off = self.raw.offset_of(mem.as_ptr() as usize) + bytes;
    let c_end = end_off.div_ceil(CHUNK_UNIT);

    if c > c0 {
      self.raw.split_chunks(c0, c);
      self.raw.free_list_add(c0);
    }
    if self.raw.right(c) > c_end {
      self.raw.split_chunks(c, c_end);
      self.raw.free_list_add(c_end);
    }

    self.mark_used(c);
    self.paranoid_check();
    Some(mem)
  }

  /// # Safety
  ///
  /// `ptr` must be null or a live allocation of this heap. On success the old
  /// allocation must not be used again unless the same pointer was returned.
  pub unsafe fn realloc(&mut self, ptr: *mut u8, bytes: usize) -> Option<NonNull<u8>> {
    unsafe { self.aligned_realloc(ptr, 0, bytes) }
  }

  /// Resizes an allocation, keeping it at a multiple of `align` (zero for no
  /// constraint). A pointer that is not already aligned is moved.
  ///
  /// Grows into a free right neighbor or shrinks in place when it can, and
  /// otherwise copies. If the copy target cannot be allocated the original is
  /// left untouched and `None` is returned.
  ///
  /// # Safety
  ///
  /// Same contract as [`SysHeap::realloc`].
  pub unsafe fn aligned_realloc(
    &mut self,
    ptr: *mut u8,
    align: usize,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let Some(ptr) = NonNull::new(ptr) else {
      return self.alloc_aligned_or_plain(align, bytes);
    };
    if bytes == 0 {
      unsafe { self.free(ptr.as_ptr()) };
      return None;
    }
    if align != 0 && !align.is_power_of_two() {
      log::warn!("sys_heap: alignment {align} is not a power of two");
      return None;
    }
    if self.size_too_big(bytes) {
      return None;
    }

    let c = match self.chunk_for(ptr) {
      Ok(c) => c,
      Err(err) => panic!("sys_heap realloc({ptr:p}): {err}"),
    };
    let addr = ptr.as_ptr() as usize;
    let gap = addr - self.raw.mem(c).as_ptr() as usize;
    let need = self.raw.bytes_to_chunksz(bytes + gap);
    let size = self.raw.size(c);
    let rc = self.raw.right(c);
    let misaligned = align != 0 && addr & (align - 1) != 0;

    if !misaligned {
      if size == need {
        return Some(ptr);
      }

      if size > need {
        self.raw.split_chunks(c, c + need);
        self.raw.set_used(c, true);
        self.raw.free_chunk(c + need);
        self.stats.release(size - need);
        self.paranoid_check();
        return Some(ptr);
      }

      if !self.raw.used(rc) && size + self.raw.size(rc) >= need {
        let split_size = need - size;
        self.raw.free_list_remove(rc);
        if split_size < self.raw.size(rc) {
          self.raw.split_chunks(rc, rc + split_size);
          self.raw.free_list_add(rc + split_size);
        }
        self.raw.merge_chunks(c, rc);
        self.raw.set_used(c, true);
        self.stats.claim(split_size);
        self.paranoid_check();
        return Some(ptr);
      }
    }

    let prev_bytes = self.raw.chunksz_to_bytes(size) - gap;
    let moved = self.alloc_aligned_or_plain(align, bytes)?;
    unsafe {
      ptr::copy_nonoverlapping(ptr.as_ptr(), moved.as_ptr(), prev_bytes.min(bytes));
    }
    self.release_chunk(c);
    self.paranoid_check();
    Some(moved)
  }

  fn alloc_aligned_or_plain(&mut self, align: usize, bytes: usize) -> Option<NonNull<u8>> {
    if align == 0 {
      self.alloc(bytes)
    } else {
      self.aligned_alloc(align, bytes)
    }
  }

  /// Returns an allocation to the heap. Null is ignored.
  ///
  /// # Panics
  ///
  /// On a pointer this heap does not own, a double free, or damaged
  /// neighbor headers.
  ///
  /// # Safety
  ///
  /// The allocation must not be used after this call.
  pub unsafe fn free(&mut self, ptr: *mut u8) {
    if let Err(err) = unsafe { self.try_free(ptr) } {
      panic!("sys_heap free({ptr:p}): {err}");
    }
  }

  /// Like [`SysHeap::free`] but reports bad pointers instead of panicking.
  /// The heap is unchanged when an error is returned.
  ///
  /// # Safety
  ///
  /// The allocation must not be used after a successful call.
  pub unsafe fn try_free(&mut self, ptr: *mut u8) -> HeapResult<()> {
    let Some(ptr) = NonNull::new(ptr) else {
      return Ok(());
    };

    let c = self.chunk_for(ptr)?;
    self.release_chunk(c);
    self.paranoid_check();
    Ok(())
  }

  /// Bytes usable at `ptr`, at least what was requested for it.
  pub fn usable_size(&self, ptr: NonNull<u8>) -> HeapResult<usize> {
    let c = self.chunk_for(ptr)?;
    let gap = ptr.as_ptr() as usize - self.raw.mem(c).as_ptr() as usize;
    Ok(self.raw.chunksz_to_bytes(self.raw.size(c)) - gap)
  }

  /// Maps a payload pointer back to its used chunk, checking the boundary
  /// tags on both sides. Never reads outside the span.
  fn chunk_for(&self, ptr: NonNull<u8>) -> HeapResult<ChunkId> {
    let raw = &self.raw;
    let addr = ptr.as_ptr() as usize;
    let base = raw.base().as_ptr() as usize;
    let end = raw.end_chunk();
    let lo = base + raw.first_chunk() * CHUNK_UNIT + raw.header_bytes();
    let hi = base + end * CHUNK_UNIT;
    if addr < lo || addr >= hi {
      return Err(HeapError::InvalidPointer);
    }

    let c = raw.mem_to_chunkid(addr);
    if !raw.used(c) {
      return Err(HeapError::DoubleFree);
    }

    let sz = raw.size(c);
    let left = raw.left_size(c);
    if sz == 0 || c + sz > end || left == 0 || left > c {
      return Err(HeapError::Corrupted);
    }
    if raw.left_size(c + sz) != sz || raw.size(c - left) != left {
      return Err(HeapError::Corrupted);
    }
    Ok(c)
  }

  #[inline]
  fn paranoid_check(&mut self) {
    #[cfg(feature = "paranoid")]
    if let Err(err) = self.check() {
      panic!("sys_heap corrupted: {err}");
    }
  }
}
