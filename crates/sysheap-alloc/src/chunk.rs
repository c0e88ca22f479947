use core::ptr::NonNull;

use sysheap_list::HasLink;
use sysheap_sys::math::units_ceil;

/// Granularity of every size and offset in the heap, in bytes.
pub const CHUNK_UNIT: usize = 8;

/// Offset of a chunk from the start of the heap, in chunk units.
pub type ChunkId = usize;
/// Chunk size, in chunk units.
pub type ChunkSz = usize;

const NARROW_LIMIT: ChunkSz = 0x7fff;
const WIDE_LIMIT: ChunkSz = 0x7fff_ffff;

pub const fn chunksz(bytes: usize) -> ChunkSz {
  units_ceil(bytes, CHUNK_UNIT)
}

/// Width of the packed header fields, fixed for the lifetime of a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWidth {
  /// 16-bit fields, 4-byte headers, up to 0x7fff units.
  Narrow,
  /// 32-bit fields, 8-byte headers, up to 0x7fff_ffff units.
  Wide,
}

impl HeaderWidth {
  pub const fn for_chunks(chunks: ChunkSz) -> Self {
    if chunks > NARROW_LIMIT {
      Self::Wide
    } else {
      Self::Narrow
    }
  }

  pub const fn max_chunks(self) -> ChunkSz {
    match self {
      Self::Narrow => NARROW_LIMIT,
      Self::Wide => WIDE_LIMIT,
    }
  }

  /// Bytes taken by `LEFT_SIZE` plus `SIZE_AND_USED`.
  pub const fn header_bytes(self) -> usize {
    match self {
      Self::Narrow => 4,
      Self::Wide => 8,
    }
  }

  const fn field_max(self) -> usize {
    match self {
      Self::Narrow => u16::MAX as usize,
      Self::Wide => u32::MAX as usize,
    }
  }

  pub const fn bytes_to_chunksz(self, bytes: usize) -> ChunkSz {
    chunksz(self.header_bytes().saturating_add(bytes))
  }

  pub const fn min_chunk_size(self) -> ChunkSz {
    self.bytes_to_chunksz(1)
  }

  pub const fn chunksz_to_bytes(self, size: ChunkSz) -> usize {
    size * CHUNK_UNIT - self.header_bytes()
  }
}

#[derive(Debug, Clone, Copy)]
#[repr(usize)]
enum Field {
  LeftSize = 0,
  SizeAndUsed = 1,
  FreePrev = 2,
  FreeNext = 3,
}

/// What the words at the start of a chunk currently mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
  Used,
  Free { prev: ChunkId, next: ChunkId },
  /// Free, but too small to carry list links.
  SoloFree,
}

/// Typed view over the chunk headers of one heap.
///
/// Every accessor expects `c <= end`: the end marker's header is the last
/// thing inside the span. Free-list links are only meaningful for free chunks
/// that are not solo headers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkBuf {
  base: NonNull<u8>,
  end: ChunkId,
  width: HeaderWidth,
}

impl ChunkBuf {
  /// # Safety
  ///
  /// `base` must be `CHUNK_UNIT`-aligned and valid for reads and writes of
  /// `end * CHUNK_UNIT + width.header_bytes()` bytes.
  pub(crate) const unsafe fn new(base: NonNull<u8>, end: ChunkId, width: HeaderWidth) -> Self {
    Self { base, end, width }
  }

  #[inline(always)]
  pub(crate) const fn base(&self) -> NonNull<u8> {
    self.base
  }

  #[inline(always)]
  pub(crate) const fn end(&self) -> ChunkId {
    self.end
  }

  #[inline(always)]
  pub(crate) const fn width(&self) -> HeaderWidth {
    self.width
  }

  #[inline(always)]
  pub(crate) const fn header_bytes(&self) -> usize {
    self.width.header_bytes()
  }

  #[inline(always)]
  pub(crate) const fn min_chunk_size(&self) -> ChunkSz {
    self.width.min_chunk_size()
  }

  #[inline(always)]
  pub(crate) const fn bytes_to_chunksz(&self, bytes: usize) -> ChunkSz {
    self.width.bytes_to_chunksz(bytes)
  }

  #[inline(always)]
  pub(crate) const fn chunksz_to_bytes(&self, size: ChunkSz) -> usize {
    self.width.chunksz_to_bytes(size)
  }

  #[inline(always)]
  fn cmem(&self, c: ChunkId) -> *mut u8 {
    debug_assert!(c <= self.end, "chunk {c} past end {}", self.end);
    unsafe { self.base.as_ptr().add(c * CHUNK_UNIT) }
  }

  #[inline]
  fn field(&self, c: ChunkId, f: Field) -> usize {
    let cmem = self.cmem(c);
    match self.width {
      HeaderWidth::Narrow => unsafe { cmem.cast::<u16>().add(f as usize).read() as usize },
      HeaderWidth::Wide => unsafe { cmem.cast::<u32>().add(f as usize).read() as usize },
    }
  }

  #[inline]
  fn set_field(&mut self, c: ChunkId, f: Field, val: usize) {
    debug_assert!(val <= self.width.field_max(), "{val:#x} overflows {:?}", self.width);
    let cmem = self.cmem(c);
    match self.width {
      HeaderWidth::Narrow => unsafe { cmem.cast::<u16>().add(f as usize).write(val as u16) },
      HeaderWidth::Wide => unsafe { cmem.cast::<u32>().add(f as usize).write(val as u32) },
    }
  }

  #[inline]
  pub(crate) fn size(&self, c: ChunkId) -> ChunkSz {
    self.field(c, Field::SizeAndUsed) >> 1
  }

  #[inline]
  pub(crate) fn used(&self, c: ChunkId) -> bool {
    self.field(c, Field::SizeAndUsed) & 1 != 0
  }

  #[inline]
  pub(crate) fn left_size(&self, c: ChunkId) -> ChunkSz {
    self.field(c, Field::LeftSize)
  }

  #[inline]
  pub(crate) fn free_prev(&self, c: ChunkId) -> ChunkId {
    self.field(c, Field::FreePrev)
  }

  #[inline]
  pub(crate) fn free_next(&self, c: ChunkId) -> ChunkId {
    self.field(c, Field::FreeNext)
  }

  /// Also clears the used bit; mark the chunk used afterwards if needed.
  #[inline]
  pub(crate) fn set_size(&mut self, c: ChunkId, size: ChunkSz) {
    self.set_field(c, Field::SizeAndUsed, size << 1);
  }

  #[inline]
  pub(crate) fn set_used(&mut self, c: ChunkId, used: bool) {
    let val = self.field(c, Field::SizeAndUsed);
    let val = if used { val | 1 } else { val & !1 };
    self.set_field(c, Field::SizeAndUsed, val);
  }

  #[inline]
  pub(crate) fn set_left_size(&mut self, c: ChunkId, size: ChunkSz) {
    self.set_field(c, Field::LeftSize, size);
  }

  #[inline]
  pub(crate) fn set_free_prev(&mut self, c: ChunkId, prev: ChunkId) {
    self.set_field(c, Field::FreePrev, prev);
  }

  #[inline]
  pub(crate) fn set_free_next(&mut self, c: ChunkId, next: ChunkId) {
    self.set_field(c, Field::FreeNext, next);
  }

  #[inline]
  pub(crate) fn right(&self, c: ChunkId) -> ChunkId {
    c + self.size(c)
  }

  #[inline]
  pub(crate) fn left(&self, c: ChunkId) -> ChunkId {
    c - self.left_size(c)
  }

  #[inline]
  pub(crate) fn is_solo(&self, c: ChunkId) -> bool {
    self.width == HeaderWidth::Wide && self.size(c) == 1
  }

  pub(crate) fn state(&self, c: ChunkId) -> ChunkState {
    if self.used(c) {
      ChunkState::Used
    } else if self.is_solo(c) {
      ChunkState::SoloFree
    } else {
      ChunkState::Free {
        prev: self.free_prev(c),
        next: self.free_next(c),
      }
    }
  }

  /// Payload of chunk `c`.
  #[inline]
  pub(crate) fn mem(&self, c: ChunkId) -> NonNull<u8> {
    debug_assert!(c < self.end);
    let mem = unsafe { self.base.add(c * CHUNK_UNIT + self.header_bytes()) };
    debug_assert!((mem.as_ptr() as usize) % self.header_bytes() == 0);
    mem
  }

  /// Chunk whose payload contains `addr`, which must lie past the first header.
  #[inline]
  pub(crate) fn mem_to_chunkid(&self, addr: usize) -> ChunkId {
    let base = self.base.as_ptr() as usize;
    (addr - self.header_bytes() - base) / CHUNK_UNIT
  }

  #[inline]
  pub(crate) fn offset_of(&self, addr: usize) -> usize {
    addr - self.base.as_ptr() as usize
  }
}

impl HasLink for ChunkBuf {
  type Id = ChunkId;

  fn next(&self, item: ChunkId) -> ChunkId {
    self.free_next(item)
  }

  fn prev(&self, item: ChunkId) -> ChunkId {
    self.free_prev(item)
  }

  fn set_next(&mut self, item: ChunkId, next: ChunkId) {
    self.set_free_next(item, next);
  }

  fn set_prev(&mut self, item: ChunkId, prev: ChunkId) {
    self.set_free_prev(item, prev);
  }
}
