use core::{
  mem::size_of,
  ops::{
    Deref,
    DerefMut,
  },
  ptr::NonNull,
};

use sysheap_bitmap::Bitmap;

use crate::chunk::{
  ChunkBuf,
  ChunkId,
  ChunkSz,
  HeaderWidth,
};

/// Control structure at the start of the span. Its first word doubles as the
/// header of chunk 0, which is the chunk holding this structure and the
/// bucket table that follows it.
#[repr(C)]
struct Header {
  chunk0_hdr: [u32; 2],
  end_chunk: u32,
  avail: Bitmap,
}

type BucketHead = u32;

pub(crate) const HEADER_BYTES: usize = size_of::<Header>();

/// Bytes of control data for a heap with `nb_buckets` size classes.
pub(crate) const fn control_bytes(nb_buckets: usize) -> usize {
  HEADER_BYTES + nb_buckets * size_of::<BucketHead>()
}

/// Handle to a heap laid out in place. All state lives in the span.
#[derive(Debug)]
pub(crate) struct RawHeap {
  hdr: NonNull<Header>,
  chunks: ChunkBuf,
}

impl RawHeap {
  /// Writes a fresh heap of `heap_sz` units at `base`: the control chunk,
  /// one free chunk spanning the rest, and the zero-size end marker.
  ///
  /// # Safety
  ///
  /// `base` must be `CHUNK_UNIT`-aligned and valid for reads and writes of
  /// `heap_sz` units plus one end-marker header, with nothing else using it.
  /// `chunk0_size` must cover `control_bytes(nb_buckets)` and leave at least
  /// one minimum-size chunk.
  pub(crate) unsafe fn format(
    base: NonNull<u8>,
    heap_sz: ChunkSz,
    chunk0_size: ChunkSz,
    nb_buckets: usize,
    width: HeaderWidth,
  ) -> Self {
    let hdr = base.cast::<Header>();
    unsafe {
      hdr.write(Header {
        chunk0_hdr: [0; 2],
        end_chunk: heap_sz as u32,
        avail: Bitmap::zero(),
      });
    }

    let mut heap = Self {
      hdr,
      chunks: unsafe { ChunkBuf::new(base, heap_sz, width) },
    };
    for b in 0..nb_buckets {
      heap.set_bucket_head(b, None);
    }

    heap.set_size(0, chunk0_size);
    heap.set_left_size(0, 0);
    heap.set_used(0, true);

    heap.set_size(chunk0_size, heap_sz - chunk0_size);
    heap.set_left_size(chunk0_size, chunk0_size);

    heap.set_size(heap_sz, 0);
    heap.set_left_size(heap_sz, heap_sz - chunk0_size);
    heap.set_used(heap_sz, true);

    heap.free_list_add(chunk0_size);
    heap
  }

  #[inline(always)]
  pub(crate) fn end_chunk(&self) -> ChunkId {
    unsafe { (*self.hdr.as_ptr()).end_chunk as ChunkId }
  }

  /// First chunk after the control chunk.
  #[inline(always)]
  pub(crate) fn first_chunk(&self) -> ChunkId {
    self.right(0)
  }

  #[inline(always)]
  pub(crate) fn avail(&self) -> Bitmap {
    unsafe { (*self.hdr.as_ptr()).avail }
  }

  #[inline(always)]
  pub(crate) fn avail_mut(&mut self) -> &mut Bitmap {
    unsafe { &mut (*self.hdr.as_ptr()).avail }
  }

  #[inline(always)]
  fn bucket_slot(&self, bidx: usize) -> *mut BucketHead {
    debug_assert!(bidx < self.nb_buckets());
    unsafe {
      self
        .hdr
        .as_ptr()
        .cast::<u8>()
        .add(HEADER_BYTES)
        .cast::<BucketHead>()
        .add(bidx)
    }
  }

  /// First chunk of bucket `bidx`; chunk 0 is never free so it encodes "empty".
  #[inline]
  pub(crate) fn bucket_head(&self, bidx: usize) -> Option<ChunkId> {
    let head = unsafe { self.bucket_slot(bidx).read() } as ChunkId;
    (head != 0).then_some(head)
  }

  #[inline]
  pub(crate) fn set_bucket_head(&mut self, bidx: usize, head: Option<ChunkId>) {
    let raw = head.unwrap_or(0) as BucketHead;
    unsafe { self.bucket_slot(bidx).write(raw) };
  }

  pub(crate) fn nb_buckets(&self) -> usize {
    self.bucket_idx(self.end_chunk()) + 1
  }

  pub(crate) fn chunks(&self) -> &ChunkBuf {
    &self.chunks
  }

  pub(crate) fn chunks_mut(&mut self) -> &mut ChunkBuf {
    &mut self.chunks
  }
}

impl Deref for RawHeap {
  type Target = ChunkBuf;

  fn deref(&self) -> &ChunkBuf {
    &self.chunks
  }
}

impl DerefMut for RawHeap {
  fn deref_mut(&mut self) -> &mut ChunkBuf {
    &mut self.chunks
  }
}
