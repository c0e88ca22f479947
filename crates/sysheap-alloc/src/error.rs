use core::fmt;

use sysheap_bitmap::BitmapError;

use crate::chunk::{
  ChunkId,
  ChunkSz,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The span cannot hold the control structure plus one minimum chunk.
  TooSmall { have: usize, need: usize },
  /// More chunk units than the widest header can describe.
  TooBig { chunks: ChunkSz },
  /// The pointer does not fall inside this heap's chunk region.
  InvalidPointer,
  DoubleFree,
  /// Boundary tags around the chunk disagree.
  Corrupted,
  Bitmap(BitmapError),
}

impl fmt::Display for HeapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooSmall { have, need } => write!(f, "span of {have} bytes too small, need {need}"),
      Self::TooBig { chunks } => write!(f, "{chunks} chunk units exceed the header range"),
      Self::InvalidPointer => f.write_str("pointer not owned by this heap"),
      Self::DoubleFree => f.write_str("double free"),
      Self::Corrupted => f.write_str("chunk headers corrupted"),
      Self::Bitmap(err) => write!(f, "bucket mask: {err}"),
    }
  }
}

impl core::error::Error for HeapError {}

impl From<BitmapError> for HeapError {
  fn from(err: BitmapError) -> Self {
    Self::Bitmap(err)
  }
}

pub type HeapResult<T> = Result<T, HeapError>;

/// First inconsistency found by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateError {
  /// Header out of range, zero-sized, or with a stale boundary tag.
  BadChunk { chunk: ChunkId },
  AdjacentFree { chunk: ChunkId },
  /// The linear walk did not land exactly on the end marker.
  Overrun { end: ChunkId },
  /// Mask bit and list emptiness disagree.
  BucketMismatch { bucket: usize },
  WrongBucket { bucket: usize, chunk: ChunkId },
  /// Listed twice, listed while used, or a broken link.
  DuplicateOrUsed { bucket: usize, chunk: ChunkId },
  MissingFromList { chunk: ChunkId },
}

impl fmt::Display for ValidateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::BadChunk { chunk } => write!(f, "chunk {chunk}: bad header"),
      Self::AdjacentFree { chunk } => write!(f, "chunk {chunk}: free next to a free neighbor"),
      Self::Overrun { end } => write!(f, "chunk walk does not end at {end}"),
      Self::BucketMismatch { bucket } => write!(f, "bucket {bucket}: mask bit disagrees with list"),
      Self::WrongBucket { bucket, chunk } => write!(f, "bucket {bucket}: chunk {chunk} misfiled"),
      Self::DuplicateOrUsed { bucket, chunk } => {
        write!(f, "bucket {bucket}: chunk {chunk} listed twice or in use")
      }
      Self::MissingFromList { chunk } => write!(f, "free chunk {chunk} not in any bucket"),
    }
  }
}

impl core::error::Error for ValidateError {}

pub type ValidateResult<T> = Result<T, ValidateError>;
