#![cfg_attr(not(test), no_std)]

//! Boundary-tag heap over a single caller-owned span.
//!
//! The span is split into chunks of 8-byte units. Every chunk records its own
//! size and its left neighbor's size, and free chunks sit on one of a set of
//! power-of-two buckets whose non-empty state is mirrored in a bitmask.

pub mod chunk;
pub mod config;
pub mod error;
pub mod heap;
pub mod info;
pub mod stats;
#[cfg(feature = "stress")]
pub mod stress;

mod bucket;
mod engine;
mod raw;
mod validate;

pub mod prelude {
  pub use crate::{
    chunk::{
      CHUNK_UNIT,
      ChunkState,
      HeaderWidth,
    },
    config::HeapConfig,
    error::{
      HeapError,
      HeapResult,
      ValidateError,
      ValidateResult,
    },
    heap::SysHeap,
    info::{
      BucketInfo,
      ChunkInfo,
      HeapInfo,
    },
    stats::MemoryStats,
  };

  #[cfg(feature = "stress")]
  pub use crate::stress::{
    StressBlock,
    StressResult,
    stress,
  };
}
