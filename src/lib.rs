#![no_std]

//! Chunked boundary-tag heap over caller-provided memory.
//!
//! [`SysHeap`] is the single-owner allocator; [`LockedHeap`] wraps it in a
//! spin lock and implements `GlobalAlloc`.

pub use sysheap_alloc::{
  chunk,
  config,
  error,
  heap::SysHeap,
  info,
  stats,
  stress,
};
pub use sysheap_sync::LockedHeap;

pub mod prelude {
  pub use sysheap_alloc::prelude::*;
  pub use sysheap_sync::LockedHeap;
  pub use sysheap_sys::prelude::*;
}
