#![cfg_attr(not(test), no_std)]

//! Serialized access to a [`SysHeap`], usable as a `#[global_allocator]`.

use core::{
  alloc::{
    GlobalAlloc,
    Layout,
  },
  ptr::{
    self,
    NonNull,
  },
};

use spin::{
  Mutex,
  MutexGuard,
};
use sysheap_alloc::prelude::*;

/// A heap behind a spin lock. Starts empty so it can be a `static`.
pub struct LockedHeap<'mem> {
  inner: Mutex<Option<SysHeap<'mem>>>,
}

impl<'mem> LockedHeap<'mem> {
  pub const fn empty() -> Self {
    Self {
      inner: Mutex::new(None),
    }
  }

  pub const fn new(heap: SysHeap<'mem>) -> Self {
    Self {
      inner: Mutex::new(Some(heap)),
    }
  }

  /// Lays a fresh heap over `mem`. A heap already in place is dropped along
  /// with everything allocated from it.
  pub fn init(&self, mem: &'mem mut [u8]) -> HeapResult<()> {
    let heap = SysHeap::new(mem)?;
    if self.inner.lock().replace(heap).is_some() {
      log::warn!("sys_heap: replacing an initialized heap");
    }
    Ok(())
  }

  pub fn is_initialized(&self) -> bool {
    self.inner.lock().is_some()
  }

  pub fn lock(&self) -> MutexGuard<'_, Option<SysHeap<'mem>>> {
    self.inner.lock()
  }

  /// Runs `f` with the lock held, or returns `None` before `init`.
  pub fn with<R>(&self, f: impl FnOnce(&mut SysHeap<'mem>) -> R) -> Option<R> {
    self.inner.lock().as_mut().map(f)
  }
}

impl Default for LockedHeap<'_> {
  fn default() -> Self {
    Self::empty()
  }
}

unsafe impl GlobalAlloc for LockedHeap<'_> {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    self
      .with(|heap| heap.aligned_alloc(layout.align(), layout.size()))
      .flatten()
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    self.with(|heap| unsafe { heap.free(ptr) });
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    self
      .with(|heap| unsafe { heap.aligned_realloc(ptr, layout.align(), new_size) })
      .flatten()
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }
}

#[cfg(test)]
mod tests;
