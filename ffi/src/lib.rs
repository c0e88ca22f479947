#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]

//! C ABI over [`SysHeap`].
//!
//! `struct sys_heap` is opaque: C code reserves `SYS_HEAP_BYTES` bytes aligned
//! to `SYS_HEAP_ALIGN` and hands a pointer to `sys_heap_init`. Every other
//! call expects an initialized heap.

use core::{
  ffi::{
    c_int,
    c_void,
  },
  mem::MaybeUninit,
  ptr::{
    self,
    NonNull,
  },
  slice,
};

use sysheap::{
  prelude::*,
  stress::stress,
};

mod handler;

const STRESS_SEED: u64 = 0x5eed_1e55;

#[repr(C)]
pub struct sys_heap {
  heap: MaybeUninit<SysHeap<'static>>,
}

#[unsafe(no_mangle)]
pub static SYS_HEAP_BYTES: usize = size_of::<sys_heap>();

#[unsafe(no_mangle)]
pub static SYS_HEAP_ALIGN: usize = align_of::<sys_heap>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct sys_memory_stats {
  pub free_bytes: usize,
  pub allocated_bytes: usize,
  pub max_allocated_bytes: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct sys_heap_stress_result {
  pub total_allocs: u64,
  pub successful_allocs: u64,
  pub total_frees: u64,
  pub accumulated_in_use_bytes: u64,
}

pub type sys_heap_alloc_fn = unsafe extern "C" fn(arg: *mut c_void, bytes: usize) -> *mut c_void;
pub type sys_heap_free_fn = unsafe extern "C" fn(arg: *mut c_void, ptr: *mut c_void);

unsafe fn heap_mut<'a>(heap: *mut sys_heap) -> Option<&'a mut SysHeap<'static>> {
  unsafe { heap.as_mut().map(|h| h.heap.assume_init_mut()) }
}

fn out_ptr(p: Option<NonNull<u8>>) -> *mut c_void {
  p.map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_init(heap: *mut sys_heap, mem: *mut c_void, bytes: usize) -> c_int {
  let (Some(heap), Some(mem)) = (unsafe { heap.as_mut() }, NonNull::new(mem.cast::<u8>())) else {
    return -libc::EINVAL;
  };

  match unsafe { SysHeap::from_raw(mem, bytes, HeapConfig::default()) } {
    Ok(sys) => {
      heap.heap.write(sys);
      0
    }
    Err(_) => -libc::EINVAL,
  }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_alloc(heap: *mut sys_heap, bytes: usize) -> *mut c_void {
  out_ptr(unsafe { heap_mut(heap) }.and_then(|h| h.alloc(bytes)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_aligned_alloc(
  heap: *mut sys_heap,
  align: usize,
  bytes: usize,
) -> *mut c_void {
  out_ptr(unsafe { heap_mut(heap) }.and_then(|h| h.aligned_alloc(align, bytes)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_realloc(
  heap: *mut sys_heap,
  ptr: *mut c_void,
  bytes: usize,
) -> *mut c_void {
  out_ptr(unsafe { heap_mut(heap) }.and_then(|h| unsafe { h.realloc(ptr.cast(), bytes) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_aligned_realloc(
  heap: *mut sys_heap,
  ptr: *mut c_void,
  align: usize,
  bytes: usize,
) -> *mut c_void {
  out_ptr(
    unsafe { heap_mut(heap) }.and_then(|h| unsafe { h.aligned_realloc(ptr.cast(), align, bytes) }),
  )
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_free(heap: *mut sys_heap, ptr: *mut c_void) {
  if let Some(h) = unsafe { heap_mut(heap) } {
    unsafe { h.free(ptr.cast()) };
  }
}

/// Zero for pointers the heap does not recognize.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_usable_size(heap: *mut sys_heap, ptr: *mut c_void) -> usize {
  let (Some(h), Some(ptr)) = (unsafe { heap_mut(heap) }, NonNull::new(ptr.cast::<u8>())) else {
    return 0;
  };
  h.usable_size(ptr).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_validate(heap: *mut sys_heap) -> bool {
  unsafe { heap_mut(heap) }.is_some_and(|h| h.validate())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_runtime_stats_get(
  heap: *mut sys_heap,
  stats: *mut sys_memory_stats,
) -> c_int {
  let (Some(h), Some(stats)) = (unsafe { heap_mut(heap) }, unsafe { stats.as_mut() }) else {
    return -libc::EINVAL;
  };

  let rs = h.runtime_stats();
  *stats = sys_memory_stats {
    free_bytes: rs.free_bytes(),
    allocated_bytes: rs.allocated_bytes(),
    max_allocated_bytes: rs.max_allocated_bytes(),
  };
  0
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_runtime_stats_reset_max(heap: *mut sys_heap) -> c_int {
  match unsafe { heap_mut(heap) } {
    Some(h) => {
      h.reset_max();
      0
    }
    None => -libc::EINVAL,
  }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sys_heap_print_info(heap: *mut sys_heap, dump_chunks: bool) {
  if let Some(h) = unsafe { heap_mut(heap) } {
    h.print_info(dump_chunks);
  }
}

struct StressCtx {
  alloc_fn: sys_heap_alloc_fn,
  free_fn: sys_heap_free_fn,
  arg: *mut c_void,
}

/// Runs the randomized workload against C callbacks. `scratch_mem` holds the
/// bookkeeping for live blocks and bounds how many can exist at once.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn sys_heap_stress(
  alloc_fn: Option<sys_heap_alloc_fn>,
  free_fn: Option<sys_heap_free_fn>,
  arg: *mut c_void,
  total_bytes: usize,
  op_count: u32,
  scratch_mem: *mut c_void,
  scratch_bytes: usize,
  target_percent: c_int,
  result: *mut sys_heap_stress_result,
) -> c_int {
  let (Some(alloc_fn), Some(free_fn), Some(result)) = (alloc_fn, free_fn, unsafe { result.as_mut() })
  else {
    return -libc::EINVAL;
  };

  let scratch: &mut [StressBlock] = match NonNull::new(scratch_mem.cast::<u8>()) {
    Some(mem) => unsafe { scratch_blocks(mem, scratch_bytes) },
    None => &mut [],
  };

  let mut ctx = StressCtx {
    alloc_fn,
    free_fn,
    arg,
  };
  let sr = stress(
    &mut ctx,
    |ctx, bytes| NonNull::new(unsafe { (ctx.alloc_fn)(ctx.arg, bytes) }.cast::<u8>()),
    |ctx, p| unsafe { (ctx.free_fn)(ctx.arg, p.as_ptr().cast()) },
    total_bytes,
    op_count,
    scratch,
    u32::try_from(target_percent).unwrap_or(0),
    STRESS_SEED,
  );

  *result = sys_heap_stress_result {
    total_allocs: sr.total_allocs(),
    successful_allocs: sr.successful_allocs(),
    total_frees: sr.total_frees(),
    accumulated_in_use_bytes: sr.accumulated_in_use_bytes(),
  };
  0
}

/// Carves an initialized block table out of raw scratch memory.
unsafe fn scratch_blocks<'a>(mem: NonNull<u8>, bytes: usize) -> &'a mut [StressBlock] {
  let Some(start) = align_offset(mem.as_ptr() as usize, align_of::<StressBlock>()) else {
    return &mut [];
  };
  let len = bytes.saturating_sub(start) / size_of::<StressBlock>();
  if len == 0 {
    return &mut [];
  }

  let blocks = unsafe { mem.add(start) }.cast::<StressBlock>();
  for i in 0..len {
    unsafe { blocks.add(i).write(StressBlock::default()) };
  }
  unsafe { slice::from_raw_parts_mut(blocks.as_ptr(), len) }
}
