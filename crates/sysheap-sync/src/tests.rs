use std::{
  sync::Arc,
  thread,
};

use super::*;

fn leaked_span(bytes: usize) -> &'static mut [u8] {
  Box::leak(vec![0u8; bytes].into_boxed_slice())
}

#[test]
fn test_empty_returns_null() {
  let heap = LockedHeap::empty();
  assert!(!heap.is_initialized());
  assert!(heap.with(|h| h.alloc(8)).is_none());

  let layout = Layout::from_size_align(32, 8).unwrap();
  assert!(unsafe { heap.alloc(layout) }.is_null());
}

#[test]
fn test_init_and_with() {
  let heap = LockedHeap::empty();
  heap.init(leaked_span(4096)).unwrap();
  assert!(heap.is_initialized());

  let p = heap.with(|h| h.alloc(100)).flatten().unwrap();
  assert!(heap.with(|h| h.validate()).unwrap());
  heap.with(|h| unsafe { h.free(p.as_ptr()) });
  assert_eq!(
    heap.with(|h| h.runtime_stats().allocated_bytes()),
    Some(0)
  );
}

#[test]
fn test_init_too_small() {
  let heap = LockedHeap::empty();
  assert!(matches!(
    heap.init(leaked_span(8)),
    Err(HeapError::TooSmall { .. })
  ));
  assert!(!heap.is_initialized());
}

#[test]
fn test_global_alloc_layouts() {
  let heap = LockedHeap::empty();
  heap.init(leaked_span(1 << 16)).unwrap();

  let mut live = Vec::new();
  for align in [1, 2, 4, 8, 16, 64, 256] {
    let layout = Layout::from_size_align(48, align).unwrap();
    let p = unsafe { heap.alloc(layout) };
    assert!(!p.is_null());
    assert_eq!(p as usize % align, 0);
    unsafe { p.write_bytes(0xa5, 48) };
    live.push((p, layout));
  }

  for (p, layout) in live {
    unsafe { heap.dealloc(p, layout) };
  }
  assert!(heap.with(|h| h.validate()).unwrap());
  assert_eq!(heap.with(|h| h.chunks().count()), Some(1));
}

#[test]
fn test_global_realloc_keeps_contents() {
  let heap = LockedHeap::empty();
  heap.init(leaked_span(1 << 14)).unwrap();

  let layout = Layout::from_size_align(40, 32).unwrap();
  let p = unsafe { heap.alloc(layout) };
  unsafe { p.write_bytes(0x3d, 40) };

  let q = unsafe { heap.realloc(p, layout, 400) };
  assert!(!q.is_null());
  assert_eq!(q as usize % 32, 0);
  let head = unsafe { core::slice::from_raw_parts(q, 40) };
  assert!(head.iter().all(|b| *b == 0x3d));

  unsafe { heap.dealloc(q, Layout::from_size_align(400, 32).unwrap()) };
  assert!(heap.with(|h| h.validate()).unwrap());
}

#[test]
fn test_threads_share_heap() {
  let heap: Arc<LockedHeap<'static>> = Arc::new(LockedHeap::empty());
  heap.init(leaked_span(1 << 18)).unwrap();

  let workers: Vec<_> = (0..4)
    .map(|t| {
      let heap = Arc::clone(&heap);
      thread::spawn(move || {
        for i in 0..500usize {
          let layout = Layout::from_size_align(16 + (i * 7 + t) % 200, 8).unwrap();
          let p = unsafe { heap.alloc(layout) };
          assert!(!p.is_null());
          unsafe {
            p.write_bytes(t as u8, layout.size());
            heap.dealloc(p, layout);
          }
        }
      })
    })
    .collect();

  for worker in workers {
    worker.join().unwrap();
  }
  assert!(heap.with(|h| h.validate()).unwrap());
  assert_eq!(
    heap.with(|h| h.runtime_stats().allocated_bytes()),
    Some(0)
  );
}
