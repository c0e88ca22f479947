use core::{
  hint::black_box,
  ptr::{
    self,
    NonNull,
  },
};

use criterion::{
  Criterion,
  criterion_group,
  criterion_main,
};
use sysheap::prelude::*;

fn heap_over(words: &mut [u64]) -> SysHeap<'_> {
  let bytes = words.len() * size_of::<u64>();
  let mem = NonNull::from(words).cast::<u8>();
  unsafe { SysHeap::from_raw(mem, bytes, HeapConfig::default()) }.unwrap()
}

fn bench_grow_in_place(c: &mut Criterion) {
  let mut words = vec![0u64; 1 << 16];
  let mut heap = heap_over(&mut words);

  c.bench_function("realloc_grow_in_place", |b| {
    b.iter(|| {
      let mut p = heap.alloc(16).unwrap();
      for size in (32..4096).step_by(256) {
        p = unsafe { heap.realloc(p.as_ptr(), black_box(size)) }.unwrap();
      }
      unsafe { heap.free(p.as_ptr()) };
    });
  });
}

fn bench_grow_by_copy(c: &mut Criterion) {
  let mut words = vec![0u64; 1 << 16];
  let mut heap = heap_over(&mut words);

  c.bench_function("realloc_grow_by_copy", |b| {
    b.iter(|| {
      let mut p = heap.alloc(16).unwrap();
      let mut blockers = Vec::new();
      for size in (32..4096).step_by(256) {
        p = unsafe { heap.realloc(p.as_ptr(), black_box(size)) }.unwrap();
        blockers.extend(heap.alloc(8));
      }
      unsafe { heap.free(p.as_ptr()) };
      for q in blockers {
        unsafe { heap.free(q.as_ptr()) };
      }
    });
  });
}

fn bench_shrink(c: &mut Criterion) {
  let mut words = vec![0u64; 1 << 16];
  let mut heap = heap_over(&mut words);

  c.bench_function("realloc_shrink", |b| {
    b.iter(|| {
      let mut p = unsafe { heap.realloc(ptr::null_mut(), 8192) }.unwrap();
      for size in (64..8192).rev().step_by(512) {
        p = unsafe { heap.realloc(p.as_ptr(), black_box(size)) }.unwrap();
      }
      unsafe { heap.realloc(p.as_ptr(), 0) };
    });
  });
}

criterion_group!(benches, bench_grow_in_place, bench_grow_by_copy, bench_shrink);
criterion_main!(benches);
