use core::{
  hint::black_box,
  ptr::NonNull,
};

use criterion::{
  BatchSize,
  Criterion,
  criterion_group,
  criterion_main,
};
use sysheap::{
  prelude::*,
  stress::stress,
};

fn bench_stress(c: &mut Criterion) {
  for target in [30, 90] {
    c.bench_function(&format!("stress_10k_target_{target}"), |b| {
      b.iter_batched(
        || (vec![0u64; 1 << 14], vec![StressBlock::default(); 512]),
        |(mut words, mut scratch)| {
          let bytes = words.len() * size_of::<u64>();
          let mem = NonNull::from(words.as_mut_slice()).cast::<u8>();
          let mut heap = unsafe { SysHeap::from_raw(mem, bytes, HeapConfig::default()) }.unwrap();
          let result = stress(
            &mut heap,
            |h, size| h.alloc(size),
            |h, p| unsafe { h.free(p.as_ptr()) },
            bytes,
            10_000,
            &mut scratch,
            target,
            0xfeed,
          );
          black_box(result);
        },
        BatchSize::LargeInput,
      );
    });
  }
}

criterion_group!(benches, bench_stress);
criterion_main!(benches);
