//! Randomized alloc/free workload for exercising any allocator.
//!
//! Sizes are log-uniform, and the choice between allocating and freeing is
//! biased so occupancy hovers around a target percentage of `total_bytes`.

use core::ptr::NonNull;

use getset::CopyGetters;
use rand::{
  Rng,
  SeedableRng,
  rngs::SmallRng,
};

/// One live allocation tracked by [`stress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct StressBlock {
  ptr: Option<NonNull<u8>>,
  size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct StressResult {
  total_allocs: u64,
  successful_allocs: u64,
  total_frees: u64,
  /// Sum of requested live bytes sampled after every operation.
  accumulated_in_use_bytes: u64,
  /// Blocks still allocated; they are the first entries of the scratch slice.
  live_blocks: usize,
  live_bytes: usize,
}

struct Workload<'s> {
  rng: SmallRng,
  blocks: &'s mut [StressBlock],
  live: usize,
  live_bytes: usize,
  total_bytes: usize,
  target_percent: u32,
}

impl Workload<'_> {
  fn alloc_size(&mut self) -> usize {
    let scale = 4 + self.rng.random::<u32>().leading_zeros();
    let mask = (1u64 << scale) - 1;
    (u64::from(self.rng.random::<u32>()) & mask) as usize
  }

  fn should_alloc(&mut self) -> bool {
    if self.live == 0 {
      return true;
    }
    if self.live >= self.blocks.len() {
      return false;
    }

    let full_pct = 100 * self.live_bytes / self.total_bytes.max(1);
    let target = self.target_percent.max(1);
    let free_chance = if full_pct < self.target_percent as usize {
      (full_pct as u32).saturating_mul(0x8000_0000 / target)
    } else {
      u32::MAX
    };
    self.rng.random::<u32>() > free_chance
  }

  fn pick_victim(&mut self) -> usize {
    self.rng.random::<u32>() as usize % self.live
  }
}

/// Runs `op_count` random operations against `ctx`.
///
/// `scratch` bounds how many blocks can be live at once. Blocks still live at
/// the end are left allocated in `scratch[..live_blocks]` for the caller.
#[allow(clippy::too_many_arguments)]
pub fn stress<C, A, F>(
  ctx: &mut C,
  mut alloc_fn: A,
  mut free_fn: F,
  total_bytes: usize,
  op_count: u32,
  scratch: &mut [StressBlock],
  target_percent: u32,
  seed: u64,
) -> StressResult
where
  A: FnMut(&mut C, usize) -> Option<NonNull<u8>>,
  F: FnMut(&mut C, NonNull<u8>),
{
  let mut work = Workload {
    rng: SmallRng::seed_from_u64(seed),
    blocks: scratch,
    live: 0,
    live_bytes: 0,
    total_bytes,
    target_percent,
  };
  let mut result = StressResult::default();
  if work.blocks.is_empty() {
    return result;
  }

  for _ in 0..op_count {
    if work.should_alloc() {
      let size = work.alloc_size();
      result.total_allocs += 1;
      if let Some(ptr) = alloc_fn(ctx, size) {
        result.successful_allocs += 1;
        work.blocks[work.live] = StressBlock {
          ptr: Some(ptr),
          size,
        };
        work.live += 1;
        work.live_bytes += size;
      }
    } else {
      let victim = work.pick_victim();
      let block = work.blocks[victim];
      work.blocks[victim] = work.blocks[work.live - 1];
      work.blocks[work.live - 1] = StressBlock::default();
      work.live -= 1;
      work.live_bytes -= block.size;
      result.total_frees += 1;
      if let Some(ptr) = block.ptr {
        free_fn(ctx, ptr);
      }
    }
    result.accumulated_in_use_bytes += work.live_bytes as u64;
  }

  result.live_blocks = work.live;
  result.live_bytes = work.live_bytes;
  log::debug!(
    "stress: {} of {} allocs succeeded, {} frees, {} blocks live",
    result.successful_allocs,
    result.total_allocs,
    result.total_frees,
    result.live_blocks
  );
  result
}
