#![no_std]

pub mod math;

pub mod prelude {
  pub use super::math::{
    align_offset,
    align_ptr,
    align_up,
    floor_log2,
    units_ceil,
  };
}
