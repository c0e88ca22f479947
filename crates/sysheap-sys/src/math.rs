use core::ptr::NonNull;

pub const fn align_up(value: usize, align: usize) -> Option<usize> {
  if !align.is_power_of_two() {
    return None;
  }

  let mask = align - 1;
  match value.checked_add(mask) {
    Some(sum) => Some(sum & !mask),
    None => None,
  }
}

/// Distance from `addr` up to the next multiple of `align`.
pub const fn align_offset(addr: usize, align: usize) -> Option<usize> {
  match align_up(addr, align) {
    Some(aligned) => Some(aligned - addr),
    None => None,
  }
}

/// Moves `ptr` forward to the next multiple of `align`, keeping its provenance.
///
/// # Safety
///
/// The aligned address must stay inside the allocation `ptr` points into.
pub unsafe fn align_ptr(ptr: NonNull<u8>, align: usize) -> Option<NonNull<u8>> {
  let offset = align_offset(ptr.as_ptr() as usize, align)?;
  Some(unsafe { ptr.add(offset) })
}

/// Number of `unit`-sized pieces needed to cover `bytes`, rounding up.
pub const fn units_ceil(bytes: usize, unit: usize) -> usize {
  bytes.div_ceil(unit)
}

pub const fn floor_log2(value: usize) -> Option<u32> {
  if value == 0 {
    return None;
  }
  Some(usize::BITS - 1 - value.leading_zeros())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_up() {
    assert_eq!(align_up(0, 8), Some(0));
    assert_eq!(align_up(1, 8), Some(8));
    assert_eq!(align_up(8, 8), Some(8));
    assert_eq!(align_up(9, 8), Some(16));
    assert_eq!(align_up(100, 3), None);
    assert_eq!(align_up(usize::MAX - 6, 8), None);
  }

  #[test]
  fn test_align_offset() {
    assert_eq!(align_offset(0, 8), Some(0));
    assert_eq!(align_offset(1, 8), Some(7));
    assert_eq!(align_offset(12, 16), Some(4));
    assert_eq!(align_offset(usize::MAX, 8), None);
  }

  #[test]
  fn test_align_ptr() {
    let mut data = [0u8; 64];
    let ptr = NonNull::new(data.as_mut_ptr()).unwrap();

    let aligned = unsafe { align_ptr(ptr, 16) }.unwrap();
    assert_eq!(aligned.as_ptr() as usize % 16, 0);
    assert!(aligned.as_ptr() >= ptr.as_ptr());
    assert!((aligned.as_ptr() as usize) - (ptr.as_ptr() as usize) < 16);

    assert!(unsafe { align_ptr(ptr, 3) }.is_none());
  }

  #[test]
  fn test_units_ceil() {
    assert_eq!(units_ceil(0, 8), 0);
    assert_eq!(units_ceil(1, 8), 1);
    assert_eq!(units_ceil(8, 8), 1);
    assert_eq!(units_ceil(104, 8), 13);
    assert_eq!(units_ceil(4004, 8), 501);
  }

  #[test]
  fn test_floor_log2() {
    assert_eq!(floor_log2(0), None);
    assert_eq!(floor_log2(1), Some(0));
    assert_eq!(floor_log2(2), Some(1));
    assert_eq!(floor_log2(3), Some(1));
    assert_eq!(floor_log2(511), Some(8));
    assert_eq!(floor_log2(512), Some(9));
    assert_eq!(floor_log2(usize::MAX), Some(usize::BITS - 1));
  }
}
