#![cfg_attr(not(test), no_std)]


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapError {
  OutOfBounds { index: usize, size: usize },
}

impl core::fmt::Display for BitmapError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::OutOfBounds { index, size } => write!(f, "bit {index} out of bounds ({size} bits)"),
    }
  }
}

pub type BitmapResult<T> = Result<T, BitmapError>;

pub type BitmapWord = u32;

const WORD_BITS: usize = BitmapWord::BITS as usize;

/// A single-word bitmap that can live inside a `#[repr(C)]` header.
///
/// Every operation is O(1); searches are a mask plus `trailing_zeros`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Bitmap(BitmapWord);

impl Bitmap {
  pub const BITS: usize = WORD_BITS;

  #[inline(always)]
  pub const fn zero() -> Self {
    Self(0)
  }

  /// Checks that `fields` bits fit in one word.
  pub const fn check(fields: usize) -> BitmapResult<()> {
    if fields > WORD_BITS {
      return Err(BitmapError::OutOfBounds {
        index: fields - 1,
        size: WORD_BITS,
      });
    }
    Ok(())
  }

  #[inline(always)]
  const fn mask(index: usize) -> BitmapWord {
    debug_assert!(index < WORD_BITS);
    1 << index
  }

  #[inline]
  pub fn set(&mut self, index: usize) {
    self.0 |= Self::mask(index);
  }

  #[inline]
  pub fn clear(&mut self, index: usize) {
    self.0 &= !Self::mask(index);
  }

  #[inline]
  pub const fn get(&self, index: usize) -> bool {
    self.0 & Self::mask(index) != 0
  }

  /// Lowest set bit at or above `index`.
  #[inline]
  pub const fn find_fs_from(&self, index: usize) -> Option<usize> {
    if index >= WORD_BITS {
      return None;
    }
    let masked = self.0 & !((1 << index) - 1);
    if masked == 0 {
      return None;
    }
    Some(masked.trailing_zeros() as usize)
  }
}
