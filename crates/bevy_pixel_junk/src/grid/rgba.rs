//! RGBA cell color.

/// RGBA color with 8 bits per channel.
///
/// Alpha doubles as presence: any non-zero alpha is solid body mass.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  #[inline]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Creates an opaque RGB color (alpha = 255).
  #[inline]
  pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: 255 }
  }

  /// Empty cell.
  pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

  pub const WHITE: Self = Self::rgb(255, 255, 255);

  /// Returns true if this color marks a present cell.
  #[inline]
  pub const fn is_present(self) -> bool {
    self.a > 0
  }

  #[inline]
  pub const fn to_array(self) -> [u8; 4] {
    [self.r, self.g, self.b, self.a]
  }

  #[inline]
  pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
    Self { r, g, b, a }
  }
}
