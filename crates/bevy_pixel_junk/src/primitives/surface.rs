//! Row-major 2D buffer addressed by signed cell coordinates.
//!
//! # Coordinate System
//!
//! Surfaces use a Y+ up coordinate system consistent with world coordinates:
//! - **X+** is to the right
//! - **Y+** is upward
//! - **(0, 0)** is the bottom-left cell
//!
//! Coordinates are `IVec2` so callers can look up neighbors of edge cells
//! without casting; anything outside `[0, width) x [0, height)` simply misses.

use std::ops::Index;

use bevy::math::IVec2;

/// A 2D buffer of elements.
///
/// Data is stored in row-major order (y * width + x), row 0 at the bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface<T> {
  data: Box<[T]>,
  width: u32,
  height: u32,
}

impl<T: Clone> Surface<T> {
  /// Creates a new surface filled with the given value.
  pub fn filled(width: u32, height: u32, value: T) -> Self {
    let len = (width as usize) * (height as usize);
    Self {
      data: vec![value; len].into_boxed_slice(),
      width,
      height,
    }
  }
}

impl<T> Surface<T> {
  /// Wraps an existing row-major buffer.
  ///
  /// Returns `None` when `data.len() != width * height`.
  pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Option<Self> {
    if data.len() != (width as usize) * (height as usize) {
      return None;
    }
    Some(Self {
      data: data.into_boxed_slice(),
      width,
      height,
    })
  }

  /// Builds a surface by evaluating `f` at every cell.
  pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(IVec2) -> T) -> Self {
    let mut data = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height as i32 {
      for x in 0..width as i32 {
        data.push(f(IVec2::new(x, y)));
      }
    }
    Self {
      data: data.into_boxed_slice(),
      width,
      height,
    }
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Number of cells.
  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Returns true if `pos` addresses a cell of this surface.
  #[inline]
  pub fn contains(&self, pos: IVec2) -> bool {
    pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
  }

  /// Converts a position to a linear index, or `None` if out of bounds.
  #[inline]
  pub fn index_of(&self, pos: IVec2) -> Option<usize> {
    self.contains(pos).then(|| self.index_unchecked(pos))
  }

  /// Linear index without the bounds check. Caller guarantees `contains(pos)`.
  #[inline]
  pub fn index_unchecked(&self, pos: IVec2) -> usize {
    (pos.y as usize) * (self.width as usize) + (pos.x as usize)
  }

  /// Position of a linear index.
  #[inline]
  pub fn position_of(&self, index: usize) -> IVec2 {
    let w = self.width as usize;
    IVec2::new((index % w) as i32, (index / w) as i32)
  }

  #[inline]
  pub fn get(&self, pos: IVec2) -> Option<&T> {
    self.index_of(pos).map(|i| &self.data[i])
  }

  #[inline]
  pub fn get_mut(&mut self, pos: IVec2) -> Option<&mut T> {
    self.index_of(pos).map(|i| &mut self.data[i])
  }

  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  /// Iterates `(position, element)` in row-major order.
  pub fn iter(&self) -> impl Iterator<Item = (IVec2, &T)> + '_ {
    self
      .data
      .iter()
      .enumerate()
      .map(|(i, v)| (self.position_of(i), v))
  }
}

impl<T> Index<IVec2> for Surface<T> {
  type Output = T;

  #[inline]
  fn index(&self, pos: IVec2) -> &Self::Output {
    &self.data[self.index_unchecked(pos)]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn out_of_bounds_misses() {
    let surface = Surface::filled(3, 2, 7u8);
    assert!(surface.get(IVec2::new(-1, 0)).is_none());
    assert!(surface.get(IVec2::new(3, 0)).is_none());
    assert!(surface.get(IVec2::new(0, 2)).is_none());
    assert_eq!(surface.get(IVec2::new(2, 1)), Some(&7));
  }

  #[test]
  fn row_major_layout() {
    let surface = Surface::from_fn(3, 2, |p| p.x + 10 * p.y);
    assert_eq!(surface.as_slice(), &[0, 1, 2, 10, 11, 12]);
    assert_eq!(surface.position_of(4), IVec2::new(1, 1));
    assert_eq!(surface[IVec2::new(2, 1)], 12);
  }

  #[test]
  fn from_vec_rejects_wrong_length() {
    assert!(Surface::from_vec(2, 2, vec![0u8; 3]).is_none());
    assert!(Surface::from_vec(2, 2, vec![0u8; 4]).is_some());
  }
}
