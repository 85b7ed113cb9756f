//! Pixel grids: the colored, alpha-tagged cells backing a destructible body.
//!
//! A [`PixelGrid`] is the ground truth for a body's shape. A cell is present
//! when its alpha is non-zero; everything else about the body (collider, mass,
//! fragments) is derived from the grid after each mutation.
//!
//! # Batched writes
//!
//! Every write marks the grid as having pending changes. [`PixelGrid::apply_pixels`]
//! commits them, bumping [`PixelGrid::applied_generation`] so the backing image
//! is re-uploaded once per batch rather than once per cell:
//!
//! ```
//! use bevy::math::IVec2;
//! use bevy_pixel_junk::{PixelGrid, Rgba};
//!
//! let mut grid = PixelGrid::filled(4, 4, Rgba::WHITE);
//! for x in 0..4 {
//!   grid.set_pixel_no_apply(IVec2::new(x, 0), Rgba::TRANSPARENT);
//! }
//! grid.apply_pixels();
//! assert_eq!(grid.live_count(), 12);
//! ```

mod image;
mod marcher;
mod nearest;
mod regions;
mod rgba;

use bevy::math::{IVec2, Vec2};
pub use image::GridImageError;
pub use marcher::GridMarcher;
pub use nearest::{closest_pixel, closest_pixels};
pub use regions::{GridRegionFinder, Region};
pub use rgba::Rgba;

use crate::primitives::Surface;

/// Orthogonal neighbor offsets (4-connectivity).
pub const NEIGHBORS_4: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// A width x height grid of colored cells.
///
/// Dimensions are fixed at construction and always at least 1x1. Splitting a
/// body never resizes its grid; fragments get a new, tighter grid via
/// [`PixelGrid::sub_grid`].
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
  cells: Surface<Rgba>,
  live: usize,
  pending: bool,
  generation: u64,
}

impl PixelGrid {
  /// Creates a fully transparent grid. Dimensions are clamped to at least 1.
  pub fn new(width: u32, height: u32) -> Self {
    Self::filled(width, height, Rgba::TRANSPARENT)
  }

  /// Creates a grid with every cell set to `color`.
  pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
    let cells = Surface::filled(width.max(1), height.max(1), color);
    let live = if color.is_present() { cells.len() } else { 0 };
    Self {
      cells,
      live,
      pending: false,
      generation: 0,
    }
  }

  /// Creates a grid from row-major colors (row 0 at the bottom).
  ///
  /// Returns `None` for zero dimensions or a length mismatch.
  pub fn from_colors(width: u32, height: u32, colors: Vec<Rgba>) -> Option<Self> {
    if width == 0 || height == 0 {
      return None;
    }
    let cells = Surface::from_vec(width, height, colors)?;
    Some(Self::from_surface(cells))
  }

  /// Creates a grid by evaluating `f` at every cell.
  pub fn from_fn(width: u32, height: u32, f: impl FnMut(IVec2) -> Rgba) -> Self {
    Self::from_surface(Surface::from_fn(width.max(1), height.max(1), f))
  }

  /// Creates a disc of `color` in a `2 * radius` square grid.
  pub fn circle(radius: u32, color: Rgba) -> Self {
    let diameter = (radius * 2).max(1);
    let center = radius as f32;
    let radius_sq = (radius as f32 - 0.5).powi(2);
    Self::from_fn(diameter, diameter, |p| {
      let d = p.as_vec2() + 0.5 - center;
      if d.length_squared() <= radius_sq {
        color
      } else {
        Rgba::TRANSPARENT
      }
    })
  }

  fn from_surface(cells: Surface<Rgba>) -> Self {
    let live = cells.as_slice().iter().filter(|c| c.is_present()).count();
    Self {
      cells,
      live,
      pending: false,
      generation: 0,
    }
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.cells.width()
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.cells.height()
  }

  /// Grid size in cells.
  #[inline]
  pub fn dimensions(&self) -> IVec2 {
    IVec2::new(self.width() as i32, self.height() as i32)
  }

  #[inline]
  pub fn in_bounds(&self, point: IVec2) -> bool {
    self.cells.contains(point)
  }

  /// Returns true if `point` is inside the grid and its alpha is non-zero.
  #[inline]
  pub fn is_pixel(&self, point: IVec2) -> bool {
    self.cells.get(point).is_some_and(|c| c.is_present())
  }

  /// Presence test without the bounds check.
  ///
  /// The caller must have validated `point` with [`PixelGrid::in_bounds`].
  /// Out-of-range points either read another cell (an x past the right
  /// edge lands in the next row) or panic.
  #[inline]
  pub fn is_pixel_assume_in_bounds(&self, point: IVec2) -> bool {
    self.cells[point].is_present()
  }

  /// Color at `point`, transparent when out of bounds.
  #[inline]
  pub fn color(&self, point: IVec2) -> Rgba {
    self.cells.get(point).copied().unwrap_or(Rgba::TRANSPARENT)
  }

  /// Writes a cell and commits immediately.
  pub fn set_pixel(&mut self, point: IVec2, color: Rgba) {
    self.set_pixel_no_apply(point, color);
    self.apply_pixels();
  }

  /// Writes a cell without committing. Out-of-bounds writes are ignored.
  pub fn set_pixel_no_apply(&mut self, point: IVec2, color: Rgba) {
    let Some(cell) = self.cells.get_mut(point) else {
      return;
    };
    match (cell.is_present(), color.is_present()) {
      (true, false) => self.live -= 1,
      (false, true) => self.live += 1,
      _ => {}
    }
    *cell = color;
    self.pending = true;
  }

  /// Commits pending writes. A no-op when nothing was written.
  pub fn apply_pixels(&mut self) {
    if self.pending {
      self.pending = false;
      self.generation += 1;
    }
  }

  /// Clears a single cell and commits.
  pub fn remove_pixel_at(&mut self, point: IVec2) {
    self.set_pixel(point, Rgba::TRANSPARENT);
  }

  /// Clears a batch of cells with a single commit.
  ///
  /// Returns the number of cells that were present before removal. An empty
  /// batch leaves the grid (and its generation) untouched.
  pub fn remove_pixels<'a>(&mut self, points: impl IntoIterator<Item = &'a IVec2>) -> usize {
    let before = self.live;
    for &point in points {
      self.set_pixel_no_apply(point, Rgba::TRANSPARENT);
    }
    self.apply_pixels();
    before - self.live
  }

  /// Number of present cells.
  #[inline]
  pub fn live_count(&self) -> usize {
    self.live
  }

  /// Returns true when no cell is present.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Incremented by every commit that followed at least one write.
  #[inline]
  pub fn applied_generation(&self) -> u64 {
    self.generation
  }

  /// Returns true if writes happened since the last commit.
  #[inline]
  pub fn has_pending(&self) -> bool {
    self.pending
  }

  /// Row-major colors, row 0 at the bottom.
  #[inline]
  pub fn colors(&self) -> &[Rgba] {
    self.cells.as_slice()
  }

  /// Iterates present cells in row-major order.
  pub fn present_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
    self
      .cells
      .iter()
      .filter(|(_, c)| c.is_present())
      .map(|(p, _)| p)
  }

  /// Copies `points` into a new grid sized to their bounding box.
  ///
  /// Returns the new grid and the parent cell that maps to its (0, 0), or
  /// `None` when `points` is empty.
  pub fn sub_grid(&self, points: &[IVec2]) -> Option<(PixelGrid, IVec2)> {
    let first = *points.first()?;
    let (min, max) = points
      .iter()
      .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let size = (max - min + IVec2::ONE).as_uvec2();

    let mut grid = PixelGrid::new(size.x, size.y);
    for &point in points {
      grid.set_pixel_no_apply(point - min, self.color(point));
    }
    grid.pending = false;
    Some((grid, min))
  }

  /// Finds the first present cell on a ray from `start` along `direction`.
  ///
  /// With `from_far_end` the ray is walked back from where it leaves the grid,
  /// returning the present cell farthest from `start` instead.
  pub fn point_along_path(
    &self,
    start: IVec2,
    direction: Vec2,
    from_far_end: bool,
  ) -> Option<IVec2> {
    let traversed = GridMarcher::march(self.dimensions(), start, direction);
    if from_far_end {
      traversed.into_iter().rev().find(|&p| self.is_pixel(p))
    } else {
      traversed.into_iter().find(|&p| self.is_pixel(p))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alpha_marks_presence() {
    let mut grid = PixelGrid::new(2, 2);
    assert!(grid.is_empty());
    grid.set_pixel(IVec2::new(1, 0), Rgba::new(10, 20, 30, 1));
    assert!(grid.is_pixel(IVec2::new(1, 0)));
    assert!(!grid.is_pixel(IVec2::new(0, 0)));
    assert_eq!(grid.live_count(), 1);
  }

  #[test]
  fn out_of_bounds_queries_are_total() {
    let mut grid = PixelGrid::filled(2, 2, Rgba::WHITE);
    assert!(!grid.is_pixel(IVec2::new(-1, 0)));
    assert!(!grid.is_pixel(IVec2::new(0, 2)));
    assert_eq!(grid.color(IVec2::new(5, 5)), Rgba::TRANSPARENT);
    grid.set_pixel(IVec2::new(9, 9), Rgba::TRANSPARENT);
    assert_eq!(grid.live_count(), 4);
  }

  #[test]
  fn batched_writes_commit_once() {
    let mut grid = PixelGrid::filled(3, 3, Rgba::WHITE);
    grid.set_pixel_no_apply(IVec2::new(0, 0), Rgba::TRANSPARENT);
    grid.set_pixel_no_apply(IVec2::new(1, 0), Rgba::TRANSPARENT);
    assert!(grid.has_pending());
    assert_eq!(grid.applied_generation(), 0);
    grid.apply_pixels();
    assert_eq!(grid.applied_generation(), 1);
    grid.apply_pixels();
    assert_eq!(grid.applied_generation(), 1);
  }

  #[test]
  fn empty_removal_is_a_no_op() {
    let mut grid = PixelGrid::filled(3, 3, Rgba::WHITE);
    let removed = grid.remove_pixels(&[]);
    assert_eq!(removed, 0);
    assert_eq!(grid.applied_generation(), 0);
  }

  #[test]
  fn removing_twice_counts_once() {
    let mut grid = PixelGrid::filled(3, 3, Rgba::WHITE);
    let cell = IVec2::new(1, 1);
    assert_eq!(grid.remove_pixels(&[cell, cell]), 1);
    assert_eq!(grid.live_count(), 8);
  }

  #[test]
  fn sub_grid_uses_tight_bounds() {
    let mut grid = PixelGrid::new(5, 5);
    let red = Rgba::rgb(255, 0, 0);
    grid.set_pixel(IVec2::new(3, 1), red);
    grid.set_pixel(IVec2::new(4, 2), red);

    let (sub, origin) = grid
      .sub_grid(&[IVec2::new(3, 1), IVec2::new(4, 2)])
      .unwrap();
    assert_eq!(origin, IVec2::new(3, 1));
    assert_eq!(sub.dimensions(), IVec2::new(2, 2));
    assert_eq!(sub.color(IVec2::new(0, 0)), red);
    assert_eq!(sub.color(IVec2::new(1, 1)), red);
    assert!(!sub.is_pixel(IVec2::new(1, 0)));
    assert_eq!(sub.live_count(), 2);
  }

  #[test]
  fn point_along_path_finds_first_and_last() {
    let mut grid = PixelGrid::new(6, 1);
    grid.set_pixel(IVec2::new(2, 0), Rgba::WHITE);
    grid.set_pixel(IVec2::new(4, 0), Rgba::WHITE);

    let first = grid.point_along_path(IVec2::ZERO, Vec2::X, false);
    let last = grid.point_along_path(IVec2::ZERO, Vec2::X, true);
    assert_eq!(first, Some(IVec2::new(2, 0)));
    assert_eq!(last, Some(IVec2::new(4, 0)));
    assert_eq!(grid.point_along_path(IVec2::ZERO, Vec2::NEG_X, false), None);
  }
}
