//! Nearest present cell search.
//!
//! Expands a square window ring by ring around the rounded query point and
//! keeps a bounded list of the best candidates sorted by squared distance to
//! the unrounded point. The search stops as soon as no cell outside the
//! window could beat the current N-th candidate, so the result is the true N
//! nearest cells rather than the first N found.

use bevy::math::{IVec2, Vec2};

use super::PixelGrid;

/// Returns the present cell nearest to `point` (continuous cell space).
pub fn closest_pixel(grid: &PixelGrid, point: Vec2) -> Option<IVec2> {
  closest_pixels(grid, point, 1).into_iter().next()
}

/// Returns up to `count` present cells nearest to `point`, closest first.
///
/// Fewer than `count` cells are returned only when the grid holds fewer
/// present cells. Ties keep ring discovery order.
pub fn closest_pixels(grid: &PixelGrid, point: Vec2, count: usize) -> Vec<IVec2> {
  if count == 0 || grid.is_empty() {
    return Vec::new();
  }

  let center = point.round().as_ivec2();
  let dims = grid.dimensions();
  let outside = (IVec2::ZERO - center)
    .max(center - (dims - IVec2::ONE))
    .max(IVec2::ZERO);
  let max_radius = dims.max_element() + outside.max_element();

  let mut best: Vec<(f32, IVec2)> = Vec::with_capacity(count + 1);

  for radius in 0..=max_radius {
    for_each_ring_cell(dims, center, radius, |cell| {
      if !grid.is_pixel_assume_in_bounds(cell) {
        return;
      }
      let dist = (cell.as_vec2() - point).length_squared();
      let at = best.partition_point(|&(d, _)| d <= dist);
      if at < count {
        best.insert(at, (dist, cell));
        best.truncate(count);
      }
    });

    // Unvisited cells are at least `radius + 1` rings out, and the query
    // point is within half a cell of `center` on each axis.
    if best.len() == count {
      let bound = radius as f32 + 0.5;
      if best[count - 1].0 <= bound * bound {
        break;
      }
    }
  }

  best.into_iter().map(|(_, cell)| cell).collect()
}

/// Visits the in-bounds cells at Chebyshev distance exactly `radius` from
/// `center`.
fn for_each_ring_cell(dims: IVec2, center: IVec2, radius: i32, mut f: impl FnMut(IVec2)) {
  if radius == 0 {
    if center.cmpge(IVec2::ZERO).all() && center.cmplt(dims).all() {
      f(center);
    }
    return;
  }

  let y_min = (center.y - radius).max(0);
  let y_max = (center.y + radius).min(dims.y - 1);
  let x_min = (center.x - radius).max(0);
  let x_max = (center.x + radius).min(dims.x - 1);

  for y in y_min..=y_max {
    if y == center.y - radius || y == center.y + radius {
      for x in x_min..=x_max {
        f(IVec2::new(x, y));
      }
    } else {
      for x in [center.x - radius, center.x + radius] {
        if x >= 0 && x < dims.x {
          f(IVec2::new(x, y));
        }
      }
    }
  }
}
