//! Pixel-edge contour tracing.
//!
//! Turns the present cells of a [`PixelGrid`] into one closed, clockwise
//! outline:
//!
//! 1. Emit a unit edge on every cell boundary where occupancy changes,
//!    oriented so the present cell lies on its right (outside the grid is
//!    empty).
//! 2. Chain edges head to tail, starting from the first emitted edge, until
//!    the chain returns to its start. Where two boundaries meet at a corner
//!    (cells touching only diagonally) the chain takes the rightmost turn, so
//!    a hole touching the outside at a corner is folded into the outline and
//!    the loop never crosses itself.
//! 3. Drop the duplicated closing vertex and every collinear vertex.
//! 4. Normalize winding to clockwise.
//! 5. Recenter on the pivot and scale to world units.
//!
//! The outline assumes a single component. Holes that touch the outline
//! nowhere are left unchained and end up filled.

use std::collections::HashMap;

use bevy::math::{IVec2, Vec2};

use crate::grid::PixelGrid;

/// Collinearity tolerance (cross product magnitude).
const EPSILON: f32 = 0.001;

/// Directed unit edge between two cell corners; the present cell is on its
/// right.
type Edge = (IVec2, IVec2);

/// Traces grid outlines into collision polygons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridContourTracer {
  /// Normalized pivot; `(0.5, 0.5)` centers the outline on the grid.
  pub pivot: Vec2,
  /// Cells per world unit.
  pub pixels_per_unit: f32,
}

impl Default for GridContourTracer {
  fn default() -> Self {
    Self {
      pivot: Vec2::splat(0.5),
      pixels_per_unit: 1.0,
    }
  }
}

impl GridContourTracer {
  pub fn new(pivot: Vec2, pixels_per_unit: f32) -> Self {
    Self {
      pivot,
      pixels_per_unit,
    }
  }

  /// Traces the outline in body-local world units.
  ///
  /// Returns `None` when the grid has no present cells.
  pub fn trace(&self, grid: &PixelGrid) -> Option<Vec<Vec2>> {
    let outline = Self::trace_cells(grid)?;
    let offset = self.pivot * grid.dimensions().as_vec2();
    let scale = self.pixels_per_unit.recip();
    Some(outline.into_iter().map(|p| (p - offset) * scale).collect())
  }

  /// Traces the outline in cell-corner coordinates, where cell `(x, y)`
  /// spans `[x, x + 1] x [y, y + 1]`.
  pub fn trace_cells(grid: &PixelGrid) -> Option<Vec<Vec2>> {
    let edges = emit_edges(grid);
    if edges.is_empty() {
      return None;
    }

    let mut corners = chain_edges(&edges);
    if corners.len() > 1 && corners.first() == corners.last() {
      corners.pop();
    }
    let mut outline: Vec<Vec2> = corners.into_iter().map(|c| c.as_vec2()).collect();
    remove_collinear(&mut outline);
    if !is_clockwise(&outline) {
      outline.reverse();
    }
    Some(outline)
  }
}

fn emit_edges(grid: &PixelGrid) -> Vec<Edge> {
  let (w, h) = (grid.width() as i32, grid.height() as i32);
  let mut edges = Vec::new();

  // Vertical lines: upward when the present cell is on the +x side.
  for x in 0..=w {
    for y in 0..h {
      let left = grid.is_pixel(IVec2::new(x - 1, y));
      let right = grid.is_pixel(IVec2::new(x, y));
      let (low, high) = (IVec2::new(x, y), IVec2::new(x, y + 1));
      match (left, right) {
        (false, true) => edges.push((low, high)),
        (true, false) => edges.push((high, low)),
        _ => {}
      }
    }
  }
  // Horizontal lines: rightward when the present cell is below.
  for y in 0..=h {
    for x in 0..w {
      let below = grid.is_pixel(IVec2::new(x, y - 1));
      let above = grid.is_pixel(IVec2::new(x, y));
      let (west, east) = (IVec2::new(x, y), IVec2::new(x + 1, y));
      match (below, above) {
        (true, false) => edges.push((west, east)),
        (false, true) => edges.push((east, west)),
        _ => {}
      }
    }
  }

  edges
}

/// Chains edges into one path starting at `edges[0]`.
///
/// Every corner has as many outgoing as incoming edges, so the chain always
/// closes; the returned path ends with a copy of its first vertex.
fn chain_edges(edges: &[Edge]) -> Vec<IVec2> {
  let mut outgoing: HashMap<IVec2, Vec<usize>> = HashMap::new();
  for (i, (from, _)) in edges.iter().enumerate() {
    outgoing.entry(*from).or_default().push(i);
  }

  let mut used = vec![false; edges.len()];
  used[0] = true;
  let (start, mut current) = edges[0];
  let mut heading = current - start;
  let mut path = vec![start, current];

  while current != start {
    // Right turns have a negative cross product with the heading.
    let next = outgoing.get(&current).and_then(|candidates| {
      candidates
        .iter()
        .copied()
        .filter(|&i| !used[i])
        .min_by_key(|&i| heading.perp_dot(edges[i].1 - edges[i].0))
    });

    let Some(i) = next else {
      bevy::log::warn!(
        "contour chain ended at {current} after {} of {} edges",
        path.len() - 1,
        edges.len()
      );
      return path;
    };

    used[i] = true;
    heading = edges[i].1 - current;
    current = edges[i].1;
    path.push(current);
  }

  let unused = used.iter().filter(|u| !**u).count();
  if unused > 0 {
    bevy::log::debug!("contour closed with {unused} edges left over (enclosed holes or islands)");
  }

  path
}

/// Removes vertices whose incident edges are collinear.
fn remove_collinear(path: &mut Vec<Vec2>) {
  let mut changed = true;
  while changed && path.len() > 3 {
    changed = false;
    let mut i = 0;
    while i < path.len() && path.len() > 3 {
      let n = path.len();
      let prev = path[(i + n - 1) % n];
      let cur = path[i];
      let next = path[(i + 1) % n];
      if (cur - prev).perp_dot(next - cur).abs() <= EPSILON {
        path.remove(i);
        changed = true;
      } else {
        i += 1;
      }
    }
  }
}

/// Clockwise test for Y+ up coordinates (positive trapezoid sum).
pub fn is_clockwise(path: &[Vec2]) -> bool {
  let n = path.len();
  let sum: f32 = (0..n)
    .map(|i| {
      let (c, nx) = (path[i], path[(i + 1) % n]);
      (nx.x - c.x) * (nx.y + c.y)
    })
    .sum();
  sum > 0.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grid::Rgba;

  fn single_pixel(w: u32, h: u32, at: IVec2) -> PixelGrid {
    let mut grid = PixelGrid::new(w, h);
    grid.set_pixel(at, Rgba::WHITE);
    grid
  }

  fn same_loop(a: &[Vec2], b: &[Vec2]) -> bool {
    a.len() == b.len() && b.iter().all(|p| a.iter().any(|q| p.distance_squared(*q) < 1e-6))
  }

  /// Builds a grid from rows listed top to bottom; `#` is present.
  fn from_rows(rows: &[&str]) -> PixelGrid {
    let h = rows.len() as i32;
    PixelGrid::from_fn(rows[0].len() as u32, h as u32, |p| {
      match rows[(h - 1 - p.y) as usize].as_bytes()[p.x as usize] {
        b'#' => Rgba::WHITE,
        _ => Rgba::TRANSPARENT,
      }
    })
  }

  fn shoelace(path: &[Vec2]) -> f32 {
    let n = path.len();
    (0..n).map(|i| path[i].perp_dot(path[(i + 1) % n])).sum::<f32>().abs() / 2.0
  }

  #[test]
  fn single_pixel_is_unit_square() {
    let grid = single_pixel(4, 3, IVec2::new(2, 1));
    let outline = GridContourTracer::trace_cells(&grid).unwrap();
    let expected = [
      Vec2::new(2.0, 1.0),
      Vec2::new(3.0, 1.0),
      Vec2::new(3.0, 2.0),
      Vec2::new(2.0, 2.0),
    ];
    assert!(same_loop(&outline, &expected), "{outline:?}");
    assert!(is_clockwise(&outline));
  }

  #[test]
  fn full_row_is_rectangle() {
    let grid = PixelGrid::filled(5, 1, Rgba::WHITE);
    let outline = GridContourTracer::trace_cells(&grid).unwrap();
    let expected = [
      Vec2::ZERO,
      Vec2::new(5.0, 0.0),
      Vec2::new(5.0, 1.0),
      Vec2::new(0.0, 1.0),
    ];
    assert!(same_loop(&outline, &expected), "{outline:?}");
  }

  #[test]
  fn l_shape_has_six_corners() {
    let mut grid = PixelGrid::filled(3, 3, Rgba::WHITE);
    grid.remove_pixels(&[IVec2::new(1, 1), IVec2::new(2, 1), IVec2::new(1, 2), IVec2::new(2, 2)]);
    let outline = GridContourTracer::trace_cells(&grid).unwrap();
    assert_eq!(outline.len(), 6);
    assert!(is_clockwise(&outline));
  }

  #[test]
  fn hole_touching_outside_corner_is_folded_in() {
    let grid = from_rows(&["##.", "#.#", "###"]);
    let outline = GridContourTracer::trace_cells(&grid).unwrap();
    // The shared corner is visited twice: once on the outside, once around
    // the hole.
    let pinch = Vec2::new(2.0, 2.0);
    assert_eq!(outline.iter().filter(|p| **p == pinch).count(), 2, "{outline:?}");
    assert_eq!(shoelace(&outline), 7.0);
    assert!(is_clockwise(&outline));
  }

  #[test]
  fn diagonal_notch_keeps_outer_loop() {
    let grid = from_rows(&[".##", "#.#", "###"]);
    let outline = GridContourTracer::trace_cells(&grid).unwrap();
    assert_eq!(shoelace(&outline), 7.0);
  }

  #[test]
  fn empty_grid_has_no_outline() {
    assert!(GridContourTracer::trace_cells(&PixelGrid::new(3, 3)).is_none());
  }

  #[test]
  fn pivot_and_scale_apply() {
    let grid = PixelGrid::filled(4, 2, Rgba::WHITE);
    let tracer = GridContourTracer::new(Vec2::splat(0.5), 2.0);
    let outline = tracer.trace(&grid).unwrap();
    let expected = [
      Vec2::new(-1.0, -0.5),
      Vec2::new(1.0, -0.5),
      Vec2::new(1.0, 0.5),
      Vec2::new(-1.0, 0.5),
    ];
    assert!(same_loop(&outline, &expected), "{outline:?}");
  }

  #[test]
  fn clockwise_test_matches_orientation() {
    let ccw = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    let cw: Vec<Vec2> = ccw.iter().rev().copied().collect();
    assert!(!is_clockwise(&ccw));
    assert!(is_clockwise(&cw));
  }
}
