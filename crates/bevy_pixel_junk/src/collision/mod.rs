//! Collision geometry for pixel bodies.
//!
//! A body's collider is rebuilt from scratch after every destructive event:
//! 1. [`GridContourTracer`] turns the grid into one clockwise outline
//! 2. [`simplify_paths`] optionally thins it with Douglas-Peucker
//! 3. [`triangulate_paths`] splits the (concave) outline into triangles
//! 4. With `rapier2d`, the triangles become a compound collider

#[cfg(feature = "rapier2d")]
mod collider;
mod contour;
mod simplify;
mod triangulate;

use bevy::math::Vec2;
#[cfg(feature = "rapier2d")]
pub use collider::collider_from_paths;
pub use contour::{GridContourTracer, is_clockwise};
pub use simplify::{simplify_closed, simplify_paths};
pub use triangulate::{Triangle, point_in_polygon, triangulate_path, triangulate_paths};

use crate::grid::PixelGrid;

/// Traces and simplifies a grid outline into collider paths.
///
/// Returns `None` when the grid has no present cells.
pub fn outline_paths(
  grid: &PixelGrid,
  tracer: &GridContourTracer,
  tolerance: f32,
) -> Option<Vec<Vec<Vec2>>> {
  let outline = tracer.trace(grid)?;
  Some(simplify_paths(vec![outline], tolerance))
}
