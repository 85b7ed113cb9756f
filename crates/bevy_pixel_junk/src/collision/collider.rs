//! Rapier collider construction from outline paths.

use bevy::math::Vec2;
use bevy_rapier2d::prelude::Collider;

use super::triangulate_paths;

/// Builds a compound triangle collider covering `paths`.
///
/// Returns `None` if no non-degenerate triangle could be produced.
pub fn collider_from_paths(paths: &[Vec<Vec2>]) -> Option<Collider> {
  let shapes: Vec<(Vec2, f32, Collider)> = triangulate_paths(paths)
    .into_iter()
    .map(|[a, b, c]| (Vec2::ZERO, 0.0, Collider::triangle(a, b, c)))
    .collect();

  if shapes.is_empty() {
    return None;
  }
  Some(Collider::compound(shapes))
}
