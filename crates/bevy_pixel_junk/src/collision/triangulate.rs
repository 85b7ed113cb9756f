//! Contour triangulation using Constrained Delaunay Triangulation (CDT).
//!
//! Physics backends want convex pieces; a traced outline is generally
//! concave, so each path is split into triangles with its edges kept as CDT
//! constraints.

use std::collections::HashMap;

use bevy::math::Vec2;
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};

/// A triangle as three indices into its source path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
  pub a: usize,
  pub b: usize,
  pub c: usize,
}

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

/// Triangulates a simple closed path (either winding).
///
/// Returns an empty list for paths with fewer than 3 vertices or with
/// self-intersecting edges.
pub fn triangulate_path(path: &[Vec2]) -> Vec<Triangle> {
  match path.len() {
    0..=2 => return Vec::new(),
    3 => return vec![Triangle { a: 0, b: 1, c: 2 }],
    _ => {}
  }
  if has_self_intersections(path) {
    bevy::log::debug!("skipping self-intersecting path with {} vertices", path.len());
    return Vec::new();
  }

  let Some((cdt, handles)) = build_cdt(path) else {
    return Vec::new();
  };
  let index_of: HashMap<FixedVertexHandle, usize> = handles
    .iter()
    .enumerate()
    .map(|(i, &h)| (h, i))
    .collect();

  cdt
    .inner_faces()
    .filter_map(|face| {
      let verts = face.vertices();
      let corners: [Vec2; 3] = std::array::from_fn(|i| {
        let p = verts[i].position();
        Vec2::new(p.x as f32, p.y as f32)
      });
      // The CDT covers the convex hull; keep faces inside the outline.
      let centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
      if !point_in_polygon(centroid, path) {
        return None;
      }
      Some(Triangle {
        a: *index_of.get(&verts[0].fix())?,
        b: *index_of.get(&verts[1].fix())?,
        c: *index_of.get(&verts[2].fix())?,
      })
    })
    .collect()
}

/// Triangulates every path and resolves indices to positions.
///
/// Degenerate (zero-area) triangles are dropped.
pub fn triangulate_paths(paths: &[Vec<Vec2>]) -> Vec<[Vec2; 3]> {
  paths
    .iter()
    .flat_map(|path| {
      triangulate_path(path)
        .into_iter()
        .map(move |t| [path[t.a], path[t.b], path[t.c]])
    })
    .filter(|[a, b, c]| (*b - *a).perp_dot(*c - *a).abs() > f32::EPSILON)
    .collect()
}

fn build_cdt(path: &[Vec2]) -> Option<(Cdt, Vec<FixedVertexHandle>)> {
  let mut cdt = Cdt::new();
  let handles = path
    .iter()
    .map(|v| cdt.insert(Point2::new(v.x as f64, v.y as f64)).ok())
    .collect::<Option<Vec<_>>>()?;

  for i in 0..handles.len() {
    let j = (i + 1) % handles.len();
    if handles[i] != handles[j] && cdt.can_add_constraint(handles[i], handles[j]) {
      cdt.add_constraint(handles[i], handles[j]);
    }
  }
  Some((cdt, handles))
}

fn has_self_intersections(path: &[Vec2]) -> bool {
  let n = path.len();
  for i in 0..n {
    let (a1, a2) = (path[i], path[(i + 1) % n]);
    for j in (i + 2)..n {
      // Edges i and j share a vertex when j wraps around to i.
      if (j + 1) % n == i {
        continue;
      }
      let (b1, b2) = (path[j], path[(j + 1) % n]);
      if segments_cross(a1, a2, b1, b2) {
        return true;
      }
    }
  }
  false
}

/// Proper crossing test; touching endpoints do not count.
fn segments_cross(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
  let d1 = (b2 - b1).perp_dot(a1 - b1);
  let d2 = (b2 - b1).perp_dot(a2 - b1);
  let d3 = (a2 - a1).perp_dot(b1 - a1);
  let d4 = (a2 - a1).perp_dot(b2 - a1);
  d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Even-odd ray casting test.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
  let n = polygon.len();
  if n < 3 {
    return false;
  }
  let mut inside = false;
  let mut j = n - 1;
  for i in 0..n {
    let (vi, vj) = (polygon[i], polygon[j]);
    if (vi.y > point.y) != (vj.y > point.y)
      && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
    {
      inside = !inside;
    }
    j = i;
  }
  inside
}

#[cfg(test)]
mod tests {
  use super::*;

  fn area(tris: &[[Vec2; 3]]) -> f32 {
    tris
      .iter()
      .map(|[a, b, c]| (*b - *a).perp_dot(*c - *a).abs() / 2.0)
      .sum()
  }

  #[test]
  fn square_becomes_two_triangles() {
    let square = vec![Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X];
    let tris = triangulate_paths(&[square]);
    assert_eq!(tris.len(), 2);
    assert!((area(&tris) - 1.0).abs() < 1e-5);
  }

  #[test]
  fn concave_outline_excludes_notch() {
    // L shape, area 5.
    let l = vec![
      Vec2::new(0.0, 0.0),
      Vec2::new(0.0, 3.0),
      Vec2::new(1.0, 3.0),
      Vec2::new(1.0, 1.0),
      Vec2::new(3.0, 1.0),
      Vec2::new(3.0, 0.0),
    ];
    let tris = triangulate_paths(&[l]);
    assert!((area(&tris) - 5.0).abs() < 1e-4);
  }

  #[test]
  fn bowtie_is_rejected() {
    let bowtie = vec![Vec2::ZERO, Vec2::ONE, Vec2::X, Vec2::Y];
    assert!(triangulate_path(&bowtie).is_empty());
  }

  #[test]
  fn point_in_polygon_basic() {
    let square = [Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X];
    assert!(point_in_polygon(Vec2::splat(0.5), &square));
    assert!(!point_in_polygon(Vec2::splat(1.5), &square));
  }
}
