//! Douglas-Peucker simplification of closed contour paths.

use bevy::math::Vec2;

/// Simplifies a closed path, keeping every vertex that deviates more than
/// `tolerance` from the simplified outline.
///
/// The loop is anchored at its two furthest-apart vertices so the arbitrary
/// start vertex does not survive simplification by accident. Vertex order
/// (and so winding) is preserved.
pub fn simplify_closed(path: &[Vec2], tolerance: f32) -> Vec<Vec2> {
  let n = path.len();
  if n <= 3 || tolerance <= 0.0 {
    return path.to_vec();
  }

  let (a, b) = furthest_pair(path);
  let mut keep = vec![false; n];
  keep[a] = true;
  keep[b] = true;

  // Walk both arcs of the loop: a -> b and b -> a (wrapping).
  mark_arc(path, a, b, tolerance, &mut keep);
  mark_arc(path, b, a, tolerance, &mut keep);

  path
    .iter()
    .zip(&keep)
    .filter_map(|(&p, &k)| k.then_some(p))
    .collect()
}

/// Simplifies each path, dropping paths that collapse below a triangle.
///
/// Returns the input unchanged if no path survives.
pub fn simplify_paths(paths: Vec<Vec<Vec2>>, tolerance: f32) -> Vec<Vec<Vec2>> {
  if tolerance <= 0.0 {
    return paths;
  }
  let simplified: Vec<Vec<Vec2>> = paths
    .iter()
    .map(|p| simplify_closed(p, tolerance))
    .filter(|p| p.len() >= 3)
    .collect();
  if simplified.is_empty() {
    paths
  } else {
    simplified
  }
}

/// Marks vertices to keep on the arc from `from` to `to` (indices wrap).
///
/// Uses an explicit stack of open spans instead of recursion.
fn mark_arc(path: &[Vec2], from: usize, to: usize, tolerance: f32, keep: &mut [bool]) {
  let n = path.len();
  let len = (to + n - from) % n;
  let at = |offset: usize| (from + offset) % n;
  let tolerance_sq = tolerance * tolerance;

  let mut spans = vec![(0usize, len)];
  while let Some((lo, hi)) = spans.pop() {
    if hi <= lo + 1 {
      continue;
    }
    let (start, end) = (path[at(lo)], path[at(hi)]);

    let mut max_dist_sq = 0.0f32;
    let mut max_offset = lo;
    for offset in lo + 1..hi {
      let dist_sq = distance_to_segment_squared(path[at(offset)], start, end);
      if dist_sq > max_dist_sq {
        max_dist_sq = dist_sq;
        max_offset = offset;
      }
    }

    if max_dist_sq > tolerance_sq {
      keep[at(max_offset)] = true;
      spans.push((lo, max_offset));
      spans.push((max_offset, hi));
    }
  }
}

fn furthest_pair(path: &[Vec2]) -> (usize, usize) {
  let mut best = (0, path.len() / 2);
  let mut max_dist_sq = 0.0f32;
  for i in 0..path.len() {
    for j in i + 1..path.len() {
      let dist_sq = path[i].distance_squared(path[j]);
      if dist_sq > max_dist_sq {
        max_dist_sq = dist_sq;
        best = (i, j);
      }
    }
  }
  best
}

fn distance_to_segment_squared(point: Vec2, start: Vec2, end: Vec2) -> f32 {
  let segment = end - start;
  let len_sq = segment.length_squared();
  if len_sq < 1e-10 {
    return point.distance_squared(start);
  }
  let t = ((point - start).dot(segment) / len_sq).clamp(0.0, 1.0);
  point.distance_squared(start + t * segment)
}
