//! Ray marching across grid cells.

use bevy::math::{IVec2, Vec2};

/// Steps allowed outside the grid before the ray must have entered it.
///
/// Impact cells sit on or just past the body's outline, so a ray that has not
/// entered within a few cells is treated as missing the grid entirely.
const MAX_ENTRY_STEPS: usize = 3;

/// Enumerates cells crossed by a ray, nearest first.
pub struct GridMarcher;

impl GridMarcher {
  /// Walks from `start` along `direction`, returning every in-bounds cell
  /// visited until the ray leaves the `dims` rectangle.
  ///
  /// The dominant axis advances one cell per step while the minor axis follows
  /// the slope, so cells come out in strictly increasing distance from
  /// `start`. A zero direction yields just `start` (when in bounds).
  pub fn march(dims: IVec2, start: IVec2, direction: Vec2) -> Vec<IVec2> {
    let in_bounds =
      |p: IVec2| p.x >= 0 && p.y >= 0 && p.x < dims.x && p.y < dims.y;

    let Some(dir) = direction.try_normalize() else {
      return if in_bounds(start) { vec![start] } else { Vec::new() };
    };

    // The dominant component is at least 1/sqrt(2) after normalizing.
    let step = if dir.x.abs() >= dir.y.abs() {
      Vec2::new(dir.x.signum(), dir.y / dir.x.abs())
    } else {
      Vec2::new(dir.x / dir.y.abs(), dir.y.signum())
    };

    let origin = start.as_vec2();
    let max_steps = (dims.x + dims.y) as usize + MAX_ENTRY_STEPS;
    let mut cells = Vec::new();
    let mut entered = false;

    for i in 0..=max_steps {
      let cell = (origin + step * i as f32).round().as_ivec2();
      if in_bounds(cell) {
        entered = true;
        cells.push(cell);
      } else if entered || i >= MAX_ENTRY_STEPS {
        break;
      }
    }
    cells
  }
}
