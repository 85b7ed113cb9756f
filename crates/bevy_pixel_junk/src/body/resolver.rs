//! Policies deciding which cells a collision destroys.

use bevy::math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::grid::{PixelGrid, closest_pixel, closest_pixels};

fn default_energy_per_pixel() -> f32 {
  500.0
}

/// A collision expressed in the struck body's cell space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
  /// Contact point in continuous cell space (integers are cell centers).
  pub point: Vec2,
  /// Velocity of the other body relative to this one, rotated into the
  /// body's local frame.
  pub direction: Vec2,
  /// Magnitude of the relative velocity in world units.
  pub speed: f32,
  /// Mass of the other body.
  pub other_mass: f32,
}

/// Destruction policy, chosen per body at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionResolver {
  /// Destroys the single present cell nearest the impact point.
  #[default]
  NearestPixel,
  /// Destroys the `speed * other_mass / energy_per_pixel` cells nearest the
  /// impact point, optionally capped at `max_pixels`.
  ImpactScaled {
    #[serde(default = "default_energy_per_pixel")]
    energy_per_pixel: f32,
    #[serde(default)]
    max_pixels: Option<usize>,
  },
  /// Destroys the cell where the other body's trajectory entered the grid.
  ///
  /// Walks back from the impact cell against the direction of travel and
  /// takes the farthest present cell; failing that, the first present cell
  /// ahead; failing that, the nearest cell.
  AlongTrajectory,
}

impl CollisionResolver {
  /// Impact-scaled policy with the default energy per pixel and no cap.
  pub fn impact_scaled() -> Self {
    Self::ImpactScaled {
      energy_per_pixel: default_energy_per_pixel(),
      max_pixels: None,
    }
  }

  /// Returns the cells to remove for `impact`. May be empty.
  pub fn select(&self, grid: &PixelGrid, impact: &Impact) -> Vec<IVec2> {
    match *self {
      Self::NearestPixel => closest_pixel(grid, impact.point).into_iter().collect(),
      Self::ImpactScaled {
        energy_per_pixel,
        max_pixels,
      } => {
        let mut count = destroyed_count(impact.speed, impact.other_mass, energy_per_pixel);
        if let Some(max) = max_pixels {
          count = count.min(max);
        }
        closest_pixels(grid, impact.point, count)
      }
      Self::AlongTrajectory => {
        let hit = impact.point.round().as_ivec2();
        grid
          .point_along_path(hit, -impact.direction, true)
          .or_else(|| grid.point_along_path(hit, impact.direction, false))
          .or_else(|| closest_pixel(grid, impact.point))
          .into_iter()
          .collect()
      }
    }
  }
}

/// Cells destroyed by an impact: kinetic proxy over energy per cell, truncated.
pub fn destroyed_count(speed: f32, other_mass: f32, energy_per_pixel: f32) -> usize {
  if energy_per_pixel <= 0.0 {
    return 0;
  }
  let count = speed * other_mass / energy_per_pixel;
  if count.is_finite() && count > 0.0 {
    count as usize
  } else {
    0
  }
}
