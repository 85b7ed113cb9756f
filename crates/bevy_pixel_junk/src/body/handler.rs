//! Per-body reaction to collisions and pixel removal.
//!
//! After any removal the handler runs the same pipeline:
//! 1. Find regions (seeded from the removed cell for single removals,
//!    whole-grid otherwise)
//! 2. Keep the largest region; peel the rest off, spawning a fragment for
//!    each peeled region of at least `min_fragment_pixels` cells
//! 3. Report the new mass (live cell count)
//! 4. Re-trace the outline and replace the collider, or report that no
//!    pixels are left
//!
//! Outbound effects go through [`DestructionHooks`], so the handler itself
//! never touches the ECS or a physics engine.

use bevy::math::{IVec2, Vec2};

use super::{BodyPose, CollisionResolver, Fragment, Impact};
use crate::collision::outline_paths;
use crate::config::DestructionConfig;
use crate::grid::{GridRegionFinder, PixelGrid, Region, Rgba};

/// Receives the side effects of destruction.
pub trait DestructionHooks {
  /// A split-off region became an independent body.
  fn spawn_fragment(&mut self, fragment: Fragment);
  /// A cosmetic effect at a world position.
  fn spawn_effect(&mut self, position: Vec2);
  /// The grid has no present cells; the owning body should be torn down.
  fn no_pixels_left(&mut self);
  /// Full replacement of the collision outline (body-local world units).
  fn replace_collider(&mut self, paths: &[Vec<Vec2>]);
  /// New mass after the grid changed.
  fn set_mass(&mut self, mass: f32);
}

/// Records every hook call.
#[derive(Debug, Default)]
pub struct DestructionLog {
  pub fragments: Vec<Fragment>,
  pub effects: Vec<Vec2>,
  pub no_pixels_left: bool,
  pub collider: Option<Vec<Vec<Vec2>>>,
  pub mass: Option<f32>,
}

impl DestructionHooks for DestructionLog {
  fn spawn_fragment(&mut self, fragment: Fragment) {
    self.fragments.push(fragment);
  }

  fn spawn_effect(&mut self, position: Vec2) {
    self.effects.push(position);
  }

  fn no_pixels_left(&mut self) {
    self.no_pixels_left = true;
  }

  fn replace_collider(&mut self, paths: &[Vec<Vec2>]) {
    self.collider = Some(paths.to_vec());
  }

  fn set_mass(&mut self, mass: f32) {
    self.mass = Some(mass);
  }
}

/// A contact reported by the physics layer, in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionInfo {
  pub contact_point: Vec2,
  /// Velocity of the other body minus this body's velocity.
  pub relative_velocity: Vec2,
  pub other_mass: f32,
  /// Collisions with anything but another pixel body are ignored.
  pub other_is_pixelated: bool,
}

/// Summary of one destructive event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DestructionReport {
  /// Cells removed directly (not counting peeled regions).
  pub removed: Vec<IVec2>,
  /// Regions found after removal, including the one kept.
  pub regions: usize,
  /// Fragment bodies requested.
  pub fragments: usize,
  /// Cells peeled off in regions too small to become fragments.
  pub discarded_pixels: usize,
  pub no_pixels_left: bool,
}

/// Destruction state for one body.
#[derive(Clone, Debug, Default)]
pub struct PixelCollisionHandler {
  pub resolver: CollisionResolver,
  did_collide: bool,
}

impl PixelCollisionHandler {
  pub fn new(resolver: CollisionResolver) -> Self {
    Self {
      resolver,
      did_collide: false,
    }
  }

  /// Re-arms the handler. Call once per physics step.
  #[inline]
  pub fn begin_step(&mut self) {
    self.did_collide = false;
  }

  /// Returns true if a collision was handled since the last step began.
  #[inline]
  pub fn did_collide(&self) -> bool {
    self.did_collide
  }

  /// Handles a contact. Only the first contact with a pixel body per step
  /// destroys anything.
  ///
  /// Returns `None` when the contact was ignored or the resolver picked no
  /// cells.
  pub fn on_collision(
    &mut self,
    grid: &mut PixelGrid,
    pose: &BodyPose,
    info: &CollisionInfo,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> Option<DestructionReport> {
    if self.did_collide || !info.other_is_pixelated {
      return None;
    }
    self.did_collide = true;

    let dims = grid.dimensions();
    let impact = Impact {
      point: pose.world_to_cell(info.contact_point, dims, config),
      direction: pose.world_direction_to_local(info.relative_velocity),
      speed: info.relative_velocity.length(),
      other_mass: info.other_mass,
    };
    let cells = self.resolver.select(grid, &impact);
    if cells.is_empty() {
      return None;
    }

    grid.remove_pixels(&cells);
    for &cell in cells.iter().take(config.effect_count(cells.len())) {
      hooks.spawn_effect(pose.cell_to_world(cell.as_vec2(), dims, config));
    }

    Some(self.after_removal(grid, cells, pose, config, hooks))
  }

  /// Removes one cell and runs the post-removal pipeline.
  pub fn remove_pixel_at(
    &self,
    grid: &mut PixelGrid,
    cell: IVec2,
    pose: &BodyPose,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> DestructionReport {
    self.remove_pixels(grid, &[cell], pose, config, hooks)
  }

  /// Removes a batch of cells and runs the post-removal pipeline.
  ///
  /// Cells that are absent or out of bounds are skipped; if none of `cells`
  /// was present nothing happens and no hook fires.
  pub fn remove_pixels(
    &self,
    grid: &mut PixelGrid,
    cells: &[IVec2],
    pose: &BodyPose,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> DestructionReport {
    let mut present: Vec<IVec2> = cells.iter().copied().filter(|&c| grid.is_pixel(c)).collect();
    present.sort_by_key(|c| (c.y, c.x));
    present.dedup();
    if present.is_empty() {
      return DestructionReport::default();
    }

    grid.remove_pixels(&present);
    self.after_removal(grid, present, pose, config, hooks)
  }

  fn after_removal(
    &self,
    grid: &mut PixelGrid,
    removed: Vec<IVec2>,
    pose: &BodyPose,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> DestructionReport {
    let mut report = DestructionReport {
      removed,
      ..Default::default()
    };

    let mut regions = match report.removed.as_slice() {
      [seed] => GridRegionFinder::find_regions_from(grid, *seed),
      _ => Vec::new(),
    };
    // A batch removal (or an isolated seed) needs the whole-grid scan.
    if regions.is_empty() && !grid.is_empty() {
      regions = GridRegionFinder::find_regions(grid);
    }
    regions.sort_by_key(|r| r.len());
    report.regions = regions.len();

    let Some((_kept, peeled)) = regions.split_last() else {
      bevy::log::debug!("no pixels left after removing {}", report.removed.len());
      report.no_pixels_left = true;
      hooks.no_pixels_left();
      return report;
    };

    for region in peeled {
      if region.len() >= config.min_fragment_pixels {
        if let Some(fragment) = self.build_fragment(grid, region, pose, config) {
          hooks.spawn_fragment(fragment);
          report.fragments += 1;
        }
      } else {
        report.discarded_pixels += region.len();
      }
      for &cell in region {
        grid.set_pixel_no_apply(cell, Rgba::TRANSPARENT);
      }
    }
    grid.apply_pixels();

    bevy::log::debug!(
      "removed {} pixels: {} regions, {} fragments, {} pixels discarded",
      report.removed.len(),
      report.regions,
      report.fragments,
      report.discarded_pixels
    );

    if !Self::rebuild(grid, config, hooks) {
      report.no_pixels_left = true;
    }
    report
  }

  /// Recomputes mass and collider from the grid as it stands.
  ///
  /// Returns false (after calling `no_pixels_left`) when nothing is left to
  /// trace.
  pub fn rebuild(
    grid: &PixelGrid,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> bool {
    hooks.set_mass(grid.live_count() as f32);
    let tolerance = config.line_simplification_tolerance;
    match outline_paths(grid, &config.tracer(), tolerance) {
      Some(paths) => {
        hooks.replace_collider(&paths);
        true
      }
      None => {
        hooks.no_pixels_left();
        false
      }
    }
  }

  /// Copies `region` into a fragment placed where it sat in the parent.
  fn build_fragment(
    &self,
    grid: &PixelGrid,
    region: &Region,
    pose: &BodyPose,
    config: &DestructionConfig,
  ) -> Option<Fragment> {
    let (sub, origin) = grid.sub_grid(region)?;
    // The fragment's origin is its own pivot, expressed in parent corner space.
    let pivot_corner = origin.as_vec2() + config.pivot() * sub.dimensions().as_vec2();
    let position = pose.corner_to_world(pivot_corner, grid.dimensions(), config);
    let angular_velocity = if config.inherit_angular_velocity {
      pose.angular_velocity
    } else {
      0.0
    };

    Some(Fragment {
      position,
      rotation: pose.isometry.rotation,
      grid: sub,
      linear_velocity: pose.linear_velocity,
      angular_velocity,
      resolver: self.resolver,
    })
  }
}
