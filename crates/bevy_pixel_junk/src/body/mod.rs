//! Pixelated bodies: entities whose shape is a [`PixelGrid`].
//!
//! A [`PixelatedBody`] owns its grid and its [`PixelCollisionHandler`]. The
//! grid is the ground truth; mass and the collision outline are derived from
//! it after every mutation and cached on the component until the physics
//! adapter picks them up.
//!
//! # Spawning
//!
//! ```ignore
//! commands.spawn((
//!   PixelatedBody::new(PixelGrid::circle(8, Rgba::WHITE), CollisionResolver::NearestPixel),
//!   Transform::from_xyz(0.0, 40.0, 0.0),
//! ));
//! ```

mod handler;
#[cfg(feature = "rapier2d")]
pub mod physics;
mod resolver;
mod systems;

use bevy::math::{Isometry2d, Rot2};
use bevy::prelude::*;
pub use handler::{
  CollisionInfo, DestructionHooks, DestructionLog, DestructionReport, PixelCollisionHandler,
};
pub use resolver::{CollisionResolver, Impact, destroyed_count};
pub use systems::{
  DestructionWriters, NoPixelsLeft, PixelCollision, PixelsDestroyed, RemovePixels, SpawnEffect,
  SpawnFragment, despawn_empty_bodies, handle_pixel_collisions, handle_remove_pixel_requests,
  prepare_new_bodies, reset_collision_latches, spawn_fragments, sync_grid_images,
};

use crate::collision::outline_paths;
use crate::config::DestructionConfig;
use crate::grid::{GridImageError, PixelGrid};

/// World placement and motion of a body for one destruction event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyPose {
  pub isometry: Isometry2d,
  pub linear_velocity: Vec2,
  pub angular_velocity: f32,
}

impl Default for BodyPose {
  fn default() -> Self {
    Self::new(Isometry2d::IDENTITY)
  }
}

impl BodyPose {
  pub fn new(isometry: Isometry2d) -> Self {
    Self {
      isometry,
      linear_velocity: Vec2::ZERO,
      angular_velocity: 0.0,
    }
  }

  /// Pose from a 3D transform: XY translation and rotation about Z.
  pub fn from_transform(transform: &Transform) -> Self {
    let (angle, _, _) = transform.rotation.to_euler(EulerRot::ZYX);
    Self::new(Isometry2d::new(
      transform.translation.truncate(),
      Rot2::radians(angle),
    ))
  }

  pub fn with_velocity(mut self, linear: Vec2, angular: f32) -> Self {
    self.linear_velocity = linear;
    self.angular_velocity = angular;
    self
  }

  /// Maps a world point into continuous cell space, where integer
  /// coordinates are cell centers.
  pub fn world_to_cell(&self, world: Vec2, dims: IVec2, config: &DestructionConfig) -> Vec2 {
    let local = self.isometry.inverse_transform_point(world);
    local * config.pixels_per_unit + config.pivot() * dims.as_vec2() - 0.5
  }

  /// Inverse of [`BodyPose::world_to_cell`].
  pub fn cell_to_world(&self, cell: Vec2, dims: IVec2, config: &DestructionConfig) -> Vec2 {
    self.corner_to_world(cell + 0.5, dims, config)
  }

  /// Maps a point in cell-corner space (cell `(x, y)` spans `[x, x + 1]`)
  /// into the world.
  pub fn corner_to_world(&self, corner: Vec2, dims: IVec2, config: &DestructionConfig) -> Vec2 {
    let local = (corner - config.pivot() * dims.as_vec2()) / config.pixels_per_unit;
    self.isometry.transform_point(local)
  }

  /// Rotates a world direction into the body's local frame.
  #[inline]
  pub fn world_direction_to_local(&self, direction: Vec2) -> Vec2 {
    self.isometry.rotation.inverse() * direction
  }
}

/// Physics-agnostic copy of a body's velocity.
///
/// The rapier adapter keeps it in sync; without a physics engine it can be
/// written directly.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyVelocity {
  pub linear: Vec2,
  pub angular: f32,
}

/// A region split off a body, ready to become a body of its own.
#[derive(Clone, Debug)]
pub struct Fragment {
  /// World position of the fragment's pivot.
  pub position: Vec2,
  pub rotation: Rot2,
  /// Tight-bounds copy of the region's cells.
  pub grid: PixelGrid,
  pub linear_velocity: Vec2,
  pub angular_velocity: f32,
  /// Inherited from the parent.
  pub resolver: CollisionResolver,
}

impl Fragment {
  pub fn transform(&self, z: f32) -> Transform {
    Transform::from_translation(self.position.extend(z))
      .with_rotation(Quat::from_rotation_z(self.rotation.as_radians()))
  }
}

/// Marks a body spawned from another body's split.
#[derive(Component, Clone, Copy, Debug)]
pub struct JunkFragment {
  pub parent: Entity,
}

/// Image asset mirroring a body's grid.
///
/// [`sync_grid_images`] re-uploads the grid whenever its applied generation
/// moves past the one last written.
#[derive(Component, Clone, Debug)]
pub struct GridImage {
  pub handle: Handle<Image>,
  synced_generation: Option<u64>,
}

impl GridImage {
  pub fn new(handle: Handle<Image>) -> Self {
    Self {
      handle,
      synced_generation: None,
    }
  }

  /// An image already holding generation `generation` of the grid.
  pub fn synced(handle: Handle<Image>, generation: u64) -> Self {
    Self {
      handle,
      synced_generation: Some(generation),
    }
  }

  #[inline]
  pub fn synced_generation(&self) -> Option<u64> {
    self.synced_generation
  }

  #[inline]
  pub(crate) fn mark_synced(&mut self, generation: u64) {
    self.synced_generation = Some(generation);
  }
}

/// A destructible rigid body made of pixels.
#[derive(Component, Clone, Debug)]
#[require(Transform, BodyVelocity)]
pub struct PixelatedBody {
  pub grid: PixelGrid,
  pub handler: PixelCollisionHandler,
  mass: f32,
  /// Collision outline in body-local world units, empty until built.
  paths: Vec<Vec<Vec2>>,
  collider_dirty: bool,
}

impl PixelatedBody {
  pub fn new(grid: PixelGrid, resolver: CollisionResolver) -> Self {
    Self {
      mass: grid.live_count() as f32,
      grid,
      handler: PixelCollisionHandler::new(resolver),
      paths: Vec::new(),
      collider_dirty: false,
    }
  }

  /// Body using the config's resolver.
  pub fn from_config(grid: PixelGrid, config: &DestructionConfig) -> Self {
    Self::new(grid, config.resolver)
  }

  /// Builds a body from an RGBA8 image; transparent texels are absent.
  pub fn from_image(image: &Image, resolver: CollisionResolver) -> Result<Self, GridImageError> {
    Ok(Self::new(PixelGrid::from_image(image)?, resolver))
  }

  /// Recomputes mass and outline from the grid.
  ///
  /// Returns false when the grid has nothing to trace.
  pub fn rebuild(&mut self, config: &DestructionConfig) -> bool {
    self.mass = self.grid.live_count() as f32;
    self.paths = outline_paths(
      &self.grid,
      &config.tracer(),
      config.line_simplification_tolerance,
    )
    .unwrap_or_default();
    self.collider_dirty = true;
    !self.paths.is_empty()
  }

  /// Live cell count as of the last rebuild.
  #[inline]
  pub fn mass(&self) -> f32 {
    self.mass
  }

  #[inline]
  pub fn paths(&self) -> &[Vec<Vec2>] {
    &self.paths
  }

  /// Returns true when the outline changed since the collider was last built.
  #[inline]
  pub fn is_collider_dirty(&self) -> bool {
    self.collider_dirty
  }

  /// Returns the outline if it changed since the last call.
  pub fn take_collider_update(&mut self) -> Option<&[Vec<Vec2>]> {
    if !self.collider_dirty || self.paths.is_empty() {
      return None;
    }
    self.collider_dirty = false;
    Some(self.paths.as_slice())
  }

  /// See [`BodyPose::world_to_cell`].
  pub fn world_to_cell_space(
    &self,
    pose: &BodyPose,
    world: Vec2,
    config: &DestructionConfig,
  ) -> Vec2 {
    pose.world_to_cell(world, self.grid.dimensions(), config)
  }

  pub fn on_collision(
    &mut self,
    pose: &BodyPose,
    info: &CollisionInfo,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> Option<DestructionReport> {
    let mut hooks = BodyHooks::new(
      &mut self.mass,
      &mut self.paths,
      &mut self.collider_dirty,
      hooks,
    );
    self
      .handler
      .on_collision(&mut self.grid, pose, info, config, &mut hooks)
  }

  pub fn remove_pixel_at(
    &mut self,
    cell: IVec2,
    pose: &BodyPose,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> DestructionReport {
    self.remove_pixels(&[cell], pose, config, hooks)
  }

  pub fn remove_pixels(
    &mut self,
    cells: &[IVec2],
    pose: &BodyPose,
    config: &DestructionConfig,
    hooks: &mut impl DestructionHooks,
  ) -> DestructionReport {
    let mut hooks = BodyHooks::new(
      &mut self.mass,
      &mut self.paths,
      &mut self.collider_dirty,
      hooks,
    );
    self
      .handler
      .remove_pixels(&mut self.grid, cells, pose, config, &mut hooks)
  }
}

/// Caches mass and outline on the body, then forwards to the caller's hooks.
struct BodyHooks<'a, H> {
  mass: &'a mut f32,
  paths: &'a mut Vec<Vec<Vec2>>,
  dirty: &'a mut bool,
  inner: &'a mut H,
}

impl<'a, H: DestructionHooks> BodyHooks<'a, H> {
  fn new(
    mass: &'a mut f32,
    paths: &'a mut Vec<Vec<Vec2>>,
    dirty: &'a mut bool,
    inner: &'a mut H,
  ) -> Self {
    Self {
      mass,
      paths,
      dirty,
      inner,
    }
  }
}

impl<H: DestructionHooks> DestructionHooks for BodyHooks<'_, H> {
  fn spawn_fragment(&mut self, fragment: Fragment) {
    self.inner.spawn_fragment(fragment);
  }

  fn spawn_effect(&mut self, position: Vec2) {
    self.inner.spawn_effect(position);
  }

  fn no_pixels_left(&mut self) {
    self.paths.clear();
    *self.mass = 0.0;
    self.inner.no_pixels_left();
  }

  fn replace_collider(&mut self, paths: &[Vec<Vec2>]) {
    *self.paths = paths.to_vec();
    *self.dirty = true;
    self.inner.replace_collider(paths);
  }

  fn set_mass(&mut self, mass: f32) {
    *self.mass = mass;
    self.inner.set_mass(mass);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grid::Rgba;

  #[test]
  fn pose_round_trips_cells() {
    let config = DestructionConfig::default().with_pixels_per_unit(4.0);
    let pose = BodyPose::new(Isometry2d::new(Vec2::new(3.0, -2.0), Rot2::degrees(30.0)));
    let dims = IVec2::new(7, 5);
    let cell = Vec2::new(2.0, 4.0);
    let world = pose.cell_to_world(cell, dims, &config);
    assert!((pose.world_to_cell(world, dims, &config) - cell).length() < 1e-4);
  }

  #[test]
  fn origin_maps_to_pivot() {
    let config = DestructionConfig::default();
    let pose = BodyPose::default();
    // 4x4 grid: the origin sits on the shared corner of cells (1, 1) and (2, 2).
    assert_eq!(pose.world_to_cell(Vec2::ZERO, IVec2::splat(4), &config), Vec2::splat(1.5));
    assert_eq!(pose.corner_to_world(Vec2::ZERO, IVec2::splat(4), &config), Vec2::splat(-2.0));
  }

  #[test]
  fn pose_from_transform_reads_z_rotation() {
    let transform = Transform::from_xyz(1.0, 2.0, 5.0).with_rotation(Quat::from_rotation_z(0.5));
    let pose = BodyPose::from_transform(&transform);
    assert_eq!(pose.isometry.translation, Vec2::new(1.0, 2.0));
    assert!((pose.isometry.rotation.as_radians() - 0.5).abs() < 1e-5);
  }

  #[test]
  fn config_body_uses_configured_resolver() {
    let config = DestructionConfig::default().with_resolver(CollisionResolver::AlongTrajectory);
    let body = PixelatedBody::from_config(PixelGrid::filled(2, 2, Rgba::WHITE), &config);
    assert_eq!(body.handler.resolver, CollisionResolver::AlongTrajectory);
  }

  #[test]
  fn world_to_cell_space_follows_body_pose() {
    let config = DestructionConfig::default().with_pixels_per_unit(2.0);
    let body = PixelatedBody::from_config(PixelGrid::filled(4, 4, Rgba::WHITE), &config);
    let pose = BodyPose::new(Isometry2d::from_translation(Vec2::new(5.0, 0.0)));
    // Half a unit right of the body origin is one cell past the pivot corner.
    let cell = body.world_to_cell_space(&pose, Vec2::new(5.5, 0.0), &config);
    assert_eq!(cell, Vec2::new(2.5, 1.5));
  }

  #[test]
  fn rebuild_caches_mass_and_outline() {
    let config = DestructionConfig::default();
    let mut body = PixelatedBody::from_config(PixelGrid::filled(3, 2, Rgba::WHITE), &config);
    assert!(body.paths().is_empty());
    assert!(body.rebuild(&config));
    assert_eq!(body.mass(), 6.0);
    assert_eq!(body.paths().len(), 1);
    assert!(body.take_collider_update().is_some());
    assert!(body.take_collider_update().is_none());
  }

  #[test]
  fn removal_marks_collider_dirty() {
    let config = DestructionConfig::default();
    let mut body = PixelatedBody::from_config(PixelGrid::filled(3, 3, Rgba::WHITE), &config);
    body.rebuild(&config);
    body.take_collider_update();

    let mut log = DestructionLog::default();
    body.remove_pixel_at(IVec2::new(0, 0), &BodyPose::default(), &config, &mut log);
    assert_eq!(body.mass(), 8.0);
    assert!(body.is_collider_dirty());
    assert_eq!(log.mass, Some(8.0));
  }

  #[test]
  fn emptied_body_drops_outline() {
    let config = DestructionConfig::default();
    let mut body = PixelatedBody::from_config(PixelGrid::filled(1, 1, Rgba::WHITE), &config);
    body.rebuild(&config);

    let mut log = DestructionLog::default();
    body.remove_pixel_at(IVec2::ZERO, &BodyPose::default(), &config, &mut log);
    assert!(log.no_pixels_left);
    assert!(body.paths().is_empty());
    assert_eq!(body.mass(), 0.0);
    assert!(body.take_collider_update().is_none());
  }

  #[test]
  fn fragment_transform_keeps_rotation() {
    let fragment = Fragment {
      position: Vec2::new(4.0, 1.0),
      rotation: Rot2::degrees(90.0),
      grid: PixelGrid::new(1, 1),
      linear_velocity: Vec2::ZERO,
      angular_velocity: 0.0,
      resolver: CollisionResolver::NearestPixel,
    };
    let transform = fragment.transform(2.0);
    assert_eq!(transform.translation, Vec3::new(4.0, 1.0, 2.0));
    let (angle, _, _) = transform.rotation.to_euler(EulerRot::ZYX);
    assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
  }
}
