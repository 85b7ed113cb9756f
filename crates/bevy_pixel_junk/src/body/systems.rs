//! ECS wiring for pixelated bodies.
//!
//! Inbound messages ([`PixelCollision`], [`RemovePixels`]) drive each body's
//! handler; its side effects leave as outbound messages. Fragment spawning
//! and despawning of emptied bodies happen in the same frame as the event
//! that caused them.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::{
  BodyPose, BodyVelocity, CollisionInfo, DestructionHooks, DestructionReport, Fragment, GridImage,
  JunkFragment, PixelatedBody,
};
use crate::config::DestructionConfig;

/// A contact between a pixelated body and something else, in world space.
///
/// Sent by the physics adapter (or by hand); one per pixelated participant.
#[derive(Message, Clone, Debug)]
pub struct PixelCollision {
  pub body: Entity,
  pub other: Entity,
  pub contact_point: Vec2,
  /// Velocity of `other` minus velocity of `body`.
  pub relative_velocity: Vec2,
  pub other_mass: f32,
  pub other_is_pixelated: bool,
}

impl PixelCollision {
  pub fn info(&self) -> CollisionInfo {
    CollisionInfo {
      contact_point: self.contact_point,
      relative_velocity: self.relative_velocity,
      other_mass: self.other_mass,
      other_is_pixelated: self.other_is_pixelated,
    }
  }
}

/// Request to destroy specific cells of a body (tools, debug input).
#[derive(Message, Clone, Debug)]
pub struct RemovePixels {
  pub body: Entity,
  pub cells: Vec<IVec2>,
}

/// Cells removed from a body by a collision or a removal request.
#[derive(Message, Clone, Debug)]
pub struct PixelsDestroyed {
  pub body: Entity,
  pub cells: Vec<IVec2>,
  pub fragments: usize,
}

/// Cosmetic effect request at a world position.
#[derive(Message, Clone, Copy, Debug)]
pub struct SpawnEffect {
  pub body: Entity,
  pub position: Vec2,
}

/// A body lost its last pixel and will be despawned this frame.
#[derive(Message, Clone, Copy, Debug)]
pub struct NoPixelsLeft {
  pub body: Entity,
}

/// A region split off `parent` and should become its own body.
#[derive(Message, Clone, Debug)]
pub struct SpawnFragment {
  pub parent: Entity,
  pub fragment: Fragment,
}

/// Outbound message writers used while destroying pixels.
#[derive(SystemParam)]
pub struct DestructionWriters<'w> {
  fragments: MessageWriter<'w, SpawnFragment>,
  effects: MessageWriter<'w, SpawnEffect>,
  empty: MessageWriter<'w, NoPixelsLeft>,
  destroyed: MessageWriter<'w, PixelsDestroyed>,
}

impl<'w> DestructionWriters<'w> {
  fn hooks(&mut self, body: Entity) -> MessageHooks<'_, 'w> {
    MessageHooks {
      body,
      writers: self,
    }
  }

  fn report(&mut self, body: Entity, report: DestructionReport) {
    if report.removed.is_empty() {
      return;
    }
    self.destroyed.write(PixelsDestroyed {
      body,
      cells: report.removed,
      fragments: report.fragments,
    });
  }
}

/// Turns handler callbacks into messages for one body.
///
/// Mass and outline are cached on the component by the body itself; the
/// physics adapter reads them from there.
struct MessageHooks<'a, 'w> {
  body: Entity,
  writers: &'a mut DestructionWriters<'w>,
}

impl DestructionHooks for MessageHooks<'_, '_> {
  fn spawn_fragment(&mut self, fragment: Fragment) {
    self.writers.fragments.write(SpawnFragment {
      parent: self.body,
      fragment,
    });
  }

  fn spawn_effect(&mut self, position: Vec2) {
    self.writers.effects.write(SpawnEffect {
      body: self.body,
      position,
    });
  }

  fn no_pixels_left(&mut self) {
    self.writers.empty.write(NoPixelsLeft { body: self.body });
  }

  fn replace_collider(&mut self, _paths: &[Vec<Vec2>]) {}

  fn set_mass(&mut self, _mass: f32) {}
}

fn pose_of(transform: &Transform, velocity: &BodyVelocity) -> BodyPose {
  BodyPose::from_transform(transform).with_velocity(velocity.linear, velocity.angular)
}

/// Re-arms every collision latch at the start of the frame.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn reset_collision_latches(mut bodies: Query<&mut PixelatedBody>) {
  for mut body in &mut bodies {
    if body.handler.did_collide() {
      body.handler.begin_step();
    }
  }
}

/// Traces the outline of bodies spawned without one.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn prepare_new_bodies(
  config: Res<DestructionConfig>,
  mut bodies: Query<(Entity, &mut PixelatedBody), Added<PixelatedBody>>,
  mut empty: MessageWriter<NoPixelsLeft>,
) {
  for (entity, mut body) in &mut bodies {
    if body.paths().is_empty() && !body.rebuild(&config) {
      debug!("pixelated body {entity} spawned without pixels");
      empty.write(NoPixelsLeft { body: entity });
    }
  }
}

#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn handle_pixel_collisions(
  config: Res<DestructionConfig>,
  mut collisions: MessageReader<PixelCollision>,
  mut bodies: Query<(&mut PixelatedBody, &Transform, &BodyVelocity)>,
  mut writers: DestructionWriters,
) {
  for collision in collisions.read() {
    let Ok((mut body, transform, velocity)) = bodies.get_mut(collision.body) else {
      continue;
    };
    if body.grid.is_empty() {
      continue;
    }
    let pose = pose_of(transform, velocity);
    let report = body.on_collision(
      &pose,
      &collision.info(),
      &config,
      &mut writers.hooks(collision.body),
    );
    if let Some(report) = report {
      writers.report(collision.body, report);
    }
  }
}

#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn handle_remove_pixel_requests(
  config: Res<DestructionConfig>,
  mut requests: MessageReader<RemovePixels>,
  mut bodies: Query<(&mut PixelatedBody, &Transform, &BodyVelocity)>,
  mut writers: DestructionWriters,
) {
  for request in requests.read() {
    let Ok((mut body, transform, velocity)) = bodies.get_mut(request.body) else {
      continue;
    };
    let pose = pose_of(transform, velocity);
    let report = body.remove_pixels(
      &request.cells,
      &pose,
      &config,
      &mut writers.hooks(request.body),
    );
    writers.report(request.body, report);
  }
}

/// Spawns a body for every split-off region.
///
/// Fragments keep the parent's z and, when the parent mirrors its grid into
/// an image, get an image of their own.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn spawn_fragments(
  mut commands: Commands,
  config: Res<DestructionConfig>,
  mut requests: MessageReader<SpawnFragment>,
  parents: Query<(&Transform, Option<&GridImage>)>,
  mut images: Option<ResMut<Assets<Image>>>,
) {
  for SpawnFragment { parent, fragment } in requests.read() {
    let (z, parent_has_image) = parents
      .get(*parent)
      .map(|(transform, image)| (transform.translation.z, image.is_some()))
      .unwrap_or((0.0, false));

    let mut body = PixelatedBody::new(fragment.grid.clone(), fragment.resolver);
    if !body.rebuild(&config) {
      continue;
    }

    let grid_image = match images.as_deref_mut() {
      Some(images) if parent_has_image => {
        let generation = body.grid.applied_generation();
        Some(GridImage::synced(images.add(body.grid.to_image()), generation))
      }
      _ => None,
    };

    let mut entity = commands.spawn((
      body,
      fragment.transform(z),
      BodyVelocity {
        linear: fragment.linear_velocity,
        angular: fragment.angular_velocity,
      },
      JunkFragment { parent: *parent },
    ));
    if let Some(grid_image) = grid_image {
      entity.insert(grid_image);
    }
  }
}

#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn despawn_empty_bodies(mut commands: Commands, mut empty: MessageReader<NoPixelsLeft>) {
  for NoPixelsLeft { body } in empty.read() {
    if let Ok(mut entity) = commands.get_entity(*body) {
      debug!("despawning emptied body {body}");
      entity.try_despawn();
    }
  }
}

/// Re-uploads grid images whose grid changed.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn sync_grid_images(
  mut images: ResMut<Assets<Image>>,
  mut bodies: Query<(&PixelatedBody, &mut GridImage), Changed<PixelatedBody>>,
) {
  for (body, mut grid_image) in &mut bodies {
    let generation = body.grid.applied_generation();
    if grid_image.synced_generation() == Some(generation) {
      continue;
    }
    let Some(image) = images.get_mut(&grid_image.handle) else {
      continue;
    };
    match body.grid.write_to_image(image) {
      Ok(()) => grid_image.mark_synced(generation),
      Err(e) => warn!("failed to upload pixel grid: {e}"),
    }
  }
}
