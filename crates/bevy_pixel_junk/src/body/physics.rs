//! rapier2d adapter for pixelated bodies.
//!
//! Add [`PixelJunkRapierPlugin`] next to `RapierPhysicsPlugin` and
//! [`PixelJunkPlugin`](crate::PixelJunkPlugin). It:
//! - gives pixelated bodies a dynamic rigid body, collision events and CCD
//! - forwards rapier contacts as [`PixelCollision`] messages, one per
//!   pixelated participant
//! - rebuilds compound colliders and mass whenever an outline changes

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

use super::{BodyVelocity, PixelCollision, PixelatedBody};
use crate::PixelJunkSet;
use crate::collision::collider_from_paths;
use crate::config::DestructionConfig;

/// Bridges pixelated bodies and rapier.
///
/// Panics at startup if [`PixelJunkPlugin`](crate::PixelJunkPlugin) is
/// missing.
#[derive(Default)]
pub struct PixelJunkRapierPlugin;

impl Plugin for PixelJunkRapierPlugin {
  fn build(&self, app: &mut App) {
    assert!(
      app.is_plugin_added::<crate::PixelJunkPlugin>(),
      "PixelJunkRapierPlugin requires PixelJunkPlugin to be added first"
    );

    app.add_systems(
      Update,
      (sync_body_velocity, forward_rapier_collisions)
        .chain()
        .before(PixelJunkSet::Destruction),
    );

    app.add_systems(
      Update,
      (attach_rapier_bodies, apply_collider_updates, toggle_ccd_by_speed)
        .chain()
        .in_set(PixelJunkSet::Sync),
    );
  }
}

/// Copies rapier velocities into [`BodyVelocity`].
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn sync_body_velocity(mut bodies: Query<(&Velocity, &mut BodyVelocity), Changed<Velocity>>) {
  for (velocity, mut body_velocity) in &mut bodies {
    body_velocity.set_if_neq(BodyVelocity {
      linear: velocity.linvel,
      angular: velocity.angvel,
    });
  }
}

type Participant<'a> = (
  &'a GlobalTransform,
  Option<&'a Velocity>,
  Option<&'a ReadMassProperties>,
  Option<&'a PixelatedBody>,
);

/// Turns started rapier contacts into [`PixelCollision`] messages.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn forward_rapier_collisions(
  mut events: MessageReader<CollisionEvent>,
  context: ReadRapierContext,
  participants: Query<Participant>,
  mut collisions: MessageWriter<PixelCollision>,
) {
  let Ok(context) = context.single() else {
    return;
  };

  for event in events.read() {
    let &CollisionEvent::Started(e1, e2, flags) = event else {
      continue;
    };
    if flags.contains(CollisionEventFlags::SENSOR) {
      continue;
    }
    let (Ok(a), Ok(b)) = (participants.get(e1), participants.get(e2)) else {
      continue;
    };

    let contact_point = context
      .contact_pair(e1, e2)
      .and_then(|pair| {
        pair
          .manifolds()
          .find_map(|manifold| manifold.solver_contact(0).map(|contact| contact.point()))
      });

    for (body, other, this, that) in [(e1, e2, a, b), (e2, e1, b, a)] {
      if this.3.is_none() {
        continue;
      }
      collisions.write(PixelCollision {
        body,
        other,
        contact_point: contact_point.unwrap_or_else(|| that.0.translation().truncate()),
        relative_velocity: linvel(that) - linvel(this),
        other_mass: mass_of(that),
        other_is_pixelated: that.3.is_some(),
      });
    }
  }
}

fn linvel(participant: Participant) -> Vec2 {
  participant.1.map(|v| v.linvel).unwrap_or(Vec2::ZERO)
}

fn mass_of(participant: Participant) -> f32 {
  let (_, _, props, body) = participant;
  props
    .map(|p| p.get().mass)
    .filter(|m| *m > 0.0)
    .or_else(|| body.map(|b| b.mass()))
    .unwrap_or(1.0)
}

/// Gives new pixelated bodies the rapier components they need.
///
/// Bodies spawned with their own `RigidBody` keep it.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
#[allow(clippy::type_complexity)]
pub fn attach_rapier_bodies(
  mut commands: Commands,
  unattached: Query<
    (Entity, &BodyVelocity, Has<RigidBody>),
    (With<PixelatedBody>, Without<ActiveEvents>),
  >,
) {
  for (entity, velocity, has_rigid_body) in &unattached {
    let mut entity = commands.entity(entity);
    entity.insert((
      ActiveEvents::COLLISION_EVENTS,
      Ccd::disabled(),
      ReadMassProperties::default(),
    ));
    if !has_rigid_body {
      entity.insert((
        RigidBody::Dynamic,
        Velocity {
          linvel: velocity.linear,
          angvel: velocity.angular,
        },
      ));
    }
  }
}

/// Replaces colliders whose outline changed.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn apply_collider_updates(
  mut commands: Commands,
  mut bodies: Query<(Entity, &mut PixelatedBody), Changed<PixelatedBody>>,
) {
  for (entity, mut body) in &mut bodies {
    if !body.is_collider_dirty() {
      continue;
    }
    let mass = body.mass();
    let Some(paths) = body.take_collider_update() else {
      continue;
    };
    match collider_from_paths(paths) {
      Some(collider) => {
        commands
          .entity(entity)
          .try_insert((collider, ColliderMassProperties::Mass(mass)));
      }
      None => warn!("outline of {entity} produced no triangles; keeping old collider"),
    }
  }
}

/// Switches continuous collision detection on for fast bodies.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn toggle_ccd_by_speed(
  config: Res<DestructionConfig>,
  mut bodies: Query<(&Velocity, &mut Ccd), With<PixelatedBody>>,
) {
  let threshold_sq = config.ccd_speed_threshold * config.ccd_speed_threshold;
  for (velocity, mut ccd) in &mut bodies {
    let enabled = velocity.linvel.length_squared() > threshold_sq;
    if ccd.enabled != enabled {
      ccd.enabled = enabled;
    }
  }
}
