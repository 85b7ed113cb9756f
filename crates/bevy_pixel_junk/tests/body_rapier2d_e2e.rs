//! E2E tests for the rapier2d adapter.
//!
//! Bodies are fixed in place so the physics step never produces contacts of
//! its own; collisions are injected as rapier `CollisionEvent`s.
//!
//! Run: cargo test -p bevy_pixel_junk --features rapier2d --test body_rapier2d_e2e

use bevy::prelude::*;
use bevy_pixel_junk::{
  DestructionConfig, PixelCollision, PixelGrid, PixelJunkPlugin, PixelJunkRapierPlugin,
  PixelJunkSet, PixelatedBody, RemovePixels, Rgba,
};
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

#[derive(Resource, Default)]
struct Seen {
  collisions: Vec<PixelCollision>,
}

fn record(mut seen: ResMut<Seen>, mut collisions: MessageReader<PixelCollision>) {
  seen.collisions.extend(collisions.read().cloned());
}

struct TestHarness {
  app: App,
  config: DestructionConfig,
}

impl TestHarness {
  fn new() -> Self {
    let config = DestructionConfig::default();
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);

    app.add_plugins(bevy::transform::TransformPlugin);
    app.add_plugins(bevy::asset::AssetPlugin::default());
    app.add_plugins(bevy::image::ImagePlugin::default());
    app.add_plugins(bevy::scene::ScenePlugin);
    app.add_plugins(bevy::gizmos::GizmoPlugin);

    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().with_length_unit(50.0));
    app.add_plugins(PixelJunkPlugin::new(config.clone()));
    app.add_plugins(PixelJunkRapierPlugin);

    app.init_resource::<Seen>();
    app.add_systems(Update, record.after(PixelJunkSet::Destruction));

    app.update();
    Self { app, config }
  }

  fn spawn_fixed(&mut self, grid: PixelGrid, at: Vec2) -> Entity {
    let body = self
      .app
      .world_mut()
      .spawn((
        PixelatedBody::from_config(grid, &self.config),
        RigidBody::Fixed,
        Transform::from_translation(at.extend(0.0)),
      ))
      .id();
    self.app.update();
    body
  }

  fn body(&self, entity: Entity) -> &PixelatedBody {
    self.app.world().get::<PixelatedBody>(entity).unwrap()
  }

  /// Sets the body's speed, steps once and reports whether CCD is on.
  fn ccd_at_speed(&mut self, entity: Entity, speed: f32) -> bool {
    let world = self.app.world_mut();
    world.get_mut::<Velocity>(entity).unwrap().linvel = Vec2::new(speed, 0.0);
    self.app.update();
    self.app.world().get::<Ccd>(entity).unwrap().enabled
  }

  fn collider_mass(&self, entity: Entity) -> Option<f32> {
    let world = self.app.world();
    world.get::<Collider>(entity)?;
    match world.get::<ColliderMassProperties>(entity)? {
      ColliderMassProperties::Mass(mass) => Some(*mass),
      _ => None,
    }
  }
}

/// Rows listed top to bottom; `#` is present.
fn from_rows(rows: &[&str]) -> PixelGrid {
  let h = rows.len() as i32;
  PixelGrid::from_fn(rows[0].len() as u32, h as u32, |p| {
    match rows[(h - 1 - p.y) as usize].as_bytes()[p.x as usize] {
      b'#' => Rgba::WHITE,
      _ => Rgba::TRANSPARENT,
    }
  })
}

#[test]
fn new_body_gets_collider_and_mass() {
  let mut h = TestHarness::new();
  let body = h.spawn_fixed(PixelGrid::filled(3, 3, Rgba::WHITE), Vec2::ZERO);

  assert_eq!(h.collider_mass(body), Some(9.0));
  assert!(h.app.world().get::<ActiveEvents>(body).is_some());
  assert!(h.app.world().get::<Ccd>(body).is_some());
}

#[test]
fn collider_follows_destruction() {
  let mut h = TestHarness::new();
  let body = h.spawn_fixed(PixelGrid::filled(3, 3, Rgba::WHITE), Vec2::ZERO);

  h.app.world_mut().write_message(RemovePixels {
    body,
    cells: vec![
      IVec2::new(0, 0),
      IVec2::new(1, 0),
      IVec2::new(2, 0),
      IVec2::new(0, 1),
    ],
  });
  h.app.update();

  assert_eq!(h.collider_mass(body), Some(5.0));
  assert!(!h.body(body).is_collider_dirty());
}

#[test]
fn hole_touching_corner_still_gets_collider() {
  let mut h = TestHarness::new();
  let body = h.spawn_fixed(from_rows(&["##.", "#.#", "###"]), Vec2::ZERO);

  assert_eq!(h.collider_mass(body), Some(7.0));
}

#[test]
fn collision_between_pixel_bodies_hits_both() {
  let mut h = TestHarness::new();
  let a = h.spawn_fixed(PixelGrid::filled(3, 3, Rgba::WHITE), Vec2::new(-3.0, 0.0));
  let b = h.spawn_fixed(PixelGrid::filled(3, 3, Rgba::WHITE), Vec2::new(3.0, 0.0));

  h.app.world_mut().write_message(CollisionEvent::Started(
    a,
    b,
    CollisionEventFlags::empty(),
  ));
  h.app.update();

  let collisions = &h.app.world().resource::<Seen>().collisions;
  assert_eq!(collisions.len(), 2);
  assert!(collisions.iter().any(|c| c.body == a && c.other == b));
  assert!(collisions.iter().any(|c| c.body == b && c.other == a));
  assert!(collisions.iter().all(|c| c.other_is_pixelated));

  for body in [a, b] {
    assert_eq!(h.body(body).grid.live_count(), 8);
    assert!(h.body(body).handler.did_collide());
  }
}

#[test]
fn sensor_contacts_are_not_forwarded() {
  let mut h = TestHarness::new();
  let a = h.spawn_fixed(PixelGrid::filled(2, 2, Rgba::WHITE), Vec2::new(-3.0, 0.0));
  let b = h.spawn_fixed(PixelGrid::filled(2, 2, Rgba::WHITE), Vec2::new(3.0, 0.0));

  h.app.world_mut().write_message(CollisionEvent::Started(
    a,
    b,
    CollisionEventFlags::SENSOR,
  ));
  h.app.update();

  assert!(h.app.world().resource::<Seen>().collisions.is_empty());
  assert_eq!(h.body(a).grid.live_count(), 4);
}

#[test]
fn ccd_follows_speed() {
  let mut h = TestHarness::new();
  let threshold = h.config.ccd_speed_threshold;
  let body = h
    .app
    .world_mut()
    .spawn((
      PixelatedBody::from_config(PixelGrid::filled(2, 2, Rgba::WHITE), &h.config),
      GravityScale(0.0),
    ))
    .id();
  h.app.update();

  assert!(h.ccd_at_speed(body, threshold * 4.0));
  assert!(!h.ccd_at_speed(body, threshold * 0.5));
  assert!(h.ccd_at_speed(body, threshold * 2.0));
}
