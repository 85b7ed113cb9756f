//! Plugin wiring pixelated bodies into a Bevy app.

use bevy::prelude::*;

use crate::body::{
  NoPixelsLeft, PixelCollision, PixelsDestroyed, RemovePixels, SpawnEffect, SpawnFragment,
  despawn_empty_bodies, handle_pixel_collisions, handle_remove_pixel_requests, prepare_new_bodies,
  reset_collision_latches, spawn_fragments, sync_grid_images,
};
use crate::config::DestructionConfig;
use crate::schedule::PixelJunkSet;

/// Destruction for [`PixelatedBody`](crate::PixelatedBody) entities.
///
/// Physics-agnostic: collisions arrive as [`PixelCollision`] messages. With
/// the `rapier2d` feature, add
/// [`PixelJunkRapierPlugin`](crate::PixelJunkRapierPlugin) after this plugin
/// to source them from rapier.
#[derive(Default)]
pub struct PixelJunkPlugin {
  pub config: DestructionConfig,
}

impl PixelJunkPlugin {
  pub fn new(config: DestructionConfig) -> Self {
    Self { config }
  }
}

impl Plugin for PixelJunkPlugin {
  fn build(&self, app: &mut App) {
    app
      .insert_resource(self.config.clone())
      .add_message::<PixelCollision>()
      .add_message::<RemovePixels>()
      .add_message::<PixelsDestroyed>()
      .add_message::<SpawnEffect>()
      .add_message::<NoPixelsLeft>()
      .add_message::<SpawnFragment>();

    app.configure_sets(
      Update,
      (PixelJunkSet::Destruction, PixelJunkSet::Sync).chain(),
    );

    app.add_systems(First, reset_collision_latches.in_set(PixelJunkSet::Reset));

    // Fragments and despawns must land in the frame that caused them.
    app.add_systems(
      Update,
      (
        prepare_new_bodies,
        handle_pixel_collisions,
        handle_remove_pixel_requests,
        spawn_fragments,
        despawn_empty_bodies,
      )
        .chain()
        .in_set(PixelJunkSet::Destruction),
    );

    app.add_systems(
      Update,
      sync_grid_images
        .run_if(resource_exists::<Assets<Image>>)
        .in_set(PixelJunkSet::Sync),
    );
  }
}
