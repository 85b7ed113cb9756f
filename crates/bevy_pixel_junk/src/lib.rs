//! Pixel Junk - destructible pixel rigid bodies for Bevy.
//!
//! Each body is a [`PixelGrid`] of colored cells. Collisions chip cells
//! away, disconnected regions split off into fragment bodies, and the
//! collider is re-traced from the remaining cells.
//!
//! ```ignore
//! App::new()
//!   .add_plugins(DefaultPlugins)
//!   .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(16.0))
//!   .add_plugins(PixelJunkPlugin::new(DestructionConfig::load("junk.toml")?))
//!   .add_plugins(PixelJunkRapierPlugin)
//!   .run();
//! ```

pub mod body;
pub mod collision;
pub mod config;
pub mod grid;
pub mod plugin;
pub mod primitives;
pub mod schedule;
#[cfg(feature = "tracy")]
mod tracy_init;

#[cfg(feature = "rapier2d")]
pub use body::physics::PixelJunkRapierPlugin;
pub use body::{
  BodyPose, BodyVelocity, CollisionInfo, CollisionResolver, DestructionHooks, DestructionLog,
  DestructionReport, Fragment, GridImage, Impact, JunkFragment, NoPixelsLeft,
  PixelCollision, PixelCollisionHandler, PixelatedBody, PixelsDestroyed, RemovePixels,
  SpawnEffect, SpawnFragment,
};
pub use collision::{GridContourTracer, outline_paths, triangulate_paths};
pub use config::{ConfigError, DestructionConfig};
pub use grid::{
  GridImageError, GridMarcher, GridRegionFinder, PixelGrid, Region, Rgba, closest_pixel,
  closest_pixels,
};
pub use plugin::PixelJunkPlugin;
pub use primitives::Surface;
pub use schedule::PixelJunkSet;
#[cfg(feature = "tracy")]
pub use tracy_init::init_tracy;
