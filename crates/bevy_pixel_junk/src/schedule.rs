//! Schedule labels for pixel junk systems.
//!
//! The latch reset runs in [`First`]; everything else runs in [`Update`]:
//!
//! ```text
//! Destruction → Sync
//! ```
//!
//! Physics adapters feed collisions in before `Destruction` and push the
//! rebuilt colliders out in `Sync`.

use bevy::prelude::*;

/// System sets for pixelated body updates.
///
/// # Usage
///
/// ```ignore
/// app.add_systems(Update, shoot.before(PixelJunkSet::Destruction));
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelJunkSet {
  /// Collision latches are re-armed (in [`First`]).
  Reset,
  /// Collisions and removal requests are resolved, fragments spawned and
  /// emptied bodies despawned.
  Destruction,
  /// Derived state (images, physics colliders) catches up with the grids.
  Sync,
}
