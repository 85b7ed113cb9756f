//! Destruction tuning, loadable from TOML.
//!
//! ```toml
//! min_fragment_pixels = 5
//! pixels_per_unit = 16.0
//! line_simplification_tolerance = 0.5
//!
//! [resolver]
//! kind = "impact_scaled"
//! energy_per_pixel = 250.0
//! ```

use std::fmt;
use std::path::Path;

use bevy::math::Vec2;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::body::CollisionResolver;
use crate::collision::GridContourTracer;

/// Global destruction settings.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructionConfig {
  /// Split-off regions smaller than this are cleared without spawning a
  /// fragment body.
  pub min_fragment_pixels: usize,
  /// Fraction of destroyed cells that spawn an effect. The count is
  /// `min(n - 1, max(1, ceil(n * effect_ratio)))`.
  pub effect_ratio: f32,
  /// Grid cells per world unit.
  pub pixels_per_unit: f32,
  /// Normalized grid point that sits at the body origin.
  pub pivot: [f32; 2],
  /// Douglas-Peucker tolerance (world units) applied to traced outlines.
  /// Zero disables simplification.
  pub line_simplification_tolerance: f32,
  /// Whether fragments also inherit the parent's angular velocity.
  pub inherit_angular_velocity: bool,
  /// Bodies faster than this (world units per second) use continuous
  /// collision detection.
  pub ccd_speed_threshold: f32,
  /// Policy used by bodies that do not pick their own.
  pub resolver: CollisionResolver,
}

impl Default for DestructionConfig {
  fn default() -> Self {
    Self {
      min_fragment_pixels: 3,
      effect_ratio: 0.25,
      pixels_per_unit: 1.0,
      pivot: [0.5, 0.5],
      line_simplification_tolerance: 0.0,
      inherit_angular_velocity: false,
      ccd_speed_threshold: 1.0,
      resolver: CollisionResolver::NearestPixel,
    }
  }
}

impl DestructionConfig {
  /// Parses and validates a TOML document.
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }

  /// Checks value ranges.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.pixels_per_unit.is_nan() || self.pixels_per_unit <= 0.0 {
      return Err(ConfigError::Invalid("pixels_per_unit must be positive"));
    }
    if !self.pivot.iter().all(|p| (0.0..=1.0).contains(p)) {
      return Err(ConfigError::Invalid("pivot components must be within [0, 1]"));
    }
    if !(0.0..).contains(&self.line_simplification_tolerance) {
      return Err(ConfigError::Invalid(
        "line_simplification_tolerance must not be negative",
      ));
    }
    if !(0.0..=1.0).contains(&self.effect_ratio) {
      return Err(ConfigError::Invalid("effect_ratio must be within [0, 1]"));
    }
    if !(0.0..).contains(&self.ccd_speed_threshold) {
      return Err(ConfigError::Invalid("ccd_speed_threshold must not be negative"));
    }
    if let CollisionResolver::ImpactScaled {
      energy_per_pixel, ..
    } = self.resolver
    {
      if energy_per_pixel.is_nan() || energy_per_pixel <= 0.0 {
        return Err(ConfigError::Invalid("energy_per_pixel must be positive"));
      }
    }
    Ok(())
  }

  pub fn with_min_fragment_pixels(mut self, pixels: usize) -> Self {
    self.min_fragment_pixels = pixels;
    self
  }

  pub fn with_pixels_per_unit(mut self, pixels_per_unit: f32) -> Self {
    self.pixels_per_unit = pixels_per_unit;
    self
  }

  pub fn with_pivot(mut self, pivot: Vec2) -> Self {
    self.pivot = pivot.to_array();
    self
  }

  pub fn with_resolver(mut self, resolver: CollisionResolver) -> Self {
    self.resolver = resolver;
    self
  }

  pub fn with_line_simplification(mut self, tolerance: f32) -> Self {
    self.line_simplification_tolerance = tolerance;
    self
  }

  pub fn with_angular_velocity_inheritance(mut self, inherit: bool) -> Self {
    self.inherit_angular_velocity = inherit;
    self
  }

  #[inline]
  pub fn pivot(&self) -> Vec2 {
    Vec2::from_array(self.pivot)
  }

  /// Contour tracer matching this pivot and scale.
  pub fn tracer(&self) -> GridContourTracer {
    GridContourTracer::new(self.pivot(), self.pixels_per_unit)
  }

  /// Number of effects spawned for `destroyed` cells.
  pub fn effect_count(&self, destroyed: usize) -> usize {
    if destroyed == 0 {
      return 0;
    }
    let scaled = (destroyed as f32 * self.effect_ratio).ceil() as usize;
    (destroyed - 1).min(scaled.max(1))
  }
}

/// Error loading a [`DestructionConfig`].
#[derive(Debug)]
pub enum ConfigError {
  Io(std::io::Error),
  Parse(toml::de::Error),
  Invalid(&'static str),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "failed to read config: {e}"),
      Self::Parse(e) => write!(f, "failed to parse config: {e}"),
      Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Parse(e) => Some(e),
      Self::Invalid(_) => None,
    }
  }
}

impl From<std::io::Error> for ConfigError {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(e: toml::de::Error) -> Self {
    Self::Parse(e)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn empty_document_is_default() {
    assert_eq!(
      DestructionConfig::from_toml_str("").unwrap(),
      DestructionConfig::default()
    );
  }

  #[test]
  fn partial_document_keeps_defaults() {
    let config = DestructionConfig::from_toml_str(
      r#"
      min_fragment_pixels = 5
      pivot = [0.0, 1.0]

      [resolver]
      kind = "along_trajectory"
      "#,
    )
    .unwrap();
    assert_eq!(config.min_fragment_pixels, 5);
    assert_eq!(config.pivot(), Vec2::new(0.0, 1.0));
    assert_eq!(config.resolver, CollisionResolver::AlongTrajectory);
    assert_eq!(config.effect_ratio, 0.25);
  }

  #[test]
  fn rejects_bad_values() {
    for source in [
      "pixels_per_unit = 0.0",
      "pivot = [1.5, 0.5]",
      "line_simplification_tolerance = -1.0",
      "effect_ratio = 2.0",
      "[resolver]\nkind = \"impact_scaled\"\nenergy_per_pixel = 0.0",
    ] {
      assert!(
        matches!(
          DestructionConfig::from_toml_str(source),
          Err(ConfigError::Invalid(_))
        ),
        "{source}"
      );
    }
  }

  #[test]
  fn parse_errors_are_reported() {
    let err = DestructionConfig::from_toml_str("min_fragment_pixels = \"many\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("failed to parse config"));
  }

  #[test]
  fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pixels_per_unit = 32.0").unwrap();
    let config = DestructionConfig::load(file.path()).unwrap();
    assert_eq!(config.pixels_per_unit, 32.0);

    let missing = DestructionConfig::load(file.path().with_extension("missing"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));
  }

  #[test]
  fn effect_count_formula() {
    let config = DestructionConfig::default();
    assert_eq!(config.effect_count(0), 0);
    assert_eq!(config.effect_count(1), 0);
    assert_eq!(config.effect_count(2), 1);
    assert_eq!(config.effect_count(5), 2);
    assert_eq!(config.effect_count(7), 2);
    assert_eq!(config.effect_count(8), 2);
    assert_eq!(config.effect_count(9), 3);
    assert_eq!(config.effect_count(40), 10);
  }
}
