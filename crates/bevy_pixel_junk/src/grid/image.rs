//! Conversion between pixel grids and Bevy images.
//!
//! Image data is top-to-bottom while grids are Y+ up, so rows are flipped in
//! both directions.

use std::fmt;

use bevy::asset::RenderAssetUsages;
use bevy::image::{Image, ImageSampler};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use super::{PixelGrid, Rgba};

const BYTES_PER_PIXEL: usize = 4;

/// Error converting between a [`PixelGrid`] and an [`Image`].
#[derive(Debug, Clone, PartialEq)]
pub enum GridImageError {
  /// Image has zero width or height.
  EmptyImage,
  /// Only 8-bit RGBA images carry per-pixel presence.
  UnsupportedFormat(TextureFormat),
  /// Image has no CPU-side pixel data, or less than its size implies.
  MissingData,
  /// Target image size differs from the grid.
  SizeMismatch {
    grid: (u32, u32),
    image: (u32, u32),
  },
}

impl fmt::Display for GridImageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::EmptyImage => write!(f, "image has zero size"),
      Self::UnsupportedFormat(format) => {
        write!(f, "unsupported texture format {format:?}, expected RGBA8")
      }
      Self::MissingData => write!(f, "image has no CPU-side data"),
      Self::SizeMismatch { grid, image } => write!(
        f,
        "grid is {}x{} but image is {}x{}",
        grid.0, grid.1, image.0, image.1
      ),
    }
  }
}

impl std::error::Error for GridImageError {}

fn check_format(image: &Image) -> Result<(), GridImageError> {
  match image.texture_descriptor.format {
    TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => Ok(()),
    other => Err(GridImageError::UnsupportedFormat(other)),
  }
}

impl PixelGrid {
  /// Builds a grid from an RGBA8 image. Any non-zero alpha is a present cell.
  pub fn from_image(image: &Image) -> Result<Self, GridImageError> {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
      return Err(GridImageError::EmptyImage);
    }
    check_format(image)?;
    let w = width as usize;
    let data = match image.data {
      Some(ref data) if data.len() == w * height as usize * BYTES_PER_PIXEL => data,
      _ => return Err(GridImageError::MissingData),
    };

    let mut colors = Vec::with_capacity(w * height as usize);
    // Grid row 0 is the last image row.
    for row in data.chunks_exact(w * BYTES_PER_PIXEL).rev() {
      colors.extend(row.chunks_exact(BYTES_PER_PIXEL).map(|px| {
        Rgba::from_array([px[0], px[1], px[2], px[3]])
      }));
    }

    PixelGrid::from_colors(width, height, colors).ok_or(GridImageError::MissingData)
  }

  /// Creates a nearest-sampled sRGB image of the grid.
  pub fn to_image(&self) -> Image {
    let mut image = Image::new_fill(
      Extent3d {
        width: self.width(),
        height: self.height(),
        depth_or_array_layers: 1,
      },
      TextureDimension::D2,
      &Rgba::TRANSPARENT.to_array(),
      TextureFormat::Rgba8UnormSrgb,
      RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.sampler = ImageSampler::nearest();
    self.fill_bytes(image.data.get_or_insert_with(Vec::new));
    image
  }

  /// Uploads the grid colors into an existing image of the same size.
  pub fn write_to_image(&self, image: &mut Image) -> Result<(), GridImageError> {
    check_format(image)?;
    if image.width() != self.width() || image.height() != self.height() {
      return Err(GridImageError::SizeMismatch {
        grid: (self.width(), self.height()),
        image: (image.width(), image.height()),
      });
    }
    self.fill_bytes(image.data.get_or_insert_with(Vec::new));
    Ok(())
  }

  fn fill_bytes(&self, bytes: &mut Vec<u8>) {
    let w = self.width() as usize;
    bytes.clear();
    bytes.reserve(self.colors().len() * BYTES_PER_PIXEL);
    for row in self.colors().chunks_exact(w).rev() {
      for color in row {
        bytes.extend_from_slice(&color.to_array());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use bevy::math::IVec2;

  use super::*;

  #[test]
  fn image_rows_are_flipped() {
    let mut grid = PixelGrid::new(2, 3);
    let red = Rgba::rgb(255, 0, 0);
    grid.set_pixel(IVec2::new(1, 2), red);

    let image = grid.to_image();
    let data = image.data.as_ref().unwrap();
    // Top image row holds the highest grid row.
    assert_eq!(&data[4..8], &red.to_array());
    assert_eq!(data.len(), 2 * 3 * 4);

    let back = PixelGrid::from_image(&image).unwrap();
    assert_eq!(back.colors(), grid.colors());
    assert_eq!(back.live_count(), 1);
  }

  #[test]
  fn write_rejects_size_mismatch() {
    let grid = PixelGrid::filled(2, 2, Rgba::WHITE);
    let mut image = PixelGrid::new(3, 2).to_image();
    assert_eq!(
      grid.write_to_image(&mut image),
      Err(GridImageError::SizeMismatch {
        grid: (2, 2),
        image: (3, 2)
      })
    );
  }

  #[test]
  fn write_updates_bytes() {
    let mut grid = PixelGrid::filled(2, 2, Rgba::WHITE);
    let mut image = grid.to_image();
    grid.remove_pixel_at(IVec2::new(0, 0));
    grid.write_to_image(&mut image).unwrap();
    let data = image.data.as_ref().unwrap();
    // Grid (0, 0) is the first pixel of the bottom image row.
    assert_eq!(&data[8..12], &Rgba::TRANSPARENT.to_array());
    assert_eq!(&data[12..16], &Rgba::WHITE.to_array());
  }

  #[test]
  fn rejects_non_rgba_formats() {
    let image = Image::new_fill(
      Extent3d {
        width: 2,
        height: 2,
        depth_or_array_layers: 1,
      },
      TextureDimension::D2,
      &[0],
      TextureFormat::R8Unorm,
      RenderAssetUsages::MAIN_WORLD,
    );
    assert_eq!(
      PixelGrid::from_image(&image),
      Err(GridImageError::UnsupportedFormat(TextureFormat::R8Unorm))
    );
  }
}
