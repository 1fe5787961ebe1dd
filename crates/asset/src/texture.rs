//! Diffuse texture loading (RGBA8, flipped so row 0 is the bottom).

use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wrap raw RGBA8 pixels.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = (width as usize) * (height as usize) * Self::BYTES_PER_PIXEL as usize;
        anyhow::ensure!(
            data.len() == expected,
            "RGBA8 data is {} bytes, expected {} for {}x{}",
            data.len(),
            expected,
            width,
            height
        );
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Load an image file (PNG/JPEG) and flip it vertically to match the
    /// bottom-up texture convention of the shader.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {path:?}"))?;

        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// Load `path`, falling back to a checkerboard if it cannot be read.
    pub fn load_or_checkerboard<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("Texture failed to load ({e:#}); using checkerboard");
                Self::checkerboard(64)
            }
        }
    }

    /// White/gray checkerboard with 8-pixel cells.
    pub fn checkerboard(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * Self::BYTES_PER_PIXEL) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
        }
    }

    /// Number of levels in a full mip chain down to 1x1.
    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Full mip chain, level 0 first. Each level halves the previous size
    /// (never below 1) and is filtered down from level 0.
    pub fn mip_chain(&self) -> Vec<TextureData> {
        let mut levels = vec![self.clone()];
        let Some(base) = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return levels;
        };

        let (mut width, mut height) = (self.width, self.height);
        while width > 1 || height > 1 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            let level = image::imageops::resize(&base, width, height, FilterType::Triangle);
            levels.push(Self {
                data: level.into_raw(),
                width,
                height,
            });
        }
        levels
    }

    #[inline]
    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }

    pub fn is_valid(&self) -> bool {
        let expected_size = (self.height * self.bytes_per_row()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_is_valid() {
        let tex = TextureData::checkerboard(16);
        assert!(tex.is_valid());
        assert_eq!(&tex.data[..4], &[255, 255, 255, 255]);
        // Pixel (8, 0) starts the second cell.
        let offset = 8 * 4;
        assert_eq!(&tex.data[offset..offset + 4], &[128, 128, 128, 255]);
    }

    #[test]
    fn mip_chain_halves_down_to_one_pixel() {
        let tex = TextureData::checkerboard(64);
        assert_eq!(tex.mip_level_count(), 7);

        let chain = tex.mip_chain();
        assert_eq!(chain.len(), 7);
        let sizes: Vec<(u32, u32)> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(
            sizes,
            vec![(64, 64), (32, 32), (16, 16), (8, 8), (4, 4), (2, 2), (1, 1)]
        );
        assert!(chain.iter().all(TextureData::is_valid));
    }

    #[test]
    fn mip_chain_of_non_square_texture() {
        let tex = TextureData::new_rgba8(4, 1, vec![255; 16]).unwrap();
        assert_eq!(tex.mip_level_count(), 3);
        let sizes: Vec<(u32, u32)> = tex.mip_chain().iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn wrong_size_is_rejected() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new_rgba8(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn load_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripe.png");
        // Top row red, bottom row blue.
        let img = image::RgbaImage::from_fn(1, 2, |_, y| {
            if y == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        img.save(&path).unwrap();

        let tex = TextureData::load(&path).unwrap();
        assert_eq!((tex.width, tex.height), (1, 2));
        assert_eq!(&tex.data[..4], &[0, 0, 255, 255]);
        assert_eq!(&tex.data[4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_texture_falls_back_to_checkerboard() {
        let tex = TextureData::load_or_checkerboard("/no/such/texture.png");
        assert_eq!((tex.width, tex.height), (64, 64));
        assert!(tex.is_valid());
    }
}
