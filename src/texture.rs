//! Texture loading and bilinear sampling
//!
//! Textures are decoded once into interleaved RGB floats in 0..1. Sampling
//! flips v so (0,0) addresses the bottom-left of the image, and clamps at the
//! borders instead of wrapping.

use crate::error::RenderError;
use crate::math::Vec2;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Texture {
    width: usize,
    height: usize,
    /// Interleaved RGB, row-major from the top of the image.
    pixels: Vec<f32>,
}

impl Texture {
    pub fn from_file(path: &Path) -> Result<Texture, RenderError> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = (img.width() as usize, img.height() as usize);
        let pixels = img.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Ok(Texture { width, height, pixels })
    }

    #[cfg(test)]
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<f32>) -> Texture {
        assert_eq!(pixels.len(), width * height * 3);
        Texture { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn texel(&self, x: usize, y: usize) -> [f32; 3] {
        let i = (y * self.width + x) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Bilinear RGB sample at a UV coordinate. Rows blend between the texel
    /// row above and below the sample point; coordinates outside 0..1 clamp
    /// to the border texels.
    pub fn bilinear(&self, uv: Vec2) -> [f32; 3] {
        // A degenerate texture has no neighborhood to blend.
        if self.width < 2 || self.height < 2 {
            return self.texel(0, 0);
        }
        let u = uv.x * self.width as f32;
        let v = (1.0 - uv.y) * self.height as f32;

        let mut x = (u + 0.5) as i32;
        if x >= self.width as i32 {
            x = self.width as i32 - 1;
        } else if x <= 0 {
            x = 1;
        }
        let mut y = (v + 0.5) as i32;
        if y >= self.height as i32 {
            y = self.height as i32 - 1;
        } else if y <= 0 {
            y = 1;
        }

        let left_w = (u + 0.5 - x as f32).clamp(0.0, 1.0);
        let low_w = (v + 0.5 - y as f32).clamp(0.0, 1.0);

        let (x, y) = (x as usize, y as usize);
        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let up =
                (1.0 - left_w) * self.texel(x - 1, y - 1)[c] + left_w * self.texel(x, y - 1)[c];
            let low = (1.0 - left_w) * self.texel(x - 1, y)[c] + left_w * self.texel(x, y)[c];
            out[c] = low_w * low + (1.0 - low_w) * up;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        // 2x2: top row red/green, bottom row blue/white.
        #[rustfmt::skip]
        let pixels = vec![
            1.0, 0.0, 0.0,  0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,  1.0, 1.0, 1.0,
        ];
        Texture::from_pixels(2, 2, pixels)
    }

    #[test]
    fn test_center_blends_all_texels() {
        let t = checker();
        let s = t.bilinear(Vec2::new(0.5, 0.5));
        for c in s {
            assert!((c - 0.5).abs() < 0.001);
        }
    }

    #[test]
    fn test_corners_clamp() {
        let t = checker();
        // v=1 addresses the top row of the image.
        let s = t.bilinear(Vec2::new(0.0, 1.0));
        assert!(s[0] > 0.9 && s[1] < 0.1 && s[2] < 0.1);
        let s = t.bilinear(Vec2::new(1.0, 0.0));
        assert!(s[0] > 0.9 && s[1] > 0.9 && s[2] > 0.9);
    }

    #[test]
    fn test_out_of_range_uv_clamps() {
        let t = checker();
        let inside = t.bilinear(Vec2::new(1.0, 1.0));
        let outside = t.bilinear(Vec2::new(2.0, 3.0));
        for (a, b) in inside.iter().zip(outside.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_solid_texture_is_constant() {
        let t = Texture::from_pixels(2, 2, vec![0.25; 12]);
        for (u, v) in [(0.1, 0.9), (0.5, 0.5), (0.99, 0.01)] {
            let s = t.bilinear(Vec2::new(u, v));
            for c in s {
                assert!((c - 0.25).abs() < 0.001);
            }
        }
    }
}
