//! Tagged multi-channel color values
//!
//! A color carries a channel tag (grayscale up to RGBA) and a fixed backing
//! array, so no per-value heap allocation. Binary operations are only defined
//! between colors of the same tag; mixing tags is a hard error rather than a
//! silent truncation.

use crate::error::RenderError;
use serde::{Deserialize, Serialize};

/// Framebuffer channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray = 1,
    GrayAlpha = 2,
    Rgb = 3,
    Rgba = 4,
}

impl Channels {
    pub fn count(self) -> usize {
        self as usize
    }

    fn from_count(n: usize) -> Option<Channels> {
        match n {
            1 => Some(Channels::Gray),
            2 => Some(Channels::GrayAlpha),
            3 => Some(Channels::Rgb),
            4 => Some(Channels::Rgba),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channels::Gray => "Gray",
            Channels::GrayAlpha => "GrayAlpha",
            Channels::Rgb => "Rgb",
            Channels::Rgba => "Rgba",
        };
        write!(f, "{}", name)
    }
}

/// A pixel/light color. Unused trailing slots of the backing array stay zero
/// so derived equality works per tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Color {
    channels: Channels,
    data: [f32; 4],
}

impl Color {
    pub const fn gray(g: f32) -> Self {
        Self { channels: Channels::Gray, data: [g, 0.0, 0.0, 0.0] }
    }

    pub const fn gray_alpha(g: f32, a: f32) -> Self {
        Self { channels: Channels::GrayAlpha, data: [g, a, 0.0, 0.0] }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { channels: Channels::Rgb, data: [r, g, b, 0.0] }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { channels: Channels::Rgba, data: [r, g, b, a] }
    }

    /// Fill every leading channel with `value`; when the channel count is
    /// even the trailing channel is an alpha slot and gets `alpha` instead.
    pub fn splat(channels: Channels, value: f32, alpha: f32) -> Self {
        let n = channels.count();
        let mut data = [0.0; 4];
        for slot in data.iter_mut().take(n) {
            *slot = value;
        }
        if n % 2 == 0 {
            data[n - 1] = alpha;
        }
        Self { channels, data }
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn values(&self) -> &[f32] {
        &self.data[..self.channels.count()]
    }

    fn check_match(&self, other: &Color) -> Result<(), RenderError> {
        if self.channels != other.channels {
            return Err(RenderError::ChannelMismatch {
                expected: self.channels,
                found: other.channels,
            });
        }
        Ok(())
    }

    /// Channel-wise sum; errors on mismatched tags.
    pub fn try_add(&self, other: &Color) -> Result<Color, RenderError> {
        self.check_match(other)?;
        let mut out = *self;
        for i in 0..self.channels.count() {
            out.data[i] += other.data[i];
        }
        Ok(out)
    }

    /// Channel-wise equality; errors on mismatched tags. The derived
    /// `PartialEq` answers `false` across tags instead, so comparisons that
    /// must treat a tag mismatch as a bug go through here.
    pub fn try_eq(&self, other: &Color) -> Result<bool, RenderError> {
        self.check_match(other)?;
        Ok(self.values() == other.values())
    }

    /// Channel-wise product; errors on mismatched tags.
    pub fn try_mul(&self, other: &Color) -> Result<Color, RenderError> {
        self.check_match(other)?;
        let mut out = *self;
        for i in 0..self.channels.count() {
            out.data[i] *= other.data[i];
        }
        Ok(out)
    }

    /// Scale the color channels, leaving any alpha channel untouched.
    pub fn scale(&self, f: f32) -> Color {
        let mut out = *self;
        let n = match self.channels {
            Channels::Gray | Channels::GrayAlpha => 1,
            Channels::Rgb | Channels::Rgba => 3,
        };
        for slot in out.data.iter_mut().take(n) {
            *slot *= f;
        }
        out
    }

    /// Copy this color into a framebuffer slot. The slot length must equal
    /// the channel count; callers go through `Camera::write_pixel` which
    /// checks the tags first.
    pub fn write_to(&self, slot: &mut [f32]) {
        slot.copy_from_slice(self.values());
    }
}

impl TryFrom<Vec<f32>> for Color {
    type Error = String;

    fn try_from(v: Vec<f32>) -> Result<Self, String> {
        let channels = Channels::from_count(v.len())
            .ok_or_else(|| format!("color needs 1-4 channels, got {}", v.len()))?;
        let mut data = [0.0; 4];
        data[..v.len()].copy_from_slice(&v);
        Ok(Color { channels, data })
    }
}

impl From<Color> for Vec<f32> {
    fn from(c: Color) -> Vec<f32> {
        c.values().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_same_tag() {
        let a = Color::rgb(0.1, 0.2, 0.3);
        let b = Color::rgb(0.4, 0.4, 0.4);
        let c = a.try_add(&b).unwrap();
        for (got, want) in c.values().iter().zip([0.5, 0.6, 0.7]) {
            assert!((got - want).abs() < 0.001, "got {:?}", c.values());
        }
    }

    #[test]
    fn test_add_mismatched_tags_fails() {
        let a = Color::rgb(1.0, 1.0, 1.0);
        let b = Color::gray(1.0);
        assert!(matches!(
            a.try_add(&b),
            Err(RenderError::ChannelMismatch { .. })
        ));
        assert!(matches!(
            a.try_mul(&b),
            Err(RenderError::ChannelMismatch { .. })
        ));
        assert!(matches!(
            a.try_eq(&b),
            Err(RenderError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_checked_equality_same_tag() {
        let a = Color::rgb(0.1, 0.2, 0.3);
        assert!(a.try_eq(&Color::rgb(0.1, 0.2, 0.3)).unwrap());
        assert!(!a.try_eq(&Color::rgb(0.1, 0.2, 0.4)).unwrap());
    }

    #[test]
    fn test_splat_alpha_slot() {
        assert_eq!(Color::splat(Channels::Rgba, 0.1, 1.0).values(), &[0.1, 0.1, 0.1, 1.0][..]);
        assert_eq!(Color::splat(Channels::Rgb, 0.1, 1.0).values(), &[0.1, 0.1, 0.1][..]);
        assert_eq!(Color::splat(Channels::GrayAlpha, 0.1, 1.0).values(), &[0.1, 1.0][..]);
        assert_eq!(Color::splat(Channels::Gray, 0.1, 1.0).values(), &[0.1][..]);
    }

    #[test]
    fn test_scale_preserves_alpha() {
        let c = Color::rgba(0.5, 0.5, 0.5, 0.8).scale(2.0);
        assert_eq!(c.values(), &[1.0, 1.0, 1.0, 0.8][..]);
        let g = Color::gray_alpha(0.5, 0.8).scale(0.5);
        assert_eq!(g.values(), &[0.25, 0.8][..]);
    }

    #[test]
    fn test_serde_round_trip() {
        let c = Color::try_from(vec![0.2, 0.4, 0.6]).unwrap();
        assert_eq!(c.channels(), Channels::Rgb);
        let v: Vec<f32> = c.into();
        assert_eq!(v, vec![0.2, 0.4, 0.6]);
        assert!(Color::try_from(vec![0.0; 5]).is_err());
    }
}
