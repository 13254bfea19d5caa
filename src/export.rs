//! Frame export
//!
//! Converts the camera's float framebuffer into an 8-bit image in the
//! matching pixel layout. Values are clamped to 0..1 first, so an
//! overexposed render saturates instead of wrapping.

use crate::camera::Camera;
use crate::color::Channels;
use crate::error::RenderError;
use image::{GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::path::Path;

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

pub fn save_image(camera: &Camera, path: &Path) -> Result<(), RenderError> {
    let (w, h) = (camera.width as u32, camera.height as u32);
    let channels = camera.background.channels();
    let n = channels.count();
    let sample = |x: u32, y: u32, c: usize| {
        quantize(camera.frame[(y as usize * camera.width + x as usize) * n + c])
    };
    match channels {
        Channels::Gray => {
            GrayImage::from_fn(w, h, |x, y| image::Luma([sample(x, y, 0)])).save(path)?;
        }
        Channels::GrayAlpha => {
            GrayAlphaImage::from_fn(w, h, |x, y| {
                image::LumaA([sample(x, y, 0), sample(x, y, 1)])
            })
            .save(path)?;
        }
        Channels::Rgb => {
            RgbImage::from_fn(w, h, |x, y| {
                image::Rgb([sample(x, y, 0), sample(x, y, 1), sample(x, y, 2)])
            })
            .save(path)?;
        }
        Channels::Rgba => {
            RgbaImage::from_fn(w, h, |x, y| {
                image::Rgba([
                    sample(x, y, 0),
                    sample(x, y, 1),
                    sample(x, y, 2),
                    sample(x, y, 3),
                ])
            })
            .save(path)?;
        }
    }
    Ok(())
}
