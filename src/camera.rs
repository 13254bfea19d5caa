//! Camera transforms and framebuffers
//!
//! The camera owns the color and depth buffers plus a cache of derived
//! matrices. `config` diffs the requested state against the current one and
//! recomputes only the invalidated matrices; buffers are reallocated only
//! when the resolution or channel layout actually changes. Reading a
//! projection before its matrices exist is an error, never an identity
//! fallback.
//!
//! Projected space keeps the right-handed camera frame: visible points have
//! z <= 0 and depth grows more negative with distance, so "nearer" always
//! means "larger z".

use crate::color::{Channels, Color};
use crate::error::RenderError;
use crate::math::{self, Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NEAR: f32 = 0.0001;
pub const DEFAULT_FAR: f32 = 10000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Ortho,
    Persp,
    Fisheye,
}

/// Derived matrices. A `None` entry is stale and must not be read.
#[derive(Debug, Default)]
struct TransformCache {
    translate: Option<Mat4>,
    rotate: Option<Mat4>,
    /// Roll around the gaze axis. Absent when the roll angle is zero.
    up: Option<Mat4>,
    put: Option<Mat4>,
    viewport: Option<Mat4>,
    ortho: Option<Mat4>,
    persp: Option<Mat4>,
    persp_full: Option<Mat4>,
    fisheye_viewport: Option<Mat4>,
}

#[derive(Debug)]
pub struct Camera {
    pub projection: Projection,
    pub background: Color,
    pub width: usize,
    pub height: usize,
    pub fov_y: f32,
    pub position: Vec3,
    /// Normalized gaze direction.
    pub look: Vec3,
    up_rotation: Option<f32>,
    pub near: f32,
    pub far: f32,
    pub depth: Vec<f32>,
    pub frame: Vec<f32>,
    cache: TransformCache,
}

impl Camera {
    pub fn new(background: Color, width: usize, height: usize) -> Result<Camera, RenderError> {
        let mut camera = Camera {
            projection: Projection::Ortho,
            background,
            width: 0,
            height: 0,
            fov_y: std::f32::consts::FRAC_PI_2,
            position: Vec3::ZERO,
            look: Vec3::new(0.0, 0.0, -1.0),
            up_rotation: None,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            depth: Vec::new(),
            frame: Vec::new(),
            cache: TransformCache::default(),
        };
        let channels = camera.background.channels();
        camera.alloc_buffers(width, height, channels)?;
        Ok(camera)
    }

    fn delete_buffers(&mut self) {
        self.depth = Vec::new();
        self.frame = Vec::new();
    }

    fn alloc_buffers(
        &mut self,
        width: usize,
        height: usize,
        channels: Channels,
    ) -> Result<(), RenderError> {
        if !self.depth.is_empty() {
            return Err(RenderError::BufferAlive("depth"));
        }
        if !self.frame.is_empty() {
            return Err(RenderError::BufferAlive("frame"));
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { w: width, h: height });
        }
        self.width = width;
        self.height = height;
        self.depth = vec![0.0; width * height];
        self.frame = vec![0.0; width * height * channels.count()];
        Ok(())
    }

    /// Apply a full camera description, recomputing only what changed.
    #[allow(clippy::too_many_arguments)]
    pub fn config(
        &mut self,
        projection: Projection,
        background: Color,
        width: usize,
        height: usize,
        fov_y: f32,
        position: Vec3,
        look: Vec3,
        up_rotation: f32,
        near: f32,
        far: f32,
    ) -> Result<(), RenderError> {
        let look = look.normalize();
        if look == Vec3::ZERO {
            return Err(RenderError::SceneFormat("camera look direction has zero length".into()));
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { w: width, h: height });
        }
        let up_rotation = if math::approx_zero(up_rotation) { None } else { Some(up_rotation) };

        // Diff against the current state, reallocate if needed, and only
        // then commit the field writes: a failure must not leave the camera
        // half-updated.
        let moved = position != self.position;
        let turned = look != self.look;
        let rolled = match (up_rotation, self.up_rotation) {
            (None, None) => false,
            (Some(a), Some(b)) => !math::approx_eq(a, b),
            _ => true,
        };
        let resized = width != self.width || height != self.height;
        let refocused = !math::approx_eq(fov_y, self.fov_y);
        let reclipped = !math::approx_eq(near, self.near) || !math::approx_eq(far, self.far);
        let retagged = background.channels() != self.background.channels();

        if resized || retagged {
            self.delete_buffers();
            self.alloc_buffers(width, height, background.channels())?;
        }

        self.projection = projection;
        self.background = background;
        self.fov_y = fov_y;
        self.position = position;
        self.look = look;
        self.up_rotation = up_rotation;
        self.near = near;
        self.far = far;

        if moved || self.cache.translate.is_none() {
            self.cache.translate = Some(Mat4::translation(Vec3::ZERO - position));
        }
        if turned || self.cache.rotate.is_none() {
            self.cache.rotate = Some(rotate_matrix(look));
        }
        if rolled || (up_rotation.is_some() && self.cache.up.is_none()) {
            self.cache.up = up_rotation.map(Mat4::rotation_z);
        }
        if moved || turned || rolled || self.cache.put.is_none() {
            let placed = self.cache.rotate.ok_or(RenderError::MissingTransform("rotate"))?
                * self.cache.translate.ok_or(RenderError::MissingTransform("translate"))?;
            self.cache.put = Some(match self.cache.up {
                Some(up) => up * placed,
                None => placed,
            });
            self.cache.ortho = None;
            self.cache.persp_full = None;
        }
        if resized || refocused || self.cache.viewport.is_none() {
            let half_w = self.width as f32 / 2.0;
            let half_h = self.height as f32 / 2.0;
            let scale = half_w / (fov_y / 2.0).tan();
            self.cache.viewport = Some(Mat4::from_rows([
                [scale, 0.0, 0.0, half_w],
                [0.0, -scale, 0.0, half_h],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]));
            let fish_scale = half_h / (fov_y / 2.0).sin();
            self.cache.fisheye_viewport = Some(Mat4::from_rows([
                [fish_scale, 0.0, 0.0, half_w],
                [0.0, -fish_scale, 0.0, half_h],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]));
            self.cache.ortho = None;
            self.cache.persp_full = None;
        }
        if reclipped || self.cache.persp.is_none() {
            self.cache.persp = Some(Mat4::from_rows([
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, near + far, near * far],
                [0.0, 0.0, -1.0, 0.0],
            ]));
            self.cache.persp_full = None;
        }
        if self.cache.ortho.is_none() {
            let viewport = self.cache.viewport.ok_or(RenderError::MissingTransform("viewport"))?;
            let put = self.cache.put.ok_or(RenderError::MissingTransform("put"))?;
            self.cache.ortho = Some(viewport * put);
        }
        if self.cache.persp_full.is_none() {
            let viewport = self.cache.viewport.ok_or(RenderError::MissingTransform("viewport"))?;
            let persp = self.cache.persp.ok_or(RenderError::MissingTransform("persp"))?;
            let put = self.cache.put.ok_or(RenderError::MissingTransform("put"))?;
            self.cache.persp_full = Some(viewport * persp * put);
        }
        Ok(())
    }

    /// Project a world point into screen space under the active projection.
    pub fn projection(&self, p: Vec3) -> Result<Vec3, RenderError> {
        match self.projection {
            Projection::Ortho => {
                let m = self.cache.ortho.ok_or(RenderError::MissingTransform("ortho"))?;
                Ok((m * p.homogeneous()).hnormalized())
            }
            Projection::Persp => {
                let m = self.cache.persp_full.ok_or(RenderError::MissingTransform("persp"))?;
                Ok((m * p.homogeneous()).hnormalized())
            }
            Projection::Fisheye => {
                let put = self.cache.put.ok_or(RenderError::MissingTransform("put"))?;
                let viewport = self
                    .cache
                    .fisheye_viewport
                    .ok_or(RenderError::MissingTransform("fisheye viewport"))?;
                let q = (put * p.homogeneous()).hnormalized();
                let len = q.len();
                let bent = Vec4 { x: q.x / len, y: q.y / len, z: q.z, w: 1.0 };
                Ok((viewport * bent).hnormalized())
            }
        }
    }

    /// Clear to the far plane and the background color.
    pub fn init_buffers(&mut self) {
        self.depth.fill(-f32::MAX);
        let channels = self.background.channels().count();
        for slot in self.frame.chunks_exact_mut(channels) {
            self.background.write_to(slot);
        }
    }

    pub fn index_at(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Buffer index under a projected point, or `None` when the point lies
    /// off screen or behind the camera.
    pub fn index_at_point(&self, p: Vec3) -> Option<usize> {
        if self.frame.is_empty() || p.z > 0.0 {
            return None;
        }
        self.index_at(p.x as i32, p.y as i32)
    }

    pub fn index_trust(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn depth_at_point(&self, p: Vec3) -> Option<f32> {
        self.index_at_point(p).map(|i| self.depth[i])
    }

    /// Store a color at a buffer index; tags must match the framebuffer.
    pub fn write_pixel(&mut self, index: usize, color: &Color) -> Result<(), RenderError> {
        if color.channels() != self.background.channels() {
            return Err(RenderError::ChannelMismatch {
                expected: self.background.channels(),
                found: color.channels(),
            });
        }
        let n = color.channels().count();
        color.write_to(&mut self.frame[index * n..index * n + n]);
        Ok(())
    }
}

/// Rotation aligning the world frame with the gaze: the gaze maps onto -z,
/// world up stays up. A straight-down or straight-up gaze needs the special
/// case since the horizontal gaze component vanishes.
fn rotate_matrix(gaze: Vec3) -> Mat4 {
    let a = (gaze.x * gaze.x + gaze.z * gaze.z).sqrt();
    if math::approx_zero(a) {
        return Mat4::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, gaze.y, 0.0],
            [0.0, -gaze.y, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
    }
    Mat4::from_rows([
        [-gaze.z / a, 0.0, gaze.x / a, 0.0],
        [-gaze.x * gaze.y / a, a, -gaze.z * gaze.y / a, 0.0],
        [-gaze.x, -gaze.y, -gaze.z, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}
