//! Light sources with baked shadow maps
//!
//! Each light carries its own camera whose depth buffer doubles as the
//! shadow map. Baking projects every mesh from the light and rasterizes
//! depth only, storing the negated straight-line distance from the light;
//! shading later projects the surface point into the same camera and
//! compares against the stored value.
//!
//! A sun is an orthographic camera parked far away along its direction, so
//! the distance metric stays the same for both kinds.

use crate::camera::{Camera, Projection, DEFAULT_FAR, DEFAULT_NEAR};
use crate::color::Color;
use crate::error::RenderError;
use crate::math::Vec3;
use crate::mesh::Mesh;
use crate::rasterizer::{compute_normals, progress_bar, project_mesh, screen_bounds};
use serde::{Deserialize, Serialize};

/// Stand-in distance for the sun's synthetic position.
pub const SUN_DISTANCE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Omnidirectional emitter with inverse-square falloff.
    Point,
    /// Parallel rays along a fixed direction, no falloff.
    Sun,
}

#[derive(Debug)]
pub struct Light {
    pub kind: LightKind,
    pub intensity: f32,
    pub color: Color,
    pub camera: Camera,
}

impl Light {
    pub fn new(kind: LightKind, intensity: f32, color: Color) -> Result<Light, RenderError> {
        Ok(Light {
            kind,
            intensity,
            color,
            camera: Camera::new(Color::gray(0.0), 1, 1)?,
        })
    }

    /// Place the light and size its shadow map. For a point light
    /// `placement` is its position; for a sun it is the ray direction.
    pub fn config(&mut self, size: usize, fov_y: f32, placement: Vec3) -> Result<(), RenderError> {
        let (projection, position, look) = match self.kind {
            LightKind::Point => (Projection::Persp, placement, Vec3::ZERO - placement),
            LightKind::Sun => {
                let direction = placement.normalize();
                (Projection::Ortho, direction.scale(-SUN_DISTANCE), direction)
            }
        };
        self.camera.config(
            projection,
            Color::gray(0.0),
            size,
            size,
            fov_y,
            position,
            look,
            0.0,
            DEFAULT_NEAR,
            DEFAULT_FAR,
        )
    }

    /// Bake the shadow map: depth-only rasterization of every triangle of
    /// every mesh, without backface culling so closed meshes self-shadow.
    pub fn cast_shadow(&mut self, meshes: &mut [Mesh], verbose: bool) -> Result<(), RenderError> {
        self.camera.init_buffers();
        for mesh in meshes.iter_mut() {
            project_mesh(mesh, &self.camera, None)?;
            compute_normals(mesh, None)?;
        }
        for (m, mesh) in meshes.iter().enumerate() {
            let bar = progress_bar(
                mesh.triangles.len(),
                format!("shadow {} mesh {}", self.describe(), m),
                verbose,
            );
            for tri in 0..mesh.triangles.len() {
                let projected = mesh.projected(tri)?;
                if projected.iter().all(|p| p.z > 0.0) {
                    continue;
                }
                let Some((x0, x1, y0, y1)) = screen_bounds(&self.camera, &projected) else {
                    continue;
                };
                for y in y0..y1 {
                    for x in x0..x1 {
                        let (fx, fy) = (x as f32, y as f32);
                        if !mesh.is_inside(tri, fx, fy)? {
                            continue;
                        }
                        let bc = mesh.barycentric(tri, fx, fy)?;
                        if bc.x < 0.0 {
                            continue;
                        }
                        let z = bc.x * projected[0].z
                            + bc.y * projected[1].z
                            + bc.z * projected[2].z;
                        if z > 0.0 {
                            continue;
                        }
                        let world = mesh.position_at(tri, bc);
                        let reach = -(world - self.camera.position).len();
                        let index = self.camera.index_trust(x, y);
                        if reach >= self.camera.depth[index] {
                            self.camera.depth[index] = reach;
                        }
                    }
                }
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
            if let Some(bar) = &bar {
                bar.finish();
            }
        }
        Ok(())
    }

    /// Unit vector from a surface point toward the light.
    pub fn direction_to(&self, point: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Point => (self.camera.position - point).normalize(),
            LightKind::Sun => Vec3::ZERO - self.look(),
        }
    }

    /// Incident intensity at a distance from the light.
    pub fn intensity_at(&self, distance: f32) -> f32 {
        match self.kind {
            LightKind::Point => self.intensity / (distance * distance),
            LightKind::Sun => self.intensity,
        }
    }

    fn look(&self) -> Vec3 {
        self.camera.look
    }

    fn describe(&self) -> &'static str {
        match self.kind {
            LightKind::Point => "point",
            LightKind::Sun => "sun",
        }
    }
}
