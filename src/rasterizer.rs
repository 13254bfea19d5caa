//! Triangle scan conversion and outline painting
//!
//! The rasterizer owns the scene (meshes, lights, camera) and runs the
//! passes in a fixed order: project vertices, recompute face normals, fill
//! triangles against the depth buffer, then overdraw outline edges. The
//! depth test keeps the larger (less negative) camera-space z, so the fill
//! result is independent of mesh and triangle order.

use crate::camera::{Camera, Projection};
use crate::color::Color;
use crate::error::RenderError;
use crate::light::{Light, LightKind};
use crate::math::{self, Vec3};
use crate::mesh::Mesh;
use crate::obj;
use crate::shader::Shader;
use crate::texture::Texture;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PaintOptions {
    pub fill_color: Color,
    pub line_color: Color,
    /// Dihedral threshold for crease edges, radians.
    pub crease_angle: f32,
    pub outline: bool,
    /// Rasterize back-facing triangles too.
    pub paint_back: bool,
    pub line_thickness: i32,
    pub verbose: bool,
}

pub struct Rasterizer {
    pub meshes: Vec<Mesh>,
    pub lights: Vec<Light>,
    pub camera: Camera,
}

impl Rasterizer {
    /// The camera starts as a 1x1 placeholder; `config_camera` gives it its
    /// real resolution before painting.
    pub fn new(background: Color) -> Result<Rasterizer, RenderError> {
        Ok(Rasterizer {
            meshes: Vec::new(),
            lights: Vec::new(),
            camera: Camera::new(background, 1, 1)?,
        })
    }

    pub fn load_obj(&mut self, path: &Path, texture: Option<&Path>) -> Result<(), RenderError> {
        let mut mesh = obj::load_obj(path)?;
        if let Some(texture) = texture {
            mesh.texture = Some(Texture::from_file(texture)?);
        }
        self.meshes.push(mesh);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_light(
        &mut self,
        kind: LightKind,
        intensity: f32,
        color: Color,
        shadow_map_size: usize,
        fov_y: f32,
        placement: Vec3,
    ) -> Result<(), RenderError> {
        let mut light = Light::new(kind, intensity, color)?;
        light.config(shadow_map_size, fov_y, placement)?;
        self.lights.push(light);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn config_camera(
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
        self.camera.config(
            projection, background, width, height, fov_y, position, look, up_rotation, near, far,
        )
    }

    /// Bake every light's shadow map. Must run before `paint` whenever
    /// geometry or lights changed.
    pub fn shadow_bake(&mut self, verbose: bool) -> Result<(), RenderError> {
        for light in &mut self.lights {
            light.cast_shadow(&mut self.meshes, verbose)?;
        }
        Ok(())
    }

    /// Render one frame into the camera's buffers.
    pub fn paint(&mut self, shader: &Shader, opts: &PaintOptions) -> Result<(), RenderError> {
        let Rasterizer { meshes, lights, camera } = self;
        camera.init_buffers();
        for mesh in meshes.iter_mut() {
            let bar = progress_bar(mesh.vertices.len(), "project".into(), opts.verbose);
            project_mesh(mesh, camera, bar.as_ref())?;
            let bar = progress_bar(mesh.triangles.len(), "normals".into(), opts.verbose);
            compute_normals(mesh, bar.as_ref())?;
        }

        for (m, mesh) in meshes.iter().enumerate() {
            let bar = progress_bar(mesh.triangles.len(), format!("paint mesh {}", m), opts.verbose);
            for tri in 0..mesh.triangles.len() {
                fill_triangle(camera, mesh, tri, shader, lights, opts)?;
                if opts.outline {
                    outline_triangle(camera, mesh, tri, opts)?;
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

    /// Wireframe pass: every edge of every mesh, no fill.
    pub fn paint_frame(&mut self, opts: &PaintOptions) -> Result<(), RenderError> {
        let Rasterizer { meshes, camera, .. } = self;
        camera.init_buffers();
        for mesh in meshes.iter_mut() {
            project_mesh(mesh, camera, None)?;
        }
        for mesh in meshes.iter() {
            for edge in 0..mesh.edges.len() {
                let (a, b) = mesh.edge_endpoints(edge)?;
                paint_line(camera, a, b, &opts.line_color, opts.line_thickness)?;
            }
        }
        Ok(())
    }
}

fn fill_triangle(
    camera: &mut Camera,
    mesh: &Mesh,
    tri: usize,
    shader: &Shader,
    lights: &[Light],
    opts: &PaintOptions,
) -> Result<(), RenderError> {
    let normal = mesh.triangles[tri].normal.ok_or(RenderError::MissingNormal)?;
    if !opts.paint_back && normal.z < 0.0 {
        return Ok(());
    }
    let projected = mesh.projected(tri)?;
    if projected.iter().all(|p| p.z > 0.0) {
        return Ok(());
    }
    let Some((x0, x1, y0, y1)) = screen_bounds(camera, &projected) else {
        return Ok(());
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
            let z = bc.x * projected[0].z + bc.y * projected[1].z + bc.z * projected[2].z;
            let index = camera.index_trust(x, y);
            if z > 0.0 || z < camera.depth[index] {
                continue;
            }
            camera.depth[index] = z;
            let color = shader.shade(mesh, tri, bc, &opts.fill_color, lights)?;
            camera.write_pixel(index, &color)?;
        }
    }
    Ok(())
}

/// Overdraw the triangle's feature edges: mesh boundaries, silhouettes and
/// creases. Shared edges get classified from both sides; drawing them twice
/// is harmless.
fn outline_triangle(
    camera: &mut Camera,
    mesh: &Mesh,
    tri: usize,
    opts: &PaintOptions,
) -> Result<(), RenderError> {
    for &edge in &mesh.triangles[tri].edges {
        let draw = mesh.edge_is_boundary(edge)
            || mesh.edge_is_silhouette(edge)?
            || mesh.edge_is_crease(edge, opts.crease_angle)?;
        if draw {
            let (a, b) = mesh.edge_endpoints(edge)?;
            paint_line(camera, a, b, &opts.line_color, opts.line_thickness)?;
        }
    }
    Ok(())
}

/// DDA line in projected space with a tolerant depth test, so a line lying
/// exactly on the surface it borders still wins the depth comparison.
pub fn paint_line(
    camera: &mut Camera,
    a: Vec3,
    b: Vec3,
    color: &Color,
    thickness: i32,
) -> Result<(), RenderError> {
    let dim = if (b.x - a.x).abs() >= (b.y - a.y).abs() { 0 } else { 1 };
    if math::approx_eq(a[dim], b[dim]) {
        return Ok(());
    }
    let (left, right) = if a[dim] < b[dim] { (a, b) } else { (b, a) };
    let step = (right - left).normalize();
    let planar = (1.0 - step.z * step.z).sqrt();
    if math::approx_zero(planar) {
        return Ok(());
    }
    let step = step.scale(1.0 / planar);

    let mut p = left;
    while p[dim] < right[dim] + 0.5 {
        stamp(camera, p, color)?;
        if thickness > 1 {
            for (dx, dy) in [(0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
                stamp(camera, p + Vec3::new(dx, dy, 0.0), color)?;
            }
        }
        if thickness > 2 {
            #[rustfmt::skip]
            let ring = [
                (-1.0, 0.0), (-1.0, 1.0), (0.0, -1.0), (1.0, -1.0),
                (0.0, 2.0), (1.0, 2.0), (2.0, 0.0), (2.0, 1.0),
            ];
            for (dx, dy) in ring {
                stamp(camera, p + Vec3::new(dx, dy, 0.0), color)?;
            }
        }
        p += step;
    }
    Ok(())
}

fn stamp(camera: &mut Camera, p: Vec3, color: &Color) -> Result<(), RenderError> {
    if let Some(index) = camera.index_at_point(p) {
        if math::no_less_than(p.z, camera.depth[index]) {
            camera.depth[index] = p.z;
            camera.write_pixel(index, color)?;
        }
    }
    Ok(())
}

pub fn progress_bar(len: usize, message: String, verbose: bool) -> Option<ProgressBar> {
    if !verbose {
        return None;
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:24} [{bar:40}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(message);
    Some(bar)
}

/// Project every vertex of a mesh into the camera's screen space.
pub fn project_mesh(
    mesh: &mut Mesh,
    camera: &Camera,
    bar: Option<&ProgressBar>,
) -> Result<(), RenderError> {
    for vertex in &mut mesh.vertices {
        vertex.projected = Some(camera.projection(vertex.position)?);
        if let Some(bar) = bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish();
    }
    Ok(())
}

/// Recompute every face normal from the freshly projected positions.
pub fn compute_normals(mesh: &mut Mesh, bar: Option<&ProgressBar>) -> Result<(), RenderError> {
    for tri in 0..mesh.triangles.len() {
        mesh.calculate_normal(tri)?;
        if let Some(bar) = bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish();
    }
    Ok(())
}

/// Pixel bounds of a projected triangle, grown by one pixel and clamped to
/// the frame. Returns half-open ranges, or `None` for an empty overlap.
pub fn screen_bounds(
    camera: &Camera,
    projected: &[Vec3; 3],
) -> Option<(usize, usize, usize, usize)> {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for p in projected {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let x0 = (min_x - 1.0).clamp(0.0, camera.width as f32 - 0.9);
    let x1 = (max_x + 1.0).clamp(0.0, camera.width as f32 - 0.9);
    let y0 = (min_y - 1.0).clamp(0.0, camera.height as f32 - 0.9);
    let y1 = (max_y + 1.0).clamp(0.0, camera.height as f32 - 0.9);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as usize, x1.ceil() as usize, y0 as usize, y1.ceil() as usize))
}
