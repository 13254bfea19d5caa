//! Per-pixel shading
//!
//! Three shaders, from cheapest to fullest: a flat fill, a texture lookup,
//! and the lit variant with shadow-map tests. The lit shader accumulates
//! light on top of a fixed ambient floor and multiplies the result into the
//! surface color, so fully shadowed pixels keep a dim version of their own
//! color instead of going black.

use crate::color::{Channels, Color};
use crate::error::RenderError;
use crate::light::Light;
use crate::math::Vec3;
use crate::mesh::Mesh;
use serde::{Deserialize, Serialize};

/// Ambient floor added before any light contribution.
const AMBIENT: f32 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Shader {
    /// Constant fill color, no lighting.
    FlatFill,
    /// Texture lookup only, no lighting.
    TextureSample,
    /// Texture (or fill) modulated by shadow-mapped diffuse lighting.
    LitShadow {
        /// Surface offset along the normal before the shadow lookup.
        shadow_bias: f32,
        /// 3x3 majority filter over the shadow map instead of a single tap.
        pcf: bool,
    },
}

impl Shader {
    pub fn shade(
        &self,
        mesh: &Mesh,
        tri: usize,
        bc: Vec3,
        fill: &Color,
        lights: &[Light],
    ) -> Result<Color, RenderError> {
        match *self {
            Shader::FlatFill => Ok(*fill),
            Shader::TextureSample => texture_color(mesh, tri, bc, fill),
            Shader::LitShadow { shadow_bias, pcf } => {
                let base = texture_color(mesh, tri, bc, fill)?;
                let light = light_reach(mesh, tri, bc, base.channels(), lights, shadow_bias, pcf)?;
                base.try_mul(&light)
            }
        }
    }
}

/// Sample the mesh texture at the pixel's UV, expressed in the frame's
/// channel layout. Untextured meshes fall back to the fill color.
fn texture_color(mesh: &Mesh, tri: usize, bc: Vec3, fill: &Color) -> Result<Color, RenderError> {
    let Some(texture) = &mesh.texture else {
        return Ok(*fill);
    };
    let uv = mesh.uv_at(tri, bc)?;
    let [r, g, b] = texture.bilinear(uv);
    Ok(match fill.channels() {
        Channels::Rgb => Color::rgb(r, g, b),
        Channels::Rgba => Color::rgba(r, g, b, 1.0),
        Channels::Gray => Color::gray(g),
        Channels::GrayAlpha => Color::gray_alpha(g, 1.0),
    })
}

/// Total light arriving at the pixel: the ambient floor plus, for every
/// light that passes its shadow test, a diffuse term scaled by the light's
/// intensity at that distance.
fn light_reach(
    mesh: &Mesh,
    tri: usize,
    bc: Vec3,
    channels: Channels,
    lights: &[Light],
    shadow_bias: f32,
    pcf: bool,
) -> Result<Color, RenderError> {
    let t = &mesh.triangles[tri];
    let normal = if t.smooth {
        mesh.corner_normal_at(tri, bc)?
    } else {
        t.normal.ok_or(RenderError::MissingNormal)?
    }
    .normalize();
    let point = mesh.position_at(tri, bc) + normal.scale(shadow_bias);

    let mut sum = Color::splat(channels, AMBIENT, 1.0);
    for light in lights {
        let distance = (point - light.camera.position).len();
        let reach = -distance;
        let projected = light.camera.projection(point)?;
        let shadowed = if pcf {
            let x = projected.x as i32 - 1;
            let y = projected.y as i32 - 1;
            let mut occluded = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    // Same point-based lookup as the single tap, so taps
                    // behind the light camera are rejected, not read.
                    let tap =
                        Vec3::new((x + dx) as f32, (y + dy) as f32, projected.z);
                    if matches!(light.camera.depth_at_point(tap), Some(s) if s > reach) {
                        occluded += 1;
                    }
                }
            }
            occluded > 4
        } else {
            matches!(light.camera.depth_at_point(projected), Some(s) if s > reach)
        };
        if shadowed {
            continue;
        }
        let diffuse = normal.dot(light.direction_to(point)).max(0.0);
        sum = sum.try_add(&light.color.scale(light.intensity_at(distance)).scale(diffuse))?;
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightKind;
    use crate::obj;
    use crate::texture::Texture;

    /// Upward-facing unit triangle at y = 0 with smooth normals, projected
    /// positions mirroring world x/z so barycentric lookups work.
    fn ground_triangle() -> Mesh {
        let mut mesh = obj::parse_obj(
            "v -1.0 0.0 -1.0\nv 1.0 0.0 -1.0\nv 0.0 0.0 1.0\nvn 0.0 1.0 0.0\nvt 0.5 0.5\nf 1/1/1 2/1/1 3/1/1\n",
        )
        .unwrap();
        for v in &mut mesh.vertices {
            let p = v.position;
            v.projected = Some(Vec3::new(p.x, p.z, -1.0));
        }
        mesh.calculate_normal(0).unwrap();
        mesh
    }

    fn center() -> Vec3 {
        Vec3::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }

    #[test]
    fn test_flat_fill_ignores_everything() {
        let mesh = ground_triangle();
        let fill = Color::rgb(0.9, 0.1, 0.2);
        let c = Shader::FlatFill.shade(&mesh, 0, center(), &fill, &[]).unwrap();
        assert_eq!(c, fill);
    }

    #[test]
    fn test_texture_sample_follows_frame_tag() {
        let mut mesh = ground_triangle();
        #[rustfmt::skip]
        let solid = vec![
            0.2, 0.6, 0.8,  0.2, 0.6, 0.8,
            0.2, 0.6, 0.8,  0.2, 0.6, 0.8,
        ];
        mesh.texture = Some(Texture::from_pixels(2, 2, solid));
        let c = Shader::TextureSample
            .shade(&mesh, 0, center(), &Color::rgb(0.0, 0.0, 0.0), &[])
            .unwrap();
        assert_eq!(c.channels(), Channels::Rgb);
        assert!((c.values()[2] - 0.8).abs() < 0.001);
        // A grayscale frame takes the green channel.
        let c = Shader::TextureSample
            .shade(&mesh, 0, center(), &Color::gray(0.0), &[])
            .unwrap();
        assert_eq!(c.channels(), Channels::Gray);
        assert!((c.values()[0] - 0.6).abs() < 0.001);
    }

    #[test]
    fn test_untextured_mesh_falls_back_to_fill() {
        let mesh = ground_triangle();
        let fill = Color::rgb(0.3, 0.3, 0.3);
        let c = Shader::TextureSample.shade(&mesh, 0, center(), &fill, &[]).unwrap();
        assert_eq!(c, fill);
    }

    #[test]
    fn test_no_lights_leaves_the_ambient_floor() {
        let mesh = ground_triangle();
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: false };
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[]).unwrap();
        for v in c.values() {
            assert!((v - AMBIENT).abs() < 0.001);
        }
    }

    #[test]
    fn test_unshadowed_point_light_adds_diffuse() {
        let mesh = ground_triangle();
        let mut light = Light::new(LightKind::Point, 4.0, Color::rgb(1.0, 1.0, 1.0)).unwrap();
        light.config(32, std::f32::consts::FRAC_PI_2, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        light.camera.init_buffers();
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: false };
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[light]).unwrap();
        // Light two units above a horizontal surface shining straight down:
        // 0.1 ambient + 4 / 2^2 * 1.0 diffuse, roughly. The surface point is
        // a third of the way up, so just check the band.
        assert!(c.values()[0] > 0.5, "got {:?}", c.values());
    }

    #[test]
    fn test_light_from_below_contributes_nothing() {
        let mesh = ground_triangle();
        let mut light = Light::new(LightKind::Point, 4.0, Color::rgb(1.0, 1.0, 1.0)).unwrap();
        light.config(32, std::f32::consts::FRAC_PI_2, Vec3::new(0.0, -2.0, 0.0)).unwrap();
        light.camera.init_buffers();
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: false };
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[light]).unwrap();
        for v in c.values() {
            assert!((v - AMBIENT).abs() < 0.001);
        }
    }

    #[test]
    fn test_occluder_in_shadow_map_blocks_the_light() {
        let mesh = ground_triangle();
        let mut light = Light::new(LightKind::Point, 4.0, Color::rgb(1.0, 1.0, 1.0)).unwrap();
        light.config(32, std::f32::consts::FRAC_PI_2, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        light.camera.init_buffers();
        // Pretend something half a unit from the light covers the whole map.
        light.camera.depth.fill(-0.5);
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: false };
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[light]).unwrap();
        for v in c.values() {
            assert!((v - AMBIENT).abs() < 0.001);
        }
    }

    #[test]
    fn test_pcf_majority_vote() {
        let mesh = ground_triangle();
        let mut light = Light::new(LightKind::Point, 4.0, Color::rgb(1.0, 1.0, 1.0)).unwrap();
        light.config(32, std::f32::consts::FRAC_PI_2, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        light.camera.init_buffers();
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: true };

        // Fully occluded map: nine of nine taps vote shadowed.
        light.camera.depth.fill(-0.5);
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[light]).unwrap();
        assert!((c.values()[0] - AMBIENT).abs() < 0.001);
    }

    #[test]
    fn test_pcf_rejects_taps_behind_the_light_camera() {
        // A sun at (0, 100, 0) shining down; the surface sits above it, so
        // its projection into the shadow camera lands behind the camera.
        // Even a fully occluded map must not shadow it.
        let mesh = obj::parse_obj(
            "v -1.0 101.0 -1.0\nv 1.0 101.0 -1.0\nv 0.0 101.0 1.0\nvn 0.0 1.0 0.0\nf 1//1 2//1 3//1\n",
        )
        .unwrap();
        let mut light = Light::new(LightKind::Sun, 0.8, Color::rgb(1.0, 1.0, 1.0)).unwrap();
        light.config(32, std::f32::consts::FRAC_PI_2, Vec3::new(0.0, -1.0, 0.0)).unwrap();
        light.camera.init_buffers();
        light.camera.depth.fill(-0.5);
        let shader = Shader::LitShadow { shadow_bias: 0.0, pcf: true };
        let c = shader.shade(&mesh, 0, center(), &Color::rgb(1.0, 1.0, 1.0), &[light]).unwrap();
        // Ambient plus the full sun contribution, not ambient alone.
        assert!(c.values()[0] > 0.5, "got {:?}", c.values());
    }
}
