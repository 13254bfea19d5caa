//! Scene description files
//!
//! A scene is a RON file naming the models, camera, lights and shading for
//! one render. Angles are written in degrees and converted when the scene is
//! applied; colors are channel lists, and everything in a scene must agree
//! with the background's channel layout.

use crate::camera::{Projection, DEFAULT_FAR, DEFAULT_NEAR};
use crate::color::Color;
use crate::error::RenderError;
use crate::light::LightKind;
use crate::math::Vec3;
use crate::rasterizer::PaintOptions;
use crate::shader::Shader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelDef {
    pub obj: PathBuf,
    #[serde(default)]
    pub texture: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CameraDef {
    pub projection: Projection,
    pub width: usize,
    pub height: usize,
    /// Vertical field of view, degrees.
    pub fov: f32,
    pub position: Vec3,
    pub look: Vec3,
    /// Roll around the gaze, degrees.
    #[serde(default)]
    pub up_rotation: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    pub background: Color,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LightDef {
    pub kind: LightKind,
    pub intensity: f32,
    pub color: Color,
    #[serde(default = "default_shadow_map_size")]
    pub shadow_map_size: usize,
    /// Shadow camera field of view, degrees.
    #[serde(default = "default_light_fov")]
    pub fov: f32,
    /// Position for a point light, ray direction for a sun.
    pub placement: Vec3,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OutlineDef {
    pub line_color: Color,
    /// Dihedral threshold for crease edges, degrees.
    #[serde(default = "default_crease_angle")]
    pub crease_angle: f32,
    #[serde(default = "default_thickness")]
    pub thickness: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Scene {
    pub models: Vec<ModelDef>,
    pub camera: CameraDef,
    #[serde(default)]
    pub lights: Vec<LightDef>,
    pub shader: Shader,
    pub fill_color: Color,
    #[serde(default)]
    pub outline: Option<OutlineDef>,
    #[serde(default)]
    pub paint_back: bool,
    pub output: PathBuf,
}

fn default_near() -> f32 {
    DEFAULT_NEAR
}

fn default_far() -> f32 {
    DEFAULT_FAR
}

fn default_shadow_map_size() -> usize {
    1024
}

fn default_light_fov() -> f32 {
    90.0
}

fn default_crease_angle() -> f32 {
    45.0
}

fn default_thickness() -> i32 {
    1
}

pub fn load_scene(path: &Path) -> Result<Scene, RenderError> {
    let text = std::fs::read_to_string(path)?;
    let scene: Scene = ron::from_str(&text)?;
    scene.validate()?;
    Ok(scene)
}

impl Scene {
    /// Every color in the scene must share the background's channel layout,
    /// otherwise the render would die halfway through with the same error.
    pub fn validate(&self) -> Result<(), RenderError> {
        let expected = self.camera.background.channels();
        let mut colors = vec![self.fill_color];
        colors.extend(self.lights.iter().map(|l| l.color));
        if let Some(outline) = &self.outline {
            colors.push(outline.line_color);
        }
        for color in colors {
            if color.channels() != expected {
                return Err(RenderError::ChannelMismatch { expected, found: color.channels() });
            }
        }
        Ok(())
    }

    pub fn paint_options(&self, verbose: bool) -> PaintOptions {
        let (line_color, crease_angle, thickness) = match &self.outline {
            Some(o) => (o.line_color, o.crease_angle.to_radians(), o.thickness),
            None => (self.fill_color, default_crease_angle().to_radians(), 1),
        };
        PaintOptions {
            fill_color: self.fill_color,
            line_color,
            crease_angle,
            outline: self.outline.is_some(),
            paint_back: self.paint_back,
            line_thickness: thickness,
            verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Channels;

    const SCENE: &str = r#"(
        models: [
            (obj: "model.obj", texture: Some("skin.png")),
            (obj: "floor.obj"),
        ],
        camera: (
            projection: Persp,
            width: 640,
            height: 480,
            fov: 60.0,
            position: (x: 0.0, y: 3.0, z: 6.0),
            look: (x: 0.0, y: -0.5, z: -1.0),
            background: [1.0, 1.0, 1.0],
        ),
        lights: [
            (kind: Point, intensity: 8.0, color: [1.0, 0.9, 0.8], placement: (x: 0.0, y: 4.0, z: 0.0)),
        ],
        shader: LitShadow(shadow_bias: 0.09, pcf: true),
        fill_color: [0.8, 0.8, 0.8],
        outline: Some((line_color: [0.0, 0.0, 0.0], crease_angle: 40.0, thickness: 2)),
        output: "render.png",
    )"#;

    #[test]
    fn test_parse_scene_with_defaults() {
        let scene: Scene = ron::from_str(SCENE).unwrap();
        scene.validate().unwrap();
        assert_eq!(scene.models.len(), 2);
        assert_eq!(scene.models[1].texture, None);
        assert_eq!(scene.camera.projection, Projection::Persp);
        assert!((scene.camera.near - DEFAULT_NEAR).abs() < 1e-9);
        assert_eq!(scene.lights[0].shadow_map_size, 1024);
        assert!((scene.lights[0].fov - 90.0).abs() < 0.001);
        assert!(!scene.paint_back);
        assert!(matches!(scene.shader, Shader::LitShadow { pcf: true, .. }));

        let opts = scene.paint_options(false);
        assert!(opts.outline);
        assert_eq!(opts.line_thickness, 2);
        assert!((opts.crease_angle - 40.0f32.to_radians()).abs() < 0.001);
    }

    #[test]
    fn test_mismatched_colors_rejected() {
        let mut scene: Scene = ron::from_str(SCENE).unwrap();
        scene.fill_color = Color::gray(0.5);
        assert!(matches!(
            scene.validate(),
            Err(RenderError::ChannelMismatch { expected: Channels::Rgb, found: Channels::Gray })
        ));
    }

    #[test]
    fn test_malformed_scene_is_a_parse_error() {
        assert!(matches!(
            ron::from_str::<Scene>("(models: oops)"),
            Err(ron::error::SpannedError { .. })
        ));
    }
}
