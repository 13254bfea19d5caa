//! inkline - offline toon-shading software rasterizer
//!
//! Renders a RON scene description to an image file: OBJ models, shadow
//! mapped lights, and topology-driven outline strokes.

mod camera;
mod color;
mod error;
mod export;
mod light;
mod math;
mod mesh;
mod obj;
mod rasterizer;
mod scene;
mod shader;
mod texture;

use error::RenderError;
use rasterizer::Rasterizer;
use std::path::{Path, PathBuf};

fn main() {
    let mut scene_path: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut verbose = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ if scene_path.is_none() => scene_path = Some(PathBuf::from(arg)),
            _ if output.is_none() => output = Some(PathBuf::from(arg)),
            _ => {
                print_usage();
                std::process::exit(2);
            }
        }
    }
    let Some(scene_path) = scene_path else {
        print_usage();
        std::process::exit(2);
    };

    if let Err(e) = run(&scene_path, output, verbose) {
        eprintln!("inkline: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("usage: inkline <scene.ron> [output-image] [--verbose]");
}

fn run(scene_path: &Path, output: Option<PathBuf>, verbose: bool) -> Result<(), RenderError> {
    let scene = scene::load_scene(scene_path)?;

    let mut rasterizer = Rasterizer::new(scene.camera.background)?;
    for model in &scene.models {
        if verbose {
            println!("loading {}", model.obj.display());
        }
        rasterizer.load_obj(&model.obj, model.texture.as_deref())?;
    }
    for light in &scene.lights {
        rasterizer.add_light(
            light.kind,
            light.intensity,
            light.color,
            light.shadow_map_size,
            light.fov.to_radians(),
            light.placement,
        )?;
    }
    rasterizer.shadow_bake(verbose)?;

    let c = &scene.camera;
    rasterizer.config_camera(
        c.projection,
        c.background,
        c.width,
        c.height,
        c.fov.to_radians(),
        c.position,
        c.look,
        c.up_rotation.to_radians(),
        c.near,
        c.far,
    )?;
    rasterizer.paint(&scene.shader, &scene.paint_options(verbose))?;

    let output = output.unwrap_or_else(|| scene.output.clone());
    export::save_image(&rasterizer.camera, &output)?;
    if verbose {
        println!("wrote {}", output.display());
    }
    Ok(())
}
