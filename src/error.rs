//! Render error taxonomy
//!
//! Every failure here is unrecoverable at its point of origin: the pipeline
//! fails fast and never substitutes defaults for missing derived state.

use crate::color::Channels;

#[derive(Debug)]
pub enum RenderError {
    /// Arithmetic or assignment between colors of different channel tags.
    ChannelMismatch { expected: Channels, found: Channels },
    /// Allocating over a framebuffer that is still live.
    BufferAlive(&'static str),
    InvalidResolution { w: usize, h: usize },
    /// A cached camera transform was read before being computed.
    MissingTransform(&'static str),
    /// Per-frame scratch state read before it was computed.
    MissingNormal,
    MissingUv,
    MissingProjection,
    ObjParse(String),
    SceneFormat(String),
    Io(std::io::Error),
    Image(image::ImageError),
    SceneParse(ron::error::SpannedError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::ChannelMismatch { expected, found } => {
                write!(f, "channel mismatch: expected {}, got {}", expected, found)
            }
            RenderError::BufferAlive(name) => {
                write!(f, "allocating over live {} buffer", name)
            }
            RenderError::InvalidResolution { w, h } => {
                write!(f, "illegal framebuffer resolution {}x{}", w, h)
            }
            RenderError::MissingTransform(name) => {
                write!(f, "camera {} transform read before it was computed", name)
            }
            RenderError::MissingNormal => write!(f, "normal read before it was computed"),
            RenderError::MissingUv => write!(f, "triangle has no texture coordinates"),
            RenderError::MissingProjection => {
                write!(f, "projected position read before the projection pass")
            }
            RenderError::ObjParse(msg) => write!(f, "OBJ parse error: {}", msg),
            RenderError::SceneFormat(msg) => write!(f, "scene error: {}", msg),
            RenderError::Io(e) => write!(f, "IO error: {}", e),
            RenderError::Image(e) => write!(f, "image error: {}", e),
            RenderError::SceneParse(e) => write!(f, "scene parse error: {}", e),
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        RenderError::Image(e)
    }
}

impl From<ron::error::SpannedError> for RenderError {
    fn from(e: ron::error::SpannedError) -> Self {
        RenderError::SceneParse(e)
    }
}
