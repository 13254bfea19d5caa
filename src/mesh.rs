//! Arena mesh model with half-edge adjacency
//!
//! The mesh owns flat vectors of vertices, half-edges and triangles; every
//! cross-reference is an index into the owning vector and an edge's twin is
//! `Option<usize>` (`None` exactly on mesh boundaries). Two scratch fields
//! are rewritten each render pass: the per-vertex projected position and the
//! per-triangle face normal. Reading either before its pass is an error.

use crate::error::RenderError;
use crate::math::{self, Vec2, Vec3};
use crate::texture::Texture;

#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Vec3,
    /// Camera-space projected position, valid until the next projection pass.
    pub projected: Option<Vec3>,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self { position, projected: None }
    }
}

/// Directed half-edge. `reverse` points at the opposing half-edge in the
/// adjacent triangle; when present, `edges[reverse].start == self.end`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub start: usize,
    pub end: usize,
    pub triangle: usize,
    pub reverse: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [usize; 3],
    pub uvs: [Option<Vec2>; 3],
    pub normals: [Option<Vec3>; 3],
    pub edges: [usize; 3],
    /// Face normal in projected space, valid after `calculate_normal`.
    pub normal: Option<Vec3>,
    /// Interpolate per-corner normals instead of the flat face normal.
    pub smooth: bool,
}

/// A loaded model: geometry arenas plus an optional texture.
#[derive(Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub triangles: Vec<Triangle>,
    pub texture: Option<Texture>,
}

impl Mesh {
    /// Projected corner positions of a triangle, in corner order.
    pub fn projected(&self, tri: usize) -> Result<[Vec3; 3], RenderError> {
        let t = &self.triangles[tri];
        let mut out = [Vec3::ZERO; 3];
        for (slot, &v) in out.iter_mut().zip(t.vertices.iter()) {
            *slot = self.vertices[v].projected.ok_or(RenderError::MissingProjection)?;
        }
        Ok(out)
    }

    /// Face normal from the projected corners, normalized. Overwrites the
    /// triangle's scratch normal.
    pub fn calculate_normal(&mut self, tri: usize) -> Result<(), RenderError> {
        let [a, b, c] = self.projected(tri)?;
        let normal = (b - a).cross(c - a).normalize();
        self.triangles[tri].normal = Some(normal);
        Ok(())
    }

    /// Screen-space inside test via the signs of the three edge cross
    /// products. Consistent for either winding.
    pub fn is_inside(&self, tri: usize, x: f32, y: f32) -> Result<bool, RenderError> {
        let [a, b, c] = self.projected(tri)?;
        let side = |p: Vec3, q: Vec3| (x - p.x) * (q.y - p.y) - (y - p.y) * (q.x - p.x);
        let d1 = side(a, b);
        let d2 = side(b, c);
        let d3 = side(c, a);
        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
        Ok(!(has_neg && has_pos))
    }

    pub fn barycentric(&self, tri: usize, x: f32, y: f32) -> Result<Vec3, RenderError> {
        let [a, b, c] = self.projected(tri)?;
        Ok(math::barycentric(Vec3::new(x, y, 0.0), a, b, c))
    }

    /// World-space position at a barycentric coordinate.
    pub fn position_at(&self, tri: usize, bc: Vec3) -> Vec3 {
        let t = &self.triangles[tri];
        let [a, b, c] = t.vertices.map(|v| self.vertices[v].position);
        a.scale(bc.x) + b.scale(bc.y) + c.scale(bc.z)
    }

    pub fn uv_at(&self, tri: usize, bc: Vec3) -> Result<Vec2, RenderError> {
        let t = &self.triangles[tri];
        let mut u = 0.0;
        let mut v = 0.0;
        for (uv, w) in t.uvs.iter().zip([bc.x, bc.y, bc.z]) {
            let uv = uv.ok_or(RenderError::MissingUv)?;
            u += uv.x * w;
            v += uv.y * w;
        }
        Ok(Vec2::new(u, v))
    }

    /// Interpolated per-corner normal for smooth-shaded triangles.
    pub fn corner_normal_at(&self, tri: usize, bc: Vec3) -> Result<Vec3, RenderError> {
        let t = &self.triangles[tri];
        let mut out = Vec3::ZERO;
        for (n, w) in t.normals.iter().zip([bc.x, bc.y, bc.z]) {
            let n = n.ok_or(RenderError::MissingNormal)?;
            out += n.scale(w);
        }
        Ok(out)
    }

    pub fn edge_is_boundary(&self, edge: usize) -> bool {
        self.edges[edge].reverse.is_none()
    }

    /// An edge is a silhouette when its two adjacent face normals sit on
    /// opposite sides of the view axis.
    pub fn edge_is_silhouette(&self, edge: usize) -> Result<bool, RenderError> {
        let e = &self.edges[edge];
        match e.reverse {
            None => Ok(false),
            Some(r) => {
                let n1 = self.triangles[e.triangle].normal.ok_or(RenderError::MissingNormal)?;
                let n2 = self.triangles[self.edges[r].triangle]
                    .normal
                    .ok_or(RenderError::MissingNormal)?;
                Ok(n1.z * n2.z < 0.0)
            }
        }
    }

    /// An edge is a crease when its adjacent face normals diverge beyond
    /// `crease_angle` (radians).
    pub fn edge_is_crease(&self, edge: usize, crease_angle: f32) -> Result<bool, RenderError> {
        let e = &self.edges[edge];
        match e.reverse {
            None => Ok(false),
            Some(r) => {
                let n1 = self.triangles[e.triangle].normal.ok_or(RenderError::MissingNormal)?;
                let n2 = self.triangles[self.edges[r].triangle]
                    .normal
                    .ok_or(RenderError::MissingNormal)?;
                Ok(n1.dot(n2) < crease_angle.cos())
            }
        }
    }

    /// Projected endpoints of an edge.
    pub fn edge_endpoints(&self, edge: usize) -> Result<(Vec3, Vec3), RenderError> {
        let e = &self.edges[edge];
        let a = self.vertices[e.start].projected.ok_or(RenderError::MissingProjection)?;
        let b = self.vertices[e.end].projected.ok_or(RenderError::MissingProjection)?;
        Ok((a, b))
    }
}
