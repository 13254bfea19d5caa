//! Wavefront OBJ loading
//!
//! Supports `v`, `vt`, `vn` and `f` records. Faces with more than three
//! corners are fan-triangulated. After all faces are read the half-edge twin
//! links are stitched by matching each directed edge against its opposite.

use crate::error::RenderError;
use crate::math::{Vec2, Vec3};
use crate::mesh::{Edge, Mesh, Triangle, Vertex};
use std::collections::HashMap;
use std::path::Path;

pub fn load_obj(path: &Path) -> Result<Mesh, RenderError> {
    let text = std::fs::read_to_string(path)?;
    parse_obj(&text)
}

/// One face corner: 1-based `v[/vt][/vn]` indices.
fn parse_corner(token: &str) -> Result<(usize, Option<usize>, Option<usize>), RenderError> {
    let mut parts = token.split('/');
    let v = parts
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| RenderError::ObjParse(format!("bad face corner '{}'", token)))?;
    let vt = parts.next().filter(|s| !s.is_empty()).and_then(|s| s.parse::<usize>().ok());
    let vn = parts.next().filter(|s| !s.is_empty()).and_then(|s| s.parse::<usize>().ok());
    Ok((v, vt, vn))
}

fn parse_floats(parts: &[&str], n: usize, line: &str) -> Result<Vec<f32>, RenderError> {
    if parts.len() < n {
        return Err(RenderError::ObjParse(format!("short record '{}'", line)));
    }
    parts[..n]
        .iter()
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| RenderError::ObjParse(format!("bad number in '{}'", line)))
        })
        .collect()
}

pub fn parse_obj(text: &str) -> Result<Mesh, RenderError> {
    let mut mesh = Mesh::default();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();
        match keyword {
            "v" => {
                let c = parse_floats(&rest, 3, line)?;
                mesh.vertices.push(Vertex::new(Vec3::new(c[0], c[1], c[2])));
            }
            "vt" => {
                let c = parse_floats(&rest, 2, line)?;
                uvs.push(Vec2::new(c[0], c[1]));
            }
            "vn" => {
                let c = parse_floats(&rest, 3, line)?;
                normals.push(Vec3::new(c[0], c[1], c[2]));
            }
            "f" => {
                if rest.len() < 3 {
                    return Err(RenderError::ObjParse(format!("face too short '{}'", line)));
                }
                let corners = rest
                    .iter()
                    .map(|t| parse_corner(t))
                    .collect::<Result<Vec<_>, _>>()?;
                for i in 0..corners.len() - 2 {
                    add_triangle(&mut mesh, &uvs, &normals, [
                        corners[0],
                        corners[i + 1],
                        corners[i + 2],
                    ])?;
                }
            }
            // Groups, materials and smoothing records are ignored.
            _ => {}
        }
    }

    link_reverses(&mut mesh);
    Ok(mesh)
}

fn add_triangle(
    mesh: &mut Mesh,
    uvs: &[Vec2],
    normals: &[Vec3],
    corners: [(usize, Option<usize>, Option<usize>); 3],
) -> Result<(), RenderError> {
    let mut vertices = [0usize; 3];
    let mut tri_uvs = [None; 3];
    let mut tri_normals = [None; 3];
    for (i, &(v, vt, vn)) in corners.iter().enumerate() {
        if v == 0 || v > mesh.vertices.len() {
            return Err(RenderError::ObjParse(format!("vertex index {} out of range", v)));
        }
        vertices[i] = v - 1;
        // Attribute indices are 1-based too; zero or out-of-range indices
        // leave the corner attribute unset.
        tri_uvs[i] = vt.and_then(|t| t.checked_sub(1)).and_then(|t| uvs.get(t)).copied();
        tri_normals[i] = vn.and_then(|n| n.checked_sub(1)).and_then(|n| normals.get(n)).copied();
    }

    let tri = mesh.triangles.len();
    let base = mesh.edges.len();
    for i in 0..3 {
        mesh.edges.push(Edge {
            start: vertices[i],
            end: vertices[(i + 1) % 3],
            triangle: tri,
            reverse: None,
        });
    }
    let smooth = tri_normals.iter().all(|n| n.is_some());
    mesh.triangles.push(Triangle {
        vertices,
        uvs: tri_uvs,
        normals: tri_normals,
        edges: [base, base + 1, base + 2],
        normal: None,
        smooth,
    });
    Ok(())
}

/// Stitch twin links: a directed edge's reverse is the edge running the same
/// vertex pair in the opposite direction. Unmatched edges stay boundaries.
fn link_reverses(mesh: &mut Mesh) {
    let mut by_pair: HashMap<(usize, usize), usize> = HashMap::new();
    for (id, e) in mesh.edges.iter().enumerate() {
        by_pair.insert((e.start, e.end), id);
    }
    for id in 0..mesh.edges.len() {
        let (start, end) = (mesh.edges[id].start, mesh.edges[id].end);
        mesh.edges[id].reverse = by_pair.get(&(end, start)).copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle() {
        let mesh = parse_obj("v 0.0 0.5 0.0\nv -0.5 -0.5 0.0\nv 0.5 -0.5 0.0\nf 1 3 2\n").unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.edges.len(), 3);
        assert_eq!(mesh.triangles[0].vertices, [0, 2, 1]);
        assert!(!mesh.triangles[0].smooth);
        for e in 0..3 {
            assert!(mesh.edge_is_boundary(e));
        }
    }

    #[test]
    fn test_quad_fan_triangulation_and_twins() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.triangles[0].vertices, [0, 1, 2]);
        assert_eq!(mesh.triangles[1].vertices, [0, 2, 3]);
        // The diagonal 0-2 is shared; its two half-edges point at each other.
        let shared: Vec<usize> = (0..mesh.edges.len())
            .filter(|&e| !mesh.edge_is_boundary(e))
            .collect();
        assert_eq!(shared.len(), 2);
        assert_eq!(mesh.edges[shared[0]].reverse, Some(shared[1]));
        assert_eq!(mesh.edges[shared[1]].reverse, Some(shared[0]));
    }

    #[test]
    fn test_uv_and_normal_attachment() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.0 0.0\nvt 1.0 0.0\nvt 0.0 1.0\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n";
        let mesh = parse_obj(obj).unwrap();
        let t = &mesh.triangles[0];
        assert!(t.smooth);
        assert_eq!(t.uvs[1], Some(Vec2::new(1.0, 0.0)));
        assert_eq!(t.normals[2], Some(Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_missing_normal_disables_smooth() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3\n";
        let mesh = parse_obj(obj).unwrap();
        assert!(!mesh.triangles[0].smooth);
    }

    #[test]
    fn test_zero_attribute_index_is_ignored() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nvn 0 0 1\nf 1/0/0 2/1/1 3/1/1\n";
        let mesh = parse_obj(obj).unwrap();
        let t = &mesh.triangles[0];
        assert_eq!(t.uvs[0], None);
        assert_eq!(t.normals[0], None);
        assert_eq!(t.uvs[1], Some(Vec2::new(0.5, 0.5)));
        assert!(!t.smooth);
    }

    #[test]
    fn test_vertex_index_out_of_range() {
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 5\n"),
            Err(RenderError::ObjParse(_))
        ));
    }

    #[test]
    fn test_bad_number() {
        assert!(matches!(
            parse_obj("v 0 zero 0\n"),
            Err(RenderError::ObjParse(_))
        ));
    }
}
