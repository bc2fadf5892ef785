//! Minimal Wavefront OBJ reader: positions, polygonal faces and `o`/`g`
//! groups. Normals, texture coordinates and materials are ignored.

use nalgebra::Point3;

use crate::models::mesh::{Geometry, MeshTemplate, SceneNode};
use crate::{Error, Result};

/// Parses OBJ text into a template with one mesh child per object/group.
/// Axes are left as authored.
pub fn parse_obj(source: &str, name: &str) -> Result<MeshTemplate> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut parts: Vec<(String, Vec<[u32; 3]>)> = vec![(name.to_string(), Vec::new())];

    for (line_no, raw) in source.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::MeshParse(format!("line {}: {}", line_no + 1, e)))?;
                if coords.len() != 3 {
                    return Err(Error::MeshParse(format!(
                        "line {}: vertex needs three coordinates",
                        line_no + 1
                    )));
                }
                positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            "f" => {
                let corners = tokens
                    .map(|t| resolve_index(t, positions.len()))
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(|| Error::MeshParse(format!("line {}: bad face index", line_no + 1)))?;
                if corners.len() < 3 {
                    return Err(Error::MeshParse(format!(
                        "line {}: face needs at least three vertices",
                        line_no + 1
                    )));
                }
                // Fan triangulation, as polygons in OBJ exports are convex
                if let Some((_, faces)) = parts.last_mut() {
                    for i in 1..corners.len() - 1 {
                        faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
            }
            "o" | "g" => {
                let part_name = tokens.collect::<Vec<_>>().join(" ");
                match parts.last_mut() {
                    // Reuse an empty leading part instead of leaving it dangling
                    Some((current, faces)) if faces.is_empty() => *current = part_name,
                    _ => parts.push((part_name, Vec::new())),
                }
            }
            _ => {}
        }
    }

    let mut root = SceneNode::group(name);
    for (part_name, faces) in parts.into_iter().filter(|(_, f)| !f.is_empty()) {
        root.children
            .push(SceneNode::mesh(part_name, Geometry::new(positions.clone(), faces)));
    }

    if root.children.is_empty() {
        return Err(Error::MeshParse(format!("{name}: no faces")));
    }
    Ok(MeshTemplate::new(root))
}

/// `7`, `7/2`, `7//3`, `7/2/3` or negative (relative) indices; OBJ is 1-based.
fn resolve_index(token: &str, vertex_count: usize) -> Option<u32> {
    let index: i64 = token.split('/').next()?.parse().ok()?;
    let resolved = if index < 0 {
        vertex_count as i64 + index
    } else {
        index - 1
    };
    (0..vertex_count as i64)
        .contains(&resolved)
        .then_some(resolved as u32)
}
