use std::collections::HashMap;

use glam::Vec3;

use crate::error::AssetError;
use crate::geometry::Mesh;

/// Parses a Wavefront OBJ document into a single mesh.
///
/// Polygons are fan-triangulated; texture coordinates, groups and material
/// libraries are ignored.
pub fn decode_obj(text: &str) -> Result<Mesh, AssetError> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut builder = MeshBuilder::default();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(parse_vec3(parts, line_no)?),
            Some("vn") => normals.push(parse_vec3(parts, line_no)?),
            Some("f") => {
                let corners = parts
                    .map(|corner| parse_corner(corner, positions.len(), normals.len(), line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                if corners.len() < 3 {
                    return Err(obj_error(line_no, "faces need at least 3 vertices"));
                }
                for i in 1..corners.len() - 1 {
                    for corner in [corners[0], corners[i], corners[i + 1]] {
                        builder.push(corner, &positions, &normals);
                    }
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(obj_error(0, "no vertices defined"));
    }
    let mut mesh = builder.mesh;
    mesh.ensure_normals();
    Ok(mesh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

/// Deduplicates `position/normal` pairs into indexed vertices.
#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
    lookup: HashMap<Corner, u32>,
}

impl MeshBuilder {
    fn push(&mut self, corner: Corner, positions: &[Vec3], normals: &[Vec3]) {
        let mesh = &mut self.mesh;
        let index = *self.lookup.entry(corner).or_insert_with(|| {
            mesh.positions.push(positions[corner.position]);
            mesh.normals
                .push(corner.normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO));
            (mesh.positions.len() - 1) as u32
        });
        mesh.indices.push(index);
    }
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3, AssetError> {
    let mut component = || -> Result<f32, AssetError> {
        parts
            .next()
            .ok_or_else(|| obj_error(line, "missing vector component"))?
            .parse::<f32>()
            .map_err(|err| obj_error(line, &err.to_string()))
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

/// Parses `v`, `v/vt`, `v//vn` or `v/vt/vn`, resolving relative indices.
fn parse_corner(
    corner: &str,
    position_count: usize,
    normal_count: usize,
    line: usize,
) -> Result<Corner, AssetError> {
    let mut segments = corner.split('/');
    let position = segments
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| obj_error(line, "missing vertex index"))?;
    let position = parse_index(position, position_count, line)?
        .ok_or_else(|| obj_error(line, "vertex index out of range"))?;
    let _texcoord = segments.next();
    let normal = match segments.next().filter(|segment| !segment.is_empty()) {
        Some(normal) => parse_index(normal, normal_count, line)?,
        None => None,
    };
    Ok(Corner { position, normal })
}

fn parse_index(value: &str, len: usize, line: usize) -> Result<Option<usize>, AssetError> {
    let index = value
        .parse::<i64>()
        .map_err(|err| obj_error(line, &err.to_string()))?;
    let resolved = if index > 0 {
        let zero_based = (index - 1) as usize;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    };
    Ok(resolved)
}

fn obj_error(line: usize, reason: &str) -> AssetError {
    AssetError::Obj {
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quads_are_fan_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = decode_obj(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.normals.iter().all(|n| *n == Vec3::Z));
    }

    #[test]
    fn relative_indices_and_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf -3//1 -2//1 -1//1\n";
        let mesh = decode_obj(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals, vec![Vec3::NEG_Z; 3]);
    }

    #[test]
    fn out_of_range_index_reports_line() {
        let obj = "# comment\nv 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            decode_obj(obj),
            Err(AssetError::Obj { line: 3, .. })
        ));
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(decode_obj("# nothing here\n").is_err());
    }
}
