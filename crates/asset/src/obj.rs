//! OBJ face-list parser. Produces position/normal tables and faces of any arity;
//! triangulation happens later in [`crate::mesh::pack_mesh`].

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{ImportError, ImportResult};

/// One vertex reference inside a face. Indices are resolved to 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub position: usize,
    pub normal: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Face {
    pub corners: Vec<Corner>,
}

/// Parsed mesh description. Every corner index is in bounds of its table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjMesh {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    faces: Vec<Face>,
}

impl ObjMesh {
    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    #[inline]
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }
}

/// Parse an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> ImportResult<ObjMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_obj_from_reader(BufReader::new(file))
}

/// Parse an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> ImportResult<ObjMesh> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> ImportResult<ObjMesh> {
    parse_obj(io::Cursor::new(contents))
}

fn parse_obj<R: BufRead>(reader: R) -> ImportResult<ObjMesh> {
    let mut mesh = ObjMesh::default();
    // Texture coordinates are not packed, but face corners may still index them.
    let mut texcoord_count = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ImportError::Read {
            line: line_no + 1,
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                mesh.positions.push([x, y, z]);
            }
            "vt" => {
                parse_f32(parts.next(), line_no, "u coordinate")?;
                texcoord_count += 1;
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                mesh.normals.push([nx, ny, nz]);
            }
            "f" => {
                let corners = parts
                    .map(|token| {
                        parse_corner(
                            token,
                            mesh.positions.len(),
                            texcoord_count,
                            mesh.normals.len(),
                            line_no,
                        )
                    })
                    .collect::<ImportResult<Vec<_>>>()?;
                // Arity is checked at pack time so unsupported faces are
                // dropped without disturbing the ones that follow.
                mesh.faces.push(Face { corners });
            }
            _ => {
                // o/g/s/usemtl/mtllib and anything else
            }
        }
    }

    Ok(mesh)
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> ImportResult<f32> {
    let token = value.ok_or_else(|| ImportError::parse(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|e| ImportError::parse(line_no, format!("invalid {what} '{token}': {e}")))
}

fn parse_corner(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> ImportResult<Corner> {
    let mut split = token.split('/');
    let pos = split.next().unwrap_or_default();
    let position = resolve_index(pos, pos_count, line_no)?;

    if let Some(value) = split.next().filter(|v| !v.is_empty()) {
        resolve_index(value, tex_count, line_no)?;
    }

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    if split.next().is_some() {
        return Err(ImportError::parse(
            line_no,
            format!("malformed face element '{token}'"),
        ));
    }

    Ok(Corner { position, normal })
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> ImportResult<usize> {
    let raw = token
        .parse::<i64>()
        .map_err(|_| ImportError::parse(line_no, format!("invalid index '{token}'")))?;
    if raw == 0 {
        return Err(ImportError::parse(line_no, "OBJ indices are 1-based; found 0"));
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        return Err(ImportError::parse(
            line_no,
            format!("index {raw} resolved out of bounds (len={len})"),
        ));
    }

    Ok(idx as usize)
}
