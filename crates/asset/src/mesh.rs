//! Packing of parsed OBJ faces into a flat, interleaved, unindexed vertex
//! buffer ready for upload.

use std::{io::BufRead, path::Path};

use bytemuck::{Pod, Zeroable};

use crate::{
    error::{ImportError, ImportResult},
    obj::{self, ObjMesh},
};

/// Normal assigned to every vertex of a mesh that declares no normals.
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Normal for a corner without a normal index in a mesh that has normals:
/// the reserved slot 0 of the normal table, facing +Z.
pub const MISSING_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Corner orderings emitted for a quad: fan around corner 0. A triangle uses
/// only the first entry.
const FAN: [[usize; 3]; 2] = [[0, 1, 2], [0, 2, 3]];

/// Interleaved vertex record: position then normal, 6 floats / 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub const FLOATS: usize = 6;
    pub const STRIDE: u64 = std::mem::size_of::<MeshVertex>() as u64;
    pub const POSITION_OFFSET: u64 = 0;
    pub const NORMAL_OFFSET: u64 = std::mem::size_of::<[f32; 3]>() as u64;

    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Unindexed triangle list: every three consecutive vertices form a triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedMesh {
    vertices: Vec<MeshVertex>,
}

impl PackedMesh {
    #[inline]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// Vertex count as passed to the draw call.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        // pack_mesh rejects meshes that overflow u32.
        self.vertices.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The buffer as a flat float sequence (6 floats per vertex).
    #[inline]
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Triangles a face of the given arity expands to. Only triangles and quads
/// are supported; every other arity yields nothing.
#[inline]
pub fn face_triangles(corner_count: usize) -> &'static [[usize; 3]] {
    match corner_count {
        3 => &FAN[..1],
        4 => &FAN[..],
        _ => &[],
    }
}

/// Exact number of vertices [`pack_mesh`] will emit.
pub fn packed_vertex_count(mesh: &ObjMesh) -> usize {
    mesh.faces()
        .iter()
        .map(|face| face_triangles(face.corners.len()).len() * 3)
        .sum()
}

/// Triangulate and interleave a parsed mesh.
///
/// Normals come from the mesh's normal table only when it declares at least
/// one normal; otherwise every vertex gets [`DEFAULT_NORMAL`].
pub fn pack_mesh(mesh: &ObjMesh) -> ImportResult<PackedMesh> {
    let count = packed_vertex_count(mesh);
    if u32::try_from(count).is_err() {
        return Err(ImportError::TooManyVertices { vertices: count });
    }

    let mut vertices = Vec::new();
    vertices
        .try_reserve_exact(count)
        .map_err(|source| ImportError::Allocation {
            vertices: count,
            source,
        })?;

    let use_normals = mesh.has_normals();
    let positions = mesh.positions();
    let normals = mesh.normals();
    let mut skipped = 0usize;

    for face in mesh.faces() {
        let triangles = face_triangles(face.corners.len());
        if triangles.is_empty() {
            skipped += 1;
            continue;
        }
        for triangle in triangles {
            for &corner_idx in triangle {
                let corner = face.corners[corner_idx];
                let normal = if use_normals {
                    corner.normal.map_or(MISSING_NORMAL, |n| normals[n])
                } else {
                    DEFAULT_NORMAL
                };
                vertices.push(MeshVertex::new(positions[corner.position], normal));
            }
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} face(s) with unsupported corner count");
    }
    debug_assert_eq!(vertices.len(), count);

    Ok(PackedMesh { vertices })
}

/// Parse and pack an OBJ file.
pub fn import_mesh(path: impl AsRef<Path>) -> ImportResult<PackedMesh> {
    let mesh = obj::load_obj_from_path(path)?;
    pack_mesh(&mesh)
}

/// Parse and pack an OBJ mesh from a reader.
pub fn import_mesh_from_reader<R: BufRead>(reader: R) -> ImportResult<PackedMesh> {
    let mesh = obj::load_obj_from_reader(reader)?;
    pack_mesh(&mesh)
}

/// Parse and pack an OBJ mesh held in memory.
pub fn import_mesh_from_str(contents: &str) -> ImportResult<PackedMesh> {
    let mesh = obj::load_obj_from_str(contents)?;
    pack_mesh(&mesh)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const QUAD_NO_NORMALS: &str = "
        v 0 0 0
        v 1 0 0
        v 1 1 0
        v 0 1 0
        f 1 2 3 4
    ";

    fn positions(mesh: &PackedMesh) -> Vec<[f32; 3]> {
        mesh.vertices().iter().map(|v| v.position).collect()
    }

    #[test]
    fn record_layout_is_24_bytes() {
        assert_eq!(MeshVertex::STRIDE, 24);
        assert_eq!(MeshVertex::NORMAL_OFFSET, 12);
        assert_eq!(MeshVertex::FLOATS * 4, MeshVertex::STRIDE as usize);
    }

    #[test]
    fn unit_quad_end_to_end() {
        let mesh = import_mesh_from_str(QUAD_NO_NORMALS).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(
            positions(&mesh),
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ]
        );
        assert!(mesh.vertices().iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert_eq!(
            &mesh.as_floats()[..12],
            &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn triangle_faces_emit_three_vertices_each() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 1 3 4\nf 2 3 4\n";
        let mesh = import_mesh_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 9);
    }

    #[test]
    fn quad_faces_emit_six_vertices_each() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 4 3 2 1\n";
        let mesh = import_mesh_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 12);
    }

    #[test]
    fn mixed_faces_emit_three_t_plus_six_q() {
        let src = "
            v 0 0 0
            v 1 0 0
            v 1 1 0
            v 0 1 0
            f 1 2 3
            f 1 2 3 4
            f 2 3 4
            f 1 2 3 4
            f 1 3 4
        ";
        let parsed = obj::load_obj_from_str(src).unwrap();
        assert_eq!(packed_vertex_count(&parsed), 3 * 3 + 6 * 2);
        assert_eq!(pack_mesh(&parsed).unwrap().vertex_count(), 21);
    }

    #[test]
    fn unsupported_arity_is_skipped_without_disturbing_neighbours() {
        let src = "
            v 0 0 0
            v 1 0 0
            v 1 1 0
            v 0 1 0
            v 0 2 0
            f 1 2 3
            f 1 2 3 4 5
            f
            f 1 2
            f 2 3 4
        ";
        let mesh = import_mesh_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(
            positions(&mesh),
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ]
        );
    }

    #[test]
    fn declared_normals_follow_their_corners() {
        let src = "
            v 0 0 0
            v 1 0 0
            v 1 1 0
            v 0 1 0
            vn 0 0 1
            vn 1 0 0
            vn 0 -1 0
            vn 0.5 0.5 0
            f 1//1 2//2 3//3 4//4
        ";
        let mesh = import_mesh_from_str(src).unwrap();
        let normals: Vec<[f32; 3]> = mesh.vertices().iter().map(|v| v.normal).collect();
        assert_eq!(
            normals,
            vec![
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, -1.0, 0.0],
                [0.5, 0.5, 0.0],
            ]
        );
    }

    #[test]
    fn normal_gate_is_global() {
        // One declared normal opens the gate for the whole mesh; corners
        // without a normal index get +Z, not the up fallback.
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nf 1//1 2//1 3//1\nf 1 2 3\n";
        let mesh = import_mesh_from_str(src).unwrap();
        let normals: Vec<[f32; 3]> = mesh.vertices().iter().map(|v| v.normal).collect();
        assert_eq!(&normals[..3], &[[1.0, 0.0, 0.0]; 3]);
        assert_eq!(&normals[3..], &[[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn corners_without_normal_index_face_positive_z() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nf 1 2 3\n";
        let mesh = import_mesh_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.vertices().iter().all(|v| v.normal == MISSING_NORMAL));
        assert_eq!(MISSING_NORMAL, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn no_normals_means_up_everywhere() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 5 5 5\nf 1 2 3\nf 1 2 3 4\n";
        let mesh = import_mesh_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 9);
        assert!(mesh.vertices().iter().all(|v| v.normal == DEFAULT_NORMAL));
    }

    #[test]
    fn only_unsupported_faces_yield_empty_mesh() {
        let mesh = import_mesh_from_str("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn importing_twice_is_byte_identical() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\nf 1//1 3//1 4//1\n"
        )
        .unwrap();
        file.flush().unwrap();

        let first = import_mesh(file.path()).unwrap();
        let second = import_mesh(file.path()).unwrap();
        assert_eq!(first.vertex_count(), 9);
        assert_eq!(first.vertex_count(), second.vertex_count());
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn missing_file_fails_import() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_mesh(dir.path().join("missing.obj")).unwrap_err();
        assert!(matches!(err, ImportError::Open { .. }));
    }

    #[test]
    fn reader_import_matches_str_import() {
        let from_reader = import_mesh_from_reader(std::io::Cursor::new(QUAD_NO_NORMALS)).unwrap();
        let from_str = import_mesh_from_str(QUAD_NO_NORMALS).unwrap();
        assert_eq!(from_reader, from_str);
    }
}
