//! Asset loading: OBJ meshes packed for unindexed drawing, diffuse textures.

pub mod error;
pub mod mesh;
pub mod obj;
pub mod texture;

pub use error::{ImportError, ImportResult};
pub use mesh::{MeshVertex, PackedMesh, import_mesh};
