//! GPU-resident model: one static vertex buffer drawn as an unindexed
//! triangle list.

use std::path::Path;

use asset::{MeshVertex, PackedMesh};
use wgpu::{
    Buffer, BufferUsages, Device, RenderPass, VertexAttribute, VertexBufferLayout, VertexFormat,
    VertexStepMode, util::DeviceExt,
};

/// Attribute 0 = position, attribute 1 = normal; both Float32x3.
const ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: MeshVertex::POSITION_OFFSET,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: MeshVertex::NORMAL_OFFSET,
        shader_location: 1,
    },
];

/// Vertex buffer + vertex count. A zero count means there is nothing to draw
/// and no GPU buffer exists.
#[derive(Debug)]
pub struct RenderModel {
    buffer: Option<Buffer>,
    vertex_count: u32,
}

impl RenderModel {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: MeshVertex::STRIDE,
        step_mode: VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    };

    pub fn empty() -> Self {
        Self {
            buffer: None,
            vertex_count: 0,
        }
    }

    /// Upload a packed mesh. Content is never rewritten, so the buffer only
    /// carries `VERTEX` usage.
    pub fn from_packed(device: &Device, label: &str, mesh: &PackedMesh) -> Self {
        if mesh.is_empty() {
            return Self::empty();
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: mesh.as_bytes(),
            usage: BufferUsages::VERTEX,
        });
        Self {
            buffer: Some(buffer),
            vertex_count: mesh.vertex_count(),
        }
    }

    /// Import an OBJ file and upload it. Never fails: errors are logged and
    /// yield an empty model.
    pub fn import(device: &Device, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match asset::import_mesh(path) {
            Ok(mesh) => {
                let model = Self::from_packed(device, "Model VB", &mesh);
                log::info!(
                    "Loaded model: {} ({} vertices)",
                    path.display(),
                    model.vertex_count
                );
                model
            }
            Err(e) => {
                log::error!("Model load failed for {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn is_drawable(&self) -> bool {
        self.buffer.is_some() && self.vertex_count > 0
    }

    /// Bind the vertex buffer to slot 0 and draw every vertex once.
    pub fn draw(&self, rpass: &mut RenderPass<'_>) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        if self.vertex_count == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, buffer.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }

    /// Destroy the GPU buffer now instead of waiting for drop.
    pub fn release(mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
            log::debug!("Released model buffer ({} vertices)", self.vertex_count);
        }
        self.vertex_count = 0;
    }
}

impl Default for RenderModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for RenderModel {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
    }
}
