//! Renderer: wgpu init + depth + one lit, textured model.
//! wgpu = 26.x, winit = 0.30.x

pub mod model;
pub mod texture;

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use asset::texture::TextureData;
use bytemuck::{Pod, Zeroable};
use corelib::camera::{CameraState, Projection};
use glam::{Mat4, Vec3};
use wgpu::{
    BindGroup, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, Buffer,
    BufferBindingType, BufferUsages, ColorTargetState, ColorWrites, CommandEncoderDescriptor,
    DepthBiasState, DepthStencilState, Device, DeviceDescriptor, Extent3d, Features,
    FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use model::RenderModel;

/// Per-frame uniforms (16-byte aligned): matrices, light and eye position.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
    pub view_pos: [f32; 4],
}

impl SceneUniform {
    pub fn new(model: Mat4, camera: &CameraState, projection: &Projection, light: Vec3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            projection: projection.matrix().to_cols_array_2d(),
            light_pos: light.extend(1.0).to_array(),
            view_pos: camera.position.extend(1.0).to_array(),
        }
    }
}

pub const LIGHT_POSITION: Vec3 = Vec3::new(2.0, 2.0, 2.0);

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Everything the render loop needs to know at startup.
#[derive(Clone, Copy, Debug)]
pub struct GpuOptions<'a> {
    pub backends: wgpu::Backends,
    pub model_path: &'a Path,
    pub texture_path: &'a Path,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    model: RenderModel,
    model_matrix: Mat4,

    // Uniforms
    scene_bg: BindGroup,
    scene_buf: Buffer,
    diffuse_bg: BindGroup,
    projection: Projection,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, import the model and upload
    /// the diffuse texture.
    pub async fn new(window: Arc<Window>, options: GpuOptions<'_>) -> anyhow::Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Model WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
        });

        // ==== Scene uniforms ====
        let scene_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64),
                },
                count: None,
            }],
        });

        let projection = Projection::default().with_aspect(width as f32 / height as f32);
        let model_matrix = Mat4::IDENTITY;
        let scene_init = SceneUniform::new(
            model_matrix,
            &CameraState::default(),
            &projection,
            LIGHT_POSITION,
        );
        let scene_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene UBO"),
            contents: bytemuck::bytes_of(&scene_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let scene_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene BG"),
            layout: &scene_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buf.as_entire_binding(),
            }],
        });

        // ==== Diffuse texture ====
        let diffuse_bgl = texture::diffuse_bind_group_layout(&device);
        let diffuse = TextureData::load_or_checkerboard(options.texture_path);
        let diffuse_bg =
            texture::create_diffuse_bind_group(&device, &queue, &diffuse_bgl, &diffuse);

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Model PipelineLayout"),
            bind_group_layouts: &[&scene_bgl, &diffuse_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[RenderModel::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Winding is whatever the file says, so nothing is culled.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ==== Geometry ====
        let model = RenderModel::import(&device, options.model_path);
        if !model.is_drawable() {
            log::warn!("Model has no vertices; frames will only be cleared");
        }

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            model,
            model_matrix,
            scene_bg,
            scene_buf,
            diffuse_bg,
            projection,
            depth_view,
            width,
            height,
        })
    }

    #[inline]
    pub fn model(&self) -> &RenderModel {
        &self.model
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        self.projection = self
            .projection
            .with_aspect(self.width as f32 / self.height as f32);
    }

    /// Render one frame: upload uniforms, clear, draw the model.
    pub fn render(&mut self, camera: &CameraState) -> Result<(), SurfaceError> {
        let scene = SceneUniform::new(self.model_matrix, camera, &self.projection, LIGHT_POSITION);
        self.queue
            .write_buffer(&self.scene_buf, 0, bytemuck::bytes_of(&scene));

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if self.model.is_drawable() {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.scene_bg, &[]);
                rpass.set_bind_group(1, &self.diffuse_bg, &[]);
                self.model.draw(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Explicit teardown of the model's GPU buffer.
    pub fn release_model(&mut self) {
        std::mem::take(&mut self.model).release();
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_uniform_is_16_byte_aligned() {
        let size = std::mem::size_of::<SceneUniform>();
        assert_eq!(size, 3 * 64 + 2 * 16);
        assert_eq!(size % 16, 0);
    }

    #[test]
    fn scene_uniform_carries_light_and_eye() {
        let camera = CameraState::new(Vec3::new(1.0, 2.0, 3.0), -90.0, 0.0);
        let u = SceneUniform::new(
            Mat4::IDENTITY,
            &camera,
            &Projection::default(),
            LIGHT_POSITION,
        );
        assert_eq!(u.light_pos, [2.0, 2.0, 2.0, 1.0]);
        assert_eq!(u.view_pos, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.model, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn bundled_model_is_framed_by_default_camera() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/model.obj");
        let mesh = asset::import_mesh(path).expect("bundled model imports");
        assert!(!mesh.is_empty());

        let pv = Projection::default().matrix() * CameraState::default().view();
        for v in mesh.vertices() {
            let clip = pv * Vec3::from(v.position).extend(1.0);
            assert!(clip.w > 0.0, "{:?} is behind the camera", v.position);
            let ndc = clip.truncate() / clip.w;
            assert!(
                ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&ndc.z),
                "{:?} projects outside the view: {ndc:?}",
                v.position
            );
        }
    }

    #[test]
    fn zero_normals_only_receive_ambient() {
        let src = include_str!("shaders/model.wgsl");
        assert!(src.contains("let lit = n_len > 1e-6;"));
        assert!(src.contains("select(0.0, diffuse + specular, lit)"));
        assert!(src.contains("(ambient + direct) * base"));
    }
}
