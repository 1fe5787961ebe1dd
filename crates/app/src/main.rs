//! Entry point: logging + CLI configuration, then hand off to the platform loop.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use platform::ViewerConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum GpuBackend {
    #[default]
    Auto,
    #[value(alias = "vk")]
    Vulkan,
    #[value(alias = "d3d12")]
    Dx12,
    #[value(alias = "mtl")]
    Metal,
    #[value(aliases = ["opengl", "gles"])]
    Gl,
}

impl GpuBackend {
    fn backends(self) -> wgpu::Backends {
        match self {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "objview", about = "Fly-through viewer for a single OBJ model")]
struct Cli {
    /// OBJ mesh to display
    #[arg(long, default_value = "assets/model.obj")]
    model: PathBuf,

    /// Diffuse texture (PNG/JPEG); a checkerboard is used if missing
    #[arg(long, default_value = "assets/model.png")]
    texture: PathBuf,

    /// Graphics backend
    #[arg(long, value_enum, default_value_t = GpuBackend::Auto)]
    gpu_backend: GpuBackend,

    /// Show frames per second in the window title
    #[arg(long)]
    show_fps: bool,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Camera speed in world units per second
    #[arg(long, default_value_t = 25.0)]
    speed: f32,
}

impl Cli {
    fn into_config(self) -> ViewerConfig {
        ViewerConfig {
            backends: self.gpu_backend.backends(),
            width: self.width.max(1),
            height: self.height.max(1),
            show_fps: self.show_fps,
            model_path: self.model,
            texture_path: self.texture,
            speed: self.speed,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();
    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_viewer_defaults() {
        let config = Cli::parse_from(["objview"]).into_config();
        let defaults = ViewerConfig::default();
        assert_eq!(config.width, defaults.width);
        assert_eq!(config.height, defaults.height);
        assert_eq!(config.model_path, defaults.model_path);
        assert_eq!(config.texture_path, defaults.texture_path);
        assert_eq!(config.speed, defaults.speed);
        assert_eq!(config.backends, wgpu::Backends::all());
        assert!(!config.show_fps);
    }

    #[test]
    fn backend_aliases_parse() {
        let cli = Cli::parse_from(["objview", "--gpu-backend", "vk", "--show-fps"]);
        assert_eq!(cli.gpu_backend, GpuBackend::Vulkan);
        assert!(cli.show_fps);
        assert_eq!(cli.into_config().backends, wgpu::Backends::VULKAN);
    }

    #[test]
    fn zero_size_is_clamped() {
        let config = Cli::parse_from(["objview", "--width", "0", "--height", "0"]).into_config();
        assert_eq!((config.width, config.height), (1, 1));
    }
}
