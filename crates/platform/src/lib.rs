//! Platform layer: window, input and the per-frame loop.
//!
//! - Window is created in `resumed` at a fixed size with the cursor grabbed.
//! - Raw mouse motion feeds the camera; six keys drive movement.
//! - Every frame: dt, camera update, render, request the next redraw.

pub mod input;

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Result;
use corelib::camera::CameraState;
use renderer::{GpuOptions, GpuState};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::input::KeyState;

/// Startup configuration for the viewer.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub model_path: PathBuf,
    pub texture_path: PathBuf,
    /// Camera speed in world units per second.
    pub speed: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 800,
            height: 600,
            show_fps: false,
            model_path: PathBuf::from("assets/model.obj"),
            texture_path: PathBuf::from("assets/model.png"),
            speed: 25.0,
        }
    }
}

struct Viewer {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    camera: CameraState,
    keys: KeyState,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let camera = CameraState::default().with_speed(config.speed);
        Self {
            config,
            window: None,
            gpu: None,
            camera,
            keys: KeyState::default(),
            last_frame: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Engine")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attrs)?);

        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );
        grab_cursor(&window);

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            GpuOptions {
                backends: self.config.backends,
                model_path: &self.config.model_path,
                texture_path: &self.config.texture_path,
            },
        ))?;

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.config.show_fps && dt > 0.0 {
            if let Some(window) = &self.window {
                window.set_title(&format!("FPS: {:.2}", 1.0 / dt));
            }
        }

        self.camera.apply_mouse();
        self.camera.integrate(self.keys.movement(), dt);

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match gpu.render(&self.camera) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Reconfiguring.");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory. Exiting.");
                event_loop.exit();
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.release_model();
        }
        if let Some(window) = &self.window {
            warn_on_cursor_error(
                "Cursor release failed",
                window.set_cursor_grab(CursorGrabMode::None),
            );
            window.set_cursor_visible(true);
        }
        event_loop.exit();
    }
}

/// Hide the cursor and lock it to the window; not every platform supports
/// `Locked`, so fall back to `Confined`.
fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    warn_on_cursor_error("Cursor grab unavailable", grabbed);
    window.set_cursor_visible(false);
}

/// Cursor grab changes are best-effort: failures are logged, never fatal.
/// Returns whether the change took effect.
fn warn_on_cursor_error<E: std::fmt::Display>(what: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{what}: {e}");
            false
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("Initialization failed: {e:#}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape && state == ElementState::Pressed {
                    self.shutdown(event_loop);
                    return;
                }
                self.keys.set(key, state == ElementState::Pressed);
            }
            WindowEvent::Focused(false) => self.keys.clear(),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.camera.push_mouse_delta(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the window and run the render loop until it is closed.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    log::info!(
        "Starting viewer. Backend: {:?}, show_fps={}, window_size={}x{}, model={}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.model_path.display()
    );

    let mut viewer = Viewer::new(config);
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match viewer.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_errors_are_reported_not_swallowed() {
        assert!(warn_on_cursor_error::<std::io::Error>("Cursor release failed", Ok(())));
        let unsupported = std::io::Error::new(std::io::ErrorKind::Unsupported, "no grab");
        assert!(!warn_on_cursor_error("Cursor release failed", Err(unsupported)));
    }

    #[test]
    fn default_config_matches_window_size() {
        let config = ViewerConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.model_path, PathBuf::from("assets/model.obj"));
    }
}
