//! Application state and event loop

use anyhow::{Context, Result};
use std::sync::Arc;
use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::AppConfig;
use crate::input::{InputBus, InputEvent, Viewport};
use crate::render::{FrameStatus, Renderer};
use crate::scene::Scene;

/// Main application state
pub struct App {
    window: Arc<Window>,
    renderer: Renderer,
    scene: Scene,
    bus: InputBus,
    config: AppConfig,

    // Timing
    started: Instant,
    frame_count: u64,
    skipped_frames: u64,
    stats_time: Instant,
}

impl App {
    /// Create the window, mount the scene and set up the renderer.
    pub async fn new(config: AppConfig) -> Result<(Self, EventLoop<()>)> {
        // Create event loop
        let event_loop = EventLoop::new()?;

        // Create window
        let window_attrs = WindowAttributes::default()
            .with_title(config.window.title.clone())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_transparent(config.scene.background_transparent);

        #[cfg(target_arch = "wasm32")]
        let window_attrs = {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id("canvas"))
                .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
                .context("page has no <canvas id=\"canvas\">")?;
            window_attrs.with_canvas(Some(canvas))
        };

        #[allow(deprecated)]
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();

        let bus = InputBus::new();
        let started = Instant::now();
        let scene = Scene::mount(
            &bus,
            Viewport::new(size.width, size.height),
            &config.settings(),
            started.elapsed(),
        )
        .context("Failed to build rig")?;

        // Create renderer
        let renderer = Renderer::new(window.clone(), &scene).await?;

        Ok((
            Self {
                window,
                renderer,
                scene,
                bus,
                config,
                started,
                frame_count: 0,
                skipped_frames: 0,
                stats_time: Instant::now(),
            },
            event_loop,
        ))
    }

    /// Run the event loop
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run(event_loop: EventLoop<()>, mut app: Self) -> Result<()> {
        event_loop.run_app(&mut app)?;
        Ok(())
    }

    /// Hand the app to the browser's event loop and return immediately
    #[cfg(target_arch = "wasm32")]
    pub fn run(event_loop: EventLoop<()>, app: Self) -> Result<()> {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.scene.teardown();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.scene.frame(self.started.elapsed());

        match self.renderer.render(&self.scene) {
            Ok(FrameStatus::Presented) => self.frame_count += 1,
            Ok(FrameStatus::Skipped) => self.skipped_frames += 1,
            Err(e) => {
                log::error!("Render error: {:#}", e);
                self.shutdown(event_loop);
                return;
            }
        }

        let interval = self.config.debug.stats_interval_frames;
        if interval > 0 && self.frame_count > 0 && self.frame_count % interval == 0 {
            let elapsed = self.stats_time.elapsed().as_secs_f32();
            log::info!(
                "Frame {}: {:.1} fps, pointer=({:.2}, {:.2}), blinks={}, skipped={}",
                self.frame_count,
                interval as f32 / elapsed.max(f32::EPSILON),
                self.scene.pointer().x,
                self.scene.pointer().y,
                self.scene.blink_count(),
                self.skipped_frames
            );
            self.stats_time = Instant::now();
        }

        self.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(size.width, size.height);
                self.bus.publish(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.bus.publish(InputEvent::PointerMoved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.bus.publish(InputEvent::PointerButton {
                    pressed: state == ElementState::Pressed,
                });
            }
            WindowEvent::CursorLeft { .. } => {
                // A drag cannot continue outside the window
                self.bus
                    .publish(InputEvent::PointerButton { pressed: false });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.bus.publish(InputEvent::Wheel { delta: scroll });
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.shutdown(event_loop);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!(
            "Exiting after {} frames ({} skipped)",
            self.frame_count,
            self.skipped_frames
        );
    }
}
