use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit};
use crate::error::Error;
use crate::frame::{FrameDriver, Scene, TickOutcome};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "primer".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
///
/// Opens one window, initializes the scene's resources against its surface and
/// ticks the scene on every redraw until the window closes or a fatal error occurs.
pub struct Runtime;

impl Runtime {
    pub fn run<S>(config: RuntimeConfig, gpu_init: GpuInit, scene: S) -> Result<()>
    where
        S: Scene + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<S: Scene> {
    config: RuntimeConfig,
    gpu_init: GpuInit,

    /// Moved into the driver once the window exists.
    scene: Option<S>,
    driver: Option<FrameDriver<S>>,
    window: Option<WindowEntry>,

    failure: Option<anyhow::Error>,
}

impl<S: Scene> AppState<S> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, scene: S) -> Self {
        Self {
            config,
            gpu_init,
            scene: Some(scene),
            driver: None,
            window: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }

    /// Creates the window and its GPU, then initializes every scene resource.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let scene = self.scene.take().context("scene already started")?;
        let driver = entry
            .with_gpu(|gpu| FrameDriver::new(gpu.context(), scene))
            .context("scene initialization failed")?;

        entry.with_window(|w| w.request_redraw());
        self.driver = Some(driver);
        self.window = Some(entry);
        Ok(())
    }
}

impl<S: Scene> ApplicationHandler for AppState<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(entry), Some(driver)) = (self.window.as_mut(), self.driver.as_mut()) else {
            return;
        };
        let mut fatal = None;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| driver.resize(gpu, new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| driver.resize(gpu, new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                let outcome = entry.with_mut(|fields| {
                    fields.window.pre_present_notify();
                    driver.tick(fields.gpu)
                });

                match outcome {
                    Ok(TickOutcome::Presented(_)) | Ok(TickOutcome::Skipped) => {}
                    Err(err @ Error::Surface(_)) => fatal = Some(err),
                    // The tick is abandoned; the next one starts from a fresh frame state.
                    Err(err) => log::error!("frame abandoned: {err}"),
                }

                // Schedule the next tick unconditionally.
                entry.with_window(|w| w.request_redraw());
            }

            _ => {}
        }

        if let Some(err) = fatal {
            self.fail(event_loop, anyhow::Error::new(err).context("surface acquisition failed"));
        }
    }
}
