mod cli;

use std::cell::RefCell;
use std::env;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use blockview_bridge::{channel, SurfaceBridge};
use blockview_host::{FileBackend, PanelId, PreviewConfig, PreviewController};
use blockview_render::{FileTextureSource, RenderError, RenderSession, SessionState, WgpuBackend};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use cli::CliOverrides;

/// The viewer hosts a single preview panel.
const PANEL: PanelId = PanelId(1);

const ORBIT_SENSITIVITY: f32 = 0.005;

type Session = RenderSession<WgpuBackend, FileTextureSource>;

/// Application state
struct App {
    config: PreviewConfig,
    /// Workspace documents, as URIs the backend understands.
    documents: Vec<String>,
    current_document: usize,
    controller: PreviewController<FileBackend>,

    window: Option<Arc<Window>>,
    session: Option<Rc<RefCell<Session>>>,
    surface: Option<SurfaceBridge>,

    // Input state
    left_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl App {
    fn new(config: PreviewConfig, workspace: &Path) -> Self {
        let documents = config
            .documents
            .iter()
            .map(|doc| workspace.join(doc).display().to_string())
            .collect();
        let resource_root = workspace.display().to_string();

        Self {
            config,
            documents,
            current_document: 0,
            controller: PreviewController::new(FileBackend::new(), resource_root),
            window: None,
            session: None,
            surface: None,
            left_mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    /// Create the window, the render surface and the panel's preview.
    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.as_str())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let [r, g, b, a] = self.config.clear_color;
        let size = window.inner_size();
        let backend = WgpuBackend::new(window.clone(), wgpu::Color { r, g, b, a });
        let session = Rc::new(RefCell::new(RenderSession::new(
            backend,
            FileTextureSource,
            size.width,
            size.height,
        )));

        let (host_port, surface_port) = channel();
        let mut surface = SurfaceBridge::new(surface_port);
        let handler_session = Rc::clone(&session);
        surface.on_message(move |message| {
            if let Err(e) = handler_session.borrow_mut().handle_message(message) {
                log::error!("Failed to render model: {}", e);
            }
        });

        let document = &self.documents[self.current_document];
        self.controller.open_preview(PANEL, move || host_port, document);

        // The surface announces itself only once its pipeline exists.
        let setup = session.borrow_mut().setup();
        match setup {
            Ok(()) => surface
                .signal_ready()
                .context("Failed to signal render surface ready")?,
            Err(e) => self.controller.surface_failed(PANEL, e.to_string()),
        }

        self.window = Some(window);
        self.session = Some(session);
        self.surface = Some(surface);
        Ok(())
    }

    /// Move messages across the bridge in both directions.
    fn pump(&mut self) {
        let sent = self.controller.pump();
        if let Some(surface) = &mut self.surface {
            surface.pump();
        }
        if sent > 0 {
            log::debug!("Sent {} model(s) to the render surface", sent);
        }
        self.update_title();
    }

    fn update_title(&self) {
        let (Some(window), Some(status)) = (&self.window, self.controller.status(PANEL)) else {
            return;
        };
        let document = self.controller.session(PANEL).and_then(|s| s.document()).unwrap_or("");
        let name = Path::new(document).file_name().and_then(|n| n.to_str()).unwrap_or(document);
        window.set_title(&format!("{} - {} ({})", self.config.window.title, name, status));
    }

    fn cycle_document(&mut self) {
        if self.documents.len() < 2 {
            return;
        }
        self.current_document = (self.current_document + 1) % self.documents.len();
        let document = &self.documents[self.current_document];
        log::info!("Switching to {}", document);
        self.controller.document_changed(PANEL, document);
    }

    fn redraw(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let mut session = session.borrow_mut();
        if session.state() != SessionState::Ready {
            return;
        }
        match session.redraw() {
            Ok(()) => {}
            Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                log::debug!("Frame timed out")
            }
            Err(e) => log::error!("Redraw failed: {}", e),
        }
    }

    fn close(&mut self) {
        if let Some(session) = &self.session {
            session.borrow_mut().dispose();
        }
        self.controller.close_panel(PANEL);
        self.surface = None;
        self.session = None;
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.open(event_loop) {
                log::error!("{:#}", e);
                event_loop.exit();
                return;
            }
            log::info!("Window and render surface initialized");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.close();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(session) = &self.session {
                    session.borrow_mut().resize(physical_size.width, physical_size.height);
                    log::info!("Resized to {}x{}", physical_size.width, physical_size.height);
                }
                self.request_redraw();
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.left_mouse_pressed = state == ElementState::Pressed;
                if !self.left_mouse_pressed {
                    self.last_mouse_pos = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.left_mouse_pressed {
                    if let (Some(last_pos), Some(session)) = (self.last_mouse_pos, &self.session) {
                        let delta_x = position.x - last_pos.0;
                        let delta_y = position.y - last_pos.1;
                        session.borrow_mut().orbit(
                            -delta_x as f32 * ORBIT_SENSITIVITY,
                            delta_y as f32 * ORBIT_SENSITIVITY,
                        );
                        self.request_redraw();
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(session) = &self.session {
                    let scroll_amount = match delta {
                        winit::event::MouseScrollDelta::LineDelta(_, y) => y * 0.25,
                        winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                    };
                    session.borrow_mut().dolly(-scroll_amount);
                    self.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Tab),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.cycle_document();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.pump();
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = CliOverrides::parse_from_env()?;
    let workspace = match &cli.workspace {
        Some(path) => path.clone(),
        None => env::current_dir().context("Failed to read current directory")?,
    };
    let mut config = match &cli.config {
        Some(path) => PreviewConfig::load(path)?,
        None => PreviewConfig::load_or_default(&workspace)?,
    };
    config.apply(&cli.config_overrides());

    if config.documents.is_empty() {
        bail!("No model to preview. Pass --model <file> or list documents in blockview.json.");
    }

    log::info!("Starting model preview in {}", workspace.display());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, &workspace);

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}
