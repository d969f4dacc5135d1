//! Render session: one visible preview and its GPU resources.
//!
//! ```text
//! Uninitialized --setup--> Ready --render--> Rendering --> Ready ... --dispose--> Disposed
//! ```
//!
//! Every `RenderModel` replaces the session's buffers and issues a single
//! indexed draw covering the whole index buffer. After `dispose` nothing
//! is drawn again.

use blockview_bridge::RenderMessage;
use blockview_core::{build, GeometryError, Model, ModelMesh};
use blockview_math::OrbitCamera;
use thiserror::Error;

use crate::atlas::{TextureAtlas, TextureError, TextureSource};
use crate::shader::CompileError;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("render session is not set up")]
    NotReady,

    #[error("render session has been disposed")]
    Disposed,

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to acquire frame: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// GPU operations a session drives. The session owns all sequencing.
pub trait RenderBackend {
    /// Acquire the context and configure state: pipeline, depth test,
    /// clear color, viewport.
    fn setup(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Resize the target and viewport.
    fn resize(&mut self, width: u32, height: u32);

    /// Replace the bound vertex/index buffers and atlas texture.
    fn upload(&mut self, mesh: &ModelMesh, atlas: &TextureAtlas) -> RenderResult<()>;

    /// Clear and draw the bound buffers. Returns the draw calls issued.
    fn draw(&mut self, camera: &OrbitCamera) -> RenderResult<u32>;

    /// Release every GPU resource.
    fn release(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Rendering,
    Disposed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Models uploaded and drawn.
    pub renders: u64,
    pub draw_calls: u64,
    pub vertices: usize,
    pub indices: usize,
}

pub struct RenderSession<B: RenderBackend, T: TextureSource> {
    backend: B,
    textures: T,
    state: SessionState,
    camera: OrbitCamera,
    size: (u32, u32),
    stats: SessionStats,
}

impl<B: RenderBackend, T: TextureSource> RenderSession<B, T> {
    pub fn new(backend: B, textures: T, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            backend,
            textures,
            state: SessionState::Uninitialized,
            camera: OrbitCamera::new(aspect),
            size: (width, height),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One-time GPU setup. A compile or link failure leaves the session
    /// uninitialized and is returned to the caller.
    pub fn setup(&mut self) -> RenderResult<()> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Disposed => return Err(RenderError::Disposed),
            SessionState::Ready | SessionState::Rendering => return Ok(()),
        }

        if let Err(e) = self.backend.setup(self.size.0, self.size.1) {
            log::error!("Render session setup failed: {}", e);
            return Err(e);
        }
        self.state = SessionState::Ready;
        log::info!("Render session ready ({}x{})", self.size.0, self.size.1);
        Ok(())
    }

    /// Upload `model` (replacing the previous one) and draw it.
    ///
    /// On failure the previous buffers stay bound and the session returns
    /// to `Ready`.
    pub fn render(&mut self, model: &Model) -> RenderResult<()> {
        self.expect_ready()?;

        self.state = SessionState::Rendering;
        let result = self.upload_and_draw(model);
        self.state = SessionState::Ready;

        if let Err(e) = &result {
            log::error!("Render failed: {}", e);
        }
        result
    }

    /// Entry point for messages arriving over the bridge.
    pub fn handle_message(&mut self, message: RenderMessage) -> RenderResult<()> {
        match message {
            RenderMessage::RenderModel { model } => self.render(&model),
            other => {
                log::warn!("Ignoring unsupported render message: {:?}", other);
                Ok(())
            }
        }
    }

    /// Draw the current buffers again, e.g. after a camera move.
    pub fn redraw(&mut self) -> RenderResult<()> {
        self.expect_ready()?;
        self.draw()
    }

    /// Track the canvas size. Zero-sized updates are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.state == SessionState::Disposed {
            return;
        }
        self.size = (width, height);
        self.camera.set_aspect(width as f32 / height as f32);
        if self.state != SessionState::Uninitialized {
            self.backend.resize(width, height);
        }
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.camera.orbit(delta_yaw, delta_pitch);
    }

    pub fn dolly(&mut self, amount: f32) {
        self.camera.dolly(amount);
    }

    /// Release GPU resources. Calling it again has no further effect.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        if self.state != SessionState::Uninitialized {
            self.backend.release();
        }
        self.state = SessionState::Disposed;
        log::info!("Render session disposed");
    }

    fn expect_ready(&self) -> RenderResult<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Disposed => Err(RenderError::Disposed),
            SessionState::Uninitialized | SessionState::Rendering => Err(RenderError::NotReady),
        }
    }

    fn upload_and_draw(&mut self, model: &Model) -> RenderResult<()> {
        let mut mesh = build(model)?;
        let atlas = TextureAtlas::build(mesh.textures(), &mut self.textures)?;
        mesh.remap_face_uvs(|texture| atlas.rect(texture));

        self.backend.upload(&mesh, &atlas)?;
        self.camera.frame(&mesh.bounds);

        self.stats.renders += 1;
        self.stats.vertices = mesh.vertices.len();
        self.stats.indices = mesh.indices.len();
        log::debug!(
            "Uploaded {} vertices, {} indices, {} textures",
            mesh.vertices.len(),
            mesh.indices.len(),
            atlas.texture_count()
        );

        self.draw()
    }

    fn draw(&mut self) -> RenderResult<()> {
        let calls = self.backend.draw(&self.camera)?;
        self.stats.draw_calls += calls as u64;
        Ok(())
    }
}
