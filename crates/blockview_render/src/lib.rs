//! Blockview Render - the render surface of the model preview.
//!
//! Receives resolved models from the bridge, packs their textures into an
//! atlas, uploads the geometry and draws it with a single indexed draw call.
//!
//! - [`session`]: the per-preview state machine and the [`RenderBackend`] seam
//! - [`gpu`]: wgpu backend drawing into a winit window
//! - [`shader`]: per-stage shader compilation and the model pipeline
//! - [`atlas`]: texture fetching and packing

pub mod atlas;
pub mod gpu;
pub mod session;
pub mod shader;

pub use atlas::{
    FileTextureSource, TextureAtlas, TextureError, TextureImage, TextureResult, TextureSource,
};
pub use gpu::WgpuBackend;
pub use session::{
    RenderBackend, RenderError, RenderResult, RenderSession, SessionState, SessionStats,
};
pub use shader::{
    CompileError, CompileResult, ShaderProgram, ShaderStage, VertexLayout, MODEL_FRAGMENT_SHADER,
    MODEL_VERTEX_SHADER,
};
