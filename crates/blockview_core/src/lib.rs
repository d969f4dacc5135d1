//! Blockview Core - canonical block models and the CPU side of the preview.
//!
//! This crate provides:
//!
//! - **Model types**: `Model`, `Element`, `Face`, decoded straight from model JSON
//! - **Texture resolution**: `namespace:path` references to fetchable URIs
//! - **Geometry**: indexed vertex buffers with per-face texture assignments
//!
//! # Example
//!
//! ```ignore
//! use blockview_core::{build, resolve_model};
//!
//! let resolved = resolve_model(&model, "/path/to/resources");
//! let mesh = build(&resolved.model)?;
//! println!("{} vertices, {} faces", mesh.vertices.len(), mesh.faces.len());
//! ```

pub mod geometry;
pub mod model;
pub mod texture;

// Re-export commonly used types
pub use geometry::{
    build, FaceAssignment, GeometryError, GeometryResult, ModelMesh, UvRect, Vertex, MAX_VERTICES,
};
pub use model::{
    Axis, Element, Face, FaceDir, Faces, Model, ModelError, ModelResult, Rotation, UV_PIXEL_SCALE,
};
pub use texture::{
    resolve, resolve_model, Resolution, ResolvedModel, ResolvedTexture, TextureRef,
    DEFAULT_NAMESPACE,
};
