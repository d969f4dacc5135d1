//! Blockview Host - the controller side of the model preview.
//!
//! Owns everything that happens before a model reaches the render surface:
//! asking the backend for canonical models, discarding superseded answers,
//! resolving texture references, and tracking one preview per panel.

pub mod backend;
pub mod config;
pub mod controller;
pub mod registry;

pub use backend::{
    BackendError, BackendResponse, BackendResult, CanonicalModelParams, CanonicalModelResponse,
    FileBackend, ModelBackend, RequestId,
};
pub use config::{ConfigError, ConfigOverrides, ConfigResult, PreviewConfig, WindowConfig};
pub use controller::{PreviewController, PreviewSession, PreviewStatus};
pub use registry::{PanelId, SessionRegistry};
