//! The model resolution backend seen from the controller.
//!
//! The backend answers `canonicalModel` requests keyed by document URI.
//! Requests may be slow and may complete in any order, so every request
//! carries an id and responses are polled rather than awaited.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use blockview_core::Model;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request method name.
pub const CANONICAL_MODEL: &str = "blockview/canonicalModel";

pub type RequestId = u64;

/// Errors reported by a backend for a single request.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no model known for {0}")]
    UnknownDocument(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("backend request failed: {0}")]
    Failed(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalModelParams {
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalModelResponse {
    pub model: Model,
}

/// A completed request.
#[derive(Debug)]
pub struct BackendResponse {
    pub id: RequestId,
    pub result: BackendResult<CanonicalModelResponse>,
}

/// A request/response model service.
pub trait ModelBackend {
    /// Start a request. Never blocks on the answer.
    fn request(&mut self, id: RequestId, params: CanonicalModelParams);

    /// Next finished request, in completion order.
    fn poll_response(&mut self) -> Option<BackendResponse>;
}

/// Backend that reads already-canonical model JSON from disk.
///
/// `file://` URIs and plain paths are both accepted. Unknown JSON keys
/// (such as `parent`) are ignored.
#[derive(Default)]
pub struct FileBackend {
    completed: VecDeque<BackendResponse>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(uri: &str) -> BackendResult<CanonicalModelResponse> {
        let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
        if !path.is_file() {
            return Err(BackendError::UnknownDocument(uri.to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|source| BackendError::Io {
            path: path.clone(),
            source,
        })?;
        let mut model: Model = serde_json::from_str(&text)?;
        model.normalize_pixel_uvs();
        Ok(CanonicalModelResponse { model })
    }
}

impl ModelBackend for FileBackend {
    fn request(&mut self, id: RequestId, params: CanonicalModelParams) {
        log::debug!("{} #{} {}", CANONICAL_MODEL, id, params.uri);
        let result = Self::load(&params.uri);
        self.completed.push_back(BackendResponse { id, result });
    }

    fn poll_response(&mut self) -> Option<BackendResponse> {
        self.completed.pop_front()
    }
}
