//! Canonical block model description.
//!
//! These are the structures the analysis backend produces and the bridge
//! carries to the render surface. Field names follow the model JSON format
//! (`from`, `to`, `faces`, `uv`, ...) so values decode directly with serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors found while validating a decoded model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("element {element}: non-finite value in `{field}`")]
    NonFinite { element: usize, field: &'static str },
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Texels per block edge. Model files give face UVs in these units.
pub const UV_PIXEL_SCALE: f32 = 16.0;

/// A block/item model: an ordered list of cuboid elements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub elements: Vec<Element>,

    /// Texture variables (`"all": "block/stone"`) referenced from faces as `#all`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub textures: BTreeMap<String, String>,
}

impl Model {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            textures: BTreeMap::new(),
        }
    }

    /// Number of faces across all elements.
    pub fn face_count(&self) -> usize {
        self.elements.iter().map(|e| e.faces.len()).sum()
    }

    /// Convert face UVs from model-file pixel units (0..16) to the
    /// normalized texture space carried over the bridge.
    pub fn normalize_pixel_uvs(&mut self) {
        for element in &mut self.elements {
            element.faces.retain(|_, face| {
                if let Some(uv) = &mut face.uv {
                    uv.iter_mut().for_each(|v| *v /= UV_PIXEL_SCALE);
                }
                true
            });
        }
    }

    /// Reject values that cannot be turned into geometry.
    pub fn validate(&self) -> ModelResult<()> {
        for (index, element) in self.elements.iter().enumerate() {
            element.validate(index)?;
        }
        Ok(())
    }
}

/// One cuboid of a model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub from: [f32; 3],
    pub to: [f32; 3],

    #[serde(default)]
    pub faces: Faces,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
}

impl Element {
    pub fn new(from: [f32; 3], to: [f32; 3]) -> Self {
        Self {
            from,
            to,
            faces: Faces::default(),
            rotation: None,
        }
    }

    /// Builder-style helper used by tests and the backend.
    pub fn with_face(mut self, dir: FaceDir, face: Face) -> Self {
        *self.faces.get_mut(dir) = Some(face);
        self
    }

    fn validate(&self, element: usize) -> ModelResult<()> {
        let finite = |values: &[f32]| values.iter().all(|v| v.is_finite());

        if !finite(&self.from) {
            return Err(ModelError::NonFinite { element, field: "from" });
        }
        if !finite(&self.to) {
            return Err(ModelError::NonFinite { element, field: "to" });
        }
        if let Some(rotation) = &self.rotation {
            if !finite(&rotation.origin) {
                return Err(ModelError::NonFinite { element, field: "rotation.origin" });
            }
            if !rotation.angle.is_finite() {
                return Err(ModelError::NonFinite { element, field: "rotation.angle" });
            }
        }
        for (_, face) in self.faces.iter() {
            if let Some(uv) = &face.uv {
                if !finite(uv) {
                    return Err(ModelError::NonFinite { element, field: "faces.uv" });
                }
            }
        }
        Ok(())
    }
}

/// The six face directions, in the fixed enumeration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceDir {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl FaceDir {
    /// Iteration order for every pass over an element's faces.
    pub const ALL: [FaceDir; 6] = [
        FaceDir::Up,
        FaceDir::Down,
        FaceDir::North,
        FaceDir::South,
        FaceDir::East,
        FaceDir::West,
    ];

    /// Key used in the model JSON.
    pub fn key(self) -> &'static str {
        match self {
            FaceDir::Up => "up",
            FaceDir::Down => "down",
            FaceDir::North => "north",
            FaceDir::South => "south",
            FaceDir::East => "east",
            FaceDir::West => "west",
        }
    }

    /// Outward unit normal. North is -Z, east is +X.
    pub fn normal(self) -> [f32; 3] {
        match self {
            FaceDir::Up => [0.0, 1.0, 0.0],
            FaceDir::Down => [0.0, -1.0, 0.0],
            FaceDir::North => [0.0, 0.0, -1.0],
            FaceDir::South => [0.0, 0.0, 1.0],
            FaceDir::East => [1.0, 0.0, 0.0],
            FaceDir::West => [-1.0, 0.0, 0.0],
        }
    }
}

impl std::fmt::Display for FaceDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Face slots of an element. An absent slot is not rendered.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Faces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north: Option<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south: Option<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub east: Option<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub west: Option<Face>,
}

impl Faces {
    pub fn get(&self, dir: FaceDir) -> Option<&Face> {
        match dir {
            FaceDir::Up => self.up.as_ref(),
            FaceDir::Down => self.down.as_ref(),
            FaceDir::North => self.north.as_ref(),
            FaceDir::South => self.south.as_ref(),
            FaceDir::East => self.east.as_ref(),
            FaceDir::West => self.west.as_ref(),
        }
    }

    pub fn get_mut(&mut self, dir: FaceDir) -> &mut Option<Face> {
        match dir {
            FaceDir::Up => &mut self.up,
            FaceDir::Down => &mut self.down,
            FaceDir::North => &mut self.north,
            FaceDir::South => &mut self.south,
            FaceDir::East => &mut self.east,
            FaceDir::West => &mut self.west,
        }
    }

    /// Present faces in `FaceDir::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (FaceDir, &Face)> + '_ {
        FaceDir::ALL
            .into_iter()
            .filter_map(move |dir| self.get(dir).map(|face| (dir, face)))
    }

    /// Keep only the faces for which `keep` returns true. `keep` may rewrite the face.
    pub fn retain(&mut self, mut keep: impl FnMut(FaceDir, &mut Face) -> bool) {
        for dir in FaceDir::ALL {
            let slot = self.get_mut(dir);
            let kept = match slot.as_mut() {
                Some(face) => keep(dir, face),
                None => continue,
            };
            if !kept {
                *slot = None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A textured face. `uv` is `[u0, v0, u1, v1]` in normalized texture space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub texture: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<[f32; 4]>,
}

impl Face {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            uv: None,
        }
    }

    pub fn with_uv(mut self, uv: [f32; 4]) -> Self {
        self.uv = Some(uv);
        self
    }

    /// UV rectangle, defaulting to the whole texture.
    pub fn uv_or_default(&self) -> [f32; 4] {
        self.uv.unwrap_or([0.0, 0.0, 1.0, 1.0])
    }
}

/// Rotation axis of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Element rotation around `origin`, `angle` in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub origin: [f32; 3],
    pub axis: Axis,
    pub angle: f32,

    #[serde(default)]
    pub rescale: bool,
}
