//! Texture reference resolution.
//!
//! Turns `namespace:path` references into URIs the render surface can fetch,
//! following the fixed `<root>/assets/<namespace>/textures/<path>.png`
//! resource convention. Resolution is a pure string transform; whether the
//! image exists is only discovered when the surface loads it.

use std::fmt;

use crate::model::Model;

/// Namespace used when a reference carries none.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Maximum `#variable` indirections followed before giving up.
pub const MAX_VARIABLE_DEPTH: usize = 16;

/// A parsed `namespace:path` reference borrowing from the raw string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRef<'a> {
    pub namespace: &'a str,
    pub path: &'a str,
}

impl<'a> TextureRef<'a> {
    /// Split at the first `:`. Returns `None` when either side is empty.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (namespace, path) = match raw.split_once(':') {
            Some((namespace, path)) => (namespace, path),
            None => (DEFAULT_NAMESPACE, raw),
        };
        if namespace.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self { namespace, path })
    }
}

impl fmt::Display for TextureRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// A reference mapped onto the resource root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTexture {
    pub namespace: String,
    pub path: String,
    pub uri: String,
}

/// Outcome of resolving one reference. `Dropped` is not an error: the
/// owning face is removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedTexture),
    Dropped,
}

/// Resolve `raw` against `root`.
pub fn resolve(raw: &str, root: &str) -> Resolution {
    match TextureRef::parse(raw) {
        Some(texture) => {
            let root = root.trim_end_matches('/');
            Resolution::Resolved(ResolvedTexture {
                namespace: texture.namespace.to_string(),
                path: texture.path.to_string(),
                uri: format!(
                    "{}/assets/{}/textures/{}.png",
                    root, texture.namespace, texture.path
                ),
            })
        }
        None => Resolution::Dropped,
    }
}

/// A model whose face textures are all resolved URIs.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedModel {
    pub model: Model,
    /// Faces removed because their reference could not be resolved.
    pub dropped: usize,
}

/// Resolve every face texture of `model`, dropping faces that do not resolve.
///
/// `#name` references are looked up in the model's texture variables first.
/// The returned model carries no variables.
pub fn resolve_model(model: &Model, root: &str) -> ResolvedModel {
    let mut resolved = model.clone();
    resolved.textures.clear();
    let mut dropped = 0;

    for (index, element) in resolved.elements.iter_mut().enumerate() {
        element.faces.retain(|dir, face| {
            let target = lookup_variable(model, &face.texture);
            match target.map(|raw| resolve(raw, root)) {
                Some(Resolution::Resolved(texture)) => {
                    face.texture = texture.uri;
                    true
                }
                _ => {
                    log::debug!(
                        "Dropping {} face of element {}: unresolvable texture {:?}",
                        dir,
                        index,
                        face.texture
                    );
                    dropped += 1;
                    false
                }
            }
        });
    }

    ResolvedModel { model: resolved, dropped }
}

/// Follow `#name` indirections. `None` for unknown, cyclic or too deep chains.
fn lookup_variable<'a>(model: &'a Model, raw: &'a str) -> Option<&'a str> {
    let mut current = raw;
    for _ in 0..=MAX_VARIABLE_DEPTH {
        match current.strip_prefix('#') {
            Some(name) => current = model.textures.get(name)?,
            None => return Some(current),
        }
    }
    None
}
