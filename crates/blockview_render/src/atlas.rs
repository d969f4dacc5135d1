//! Texture fetching and atlas packing.
//!
//! A model may reference any number of textures but is drawn with a single
//! indexed draw call, so every texture is packed into one RGBA atlas and
//! face UVs are remapped into their texture's rectangle.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use blockview_core::UvRect;
use thiserror::Error;

/// Rows wrap once they would grow past this width.
pub const MAX_ROW_WIDTH: u32 = 2048;

/// Largest atlas side accepted (the default wgpu 2D texture limit).
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Errors that can occur while loading textures or packing the atlas.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to read texture {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: image::ImageError,
    },

    #[error("texture atlas would be {width}x{height}, larger than {MAX_ATLAS_SIZE}")]
    TooLarge { width: u32, height: u32 },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Decoded RGBA8 pixels, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self { width, height, rgba }
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self { width, height, rgba }
    }

    /// 16x16 magenta/black checker shown for textures that fail to load.
    pub fn placeholder() -> Self {
        const SIZE: u32 = 16;
        const MAGENTA: [u8; 4] = [255, 0, 255, 255];
        const BLACK: [u8; 4] = [0, 0, 0, 255];

        let mut rgba = Vec::with_capacity((SIZE * SIZE * 4) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let cell = (x / 8 + y / 8) % 2;
                rgba.extend_from_slice(if cell == 0 { &MAGENTA } else { &BLACK });
            }
        }
        Self::new(SIZE, SIZE, rgba)
    }

    /// RGBA bytes of one texel.
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = ((y * self.width + x) * 4) as usize;
        &self.rgba[start..start + 4]
    }
}

/// Where the render surface fetches resolved texture URIs from.
pub trait TextureSource {
    fn load(&mut self, uri: &str) -> TextureResult<TextureImage>;
}

/// Loads `file://` URIs and plain paths from disk.
#[derive(Default)]
pub struct FileTextureSource;

impl TextureSource for FileTextureSource {
    fn load(&mut self, uri: &str) -> TextureResult<TextureImage> {
        let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
        let bytes = fs::read(&path).map_err(|source| TextureError::Io {
            uri: uri.to_string(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| TextureError::Decode {
            uri: uri.to_string(),
            source,
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureImage::new(width, height, rgba.into_raw()))
    }
}

/// All textures of one model packed into a single image.
#[derive(Clone, Debug)]
pub struct TextureAtlas {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    rects: HashMap<String, UvRect>,
}

impl TextureAtlas {
    /// Fetch every URI and shelf-pack the images in the given order.
    /// Textures that fail to load are replaced by the placeholder.
    pub fn build<'a>(
        uris: impl IntoIterator<Item = &'a str>,
        source: &mut dyn TextureSource,
    ) -> TextureResult<Self> {
        let images: Vec<(&str, TextureImage)> = uris
            .into_iter()
            .map(|uri| {
                let image = source.load(uri).unwrap_or_else(|e| {
                    log::warn!("{}; using placeholder", e);
                    TextureImage::placeholder()
                });
                (uri, image)
            })
            .collect();

        if images.is_empty() {
            return Ok(Self {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
                rects: HashMap::new(),
            });
        }

        // Shelf packing: left to right, wrap into a new row at MAX_ROW_WIDTH.
        let mut placements = Vec::with_capacity(images.len());
        let (mut x, mut y, mut row_height, mut width) = (0u32, 0u32, 0u32, 0u32);
        for (_, image) in &images {
            if x > 0 && x + image.width > MAX_ROW_WIDTH {
                y += row_height;
                x = 0;
                row_height = 0;
            }
            placements.push((x, y));
            x += image.width;
            row_height = row_height.max(image.height);
            width = width.max(x);
        }
        let height = y + row_height;

        if width > MAX_ATLAS_SIZE || height > MAX_ATLAS_SIZE {
            return Err(TextureError::TooLarge { width, height });
        }

        let mut rgba = vec![0u8; (width * height * 4) as usize];
        let mut rects = HashMap::with_capacity(images.len());
        for ((uri, image), (px, py)) in images.iter().zip(placements) {
            for row in 0..image.height {
                let src_start = (row * image.width * 4) as usize;
                let dst_start = (((py + row) * width + px) * 4) as usize;
                let len = (image.width * 4) as usize;
                rgba[dst_start..dst_start + len]
                    .copy_from_slice(&image.rgba[src_start..src_start + len]);
            }
            rects.insert(
                uri.to_string(),
                UvRect {
                    u0: px as f32 / width as f32,
                    v0: py as f32 / height as f32,
                    u1: (px + image.width) as f32 / width as f32,
                    v1: (py + image.height) as f32 / height as f32,
                },
            );
        }

        log::debug!("Packed {} textures into {}x{} atlas", rects.len(), width, height);

        Ok(Self {
            width,
            height,
            rgba,
            rects,
        })
    }

    /// Rectangle of `uri` in normalized atlas coordinates.
    pub fn rect(&self, uri: &str) -> Option<UvRect> {
        self.rects.get(uri).copied()
    }

    pub fn texture_count(&self) -> usize {
        self.rects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory source; unknown URIs fail to load.
    struct MapSource(HashMap<String, TextureImage>);

    impl TextureSource for MapSource {
        fn load(&mut self, uri: &str) -> TextureResult<TextureImage> {
            self.0.get(uri).cloned().ok_or_else(|| TextureError::Io {
                uri: uri.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }
    }

    fn source(entries: &[(&str, TextureImage)]) -> MapSource {
        MapSource(
            entries
                .iter()
                .map(|(uri, image)| (uri.to_string(), image.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_placeholder_checker() {
        let image = TextureImage::placeholder();
        assert_eq!((image.width, image.height), (16, 16));
        assert_eq!(image.pixel(0, 0), &[255, 0, 255, 255]);
        assert_eq!(image.pixel(8, 0), &[0, 0, 0, 255]);
        assert_eq!(image.pixel(8, 8), &[255, 0, 255, 255]);
    }

    #[test]
    fn test_packs_in_order() {
        let red = TextureImage::solid(16, 16, [255, 0, 0, 255]);
        let blue = TextureImage::solid(16, 16, [0, 0, 255, 255]);
        let mut src = source(&[("red", red), ("blue", blue)]);

        let atlas = TextureAtlas::build(["red", "blue"], &mut src).unwrap();

        assert_eq!((atlas.width, atlas.height), (32, 16));
        assert_eq!(
            atlas.rect("red"),
            Some(UvRect { u0: 0.0, v0: 0.0, u1: 0.5, v1: 1.0 })
        );
        assert_eq!(
            atlas.rect("blue"),
            Some(UvRect { u0: 0.5, v0: 0.0, u1: 1.0, v1: 1.0 })
        );
        // Pixel (16, 0) is the first blue texel
        let offset = 16 * 4;
        assert_eq!(&atlas.rgba[offset..offset + 4], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_rows_wrap_at_max_width() {
        let wide = TextureImage::solid(1024, 16, [1, 1, 1, 255]);
        let mut src = source(&[("a", wide.clone()), ("b", wide.clone()), ("c", wide)]);

        let atlas = TextureAtlas::build(["a", "b", "c"], &mut src).unwrap();

        assert_eq!((atlas.width, atlas.height), (2048, 32));
        let c = atlas.rect("c").unwrap();
        assert_eq!((c.u0, c.v0), (0.0, 0.5));
    }

    #[test]
    fn test_missing_texture_uses_placeholder() {
        let mut src = source(&[]);
        let atlas = TextureAtlas::build(["nowhere.png"], &mut src).unwrap();

        assert_eq!((atlas.width, atlas.height), (16, 16));
        assert_eq!(&atlas.rgba[0..4], &[255, 0, 255, 255]);
        assert!(atlas.rect("nowhere.png").is_some());
    }

    #[test]
    fn test_empty_atlas_is_one_texel() {
        let mut src = source(&[]);
        let atlas = TextureAtlas::build(std::iter::empty(), &mut src).unwrap();

        assert_eq!((atlas.width, atlas.height), (1, 1));
        assert_eq!(atlas.texture_count(), 0);
    }

    #[test]
    fn test_file_source_reports_missing_file() {
        let mut src = FileTextureSource;
        let result = src.load("file:///definitely/not/here.png");
        assert!(matches!(result, Err(TextureError::Io { .. })));
    }
}
