//! Filesystem source and image decoder used by the server binary.

use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage};

use crate::error::{DecodeError, FetchError};
use crate::loader::{AssetSource, Decoder};

/// File extensions the viewer displays (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

// == Filesystem Source ==
/// Reads image files from disk, optionally confined to a root directory.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only paths inside `root` will be read.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, FetchError> {
        let path = PathBuf::from(id);
        if !is_image_file(&path) {
            return Err(FetchError::new(format!("unsupported image type: {}", id)));
        }

        if let Some(root) = &self.root {
            let root = root.canonicalize()?;
            let full = if path.is_absolute() {
                path
            } else {
                root.join(path)
            };
            let full = full.canonicalize()?;
            if !full.starts_with(&root) {
                return Err(FetchError::new(format!("{} is outside the asset root", id)));
            }
            return Ok(full);
        }

        Ok(path)
    }
}

impl AssetSource<String> for FsSource {
    fn fetch(&self, id: &String) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(id)?;
        Ok(std::fs::read(path)?)
    }
}

// == Decoded Image ==
/// An image decoded into memory.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
    pub pixels: DynamicImage,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            color: pixels.color(),
            pixels,
        }
    }
}

// == Image Decoder ==
/// Decodes any format the `image` crate recognizes from its magic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder<DecodedImage> for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        image::load_from_memory(bytes)
            .map(DecodedImage::new)
            .map_err(|e| DecodeError::new(e.to_string()))
    }
}
