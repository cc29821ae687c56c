//! Image intake: accepted files become inline data URLs in an ordered gallery.
//!
//! Decoding is behind the [`FileDecoder`] trait so the page can read files
//! concurrently and tests can control completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ListingError, Result};
use crate::view::Thumbnail;

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A file offered to the gallery by drop or picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// Declared MIME type, e.g. `image/png`
    pub mime: String,
    pub source: ImageSource,
}

impl ImageFile {
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            source: ImageSource::Bytes(bytes),
        }
    }

    /// A file on disk, typed by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            mime: mime_for_extension(path).to_string(),
            name,
            source: ImageSource::Path(path.to_path_buf()),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Turns an accepted file into its inline string form.
#[async_trait]
pub trait FileDecoder: Send + Sync {
    async fn decode(&self, file: &ImageFile) -> Result<String>;
}

/// Production decoder: `data:<mime>;base64,<bytes>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlDecoder;

#[async_trait]
impl FileDecoder for DataUrlDecoder {
    async fn decode(&self, file: &ImageFile) -> Result<String> {
        let bytes = match &file.source {
            ImageSource::Bytes(bytes) => bytes.clone(),
            ImageSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| ListingError::Decode {
                        name: file.name.clone(),
                        reason: e.to_string(),
                    })?
            }
        };
        tracing::trace!(file = %file.name, bytes = bytes.len(), "Decoded image");
        Ok(data_url(&file.mime, &bytes))
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decoder whose results are held until the test releases them.
///
/// Files without a registered hold decode immediately with
/// `data:<mime>;name=<file name>` so assertions can tell entries apart.
#[derive(Clone, Default)]
pub struct MockFileDecoder {
    holds: Arc<Mutex<Vec<(String, oneshot::Receiver<Result<String>>)>>>,
    decoded: Arc<Mutex<Vec<String>>>,
}

impl MockFileDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the decode of `name` until the returned sender fires.
    ///
    /// Dropping the sender fails the decode.
    pub fn hold(&self, name: &str) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.holds.lock().push((name.to_string(), rx));
        tx
    }

    /// Names of files decoded so far, in completion order.
    pub fn decoded(&self) -> Vec<String> {
        self.decoded.lock().clone()
    }

    pub fn placeholder_data(file: &ImageFile) -> String {
        format!("data:{};name={}", file.mime, file.name)
    }
}

#[async_trait]
impl FileDecoder for MockFileDecoder {
    async fn decode(&self, file: &ImageFile) -> Result<String> {
        let hold = {
            let mut holds = self.holds.lock();
            holds
                .iter()
                .position(|(name, _)| name == &file.name)
                .map(|i| holds.remove(i).1)
        };

        let result = match hold {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(ListingError::Decode {
                    name: file.name.clone(),
                    reason: "decode abandoned".to_string(),
                })
            }),
            None => Ok(Self::placeholder_data(file)),
        };

        if result.is_ok() {
            self.decoded.lock().push(file.name.clone());
        }
        result
    }
}

/// Ordered list of inline images attached to the draft listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    images: Vec<String>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: String) {
        self.images.push(data);
    }

    /// Remove the entry at `index`; later entries shift down by one.
    ///
    /// Out-of-range indices leave the gallery unchanged and return `None`.
    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.images.get(index).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn thumbnails(&self) -> Vec<Thumbnail> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, src)| Thumbnail {
                index,
                src: src.clone(),
            })
            .collect()
    }
}
