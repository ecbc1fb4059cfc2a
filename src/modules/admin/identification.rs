use std::path::{Path, PathBuf};

use super::crud::AdminApi;
use super::interface::{AdminError, Result};
use crate::services::http_client::path_segment;

/// An identification image written to disk for viewing.
///
/// The file is removed when the guard is dropped unless it was kept with
/// `into_path`.
#[derive(Debug)]
pub struct IdentificationImage {
    path: Option<PathBuf>,
    user_id: String,
    content_type: Option<String>,
}

impl IdentificationImage {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Keeps the file on disk and hands its location to the caller
    pub fn into_path(mut self) -> Option<PathBuf> {
        self.path.take()
    }
}

impl Drop for IdentificationImage {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), "Failed to remove identification image: {}", e);
            }
        }
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.map(|c| c.split(';').next().unwrap_or("").trim()) {
        Some("image/png") => "png",
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("application/pdf") => "pdf",
        _ => "bin",
    }
}

/// Shows at most one identification image at a time
pub struct IdentificationViewer {
    dir: PathBuf,
    current: Option<IdentificationImage>,
}

impl IdentificationViewer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&IdentificationImage> {
        self.current.as_ref()
    }

    /// Fetches and materialises a user's image, releasing the previous one first
    pub async fn open(&mut self, api: &AdminApi, user_id: &str) -> Result<&IdentificationImage> {
        self.close();
        let user_id = path_segment(user_id)?;

        let image = api.identification(user_id).await?;
        std::fs::create_dir_all(&self.dir).map_err(|e| AdminError::Storage(e.to_string()))?;

        let path = self.dir.join(format!(
            "identification-{}.{}",
            user_id,
            extension_for(image.content_type.as_deref())
        ));
        std::fs::write(&path, &image.bytes).map_err(|e| AdminError::Storage(e.to_string()))?;
        tracing::debug!(user_id, bytes = image.bytes.len(), "Identification image ready");

        Ok(&*self.current.insert(IdentificationImage {
            path: Some(path),
            user_id: user_id.to_string(),
            content_type: image.content_type,
        }))
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    /// Detaches the current image so it outlives the viewer
    pub fn take(&mut self) -> Option<IdentificationImage> {
        self.current.take()
    }
}
