use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::{StorageError, is_identifier};

/// Uploaded images in a flat directory, named `<image_id><ext>`.
///
/// Lookups go through an identifier -> filename index built from the
/// directory at startup and extended on every save.
pub struct ImageStore {
    dir: PathBuf,
    index: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub image_id: String,
    pub filename: String,
}

impl ImageStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut names: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let mut index = HashMap::new();
        for name in names {
            let Some(image_id) = identifier_of(&name) else {
                continue;
            };
            if let Some(existing) = index.get(&image_id) {
                log::warn!(
                    "Image {} has several files ({} and {}); keeping {}",
                    image_id,
                    existing,
                    name,
                    existing
                );
                continue;
            }
            index.insert(image_id, name);
        }

        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Writes the bytes unmodified under a fresh identifier.
    pub async fn save(
        &self,
        image_data: &[u8],
        original_name: Option<&str>,
        mime_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let image_id = Uuid::new_v4().to_string();
        let extension = original_name
            .and_then(extension_of)
            .or_else(|| extension_for_mime(mime_type).map(String::from))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let filename = format!("{}{}", image_id, extension);

        let path = self.dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, image_data).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(image_id.clone(), filename.clone());

        Ok(StoredImage { image_id, filename })
    }

    /// Path of the stored file for `image_id`.
    pub fn resolve(&self, image_id: &str) -> Result<PathBuf, StorageError> {
        if !is_identifier(image_id) {
            return Err(StorageError::image_not_found(image_id));
        }

        let filename = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(image_id)
            .cloned()
            .ok_or_else(|| StorageError::image_not_found(image_id))?;

        let path = self.dir.join(filename);
        if !path.is_file() {
            // Removed behind our back.
            self.index
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(image_id);
            return Err(StorageError::image_not_found(image_id));
        }
        Ok(path)
    }
}

fn identifier_of(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    Uuid::parse_str(stem).ok().map(|id| id.to_string())
}

/// The original filename's extension, restricted to ASCII alphanumerics.
fn extension_of(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (!ext.is_empty()).then_some(ext)
}

pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}
