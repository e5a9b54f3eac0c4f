use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use rocket::fs::TempFile;
use tracing::{info, instrument};

use crate::error::AppError;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

const MAX_FILE_NAME_LEN: usize = 120;

/// Reduces an uploaded file name to something safe to place on disk:
/// directory components are stripped, anything outside [A-Za-z0-9._-] is
/// collapsed, and hidden-file dot prefixes are removed.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    let sanitized: String = cleaned.chars().take(MAX_FILE_NAME_LEN).collect();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Writes uploaded photos under a single root directory and hands back the
/// stored filename, which is what the record stores persist. Callers write
/// the file first and the database row after, so a failed save never leaves
/// a row pointing at a file that does not exist.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    #[instrument(skip(self, bytes))]
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let stored = sanitize_file_name(original_name);
        info!(stored = %stored, "Saving uploaded file");

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(&stored), bytes).await?;

        Ok(stored)
    }

    /// Same contract as [`save`](Self::save), fed from a buffered multipart
    /// upload.
    #[instrument(skip_all)]
    pub async fn store_upload(&self, file: &mut TempFile<'_>) -> Result<String, AppError> {
        let original = file
            .raw_name()
            .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let stored = sanitize_file_name(&original);
        info!(stored = %stored, "Storing uploaded file");

        tokio::fs::create_dir_all(&self.root).await?;
        file.copy_to(self.path_for(&stored)).await?;

        Ok(stored)
    }
}
