use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory of uploaded photo files, named `<unix-millis>.<ext>`.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    dir: PathBuf,
}

impl UploadStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Builds the stored name for an upload. Only a plain alphanumeric extension of the
    /// client's filename survives; everything else about that name is discarded.
    pub fn stored_name(original_name: &str, millis: i64) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) => format!("{}.{}", millis, ext),
            None => millis.to_string(),
        }
    }

    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let mut millis = Utc::now().timestamp_millis();

        loop {
            let filename = Self::stored_name(original_name, millis);
            let path = self.dir.join(&filename);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(data)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    file.flush().await?;
                    debug!("Stored upload {} ({} bytes)", filename, data.len());
                    return Ok(filename);
                }
                // Two uploads in the same millisecond: move on to the next one.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        }
    }

    /// Returns false when the file was already gone.
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let Some(name) = Path::new(filename).file_name() else {
            warn!("Refusing to remove suspicious upload name {:?}", filename);
            return Ok(false);
        };
        let path = self.dir.join(name);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
