//! On-disk layout for uploads and rendered summaries.
//!
//! ```text
//! {upload_dir}/{id}_{filename}   raw uploaded bytes
//! {summary_dir}/{id}.md          rendered summary (the only durable artifact)
//! ```
//!
//! Summaries are written to `{id}.md.tmp` and renamed into place, so a
//! reader that sees `{id}.md` always sees the complete document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::StorageConfig;

/// Fallback name when an upload arrives without a usable filename.
pub const FALLBACK_FILENAME: &str = "upload.pdf";

#[derive(Debug, Clone)]
pub struct SummaryStorage {
    upload_dir: PathBuf,
    summary_dir: PathBuf,
}

impl SummaryStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, summary_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            summary_dir: summary_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.upload_dir, &config.summary_dir)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn summary_dir(&self) -> &Path {
        &self.summary_dir
    }

    /// Create both directories if missing. Idempotent.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.summary_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn upload_path(&self, id: &str, filename: &str) -> PathBuf {
        self.upload_dir.join(format!("{}_{}", id, filename))
    }

    pub fn summary_path(&self, id: &str) -> PathBuf {
        self.summary_dir.join(format!("{}.md", id))
    }

    pub async fn write_upload(&self, id: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.upload_path(id, filename);
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to save upload: {}", path.display()))?;
        Ok(path)
    }

    /// Persist a rendered summary. Blocking; called from the job worker.
    pub fn write_summary(&self, id: &str, content: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.summary_dir)?;
        let path = self.summary_path(id);
        let tmp = self.summary_dir.join(format!("{}.md.tmp", id));
        let written = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(path)
    }

    pub async fn summary_exists(&self, id: &str) -> bool {
        tokio::fs::metadata(self.summary_path(id))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read a summary; `None` when it has not been written (yet).
    pub async fn read_summary(&self, id: &str) -> Result<Option<String>> {
        let path = self.summary_path(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read summary: {}", path.display()))
            }
        }
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators so `..\..\x.pdf` cannot escape the
/// upload directory either.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}
