//! Job submission and the background summary pipeline.
//!
//! ```text
//! submit() ──▶ upload on disk ──▶ JobStore ──▶ spawn ─┐
//!                                                    ▼
//!                          permit ──▶ extract ──▶ split ──▶ assemble ──▶ {id}.md
//! ```
//!
//! `submit` returns as soon as the upload is saved and the job is
//! registered. The pipeline runs on the blocking pool once a permit from the
//! job semaphore is available, so at most `jobs.max_concurrent` documents
//! are decoded at a time; later submissions wait for a permit.
//!
//! A job is `Processing` until `{id}.md` exists (`Complete`) or the worker
//! records an error in the store (`Failed`). Nothing is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::extract::{ExtractError, TextExtractor};
use crate::models::{parse_tags, JobMetadata, JobStatus};
use crate::sections::split_sections;
use crate::storage::{sanitize_filename, SummaryStorage};
use crate::store::JobStore;
use crate::summary::assemble_summary;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("failed to write summary: {0}")]
    Storage(#[from] std::io::Error),
    #[error("summary worker panicked: {0}")]
    Panicked(String),
}

/// Extract, split, and assemble a summary without persisting it.
pub fn render_summary(
    extractor: &dyn TextExtractor,
    file_path: &Path,
    filename: &str,
) -> Result<String, ExtractError> {
    let text = extractor.extract(file_path)?;
    let sections = split_sections(&text);
    Ok(assemble_summary(&sections, filename))
}

/// Full pipeline for one job: render, then write `{id}.md`.
/// Blocking; returns the rendered summary.
pub fn run_job(
    extractor: &dyn TextExtractor,
    storage: &SummaryStorage,
    file_path: &Path,
    filename: &str,
    id: &str,
) -> Result<String, JobError> {
    let summary = render_summary(extractor, file_path, filename)?;
    storage.write_summary(id, &summary)?;
    Ok(summary)
}

/// Run pipeline work on the blocking pool. A panic inside `work` comes back
/// as [`JobError::Panicked`] instead of unwinding into the caller.
pub async fn run_blocking<T, F>(work: F) -> Result<T, JobError>
where
    F: FnOnce() -> Result<T, JobError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .unwrap_or_else(|e| Err(JobError::Panicked(join_error_message(e))))
}

/// Returned by [`Summarizer::submit`] before any processing happens.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: String,
    pub meta: JobMetadata,
}

/// Result of looking up a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobView {
    NotFound,
    Processing { meta: JobMetadata },
    Failed { meta: JobMetadata, error: String },
    Complete { meta: JobMetadata, summary: String },
}

/// Result of asking for the downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadView {
    NotFound,
    Processing,
    Failed { error: String },
    Ready { path: PathBuf, download_name: String },
}

/// Owns the job store, the on-disk layout, and the worker bound.
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Summarizer {
    store: Arc<JobStore>,
    storage: SummaryStorage,
    extractor: Arc<dyn TextExtractor>,
    permits: Arc<Semaphore>,
}

impl Summarizer {
    pub fn new(
        storage: SummaryStorage,
        extractor: Arc<dyn TextExtractor>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            storage,
            extractor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &Config, extractor: Arc<dyn TextExtractor>) -> Self {
        Self::new(
            SummaryStorage::from_config(&config.storage),
            extractor,
            config.jobs.max_concurrent,
        )
    }

    pub fn storage(&self) -> &SummaryStorage {
        &self.storage
    }

    /// Save the upload, register the job, and start processing in the
    /// background. Returns without waiting for the summary.
    pub async fn submit(
        &self,
        bytes: &[u8],
        filename: &str,
        tags: &str,
        project: Option<&str>,
    ) -> Result<Submission> {
        let id = Uuid::new_v4().to_string();
        let filename = sanitize_filename(filename);
        let meta = JobMetadata::new(&id, &filename, Utc::now(), parse_tags(tags), project);

        let file_path = self.storage.write_upload(&id, &filename, bytes).await?;
        self.store.insert(meta.clone());

        info!(
            job_id = %id,
            filename = %filename,
            bytes = bytes.len(),
            project = %meta.project,
            "job submitted"
        );

        self.spawn_job(file_path, filename, id.clone());

        Ok(Submission { id, meta })
    }

    fn spawn_job(&self, file_path: PathBuf, filename: String, id: String) {
        let store = self.store.clone();
        let storage = self.storage.clone();
        let extractor = self.extractor.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    store.mark_failed(&id, "job queue closed");
                    return;
                }
            };

            let started = Instant::now();
            let worker_id = id.clone();
            let result = run_blocking(move || {
                run_job(&*extractor, &storage, &file_path, &filename, &worker_id)
            })
            .await;

            match result {
                Ok(summary) => info!(
                    job_id = %id,
                    summary_bytes = summary.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "summary complete"
                ),
                Err(e) => {
                    error!(job_id = %id, error = %e, "summary failed");
                    store.mark_failed(&id, e.to_string());
                }
            }
        });
    }

    pub async fn get(&self, id: &str) -> Result<JobView> {
        let Some(meta) = self.store.get(id) else {
            return Ok(JobView::NotFound);
        };

        if let Some(summary) = self.storage.read_summary(id).await? {
            return Ok(JobView::Complete { meta, summary });
        }

        Ok(match self.store.failure(id) {
            Some(error) => JobView::Failed { meta, error },
            None => JobView::Processing { meta },
        })
    }

    /// All submitted jobs in submission order.
    pub fn list(&self) -> Vec<JobMetadata> {
        self.store.list()
    }

    pub async fn download(&self, id: &str) -> DownloadView {
        if !self.store.contains(id) {
            return DownloadView::NotFound;
        }

        if self.storage.summary_exists(id).await {
            return DownloadView::Ready {
                path: self.storage.summary_path(id),
                download_name: format!("summary_{}.md", id),
            };
        }

        match self.store.failure(id) {
            Some(error) => DownloadView::Failed { error },
            None => DownloadView::Processing,
        }
    }

    /// Current state of a job, or `None` if the id was never issued.
    pub async fn status(&self, id: &str) -> Option<JobStatus> {
        if !self.store.contains(id) {
            return None;
        }
        if self.storage.summary_exists(id).await {
            return Some(JobStatus::Complete);
        }
        Some(match self.store.failure(id) {
            Some(error) => JobStatus::Failed { error },
            None => JobStatus::Processing,
        })
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Returns the uploaded bytes as UTF-8 text.
    struct EchoExtractor;

    impl TextExtractor for EchoExtractor {
        fn extract(&self, path: &Path) -> Result<String, ExtractError> {
            let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    struct FailingExtractor;

    impl TextExtractor for FailingExtractor {
        fn extract(&self, _path: &Path) -> Result<String, ExtractError> {
            Err(ExtractError::Pdf("invalid file trailer".to_string()))
        }
    }

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract(&self, _path: &Path) -> Result<String, ExtractError> {
            panic!("decoder blew up");
        }
    }

    /// Blocks every extraction until `open()` is called.
    #[derive(Default)]
    struct GatedExtractor {
        open: Mutex<bool>,
        cv: Condvar,
    }

    impl GatedExtractor {
        fn open(&self) {
            *self.open.lock().unwrap() = true;
            self.cv.notify_all();
        }
    }

    impl TextExtractor for GatedExtractor {
        fn extract(&self, path: &Path) -> Result<String, ExtractError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cv.wait(open).unwrap();
            }
            drop(open);
            EchoExtractor.extract(path)
        }
    }

    /// Tracks the peak number of extractions running at once.
    #[derive(Default)]
    struct CountingExtractor {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TextExtractor for CountingExtractor {
        fn extract(&self, path: &Path) -> Result<String, ExtractError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.running.fetch_sub(1, Ordering::SeqCst);
            EchoExtractor.extract(path)
        }
    }

    fn summarizer(tmp: &TempDir, extractor: Arc<dyn TextExtractor>, max: usize) -> Summarizer {
        let storage = SummaryStorage::new(tmp.path().join("uploads"), tmp.path().join("summaries"));
        storage.ensure_dirs().unwrap();
        Summarizer::new(storage, extractor, max)
    }

    async fn wait_settled(s: &Summarizer, id: &str) -> JobStatus {
        for _ in 0..250 {
            match s.status(id).await {
                Some(JobStatus::Processing) => {
                    tokio::time::sleep(Duration::from_millis(20)).await
                }
                Some(other) => return other,
                None => panic!("unknown job {}", id),
            }
        }
        panic!("job {} did not settle within 5 seconds", id);
    }

    const PAPER: &str = "Abstract\nHello world\nResults\nPoint one\nPoint two\n";

    #[test]
    fn test_run_job_writes_summary() {
        let tmp = TempDir::new().unwrap();
        let storage = SummaryStorage::new(tmp.path().join("u"), tmp.path().join("s"));
        let input = tmp.path().join("paper.txt");
        std::fs::write(&input, PAPER).unwrap();

        let summary = run_job(&EchoExtractor, &storage, &input, "paper.pdf", "job-1").unwrap();
        assert!(summary.starts_with("# Summary of paper.pdf\n\n## Abstract\nHello world\n"));
        assert!(summary.contains("- Point one\n- Point two"));
        assert_eq!(
            std::fs::read_to_string(storage.summary_path("job-1")).unwrap(),
            summary
        );
    }

    #[test]
    fn test_run_job_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let storage = SummaryStorage::new(tmp.path().join("u"), tmp.path().join("s"));
        let err = run_job(&FailingExtractor, &storage, Path::new("x.pdf"), "x.pdf", "j")
            .unwrap_err();
        assert!(matches!(err, JobError::Extraction(_)));
        assert!(!storage.summary_path("j").exists());
    }

    #[tokio::test]
    async fn test_submit_then_complete() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(EchoExtractor), 2);

        let sub = s
            .submit(PAPER.as_bytes(), "paper.pdf", "a,b", Some("Thesis"))
            .await
            .unwrap();
        assert_eq!(sub.meta.id, sub.id);
        assert_eq!(sub.meta.tags, vec!["a", "b"]);
        assert_eq!(sub.meta.project, "Thesis");
        assert!(s
            .storage()
            .upload_path(&sub.id, "paper.pdf")
            .is_file());

        assert_eq!(wait_settled(&s, &sub.id).await, JobStatus::Complete);
        match s.get(&sub.id).await.unwrap() {
            JobView::Complete { meta, summary } => {
                assert_eq!(meta, sub.meta);
                assert!(summary.contains("# Summary of paper.pdf"));
                assert!(summary.contains("## Abstract\nHello world\n"));
            }
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_before_completion_is_processing() {
        let tmp = TempDir::new().unwrap();
        let gate = Arc::new(GatedExtractor::default());
        let s = summarizer(&tmp, gate.clone(), 1);

        let sub = s.submit(PAPER.as_bytes(), "p.pdf", "", None).await.unwrap();
        assert!(matches!(
            s.get(&sub.id).await.unwrap(),
            JobView::Processing { .. }
        ));
        assert_eq!(s.download(&sub.id).await, DownloadView::Processing);

        gate.open();
        assert_eq!(wait_settled(&s, &sub.id).await, JobStatus::Complete);
        assert!(matches!(
            s.get(&sub.id).await.unwrap(),
            JobView::Complete { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(EchoExtractor), 1);
        assert_eq!(s.get("never-issued").await.unwrap(), JobView::NotFound);
        assert_eq!(s.download("never-issued").await, DownloadView::NotFound);
        assert!(s.status("never-issued").await.is_none());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(FailingExtractor), 1);
        let sub = s.submit(b"junk", "bad.pdf", "", None).await.unwrap();

        match wait_settled(&s, &sub.id).await {
            JobStatus::Failed { error } => assert!(error.contains("invalid file trailer")),
            other => panic!("expected failure, got {:?}", other),
        }
        match s.get(&sub.id).await.unwrap() {
            JobView::Failed { error, .. } => {
                assert_eq!(error, "PDF extraction failed: invalid file trailer")
            }
            other => panic!("expected failed view, got {:?}", other),
        }
        assert!(matches!(
            s.download(&sub.id).await,
            DownloadView::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(PanickingExtractor), 1);
        let sub = s.submit(b"junk", "bad.pdf", "", None).await.unwrap();

        match wait_settled(&s, &sub.id).await {
            JobStatus::Failed { error } => {
                assert!(error.contains("panicked"));
                assert!(error.contains("decoder blew up"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_blocking_catches_panic() {
        let err = run_blocking(|| {
            render_summary(&PanickingExtractor, Path::new("x.pdf"), "x.pdf").map_err(JobError::from)
        })
        .await
        .unwrap_err();
        match err {
            JobError::Panicked(msg) => assert_eq!(msg, "decoder blew up"),
            other => panic!("expected panic error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_blocking_passes_errors_through() {
        let err = run_blocking(|| {
            render_summary(&FailingExtractor, Path::new("x.pdf"), "x.pdf").map_err(JobError::from)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, JobError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let tmp = TempDir::new().unwrap();
        let counter = Arc::new(CountingExtractor::default());
        let s = summarizer(&tmp, counter.clone(), 2);

        let mut ids = Vec::new();
        for i in 0..6 {
            let sub = s
                .submit(PAPER.as_bytes(), &format!("p{}.pdf", i), "", None)
                .await
                .unwrap();
            ids.push(sub.id);
        }
        for id in &ids {
            assert_eq!(wait_settled(&s, id).await, JobStatus::Complete);
        }
        let peak = counter.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak concurrency was {}", peak);
    }

    #[tokio::test]
    async fn test_list_in_submission_order() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(EchoExtractor), 1);
        let mut expected = Vec::new();
        for name in ["c.pdf", "a.pdf", "b.pdf"] {
            expected.push(s.submit(b"x", name, "", None).await.unwrap().id);
        }
        let listed: Vec<String> = s.list().into_iter().map(|m| m.id).collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_download_ready() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(EchoExtractor), 1);
        let sub = s.submit(PAPER.as_bytes(), "p.pdf", "", None).await.unwrap();
        wait_settled(&s, &sub.id).await;

        match s.download(&sub.id).await {
            DownloadView::Ready {
                path,
                download_name,
            } => {
                assert_eq!(path, s.storage().summary_path(&sub.id));
                assert_eq!(download_name, format!("summary_{}.md", sub.id));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_strips_directories_from_filename() {
        let tmp = TempDir::new().unwrap();
        let s = summarizer(&tmp, Arc::new(EchoExtractor), 1);
        let sub = s
            .submit(PAPER.as_bytes(), "../../escape.pdf", "", None)
            .await
            .unwrap();
        assert_eq!(sub.meta.filename, "escape.pdf");
        assert!(s.storage().upload_path(&sub.id, "escape.pdf").is_file());
        assert!(!tmp.path().join("escape.pdf").exists());
    }
}
