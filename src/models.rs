//! Core data models used throughout Odessa.
//!
//! These types represent the jobs, their metadata, and the per-document
//! section buckets that flow through the summary pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project name used when the submitter does not supply one.
pub const DEFAULT_PROJECT: &str = "Default";

/// Metadata captured once at submission time. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub id: String,
    /// Original upload filename (base name only).
    pub filename: String,
    pub created_at: String, // ISO8601, UTC, no offset suffix
    pub tags: Vec<String>,
    pub project: String,
}

impl JobMetadata {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        created_at: DateTime<Utc>,
        tags: Vec<String>,
        project: Option<&str>,
    ) -> Self {
        let project = project
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROJECT);

        Self {
            id: id.into(),
            filename: filename.into(),
            created_at: format_created_at(created_at),
            tags,
            project: project.to_string(),
        }
    }
}

/// Lifecycle of a job as observed from outside.
///
/// Not stored directly: `Complete` is derived from the summary artifact on
/// disk and `Failed` from the failure recorded in the job store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum JobStatus {
    Processing,
    Complete,
    Failed { error: String },
}

/// One of the five fixed section buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Abstract,
    Introduction,
    Methods,
    Results,
    Conclusion,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Abstract,
        Section::Introduction,
        Section::Methods,
        Section::Results,
        Section::Conclusion,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::Abstract => "abstract",
            Section::Introduction => "introduction",
            Section::Methods => "methods",
            Section::Results => "results",
            Section::Conclusion => "conclusion",
        }
    }
}

/// Raw text accumulated per section for a single document.
///
/// Always carries all five buckets; a bucket that saw no lines is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionMap {
    pub r#abstract: String,
    pub introduction: String,
    pub methods: String,
    pub results: String,
    pub conclusion: String,
}

impl SectionMap {
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::Abstract => &self.r#abstract,
            Section::Introduction => &self.introduction,
            Section::Methods => &self.methods,
            Section::Results => &self.results,
            Section::Conclusion => &self.conclusion,
        }
    }

    pub fn get_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Abstract => &mut self.r#abstract,
            Section::Introduction => &mut self.introduction,
            Section::Methods => &mut self.methods,
            Section::Results => &mut self.results,
            Section::Conclusion => &mut self.conclusion,
        }
    }

    /// Bucket names in fixed order.
    pub fn keys(&self) -> [&'static str; 5] {
        Section::ALL.map(Section::key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &str)> + '_ {
        Section::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, text)| text.is_empty())
    }
}

/// Split a comma-separated tag field into trimmed tags.
///
/// A blank field means no tags. Otherwise every comma-separated entry is
/// kept in order, including empty ones (`"a,,b"` has three tags).
pub fn parse_tags(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|t| t.trim().to_string()).collect()
}

fn format_created_at(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
