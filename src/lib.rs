//! # Odessa
//!
//! Upload a PDF, get back a templated Markdown summary.
//!
//! Odessa extracts the text of an uploaded document, sorts its lines into
//! five paper sections (abstract, introduction, methods, results,
//! conclusion) using keyword headers, and renders a fixed-template summary
//! that is written to disk and served back by job id. Processing happens in
//! the background after the upload request has been answered.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  HTTP    │──▶│ JobStore │   │ Extract  │──▶│ Sections │
//! │ /summar. │   │ (memory) │   │ (PDF)    │   │ splitter │
//! └────┬─────┘   └──────────┘   └────▲─────┘   └────┬─────┘
//!      │ spawn (bounded)             │              ▼
//!      └─────────────────────────────┘        ┌──────────┐
//!                                             │ Summary  │──▶ {id}.md
//!                                             └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! odessa serve --config ./config/odessa.toml
//! curl -F file=@paper.pdf -F tags=ml,nlp http://127.0.0.1:8000/summarize
//! odessa summarize paper.pdf          # one-off, no server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Job metadata, status, and section types |
//! | [`extract`] | Text extraction (PDF) |
//! | [`sections`] | Keyword-triggered section splitter |
//! | [`summary`] | Markdown summary template |
//! | [`storage`] | Upload and summary files on disk |
//! | [`store`] | In-memory job record store |
//! | [`jobs`] | Submission, background pipeline, and lookups |
//! | [`server`] | HTTP API |

pub mod config;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod sections;
pub mod server;
pub mod storage;
pub mod store;
pub mod summary;
