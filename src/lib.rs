//! # sheet2deck
//!
//! Client for the Sheet2Deck service: turn a CSV or Excel file into a
//! PowerPoint deck.
//!
//! The heavy lifting happens on the backend. This crate owns everything
//! between the user and that backend: which files may be sent, the
//! authenticated upload, turning every possible answer into one of a small
//! set of outcomes, and telling the user about it exactly once.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Intake    extension + size ceiling (15 MiB csv-like, 8 MiB excel-like)
//!  ├─ 2. Submit    bearer multipart POST /convert {file, title, theme, use_ai}
//!  ├─ 3. Classify  status + detail → success | 8 failure kinds
//!  ├─ 4. Artifact  deck written to a private temp file, `<slug>.pptx`
//!  ├─ 5. Refresh   GET /auth/me, remaining-quota toast (best effort)
//!  └─ 6. Notify    inline text | toast | persistent toast | modal
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheet2deck::{
//!     ClientConfig, ConversionOptions, ConversionWorkflow, FileCandidate, HttpApi,
//!     Notifications, SessionStore, Theme,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let api = Arc::new(HttpApi::new(&config)?);
//!     let session = SessionStore::from_config(&config);
//!     let notifications = Notifications::new(config.toast_timeout);
//!
//!     let workflow = ConversionWorkflow::new(config, api, session, notifications);
//!     workflow.select_file(FileCandidate::from_path("ventes.csv")?)?;
//!
//!     let outcome = workflow
//!         .submit(&ConversionOptions::new("Performance Q4", Theme::Corporate))
//!         .await;
//!     if outcome.is_success() {
//!         let saved = workflow.save_artifact(".").await?;
//!         println!("{}", saved.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sheet2deck` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sheet2deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod routes;
pub mod session;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{AccountApi, ConversionApi, HttpApi};
pub use auth::AuthService;
pub use config::{ClientConfig, ClientConfigBuilder, Theme};
pub use error::{ConversionFailure, RejectReason, Sheet2DeckError};
pub use notify::{Modal, NotificationListener, Notifications, Toast};
pub use output::{ConversionOptions, SubmitOutcome, WorkflowState};
pub use pipeline::artifact::ArtifactSummary;
pub use pipeline::intake::{FileCandidate, PendingFile};
pub use routes::{Navigator, Route, Router};
pub use session::{Plan, SessionStore, UserSnapshot};
pub use workflow::ConversionWorkflow;
