//! The conversion workflow: selected file + options → deck or classified failure.
//!
//! ## States
//!
//! ```text
//!          submit()                  response classified
//!  Idle ───────────────▶ Submitting ─────────────────────▶ Idle
//!                                    (Succeeded | Failed)
//! ```
//!
//! At most one request is in flight per workflow; a second `submit` while
//! submitting returns [`SubmitOutcome::Busy`] untouched. The previous
//! artifact is released when a new submission starts, when a new file is
//! accepted, or when the workflow is dropped, so at most one deck is live
//! at a time.
//!
//! ## Notification policy
//!
//! Every failure surfaces exactly once:
//!
//! | Failure | Surface |
//! |---------|---------|
//! | not authenticated, server error | inline error text |
//! | session expired | toast + navigation to the login page |
//! | row limit, too large | persistent toast |
//! | quota exhausted | modal with `used/limit` |
//! | unsupported format, unknown | toast |
//!
//! Nothing is retried. The post-success usage refresh is best effort: its
//! failures are logged and never shown.

use crate::api::{ConversionApi, ConversionRequest};
use crate::config::ClientConfig;
use crate::error::{ConversionFailure, RejectReason, Sheet2DeckError};
use crate::notify::{Modal, Notifications, Toast};
use crate::output::{ConversionOptions, SubmitOutcome, WorkflowState};
use crate::pipeline::artifact::{self, Artifact, ArtifactSummary};
use crate::pipeline::classify::{classify_response, parse_warnings};
use crate::pipeline::intake::{self, FileCandidate, PendingFile};
use crate::pipeline::slug::deck_filename;
use crate::routes::{Navigator, NoopNavigator, Route};
use crate::session::AuthChange;
use crate::session::SessionStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Default)]
struct Inner {
    pending: Option<PendingFile>,
    artifact: Option<Artifact>,
    last_failure: Option<ConversionFailure>,
    inline_error: Option<String>,
}

/// Resets the in-flight flag even if the submit future is dropped mid-way.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One conversion surface: file selection, submission and its outcome.
pub struct ConversionWorkflow {
    config: ClientConfig,
    api: Arc<dyn ConversionApi>,
    session: SessionStore,
    notifications: Notifications,
    navigator: Arc<dyn Navigator>,
    inner: Mutex<Inner>,
    in_flight: AtomicBool,
}

impl ConversionWorkflow {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn ConversionApi>,
        session: SessionStore,
        notifications: Notifications,
    ) -> Self {
        Self {
            config,
            api,
            session,
            notifications,
            navigator: Arc::new(NoopNavigator),
            inner: Mutex::new(Inner::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Where to send the user when the session expires.
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn state(&self) -> WorkflowState {
        if self.in_flight.load(Ordering::SeqCst) {
            WorkflowState::Submitting
        } else {
            WorkflowState::Idle
        }
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn pending_file(&self) -> Option<PendingFile> {
        self.lock().pending.clone()
    }

    /// Live artifact, if the last submission succeeded.
    pub fn artifact(&self) -> Option<ArtifactSummary> {
        self.lock().artifact.as_ref().map(Artifact::summary)
    }

    pub fn last_failure(&self) -> Option<ConversionFailure> {
        self.lock().last_failure.clone()
    }

    /// Inline error text shown next to the form.
    pub fn inline_error(&self) -> Option<String> {
        self.lock().inline_error.clone()
    }

    // ── File intake ──────────────────────────────────────────────────────

    /// Offer a file. Acceptance clears the previous result; rejection clears
    /// the pending file and raises a toast.
    pub fn select_file(&self, candidate: FileCandidate) -> Result<(), RejectReason> {
        match intake::validate(candidate) {
            Ok(file) => {
                info!("Selected '{}' ({} bytes)", file.name, file.byte_size);
                let mut inner = self.lock();
                inner.pending = Some(file);
                inner.artifact = None;
                inner.last_failure = None;
                inner.inline_error = None;
                Ok(())
            }
            Err(reason) => {
                warn!("Rejected file: {}", reason);
                let toast = match reason {
                    RejectReason::TooLarge { .. } => Toast::error(reason.to_string()).persistent(),
                    RejectReason::UnsupportedFormat { .. } => Toast::error(reason.to_string()),
                };
                {
                    let mut inner = self.lock();
                    inner.pending = None;
                    inner.last_failure = Some(reason.clone().into());
                }
                self.notifications.show_toast(toast);
                Err(reason)
            }
        }
    }

    /// Release the live artifact now (e.g. when the view goes away).
    pub fn release_artifact(&self) {
        self.lock().artifact = None;
    }

    /// Copy the live artifact to `dest`. See [`Artifact::save_to`].
    pub async fn save_artifact(&self, dest: impl AsRef<Path>) -> Result<PathBuf, Sheet2DeckError> {
        let (src, filename) = {
            let inner = self.lock();
            let artifact = inner
                .artifact
                .as_ref()
                .ok_or_else(|| Sheet2DeckError::Internal("no artifact to save".into()))?;
            (artifact.path().to_path_buf(), artifact.filename().to_string())
        };
        artifact::copy_out(&src, &filename, dest.as_ref()).await
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Submit the pending file with `options`.
    pub async fn submit(&self, options: &ConversionOptions) -> SubmitOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Submit refused: a conversion is already in flight");
            return SubmitOutcome::Busy;
        }
        let _in_flight = InFlight(&self.in_flight);

        if self.lock().pending.is_none() {
            debug!("Submit ignored: no pending file");
            return SubmitOutcome::NoFile;
        }

        let Some(token) = self.session.token() else {
            return self.fail(ConversionFailure::NotAuthenticated);
        };

        let request = {
            let mut inner = self.lock();
            let Some(file) = inner.pending.take() else {
                return SubmitOutcome::NoFile;
            };
            inner.artifact = None;
            inner.last_failure = None;
            inner.inline_error = None;
            self.build_request(file, options)
        };
        info!(
            "Converting '{}' as '{}' ({})",
            request.file.name, request.title, request.theme
        );

        let response = match self.api.convert(&token, &request).await {
            Ok(r) => r,
            Err(e) => {
                return self.fail(ConversionFailure::Unknown {
                    message: e.to_string(),
                })
            }
        };

        if let Some(failure) = classify_response(response.status, response.detail.as_deref()) {
            return self.fail(failure);
        }

        let warnings = parse_warnings(response.warnings_header.as_deref());
        let filename = deck_filename(&request.title);
        let artifact = match Artifact::create(filename, &response.body, warnings).await {
            Ok(a) => a,
            Err(e) => {
                return self.fail(ConversionFailure::Unknown {
                    message: e.to_string(),
                })
            }
        };
        let summary = artifact.summary();
        self.lock().artifact = Some(artifact);
        info!(
            "Deck ready: {} ({} bytes, {} warnings)",
            summary.filename,
            summary.size,
            summary.warnings.len()
        );

        self.refresh_usage(&token).await;
        SubmitOutcome::Succeeded(summary)
    }

    fn build_request(&self, file: PendingFile, options: &ConversionOptions) -> ConversionRequest {
        let title = match options.title.trim() {
            "" => self.config.default_title.clone(),
            t => t.to_string(),
        };
        ConversionRequest {
            file,
            title,
            theme: options.theme.unwrap_or(self.config.default_theme),
            use_ai: true,
        }
    }

    /// Record `failure`, surface it once, and build the outcome.
    fn fail(&self, failure: ConversionFailure) -> SubmitOutcome {
        warn!("Conversion failed ({}): {}", failure.code(), failure);
        self.lock().last_failure = Some(failure.clone());

        match &failure {
            ConversionFailure::SessionExpired => {
                if let Err(e) = self.session.clear(AuthChange::Expired) {
                    warn!("Could not clear expired session: {}", e);
                }
                self.notifications.show_toast(Toast::warning(failure.to_string()));
                self.navigator.navigate(Route::Login);
            }
            ConversionFailure::RowLimitExceeded { message }
            | ConversionFailure::TooLarge { message } => {
                self.notifications
                    .show_toast(Toast::error(message.clone()).persistent());
            }
            ConversionFailure::QuotaExhausted {
                message,
                used,
                limit,
            } => {
                self.notifications.open_modal(Modal {
                    message: message.clone(),
                    used: *used,
                    limit: *limit,
                });
            }
            ConversionFailure::NotAuthenticated | ConversionFailure::ServerError { .. } => {
                self.lock().inline_error = Some(failure.to_string());
            }
            ConversionFailure::UnsupportedFormat { .. } | ConversionFailure::Unknown { .. } => {
                self.notifications.show_toast(Toast::error(failure.to_string()));
            }
        }

        SubmitOutcome::Failed { failure }
    }

    /// Re-fetch the user after a success. Never surfaces errors; a 401 still
    /// ends the session.
    async fn refresh_usage(&self, token: &str) {
        let user = match self.api.current_user(token).await {
            Ok(user) => user,
            Err(e) if e.status() == Some(401) => {
                warn!("Usage refresh rejected the session; clearing it");
                if let Err(clear) = self.session.clear(AuthChange::Expired) {
                    warn!("Could not clear expired session: {}", clear);
                }
                return;
            }
            Err(e) => {
                warn!("Usage refresh failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.session.set_user(&user) {
            warn!("Could not cache refreshed user: {}", e);
        }

        let limit = self.config.free_monthly_limit;
        if let Some(remaining) = user.remaining_conversions(limit) {
            self.notifications.show_toast(Toast::info(format!(
                "{remaining} conversion(s) left this month ({}/{limit} used).",
                user.conversions_this_month
            )));
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl std::fmt::Debug for ConversionWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionWorkflow")
            .field("state", &self.state())
            .field("pending", &self.pending_file().map(|p| p.name))
            .field("artifact", &self.artifact().map(|a| a.filename))
            .finish()
    }
}
