//! Result types returned by the conversion workflow.

use crate::error::ConversionFailure;
use crate::pipeline::artifact::ArtifactSummary;
use serde::Serialize;

/// Observable phase of a [`crate::workflow::ConversionWorkflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Submitting,
}

/// What a call to `submit` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SubmitOutcome {
    /// No pending file; nothing happened.
    NoFile,
    /// Another submission is in flight; this one was refused.
    Busy,
    Succeeded(ArtifactSummary),
    Failed { failure: ConversionFailure },
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }

    pub fn failure(&self) -> Option<&ConversionFailure> {
        match self {
            SubmitOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Per-submission user choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Blank means "use the configured default title".
    pub title: String,
    /// `None` means "use the configured default theme".
    pub theme: Option<crate::config::Theme>,
}

impl ConversionOptions {
    pub fn new(title: impl Into<String>, theme: crate::config::Theme) -> Self {
        Self {
            title: title.into(),
            theme: Some(theme),
        }
    }
}
