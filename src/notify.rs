//! Transient notification surfaces: one toast and one modal.
//!
//! The two surfaces are independent, not a queue. A new toast replaces the
//! current one and cancels its auto-dismiss timer; the modal stays until
//! the user closes it. Either can be visible while the other is.
//!
//! Presentation code observes the state through a [`NotificationListener`]
//! (every method has a no-op default) or by polling [`Notifications::toast`]
//! and [`Notifications::modal`]. This module decides nothing about *what*
//! to show; the workflow does.
//!
//! # Example
//!
//! ```rust
//! use sheet2deck::notify::{NotificationListener, Notifications, Toast};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl NotificationListener for Printer {
//!     fn on_toast(&self, toast: &Toast) {
//!         eprintln!("{}", toast.message);
//!     }
//! }
//!
//! let notifications = Notifications::new(Duration::from_secs(6));
//! notifications.subscribe(Arc::new(Printer));
//! notifications.show_toast(Toast::error("File too large").persistent());
//! ```

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Visual severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single toast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    /// Stays until closed or replaced instead of auto-dismissing.
    pub persistent: bool,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            persistent: false,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, message)
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// The blocking quota dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub message: String,
    pub used: Option<u32>,
    pub limit: Option<u32>,
}

/// Observer of notification changes.
///
/// Implementations must be `Send + Sync`: auto-dismiss fires from a tokio
/// task. Methods are invoked without any internal lock held.
pub trait NotificationListener: Send + Sync {
    /// A toast became visible (replacing any previous one).
    fn on_toast(&self, toast: &Toast) {
        let _ = toast;
    }

    /// The visible toast went away (timer or explicit close).
    fn on_toast_dismissed(&self) {}

    fn on_modal_opened(&self, modal: &Modal) {
        let _ = modal;
    }

    fn on_modal_closed(&self) {}
}

/// A no-op listener.
pub struct NoopNotificationListener;

impl NotificationListener for NoopNotificationListener {}

#[derive(Default)]
struct State {
    toast: Option<Toast>,
    /// Bumped on every toast change so a stale timer cannot clear a newer toast.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    modal: Option<Modal>,
    listeners: Vec<Arc<dyn NotificationListener>>,
}

/// Shared toast + modal state. Clones observe the same surfaces.
#[derive(Clone)]
pub struct Notifications {
    state: Arc<Mutex<State>>,
    toast_timeout: Duration,
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications")
            .field("toast", &self.toast())
            .field("modal", &self.modal())
            .field("toast_timeout", &self.toast_timeout)
            .finish()
    }
}

impl Notifications {
    pub fn new(toast_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            toast_timeout,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn NotificationListener>) {
        self.lock().listeners.push(listener);
    }

    /// Currently visible toast.
    pub fn toast(&self) -> Option<Toast> {
        self.lock().toast.clone()
    }

    /// Currently open modal.
    pub fn modal(&self) -> Option<Modal> {
        self.lock().modal.clone()
    }

    /// Show `toast`, replacing the current one and cancelling its timer.
    ///
    /// Non-persistent toasts are dismissed after the configured delay. That
    /// needs a tokio runtime; without one the toast simply stays.
    pub fn show_toast(&self, toast: Toast) {
        let listeners = {
            let mut state = self.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation += 1;
            let generation = state.generation;

            if !toast.persistent {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        let this = self.clone();
                        let delay = self.toast_timeout;
                        state.timer = Some(handle.spawn(async move {
                            tokio::time::sleep(delay).await;
                            this.expire(generation);
                        }));
                    }
                    Err(_) => warn!("No tokio runtime; toast will not auto-dismiss"),
                }
            }

            debug!("Toast ({:?}): {}", toast.level, toast.message);
            state.toast = Some(toast.clone());
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_toast(&toast);
        }
    }

    /// Close the toast now.
    pub fn dismiss_toast(&self) {
        let listeners = {
            let mut state = self.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation += 1;
            if state.toast.take().is_none() {
                return;
            }
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_toast_dismissed();
        }
    }

    pub fn open_modal(&self, modal: Modal) {
        let listeners = {
            let mut state = self.lock();
            state.modal = Some(modal.clone());
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_modal_opened(&modal);
        }
    }

    /// Close the modal (user action only).
    pub fn close_modal(&self) {
        let listeners = {
            let mut state = self.lock();
            if state.modal.take().is_none() {
                return;
            }
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_modal_closed();
        }
    }

    fn expire(&self, generation: u64) {
        let listeners = {
            let mut state = self.lock();
            if state.generation != generation || state.toast.is_none() {
                return;
            }
            state.toast = None;
            state.timer = None;
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_toast_dismissed();
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking listener never runs under this lock, so poisoning
        // only means a panic elsewhere; the state itself is still valid.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
