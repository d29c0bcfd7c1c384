//! Pipeline stages for one spreadsheet-to-deck submission.
//!
//! Each submodule implements exactly one step and holds no workflow state,
//! so every rule can be tested without a network or a runtime.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ (upload) ──▶ classify ──▶ slug ──▶ artifact
//! (validate)   (api)      (status)    (name)    (temp file)
//! ```
//!
//! 1. [`intake`]: extension class + size ceiling checks on the selected file
//! 2. [`classify`]: map status + detail message to a [`crate::error::ConversionFailure`],
//!    parse the warnings header
//! 3. [`slug`]: derive the download filename from the report title
//! 4. [`artifact`]: hold the returned deck on disk until it is released

pub mod artifact;
pub mod classify;
pub mod intake;
pub mod slug;
