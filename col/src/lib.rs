//! Context orchestration layer.
//!
//! Keeps one structured [`core::context::Context`] per task, renders it into
//! a deterministic system prompt, parses strict JSON model output, records
//! every run and merges suggested updates only after user approval.
//!
//! - **[`core`]**: Pure, deterministic logic (context model, rendering,
//!   parsing, recording, diff/merge, validation). No I/O.
//! - **[`io`]**: Files on disk (config, context store, response and run files).
//! - **[`providers`]**: The model endpoint seam and its HTTP adapters.
//!
//! [`run`] and [`apply`] coordinate core logic with I/O for the CLI commands.

pub mod apply;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod providers;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
