//! I/O helpers for `col` commands.

pub mod config;
pub mod context_store;
pub mod json_file;
pub mod run_store;
