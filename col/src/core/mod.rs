//! Deterministic, pure logic for context orchestration.
//!
//! Nothing under `core` touches the filesystem, network, clock or
//! environment. Every function maps in-memory values to in-memory values.

pub mod context;
pub mod json;
pub mod merge;
pub mod record;
pub mod render;
pub mod response;
pub mod schema;
pub mod validate;
