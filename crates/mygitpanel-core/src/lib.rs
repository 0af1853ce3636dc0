//! Canonical entities and store ports for MyGitPanel's polling core.
//!
//! This crate has no knowledge of GitHub, HTTP, or SQLite — it's the
//! shared vocabulary every other crate in the workspace builds on.

pub mod error;
pub mod models;
pub mod store;

pub use error::{CoreError, CoreResult};
