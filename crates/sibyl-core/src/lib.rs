//! Core types and trait definitions for the Sibyl knowledge engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod document;
pub mod error;
pub mod qa;
pub mod relation;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
