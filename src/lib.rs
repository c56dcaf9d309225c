//! Stock Statistics Gateway Library
//!
//! This library exposes the core modules for use in benchmarks and tests.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
