//! # Buildtrack App Library
//!
//! The presentation shell over `buildtrack-core`, exposed as a library so
//! integration tests can drive the HTTP router and the config loader.

pub mod api;
pub mod cli;
pub mod config;
