//! Utility functions and helpers for gemcache.
//!
//! This module provides cross-cutting concerns like structured logging,
//! secret sanitization, and retry logic with backoff for remote calls.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with security filters.
//! - `retry`: Transport retries that respect upstream API hints.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
