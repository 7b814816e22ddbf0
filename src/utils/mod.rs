//! Shared utilities.

pub mod cache;
