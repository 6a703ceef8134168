//! Shared utilities.
//!
//! Common utilities used across the crate.

pub mod hash;
