//! # tinyrel-common
//!
//! Shared identifier types and constants for the TinyRel storage engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// System-wide constants
pub mod constants;

/// Identifier newtypes
pub mod types;
