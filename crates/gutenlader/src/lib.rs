//! Public facade crate for `gutenlader`.
//!
//! This crate intentionally contains no IO or corpus-specific logic.
//! It re-exports the backend-agnostic types/traits from `gutenlader-core`.

pub use gutenlader_core::*;
