//! Domain logic for the hunt tracker.
//!
//! This crate has no I/O and no internal dependencies so it can be shared by
//! the repository layer, the HTTP layer and any future tooling.

pub mod error;
pub mod hunting;
pub mod rollup;
pub mod tree;
pub mod types;
