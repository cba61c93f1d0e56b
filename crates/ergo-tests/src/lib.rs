//! # ergo-tests
//!
//! Integration tests for the Ergo light-client verification crates.
//!
//! This crate provides:
//! - Generators for authentic header chains, forks and Merkle trees
//! - Sanity tests for the prove / encode / verify pipeline
//! - Validation tests for rejected proofs
//! - Sync tests for verifiers fed by several peers
//! - Property-based tests for Merkle proofs and proof comparison

pub mod generators;
pub mod harness;

#[cfg(test)]
mod sanity_tests;


#[cfg(test)]
mod sync_tests;


pub use generators::*;
pub use harness::*;
