// Rust guideline compliant 2026-10-19

//! Adapters (secondary ports) for the conveyor binary.
//!
//! Each sub-module implements one or more port traits defined in the `domain`
//! or `monitor` crates.

pub mod bounded_queue;
pub mod json_file_store;
