//! code-audit - resolve targets inside a multi-app project, run a static
//! analyzer over them and keep a score history
//!
//! This library provides the pipeline behind the `code-audit` binary: unit
//! discovery, target resolution, attribution filtering, analyzer invocation
//! and the run ledger.

// Deny all clippy warnings in this crate
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cargo_common_metadata
)]

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod analyzer;
pub mod attribution;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod output;
pub mod paths;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod target;
pub mod vcs;
