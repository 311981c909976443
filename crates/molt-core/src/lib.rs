//! Core infrastructure for molt.
//!
//! This crate provides the language-agnostic pieces of the pipeline:
//! - Configuration model decoded from JSON (`config`)
//! - Qualified-name selectors for include/exclude rules (`selector`)
//! - Glob-based file filtering for source discovery (`filter`)
//! - Unified error type with stable exit codes (`error`)

pub mod config;
pub mod error;
pub mod filter;
pub mod selector;

pub use config::{BundleConfig, ComponentConfig, MoltConfig, PackageConfig};
pub use error::{ExitStatus, MoltError, MoltResult};
pub use filter::{FileFilter, FilterError};
pub use selector::{any_matches_identifier, any_matches_module, QualifiedName, SelectorError};
