//! Python analysis and transform engine for molt.
//!
//! This crate holds the semantic core of the minifier:
//! - Module assets (`asset`): a qualified name plus the current tree
//! - Scope analysis (`analysis::scope`): the lexical scope model with
//!   binding/access records and conservatism predicates
//! - Literal-duplication analysis (`analysis::literals`)
//! - The whole-program import graph (`analysis::imports`), with `Unknown`
//!   as a first-class state
//! - The transform passes (`transform`): scope-safe renaming, literal
//!   hoisting, dead-code removal, and the batchable mechanical passes
//! - Bundle loaders (`loader`) and the fresh-identifier generator
//!   (`names`)
//!
//! Everything here is pure with respect to the pipeline: analyses are
//! immutable snapshots per tree revision, transforms consume a tree and
//! return a new one, and the import graph is frozen after loading.

pub mod analysis;
pub mod asset;
pub mod loader;
pub mod names;
pub mod transform;

pub use analysis::{Analyses, AnalyzerKind, ImportGraph, ModuleGraph};
pub use asset::PythonModule;
pub use loader::{ImportGraphLoaderOptions, LoadedBundle, Loader, SourceDirectoryOptions};
pub use names::NameRegistry;
pub use transform::{run_batch, Transformer, TransformerKind};
