//! molt — whole-program Python minifier.
//!
//! The workspace splits into the syntax collaborator
//! ([`molt_python_cst`]), shared infrastructure ([`molt_core`]), the
//! analysis-and-transform engine ([`molt_python`]), and this crate, which
//! orchestrates them: an explicit component registry, the two-lane
//! compiler pipeline, and output packaging. The `molt` binary is a thin
//! CLI over [`Compiler`].

pub mod compiler;
pub mod packager;
pub mod registry;

pub use compiler::{AssetFailure, Compiler, RunReport};
pub use packager::{DirectoryPackagerOptions, Packager};
pub use registry::Registry;
