//! Python syntax tree support for molt.
//!
//! This crate is the syntax collaborator consumed by the analysis and
//! transform engine. It provides:
//! - A tokenizer and recursive-descent parser for the Python subset molt
//!   operates on ([`parse_module`], [`parse_expression`])
//! - An owned node model with per-node identity ([`NodeId`]) suitable for
//!   keying analysis tables
//! - Canonical code generation ([`Codegen`], `Module::to_source`)
//! - Read-only traversal ([`Visitor`]) and pure rebuilding ([`Rewrite`])
//!
//! The printer is canonical rather than formatting-preserving: parsing the
//! printed form and printing again yields identical text, which is the
//! fixed point the engine's idempotence guarantees build on.

pub mod codegen;
pub mod error;
pub mod nodes;
pub mod parser;
pub mod rewrite;
pub mod tokenizer;
pub mod visitor;

pub use codegen::{Codegen, CodegenState};
pub use error::ParseError;
pub use nodes::{is_keyword, Module, Name, NodeId, NodeIdGen, KEYWORDS};
pub use parser::{parse_expression, parse_module};
pub use rewrite::{rewrite_tree, Rewrite, Transform};
pub use visitor::{walk_module, VisitResult, Visitor};
