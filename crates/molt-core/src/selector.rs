//! Qualified-name selectors for include/exclude configuration.
//!
//! A selector names a module by dotted path, optionally narrowed to an
//! identifier path within that module:
//!
//! - `pkg.mod` — the module `pkg.mod` and every module below it
//! - `pkg.mod:func` — the identifier `func` inside `pkg.mod`
//! - `pkg.mod:Class.method` — nested identifier paths
//!
//! Module matching is segment-wise prefix matching: `pkg` matches
//! `pkg.sub.mod` but not `pkgother`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when parsing a selector string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid selector {input:?}: {reason}")]
pub struct SelectorError {
    pub input: String,
    pub reason: &'static str,
}

/// A fully qualified dotted name, optionally with an identifier suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    module_path: Vec<String>,
    ident_path: Vec<String>,
}

impl QualifiedName {
    /// The module part, joined with dots.
    pub fn module(&self) -> String {
        self.module_path.join(".")
    }

    /// True if the selector names an identifier, not just a module.
    pub fn has_identifier(&self) -> bool {
        !self.ident_path.is_empty()
    }

    /// The identifier part, joined with dots (empty when absent).
    pub fn identifier(&self) -> String {
        self.ident_path.join(".")
    }

    /// Whether this selector covers `module_name` as a whole.
    ///
    /// A module-only selector matches the named module and everything
    /// below it. A selector with an identifier part never matches a whole
    /// module.
    pub fn matches_module(&self, module_name: &str) -> bool {
        if self.has_identifier() {
            return false;
        }
        self.module_path_matches(module_name)
    }

    /// Whether this selector covers `identifier` inside `module_name`.
    ///
    /// A module-only selector covers every identifier in the modules it
    /// matches; an identifier selector requires the exact module and its
    /// first identifier segment to match.
    pub fn matches_identifier(&self, module_name: &str, identifier: &str) -> bool {
        if !self.has_identifier() {
            return self.module_path_matches(module_name);
        }
        self.module() == module_name && self.ident_path[0] == identifier
    }

    fn module_path_matches(&self, module_name: &str) -> bool {
        let segments: Vec<&str> = module_name.split('.').collect();
        if segments.len() < self.module_path.len() {
            return false;
        }
        self.module_path
            .iter()
            .zip(segments.iter())
            .all(|(a, b)| a == b)
    }
}

impl FromStr for QualifiedName {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = |reason| SelectorError {
            input: input.to_string(),
            reason,
        };
        let (module_part, ident_part) = match input.split_once(':') {
            Some((m, i)) => (m, Some(i)),
            None => (input, None),
        };
        if module_part.is_empty() {
            return Err(error("empty module path"));
        }
        let module_path: Vec<String> = module_part.split('.').map(str::to_string).collect();
        if module_path.iter().any(|s| !is_identifier(s)) {
            return Err(error("module path segments must be identifiers"));
        }
        let ident_path = match ident_part {
            None => Vec::new(),
            Some("") => return Err(error("empty identifier path after ':'")),
            Some(i) => {
                let path: Vec<String> = i.split('.').map(str::to_string).collect();
                if path.iter().any(|s| !is_identifier(s)) {
                    return Err(error("identifier path segments must be identifiers"));
                }
                path
            }
        };
        Ok(QualifiedName {
            module_path,
            ident_path,
        })
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module())?;
        if self.has_identifier() {
            write!(f, ":{}", self.identifier())?;
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// True if any selector in `selectors` covers the whole module.
pub fn any_matches_module(selectors: &[QualifiedName], module_name: &str) -> bool {
    selectors.iter().any(|s| s.matches_module(module_name))
}

/// True if any selector covers `identifier` in `module_name`.
pub fn any_matches_identifier(
    selectors: &[QualifiedName],
    module_name: &str,
    identifier: &str,
) -> bool {
    selectors
        .iter()
        .any(|s| s.matches_identifier(module_name, identifier))
}
