//! Module assets.
//!
//! A [`PythonModule`] pairs a stable identity (the fully qualified dotted
//! name) with the current syntax tree. The identity never changes; the
//! tree is replaced, never mutated, as transformers run — the old tree
//! stays valid until the replacement is installed, so a failed transform
//! leaves the asset untouched.

use std::path::PathBuf;

use molt_core::{MoltError, MoltResult};
use molt_python_cst::{parse_module, Module};

/// One Python source file in a bundle.
#[derive(Debug, Clone)]
pub struct PythonModule {
    full_name: String,
    is_package: bool,
    tree: Module,
}

impl PythonModule {
    /// Create an asset from an already-parsed tree.
    pub fn new(full_name: impl Into<String>, is_package: bool, tree: Module) -> Self {
        PythonModule {
            full_name: full_name.into(),
            is_package,
            tree,
        }
    }

    /// Parse source text into an asset.
    pub fn parse(
        full_name: impl Into<String>,
        is_package: bool,
        source: &str,
    ) -> MoltResult<Self> {
        let full_name = full_name.into();
        let tree = parse_module(source)
            .map_err(|e| MoltError::parse(full_name.clone(), e.to_string()))?;
        Ok(PythonModule {
            full_name,
            is_package,
            tree,
        })
    }

    /// Fully qualified dotted module name, e.g. `pkg.sub.mod`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Whether this asset is a package `__init__` module.
    pub fn is_package(&self) -> bool {
        self.is_package
    }

    /// The package this module lives in (`pkg.sub` for `pkg.sub.mod`),
    /// or the module itself for packages.
    pub fn package(&self) -> String {
        if self.is_package {
            return self.full_name.clone();
        }
        match self.full_name.rsplit_once('.') {
            Some((package, _)) => package.to_string(),
            None => String::new(),
        }
    }

    /// Current syntax tree.
    pub fn tree(&self) -> &Module {
        &self.tree
    }

    /// Install a replacement tree.
    pub fn replace_tree(&mut self, tree: Module) {
        self.tree = tree;
    }

    /// Render the current tree to source text.
    pub fn to_source(&self) -> String {
        self.tree.to_source()
    }

    /// Output path relative to the package root: `pkg/mod.py`, or
    /// `pkg/__init__.py` for packages.
    pub fn output_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.full_name.split('.') {
            path.push(segment);
        }
        if self.is_package {
            path.push("__init__.py");
        } else {
            path.set_extension("py");
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_module_name_on_failure() {
        let err = PythonModule::parse("pkg.bad", false, "def (:\n").unwrap_err();
        assert!(err.to_string().contains("pkg.bad"));
    }

    #[test]
    fn output_path_for_plain_module() {
        let asset = PythonModule::parse("pkg.sub.mod", false, "x = 1\n").unwrap();
        assert_eq!(asset.output_path(), PathBuf::from("pkg/sub/mod.py"));
        assert_eq!(asset.package(), "pkg.sub");
    }

    #[test]
    fn output_path_for_package() {
        let asset = PythonModule::parse("pkg", true, "").unwrap();
        assert_eq!(asset.output_path(), PathBuf::from("pkg/__init__.py"));
        assert_eq!(asset.package(), "pkg");
    }

    #[test]
    fn replace_tree_keeps_identity() {
        let mut asset = PythonModule::parse("m", false, "x = 1\n").unwrap();
        let replacement = molt_python_cst::parse_module("y = 2\n").unwrap();
        asset.replace_tree(replacement);
        assert_eq!(asset.full_name(), "m");
        assert_eq!(asset.to_source(), "y = 2\n");
    }
}
