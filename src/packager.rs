//! Output packaging.
//!
//! The directory packager writes one file per module under the target
//! base path, preserving package structure (`pkg/sub/mod.py`,
//! `pkg/__init__.py`). The output location template may reference the
//! package name.

use std::fs;
use std::path::Path;

use molt_core::{MoltError, MoltResult};
use molt_python::PythonModule;
use serde::Deserialize;

/// Options for the directory packager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryPackagerOptions {
    /// Output directory relative to the target base path;
    /// `{package_name}` expands to the configured package name.
    pub output_path: String,
}

impl Default for DirectoryPackagerOptions {
    fn default() -> Self {
        DirectoryPackagerOptions {
            output_path: "{package_name}".to_string(),
        }
    }
}

/// The closed set of packagers.
#[derive(Debug, Clone)]
pub enum Packager {
    Directory(DirectoryPackagerOptions),
}

impl Packager {
    /// The name this packager goes by in configuration and logs.
    pub fn config_name(&self) -> &'static str {
        match self {
            Packager::Directory(_) => "directory",
        }
    }

    /// Write every module's current text; returns the file count.
    pub fn package(
        &self,
        target_base: &Path,
        package_name: &str,
        modules: &[PythonModule],
    ) -> MoltResult<usize> {
        match self {
            Packager::Directory(options) => {
                let output_dir =
                    target_base.join(options.output_path.replace("{package_name}", package_name));
                for module in modules {
                    let path = output_dir.join(module.output_path());
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent).map_err(|e| {
                            MoltError::package(format!(
                                "cannot create {}: {e}",
                                parent.display()
                            ))
                        })?;
                    }
                    fs::write(&path, module.to_source()).map_err(|e| {
                        MoltError::package(format!("cannot write {}: {e}", path.display()))
                    })?;
                    tracing::debug!(module = module.full_name(), path = %path.display(), "wrote");
                }
                Ok(modules.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, is_package: bool, source: &str) -> PythonModule {
        PythonModule::parse(name, is_package, source).unwrap()
    }

    #[test]
    fn writes_package_preserving_layout() {
        let dir = tempfile::tempdir().unwrap();
        let modules = vec![
            module("app", false, "x = 1\n"),
            module("pkg", true, ""),
            module("pkg.util", false, "y = 2\n"),
        ];
        let packager = Packager::Directory(DirectoryPackagerOptions::default());
        let written = packager.package(dir.path(), "dist", &modules).unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/app.py")).unwrap(),
            "x = 1\n"
        );
        assert!(dir.path().join("dist/pkg/__init__.py").is_file());
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/pkg/util.py")).unwrap(),
            "y = 2\n"
        );
    }

    #[test]
    fn output_path_template_expands_package_name() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Packager::Directory(DirectoryPackagerOptions {
            output_path: "out/{package_name}-bundle".to_string(),
        });
        let modules = vec![module("m", false, "x = 1\n")];
        packager.package(dir.path(), "web", &modules).unwrap();
        assert!(dir.path().join("out/web-bundle/m.py").is_file());
    }

    #[test]
    fn unwritable_target_is_a_package_error() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the output directory should go
        fs::write(dir.path().join("dist"), "blocking file").unwrap();
        let packager = Packager::Directory(DirectoryPackagerOptions::default());
        let modules = vec![module("m", false, "x = 1\n")];
        let err = packager.package(dir.path(), "dist", &modules).unwrap_err();
        assert_eq!(err.exit_status().code(), 5);
    }
}
