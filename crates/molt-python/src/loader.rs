//! Bundle loaders.
//!
//! A loader produces the assets of one bundle plus the import graph the
//! non-batchable transforms consult:
//!
//! - [`Loader::ImportGraph`] starts from an entry-point file and chases
//!   static imports across the source root, so it sees the whole program
//!   and yields a `Known` graph. Imports that do not resolve to a file
//!   under the root (standard library, third-party distributions) are
//!   simply not part of the bundle.
//! - [`Loader::SourceDirectory`] loads every `.py` file under a directory
//!   through glob include/exclude patterns. Nothing guarantees the result
//!   is a whole program, so the graph is `Unknown` and the transforms
//!   stay conservative.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use molt_core::{FileFilter, MoltError, MoltResult};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::analysis::imports::{collect_imports, ImportGraph, ImportRecord, ModuleGraph};
use crate::asset::PythonModule;

/// The assets and reference graph of one loaded bundle.
#[derive(Debug)]
pub struct LoadedBundle {
    pub modules: Vec<PythonModule>,
    pub graph: ImportGraph,
}

/// Options for the import-graph loader.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportGraphLoaderOptions {
    /// Entry-point file, relative to the source base path.
    pub entry_point: PathBuf,
    /// Dotted module names to load even if nothing imports them.
    pub includes: Vec<String>,
}

/// Options for the source-directory loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceDirectoryOptions {
    /// Directory to scan, relative to the source base path.
    pub directory: PathBuf,
    /// Glob patterns of files to include (empty means everything).
    pub includes: Vec<String>,
    /// Glob patterns of files to exclude.
    pub excludes: Vec<String>,
}

impl Default for SourceDirectoryOptions {
    fn default() -> Self {
        SourceDirectoryOptions {
            directory: PathBuf::from("."),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

/// The closed set of loaders.
#[derive(Debug, Clone)]
pub enum Loader {
    ImportGraph(ImportGraphLoaderOptions),
    SourceDirectory(SourceDirectoryOptions),
}

impl Loader {
    /// The name this loader goes by in configuration and logs.
    pub fn config_name(&self) -> &'static str {
        match self {
            Loader::ImportGraph(_) => "import_graph",
            Loader::SourceDirectory(_) => "source_directory",
        }
    }

    /// Load the bundle's assets from disk.
    pub fn load(&self, source_base: &Path) -> MoltResult<LoadedBundle> {
        match self {
            Loader::ImportGraph(options) => load_import_graph(source_base, options),
            Loader::SourceDirectory(options) => load_source_directory(source_base, options),
        }
    }
}

// ============================================================================
// Import-graph loader
// ============================================================================

fn load_import_graph(
    source_base: &Path,
    options: &ImportGraphLoaderOptions,
) -> MoltResult<LoadedBundle> {
    if options.entry_point.as_os_str().is_empty() {
        return Err(MoltError::config(
            "import_graph loader requires an entry_point",
        ));
    }
    let entry_path = source_base.join(&options.entry_point);
    if !entry_path.is_file() {
        return Err(MoltError::load(format!(
            "entry point {} does not exist",
            entry_path.display()
        )));
    }
    let (root, entry_name) = locate_entry(&entry_path)?;
    tracing::debug!(root = %root.display(), entry = %entry_name, "chasing imports");

    let mut pending: VecDeque<String> = VecDeque::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    enqueue_with_ancestors(&entry_name, &mut pending);
    for include in &options.includes {
        enqueue_with_ancestors(include, &mut pending);
    }

    let mut modules: Vec<PythonModule> = Vec::new();
    while let Some(name) = pending.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some((path, is_package)) = resolve_module_file(&root, &name) else {
            // not under the source root: stdlib or third-party
            continue;
        };
        let source = fs::read_to_string(&path)
            .map_err(|e| MoltError::load(format!("cannot read {}: {e}", path.display())))?;
        let module = PythonModule::parse(name, is_package, &source)?;
        for record in collect_imports(&module) {
            enqueue_record(&record, &mut pending);
        }
        modules.push(module);
    }

    modules.sort_by(|a, b| a.full_name().cmp(b.full_name()));
    let graph = ImportGraph::Known(ModuleGraph::build(&modules));
    Ok(LoadedBundle { modules, graph })
}

/// The source root above the entry point's outermost package, and the
/// entry point's fully qualified module name.
fn locate_entry(entry_path: &Path) -> MoltResult<(PathBuf, String)> {
    let stem = entry_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            MoltError::load(format!("entry point {} has no stem", entry_path.display()))
        })?;
    let mut parts: Vec<String> = if stem == "__init__" {
        Vec::new()
    } else {
        vec![stem.to_string()]
    };
    let mut root = entry_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    while root.join("__init__.py").is_file() {
        let Some(package) = root.file_name().and_then(|s| s.to_str()) else {
            break;
        };
        parts.insert(0, package.to_string());
        let Some(parent) = root.parent() else {
            break;
        };
        root = parent.to_path_buf();
    }
    if parts.is_empty() {
        return Err(MoltError::load(format!(
            "cannot derive a module name for {}",
            entry_path.display()
        )));
    }
    Ok((root, parts.join(".")))
}

fn resolve_module_file(root: &Path, dotted: &str) -> Option<(PathBuf, bool)> {
    let rel: PathBuf = dotted.split('.').collect();
    let file = root.join(&rel).with_extension("py");
    if file.is_file() {
        return Some((file, false));
    }
    let init = root.join(&rel).join("__init__.py");
    if init.is_file() {
        return Some((init, true));
    }
    None
}

/// Queue a dotted name and every enclosing package.
fn enqueue_with_ancestors(dotted: &str, pending: &mut VecDeque<String>) {
    let parts: Vec<&str> = dotted.split('.').collect();
    for end in 1..=parts.len() {
        pending.push_back(parts[..end].join("."));
    }
}

fn enqueue_record(record: &ImportRecord, pending: &mut VecDeque<String>) {
    enqueue_with_ancestors(record.target(), pending);
    if let ImportRecord::Names { target, names } = record {
        // `from pkg import mod` may name a submodule
        for name in names {
            pending.push_back(format!("{target}.{name}"));
        }
    }
}

// ============================================================================
// Source-directory loader
// ============================================================================

fn load_source_directory(
    source_base: &Path,
    options: &SourceDirectoryOptions,
) -> MoltResult<LoadedBundle> {
    let directory = source_base.join(&options.directory);
    if !directory.is_dir() {
        return Err(MoltError::load(format!(
            "source directory {} does not exist",
            directory.display()
        )));
    }
    let filter = FileFilter::new(&options.includes, &options.excludes)
        .map_err(|e| MoltError::config(e.to_string()))?;

    let mut modules = Vec::new();
    for entry in WalkDir::new(&directory).sort_by_file_name() {
        let entry = entry.map_err(|e| MoltError::load(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }
        let relative = path
            .strip_prefix(&directory)
            .map_err(|e| MoltError::load(e.to_string()))?;
        if !filter.matches(relative) {
            continue;
        }
        let Some(name) = module_name_for(&directory, relative) else {
            continue;
        };
        let is_package = path.file_name().and_then(|s| s.to_str()) == Some("__init__.py");
        let source = fs::read_to_string(path)
            .map_err(|e| MoltError::load(format!("cannot read {}: {e}", path.display())))?;
        modules.push(PythonModule::parse(name, is_package, &source)?);
    }

    modules.sort_by(|a, b| a.full_name().cmp(b.full_name()));
    Ok(LoadedBundle {
        modules,
        graph: ImportGraph::Unknown,
    })
}

/// Dotted module name for a file relative to the scanned directory. A
/// root-level `__init__.py` names the package after the directory itself.
fn module_name_for(directory: &Path, relative: &Path) -> Option<String> {
    let mut parts: Vec<String> = relative
        .iter()
        .filter_map(|c| c.to_str())
        .map(str::to_string)
        .collect();
    let last = parts.pop()?;
    match last.strip_suffix(".py") {
        Some("__init__") => {}
        Some(stem) => parts.push(stem.to_string()),
        None => return None,
    }
    if parts.is_empty() {
        let package = directory.file_name()?.to_str()?;
        parts.push(package.to_string());
    }
    Some(parts.join("."))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(bundle: &LoadedBundle) -> Vec<&str> {
        bundle.modules.iter().map(|m| m.full_name()).collect()
    }

    mod import_graph_loader {
        use super::*;

        fn loader(entry: &str) -> Loader {
            Loader::ImportGraph(ImportGraphLoaderOptions {
                entry_point: PathBuf::from(entry),
                includes: Vec::new(),
            })
        }

        #[test]
        fn chases_imports_from_the_entry_point() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "app.py", "from pkg.util import helper\nhelper()\n");
            write(dir.path(), "pkg/__init__.py", "");
            write(dir.path(), "pkg/util.py", "def helper():\n    pass\n");
            write(dir.path(), "pkg/unrelated.py", "x = 1\n");

            let bundle = loader("app.py").load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["app", "pkg", "pkg.util"]);
            assert!(bundle.graph.is_known());
            assert_eq!(bundle.graph.name_imported("pkg.util", "helper"), Some(true));
        }

        #[test]
        fn entry_inside_a_package_gets_a_qualified_name() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "pkg/__init__.py", "");
            write(dir.path(), "pkg/main.py", "from . import sibling\n");
            write(dir.path(), "pkg/sibling.py", "x = 1\n");

            let bundle = loader("pkg/main.py").load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["pkg", "pkg.main", "pkg.sibling"]);
        }

        #[test]
        fn external_imports_are_skipped() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "app.py", "import os\nimport json\n");

            let bundle = loader("app.py").load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["app"]);
        }

        #[test]
        fn includes_force_extra_modules() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "app.py", "x = 1\n");
            write(dir.path(), "plugin.py", "y = 2\n");

            let loader = Loader::ImportGraph(ImportGraphLoaderOptions {
                entry_point: PathBuf::from("app.py"),
                includes: vec!["plugin".to_string()],
            });
            let bundle = loader.load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["app", "plugin"]);
        }

        #[test]
        fn submodule_named_in_from_import_is_loaded() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "app.py", "from pkg import mod\n");
            write(dir.path(), "pkg/__init__.py", "");
            write(dir.path(), "pkg/mod.py", "x = 1\n");

            let bundle = loader("app.py").load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["app", "pkg", "pkg.mod"]);
        }

        #[test]
        fn missing_entry_point_is_a_load_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = loader("absent.py").load(dir.path()).unwrap_err();
            assert_eq!(err.exit_status().code(), 3);
        }

        #[test]
        fn missing_entry_point_option_is_a_config_error() {
            let dir = tempfile::tempdir().unwrap();
            let loader = Loader::ImportGraph(ImportGraphLoaderOptions::default());
            let err = loader.load(dir.path()).unwrap_err();
            assert_eq!(err.exit_status().code(), 2);
        }

        #[test]
        fn unparsable_module_reports_its_name() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "app.py", "import broken\n");
            write(dir.path(), "broken.py", "def (:\n");
            let err = loader("app.py").load(dir.path()).unwrap_err();
            assert!(err.to_string().contains("broken"));
        }
    }

    mod source_directory_loader {
        use super::*;

        fn loader(options: SourceDirectoryOptions) -> Loader {
            Loader::SourceDirectory(options)
        }

        #[test]
        fn loads_every_python_file() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "src/a.py", "x = 1\n");
            write(dir.path(), "src/pkg/__init__.py", "");
            write(dir.path(), "src/pkg/b.py", "y = 2\n");
            write(dir.path(), "src/notes.txt", "not python");

            let options = SourceDirectoryOptions {
                directory: PathBuf::from("src"),
                ..SourceDirectoryOptions::default()
            };
            let bundle = loader(options).load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["a", "pkg", "pkg.b"]);
            assert!(!bundle.graph.is_known());
        }

        #[test]
        fn excludes_filter_files_out() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "src/keep.py", "x = 1\n");
            write(dir.path(), "src/tests/test_keep.py", "y = 2\n");

            let options = SourceDirectoryOptions {
                directory: PathBuf::from("src"),
                excludes: vec!["tests/**".to_string()],
                ..SourceDirectoryOptions::default()
            };
            let bundle = loader(options).load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["keep"]);
        }

        #[test]
        fn root_init_names_the_package_after_the_directory() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "mypkg/__init__.py", "x = 1\n");
            write(dir.path(), "mypkg/mod.py", "y = 2\n");

            let options = SourceDirectoryOptions {
                directory: PathBuf::from("mypkg"),
                ..SourceDirectoryOptions::default()
            };
            let bundle = loader(options).load(dir.path()).unwrap();
            assert_eq!(names(&bundle), vec!["mod", "mypkg"]);
            let package = bundle
                .modules
                .iter()
                .find(|m| m.full_name() == "mypkg")
                .unwrap();
            assert!(package.is_package());
        }

        #[test]
        fn missing_directory_is_a_load_error() {
            let dir = tempfile::tempdir().unwrap();
            let options = SourceDirectoryOptions {
                directory: PathBuf::from("absent"),
                ..SourceDirectoryOptions::default()
            };
            let err = loader(options).load(dir.path()).unwrap_err();
            assert_eq!(err.exit_status().code(), 3);
        }
    }
}
