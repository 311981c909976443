//! Import graph analysis.
//!
//! The whole-program reference graph answers two questions for the
//! transform passes: which modules import a given module, and whether a
//! specific identifier of that module is statically imported anywhere.
//! `import m` and `from p import m` count as importing every identifier
//! of `m` (any attribute may be referenced through the module object),
//! and `from m import *` does the same because the bound names are
//! unknowable statically.
//!
//! "Unknown" is a first-class state: loaders that cannot see the whole
//! program produce [`ImportGraph::Unknown`], and every query then returns
//! `None`, which forces conservative behavior downstream.

use std::collections::{BTreeMap, BTreeSet};

use molt_python_cst::nodes::*;
use molt_python_cst::visitor::{walk_module, VisitResult, Visitor};

use crate::asset::PythonModule;

/// One static import recorded from a module body, with the target
/// resolved to an absolute dotted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRecord {
    /// `import target` (or `import target as alias`).
    Module { target: String },
    /// `from target import name, ...` — `names` are the identifiers as
    /// they exist in the target module, not local aliases.
    Names { target: String, names: Vec<String> },
    /// `from target import *`.
    Star { target: String },
}

impl ImportRecord {
    /// The imported module path.
    pub fn target(&self) -> &str {
        match self {
            ImportRecord::Module { target } => target,
            ImportRecord::Names { target, .. } => target,
            ImportRecord::Star { target } => target,
        }
    }
}

/// Collect the static imports of a module, resolving relative imports
/// against the module's own dotted name. Unresolvable relative imports
/// (more leading dots than enclosing packages) are dropped.
pub fn collect_imports(module: &PythonModule) -> Vec<ImportRecord> {
    let mut collector = ImportCollector {
        records: Vec::new(),
        importer: module.full_name().to_string(),
        is_package: module.is_package(),
    };
    walk_module(&mut collector, module.tree());
    collector.records
}

struct ImportCollector {
    records: Vec<ImportRecord>,
    importer: String,
    is_package: bool,
}

impl ImportCollector {
    /// Absolute target for a `from`-import with `relative` leading dots.
    fn resolve_relative(&self, relative: u32, module: Option<&DottedName>) -> Option<String> {
        if relative == 0 {
            return module.map(DottedName::dotted);
        }
        let mut base: Vec<&str> = self.importer.split('.').collect();
        if !self.is_package {
            base.pop();
        }
        for _ in 1..relative {
            if base.pop().is_none() {
                return None;
            }
        }
        let mut parts: Vec<String> = base.into_iter().map(str::to_string).collect();
        if let Some(module) = module {
            parts.extend(module.parts.iter().map(|n| n.value.clone()));
        }
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("."))
    }
}

impl Visitor for ImportCollector {
    fn visit_import(&mut self, node: &Import) -> VisitResult {
        for alias in &node.names {
            self.records.push(ImportRecord::Module {
                target: alias.name.dotted(),
            });
        }
        VisitResult::Continue
    }

    fn visit_import_from(&mut self, node: &ImportFrom) -> VisitResult {
        let Some(target) = self.resolve_relative(node.relative, node.module.as_ref()) else {
            return VisitResult::Continue;
        };
        match &node.names {
            ImportNames::Star => self.records.push(ImportRecord::Star { target }),
            ImportNames::Aliases(aliases) => self.records.push(ImportRecord::Names {
                target,
                names: aliases.iter().map(|a| a.name.value.clone()).collect(),
            }),
        }
        VisitResult::Continue
    }
}

/// The whole-program import graph, or the explicit absence of one.
#[derive(Debug)]
pub enum ImportGraph {
    /// No whole-program view; every query answers `None`.
    Unknown,
    Known(ModuleGraph),
}

impl ImportGraph {
    pub fn is_known(&self) -> bool {
        matches!(self, ImportGraph::Known(_))
    }

    /// Modules that import `module`, or `None` when the graph is unknown.
    pub fn importers_of(&self, module: &str) -> Option<BTreeSet<&str>> {
        match self {
            ImportGraph::Unknown => None,
            ImportGraph::Known(graph) => Some(graph.importers_of(module)),
        }
    }

    /// Whether any other module statically imports `name` from `module`.
    /// `None` when the graph is unknown.
    pub fn name_imported(&self, module: &str, name: &str) -> Option<bool> {
        match self {
            ImportGraph::Unknown => None,
            ImportGraph::Known(graph) => Some(graph.name_imported(module, name)),
        }
    }
}

/// Frozen import relationships between the modules of one bundle.
///
/// Built once after loading and treated as read-only from then on; the
/// parallel transform lane shares it without locking.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// Importer module name -> its import records.
    imports: BTreeMap<String, Vec<ImportRecord>>,
}

impl ModuleGraph {
    /// Build the graph from a loaded bundle.
    pub fn build(modules: &[PythonModule]) -> ModuleGraph {
        let mut imports = BTreeMap::new();
        for module in modules {
            imports.insert(module.full_name().to_string(), collect_imports(module));
        }
        ModuleGraph { imports }
    }

    /// Records of one importer (loaders use this while chasing imports).
    pub fn imports_of(&self, importer: &str) -> &[ImportRecord] {
        self.imports.get(importer).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record_covers_module(record: &ImportRecord, module: &str) -> bool {
        match record {
            ImportRecord::Module { target } => target == module,
            ImportRecord::Star { target } => target == module,
            ImportRecord::Names { target, names } => {
                // `from p import m` imports the module `p.m` wholesale
                target == module
                    || names.iter().any(|n| {
                        module.strip_prefix(target.as_str())
                            .and_then(|rest| rest.strip_prefix('.'))
                            == Some(n.as_str())
                    })
            }
        }
    }

    /// Modules whose import statements reference `module`.
    pub fn importers_of(&self, module: &str) -> BTreeSet<&str> {
        self.imports
            .iter()
            .filter(|(importer, _)| importer.as_str() != module)
            .filter(|(_, records)| {
                records
                    .iter()
                    .any(|r| Self::record_covers_module(r, module))
            })
            .map(|(importer, _)| importer.as_str())
            .collect()
    }

    /// True if any other module imports `name` from `module`, directly
    /// (`from module import name`), wholesale (`import module`, or the
    /// module itself imported by name), or via a star import.
    pub fn name_imported(&self, module: &str, name: &str) -> bool {
        self.imports
            .iter()
            .filter(|(importer, _)| importer.as_str() != module)
            .flat_map(|(_, records)| records.iter())
            .any(|record| match record {
                ImportRecord::Module { target } => target == module,
                ImportRecord::Star { target } => target == module,
                ImportRecord::Names { target, names } => {
                    if target == module {
                        return names.iter().any(|n| n == name);
                    }
                    Self::record_covers_module(record, module)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, is_package: bool, source: &str) -> PythonModule {
        PythonModule::parse(name, is_package, source).unwrap()
    }

    mod collection {
        use super::*;

        #[test]
        fn collects_plain_and_from_imports() {
            let m = module("app", false, "import os.path\nfrom pkg.mod import a, b\n");
            let records = collect_imports(&m);
            assert_eq!(
                records,
                vec![
                    ImportRecord::Module {
                        target: "os.path".to_string()
                    },
                    ImportRecord::Names {
                        target: "pkg.mod".to_string(),
                        names: vec!["a".to_string(), "b".to_string()],
                    },
                ]
            );
        }

        #[test]
        fn records_target_names_not_aliases() {
            let m = module("app", false, "from pkg import real as alias\n");
            assert_eq!(
                collect_imports(&m),
                vec![ImportRecord::Names {
                    target: "pkg".to_string(),
                    names: vec!["real".to_string()],
                }]
            );
        }

        #[test]
        fn resolves_single_dot_relative_import() {
            let m = module("pkg.mod", false, "from . import sibling\nfrom .other import x\n");
            let records = collect_imports(&m);
            assert_eq!(records[0].target(), "pkg");
            assert_eq!(records[1].target(), "pkg.other");
        }

        #[test]
        fn package_init_resolves_relative_to_itself() {
            let m = module("pkg", true, "from .mod import x\n");
            assert_eq!(collect_imports(&m)[0].target(), "pkg.mod");
        }

        #[test]
        fn double_dot_climbs_a_package() {
            let m = module("pkg.sub.mod", false, "from ..util import x\n");
            assert_eq!(collect_imports(&m)[0].target(), "pkg.util");
        }

        #[test]
        fn over_deep_relative_import_is_dropped() {
            let m = module("mod", false, "from ...nowhere import x\n");
            assert!(collect_imports(&m).is_empty());
        }

        #[test]
        fn star_import_is_recorded() {
            let m = module("app", false, "from pkg.mod import *\n");
            assert_eq!(
                collect_imports(&m),
                vec![ImportRecord::Star {
                    target: "pkg.mod".to_string()
                }]
            );
        }
    }

    mod queries {
        use super::*;

        fn graph(modules: &[PythonModule]) -> ModuleGraph {
            ModuleGraph::build(modules)
        }

        #[test]
        fn importers_of_names_the_importing_modules() {
            let modules = vec![
                module("app", false, "from lib import helper\n"),
                module("other", false, "import lib\n"),
                module("lib", false, "def helper():\n    pass\n"),
            ];
            let graph = graph(&modules);
            let importers = graph.importers_of("lib");
            assert!(importers.contains("app"));
            assert!(importers.contains("other"));
            assert_eq!(importers.len(), 2);
        }

        #[test]
        fn from_import_covers_named_identifier_only() {
            let modules = vec![
                module("app", false, "from lib import used\n"),
                module("lib", false, "used = 1\nunused = 2\n"),
            ];
            let graph = graph(&modules);
            assert!(graph.name_imported("lib", "used"));
            assert!(!graph.name_imported("lib", "unused"));
        }

        #[test]
        fn whole_module_import_covers_every_identifier() {
            let modules = vec![
                module("app", false, "import lib\n"),
                module("lib", false, "anything = 1\n"),
            ];
            assert!(graph(&modules).name_imported("lib", "anything"));
        }

        #[test]
        fn star_import_covers_every_identifier() {
            let modules = vec![
                module("app", false, "from lib import *\n"),
                module("lib", false, "anything = 1\n"),
            ];
            assert!(graph(&modules).name_imported("lib", "anything"));
        }

        #[test]
        fn submodule_imported_by_name_covers_it_wholesale() {
            let modules = vec![
                module("app", false, "from pkg import mod\n"),
                module("pkg", true, ""),
                module("pkg.mod", false, "helper = 1\n"),
            ];
            let graph = graph(&modules);
            assert!(graph.name_imported("pkg.mod", "helper"));
            assert!(graph.importers_of("pkg.mod").contains("app"));
        }

        #[test]
        fn a_module_does_not_count_as_its_own_importer() {
            let modules = vec![module("lib", false, "from lib import x\nx = 1\n")];
            assert!(graph(&modules).importers_of("lib").is_empty());
        }

        #[test]
        fn unknown_graph_answers_none() {
            let graph = ImportGraph::Unknown;
            assert!(!graph.is_known());
            assert!(graph.importers_of("lib").is_none());
            assert!(graph.name_imported("lib", "x").is_none());
        }

        #[test]
        fn known_graph_answers_some() {
            let modules = vec![
                module("app", false, "from lib import used\n"),
                module("lib", false, "used = 1\n"),
            ];
            let graph = ImportGraph::Known(ModuleGraph::build(&modules));
            assert_eq!(graph.name_imported("lib", "used"), Some(true));
            assert_eq!(graph.name_imported("lib", "other"), Some(false));
        }
    }
}
