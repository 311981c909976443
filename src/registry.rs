//! Component registry.
//!
//! Maps configuration names to component constructors. The registry is
//! built once at process start and passed by reference to the compiler;
//! there is no global mutable state. Each factory decodes the raw JSON
//! options of a [`ComponentConfig`] into the component's typed options.

use std::collections::BTreeMap;

use molt_core::{ComponentConfig, MoltError, MoltResult};
use molt_python::loader::{ImportGraphLoaderOptions, Loader, SourceDirectoryOptions};
use molt_python::transform::{
    DeadCodeOptions, HoistOptions, MechanicalOptions, RenameOptions, Transformer,
};

use crate::packager::{DirectoryPackagerOptions, Packager};

type LoaderFactory = fn(&ComponentConfig) -> MoltResult<Loader>;
type TransformerFactory = fn(&ComponentConfig) -> MoltResult<Transformer>;
type PackagerFactory = fn(&ComponentConfig) -> MoltResult<Packager>;

/// Name-to-constructor tables for every pluggable component kind.
pub struct Registry {
    loaders: BTreeMap<&'static str, LoaderFactory>,
    transformers: BTreeMap<&'static str, TransformerFactory>,
    packagers: BTreeMap<&'static str, PackagerFactory>,
}

impl Registry {
    /// Registry holding every built-in component.
    pub fn with_builtin_components() -> Registry {
        let mut loaders: BTreeMap<&'static str, LoaderFactory> = BTreeMap::new();
        loaders.insert("import_graph", |config| {
            Ok(Loader::ImportGraph(
                config.options_as::<ImportGraphLoaderOptions>()?,
            ))
        });
        loaders.insert("source_directory", |config| {
            Ok(Loader::SourceDirectory(
                config.options_as::<SourceDirectoryOptions>()?,
            ))
        });

        let mut transformers: BTreeMap<&'static str, TransformerFactory> = BTreeMap::new();
        transformers.insert("rename_identifiers", |config| {
            Ok(Transformer::RenameIdentifiers(
                config.options_as::<RenameOptions>()?,
            ))
        });
        transformers.insert("hoist_literals", |config| {
            Ok(Transformer::HoistLiterals(
                config.options_as::<HoistOptions>()?,
            ))
        });
        transformers.insert("remove_unreferenced_code", |config| {
            Ok(Transformer::RemoveUnreferencedCode(
                config.options_as::<DeadCodeOptions>()?,
            ))
        });
        transformers.insert("remove_pass", |config| {
            Ok(Transformer::RemovePass(
                config.options_as::<MechanicalOptions>()?,
            ))
        });
        transformers.insert("remove_assertions", |config| {
            Ok(Transformer::RemoveAssertions(
                config.options_as::<MechanicalOptions>()?,
            ))
        });

        let mut packagers: BTreeMap<&'static str, PackagerFactory> = BTreeMap::new();
        packagers.insert("directory", |config| {
            Ok(Packager::Directory(
                config.options_as::<DirectoryPackagerOptions>()?,
            ))
        });

        Registry {
            loaders,
            transformers,
            packagers,
        }
    }

    pub fn loader(&self, config: &ComponentConfig) -> MoltResult<Loader> {
        self.resolve(&self.loaders, "loader", config)
    }

    pub fn transformer(&self, config: &ComponentConfig) -> MoltResult<Transformer> {
        self.resolve(&self.transformers, "transformer", config)
    }

    pub fn packager(&self, config: &ComponentConfig) -> MoltResult<Packager> {
        self.resolve(&self.packagers, "packager", config)
    }

    fn resolve<T>(
        &self,
        table: &BTreeMap<&'static str, fn(&ComponentConfig) -> MoltResult<T>>,
        kind: &'static str,
        config: &ComponentConfig,
    ) -> MoltResult<T> {
        match table.get(config.name.as_str()) {
            Some(factory) => factory(config),
            None => Err(MoltError::UnknownComponent {
                kind,
                name: config.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_builtin_transformer() {
        let registry = Registry::with_builtin_components();
        for name in [
            "rename_identifiers",
            "hoist_literals",
            "remove_unreferenced_code",
            "remove_pass",
            "remove_assertions",
        ] {
            let transformer = registry
                .transformer(&ComponentConfig::named(name))
                .unwrap();
            assert_eq!(transformer.config_name(), name);
        }
    }

    #[test]
    fn decodes_transformer_options() {
        let registry = Registry::with_builtin_components();
        let config = ComponentConfig {
            name: "rename_identifiers".to_string(),
            options: serde_json::json!({"only_rename_locals": false, "excludes": ["pkg.mod:api"]}),
        };
        let transformer = registry.transformer(&config).unwrap();
        assert!(matches!(
            transformer,
            Transformer::RenameIdentifiers(ref o) if !o.only_rename_locals
        ));
    }

    #[test]
    fn unknown_component_is_a_config_error() {
        let registry = Registry::with_builtin_components();
        let err = registry
            .transformer(&ComponentConfig::named("frobnicate"))
            .unwrap_err();
        assert_eq!(err.exit_status().code(), 2);
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn bad_options_are_a_config_error() {
        let registry = Registry::with_builtin_components();
        let config = ComponentConfig {
            name: "rename_identifiers".to_string(),
            options: serde_json::json!({"only_rename_locals": "definitely"}),
        };
        let err = registry.transformer(&config).unwrap_err();
        assert_eq!(err.exit_status().code(), 2);
    }
}
