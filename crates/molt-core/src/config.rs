//! Configuration model.
//!
//! A molt run is described by one JSON document: packages, each holding a
//! packager and named bundles, each bundle holding a loader and an ordered
//! transformer list. Component options are kept as raw JSON here and
//! decoded by the component registry when the pipeline is assembled, so
//! this crate stays independent of the concrete component set.
//!
//! ```json
//! {
//!     "source_base_path": ".",
//!     "target_base_path": "dist",
//!     "packages": {
//!         "dist": {
//!             "packager": {"name": "directory"},
//!             "bundles": {
//!                 "app": {
//!                     "loader": {
//!                         "name": "import_graph",
//!                         "options": {"entry_point": "app.py"}
//!                     },
//!                     "transformers": [
//!                         {"name": "remove_unreferenced_code"},
//!                         {"name": "rename_identifiers"},
//!                         {"name": "hoist_literals"}
//!                     ]
//!                 }
//!             }
//!         }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MoltError, MoltResult};

/// Top-level configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoltConfig {
    /// Base directory source paths are resolved against.
    #[serde(default = "default_source_base")]
    pub source_base_path: PathBuf,
    /// Base directory output is written under.
    #[serde(default = "default_target_base")]
    pub target_base_path: PathBuf,
    /// Skip failed assets instead of aborting the run.
    #[serde(default)]
    pub ignore_errors: bool,
    /// Worker threads for the parallel transform lane (0 = one per core).
    #[serde(default)]
    pub workers: usize,
    /// Output packages by name.
    pub packages: BTreeMap<String, PackageConfig>,
}

fn default_source_base() -> PathBuf {
    PathBuf::from(".")
}

fn default_target_base() -> PathBuf {
    PathBuf::from("dist")
}

/// One output package: a packager plus its bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub packager: ComponentConfig,
    pub bundles: BTreeMap<String, BundleConfig>,
}

/// One bundle: a loader and an ordered transformer list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    pub loader: ComponentConfig,
    #[serde(default)]
    pub transformers: Vec<ComponentConfig>,
}

/// A component reference: registry name plus raw options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl ComponentConfig {
    /// Reference a component with default options.
    pub fn named(name: impl Into<String>) -> Self {
        ComponentConfig {
            name: name.into(),
            options: serde_json::Value::Null,
        }
    }

    /// Decode this component's options into a typed options struct.
    ///
    /// Absent options decode as `T::default()`.
    pub fn options_as<T>(&self) -> MoltResult<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.options.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.options.clone()).map_err(|e| {
            MoltError::config(format!("invalid options for component {:?}: {e}", self.name))
        })
    }
}

impl MoltConfig {
    /// Parse a configuration document from JSON text.
    pub fn from_json(text: &str) -> MoltResult<Self> {
        let config: MoltConfig = serde_json::from_str(text)
            .map_err(|e| MoltError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> MoltResult<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let text = fs::read_to_string(path).map_err(|e| {
            MoltError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    fn validate(&self) -> MoltResult<()> {
        if self.packages.is_empty() {
            return Err(MoltError::config("no packages configured"));
        }
        for (package_name, package) in &self.packages {
            if package.bundles.is_empty() {
                return Err(MoltError::config(format!(
                    "package {package_name:?} has no bundles"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "packages": {
            "dist": {
                "packager": {"name": "directory"},
                "bundles": {
                    "app": {
                        "loader": {
                            "name": "import_graph",
                            "options": {"entry_point": "app.py"}
                        },
                        "transformers": [
                            {"name": "rename_identifiers",
                             "options": {"only_rename_locals": false}}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_minimal_configuration() {
        let config = MoltConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.source_base_path, PathBuf::from("."));
        assert_eq!(config.target_base_path, PathBuf::from("dist"));
        assert!(!config.ignore_errors);
        let package = &config.packages["dist"];
        assert_eq!(package.packager.name, "directory");
        let bundle = &package.bundles["app"];
        assert_eq!(bundle.loader.name, "import_graph");
        assert_eq!(bundle.transformers.len(), 1);
    }

    #[test]
    fn component_options_decode_into_typed_struct() {
        #[derive(Debug, Default, Deserialize)]
        struct Opts {
            #[serde(default)]
            only_rename_locals: bool,
        }
        let config = MoltConfig::from_json(MINIMAL).unwrap();
        let component = &config.packages["dist"].bundles["app"].transformers[0];
        let opts: Opts = component.options_as().unwrap();
        assert!(!opts.only_rename_locals);
    }

    #[test]
    fn absent_options_decode_as_default() {
        #[derive(Debug, Default, Deserialize)]
        struct Opts {
            #[serde(default)]
            enabled: bool,
        }
        let component = ComponentConfig::named("remove_pass");
        let opts: Opts = component.options_as().unwrap();
        assert!(!opts.enabled);
    }

    #[test]
    fn rejects_empty_packages() {
        let err = MoltConfig::from_json(r#"{"packages": {}}"#).unwrap_err();
        assert_eq!(err.exit_status().code(), 2);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = MoltConfig::from_json(r#"{"packages": {}, "typo_field": 1}"#).unwrap_err();
        assert!(err.to_string().contains("typo_field"));
    }

    #[test]
    fn rejects_bad_option_types() {
        #[derive(Debug, Default, Deserialize)]
        struct Opts {
            #[serde(default)]
            #[allow(dead_code)]
            entry_point: String,
        }
        let component = ComponentConfig {
            name: "import_graph".to_string(),
            options: serde_json::json!({"entry_point": 42}),
        };
        assert!(component.options_as::<Opts>().is_err());
    }
}
