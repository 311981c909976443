//! Pipeline orchestration.
//!
//! Each bundle runs a fixed state machine: **Load** (assets plus, where
//! the loader supports it, the whole-program import graph) →
//! **Analyze+Transform** → **Package**. Transforms run in two lanes: the
//! sequential lane applies every non-batchable transformer per asset in
//! declared order, resolving that transformer's analyses against the
//! asset's current tree; once it has fully completed, the parallel lane
//! runs the fused batchable pass over the surviving assets in a worker
//! pool. The import graph is frozen after loading and is the only state
//! shared across the parallel lane.
//!
//! A transformer failure is caught per asset at this boundary: the
//! asset's previous tree stays installed, the failure is logged with
//! module and transformer names, and the run either skips the asset
//! (`ignore_errors`) or aborts.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use molt_core::{BundleConfig, MoltConfig, MoltError, MoltResult};
use molt_python::analysis::Analyses;
use molt_python::transform::{run_batch, Transformer};
use molt_python::{ImportGraph, LoadedBundle, PythonModule};
use molt_python_cst::Module;
use rayon::prelude::*;

use crate::packager::Packager;
use crate::registry::Registry;

/// One asset-level transform failure.
#[derive(Debug, Clone)]
pub struct AssetFailure {
    pub module: String,
    pub transformer: String,
    pub message: String,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub files_written: usize,
    /// Failures skipped under the ignore-errors policy.
    pub failed_assets: Vec<AssetFailure>,
}

/// Drives the Load → Analyze+Transform → Package pipeline for every
/// configured package and bundle.
pub struct Compiler<'a> {
    config: &'a MoltConfig,
    registry: &'a Registry,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a MoltConfig, registry: &'a Registry) -> Self {
        Compiler { config, registry }
    }

    /// Run the full pipeline. Returns an error on the first unrecoverable
    /// failure; asset-level failures are collected in the report when
    /// `ignore_errors` is set.
    pub fn run(&self) -> MoltResult<RunReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| MoltError::internal(format!("cannot build worker pool: {e}")))?;

        let mut report = RunReport::default();
        for (package_name, package_config) in &self.config.packages {
            let packager = self.registry.packager(&package_config.packager)?;
            for (bundle_name, bundle_config) in &package_config.bundles {
                self.run_bundle(
                    &pool,
                    package_name,
                    bundle_name,
                    bundle_config,
                    &packager,
                    &mut report,
                )?;
            }
        }
        Ok(report)
    }

    fn run_bundle(
        &self,
        pool: &rayon::ThreadPool,
        package_name: &str,
        bundle_name: &str,
        bundle_config: &BundleConfig,
        packager: &Packager,
        report: &mut RunReport,
    ) -> MoltResult<()> {
        let loader = self.registry.loader(&bundle_config.loader)?;
        let transformers: Vec<Transformer> = bundle_config
            .transformers
            .iter()
            .map(|config| self.registry.transformer(config))
            .collect::<MoltResult<_>>()?;
        let (batchable, sequential): (Vec<Transformer>, Vec<Transformer>) =
            transformers.into_iter().partition(Transformer::batchable);

        tracing::info!(
            bundle = bundle_name,
            loader = loader.config_name(),
            "loading bundle"
        );
        let LoadedBundle { mut modules, graph } = loader.load(&self.config.source_base_path)?;
        tracing::info!(bundle = bundle_name, assets = modules.len(), "loaded");

        // sequential lane: non-batchable transforms in declared order
        let mut skipped: BTreeSet<String> = BTreeSet::new();
        for module in &mut modules {
            for transformer in &sequential {
                if transformer.excludes_module(module.full_name()) {
                    continue;
                }
                tracing::debug!(
                    module = module.full_name(),
                    transformer = transformer.config_name(),
                    "applying"
                );
                match apply_one(transformer, module, &graph) {
                    Ok(tree) => module.replace_tree(tree),
                    Err(message) => {
                        self.record_failure(
                            report,
                            module.full_name(),
                            transformer.config_name(),
                            message,
                        )?;
                        skipped.insert(module.full_name().to_string());
                        break;
                    }
                }
            }
        }

        // parallel lane: fused batchable pass, one worker per asset
        if !batchable.is_empty() {
            let failures: Mutex<Vec<AssetFailure>> = Mutex::new(Vec::new());
            pool.install(|| {
                modules
                    .par_iter_mut()
                    .filter(|module| !skipped.contains(module.full_name()))
                    .for_each(|module| {
                        let tree = module.tree().clone();
                        let name = module.full_name().to_string();
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            run_batch(&batchable, &name, tree)
                        }));
                        match result {
                            Ok(tree) => module.replace_tree(tree),
                            Err(panic) => failures
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner())
                                .push(AssetFailure {
                                    module: name,
                                    transformer: "batch".to_string(),
                                    message: panic_message(panic),
                                }),
                        }
                    });
            });
            for failure in failures.into_inner().unwrap_or_else(|p| p.into_inner()) {
                self.record_failure(
                    report,
                    &failure.module,
                    &failure.transformer,
                    failure.message,
                )?;
            }
        }

        tracing::info!(bundle = bundle_name, "packaging");
        report.files_written +=
            packager.package(&self.config.target_base_path, package_name, &modules)?;
        Ok(())
    }

    fn record_failure(
        &self,
        report: &mut RunReport,
        module: &str,
        transformer: &str,
        message: String,
    ) -> MoltResult<()> {
        tracing::warn!(module, transformer, %message, "transform failed");
        if !self.config.ignore_errors {
            return Err(MoltError::transform(module, transformer, message));
        }
        report.failed_assets.push(AssetFailure {
            module: module.to_string(),
            transformer: transformer.to_string(),
            message,
        });
        Ok(())
    }
}

/// Apply one non-batchable transformer to one asset. The input tree is a
/// copy, so a failure installs nothing; a panic is reported as the
/// failure message.
fn apply_one(
    transformer: &Transformer,
    module: &PythonModule,
    graph: &ImportGraph,
) -> Result<Module, String> {
    let tree = module.tree().clone();
    let analyses = Analyses::resolve(&tree, transformer.required_analyzers());
    catch_unwind(AssertUnwindSafe(|| {
        transformer.apply(module.full_name(), tree, &analyses, graph)
    }))
    .map_err(panic_message)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "transformer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molt_core::config::ComponentConfig;

    #[test]
    fn transformers_partition_into_lanes() {
        let registry = Registry::with_builtin_components();
        let configs = [
            ComponentConfig::named("remove_unreferenced_code"),
            ComponentConfig::named("remove_pass"),
            ComponentConfig::named("rename_identifiers"),
        ];
        let transformers: Vec<Transformer> = configs
            .iter()
            .map(|c| registry.transformer(c).unwrap())
            .collect();
        let (batchable, sequential): (Vec<Transformer>, Vec<Transformer>) =
            transformers.into_iter().partition(Transformer::batchable);
        assert_eq!(batchable.len(), 1);
        assert_eq!(sequential.len(), 2);
        // declared order survives partitioning
        assert_eq!(sequential[0].config_name(), "remove_unreferenced_code");
        assert_eq!(sequential[1].config_name(), "rename_identifiers");
    }

    #[test]
    fn panic_messages_are_extracted() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic), "boom");
        let panic: Box<dyn Any + Send> = Box::new("formatted boom".to_string());
        assert_eq!(panic_message(panic), "formatted boom");
    }
}
