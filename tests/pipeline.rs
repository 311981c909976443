//! End-to-end pipeline tests: load from disk, transform, package, and
//! check the contracts that span passes (idempotence, conservatism under
//! an unknown graph, re-parseability of everything written).

use std::fs;
use std::path::{Path, PathBuf};

use molt::{Compiler, Registry, RunReport};
use molt_core::{MoltConfig, MoltResult};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

fn run_pipeline(config: serde_json::Value) -> MoltResult<RunReport> {
    let config = MoltConfig::from_json(&config.to_string())?;
    let registry = Registry::with_builtin_components();
    Compiler::new(&config, &registry).run()
}

fn standard_config(
    source: &Path,
    target: &Path,
    loader: serde_json::Value,
    transformers: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "source_base_path": source,
        "target_base_path": target,
        "packages": {
            "dist": {
                "packager": {"name": "directory"},
                "bundles": {
                    "app": {
                        "loader": loader,
                        "transformers": transformers
                    }
                }
            }
        }
    })
}

fn entry_loader(entry: &str) -> serde_json::Value {
    serde_json::json!({"name": "import_graph", "options": {"entry_point": entry}})
}

/// Every regular file under `root`, as (relative path, contents), sorted.
fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    fn collect(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, String)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                collect(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.push((relative, fs::read_to_string(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    collect(root, root, &mut out);
    out.sort();
    out
}

#[test]
fn whole_program_pipeline_minifies_and_packages() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    write(&src, "app.py", "from pkg.util import greet\ngreet('friendly-name')\n");
    write(&src, "pkg/__init__.py", "");
    write(
        &src,
        "pkg/util.py",
        "def greet(person):\n    message = 'friendly-greeting'\n    other = 'friendly-greeting'\n    print(message, other, person)\ndef unused_helper():\n    pass\n",
    );

    let report = run_pipeline(standard_config(
        &src,
        &out,
        entry_loader("app.py"),
        serde_json::json!([
            {"name": "remove_unreferenced_code"},
            {"name": "rename_identifiers"},
            {"name": "hoist_literals"}
        ]),
    ))
    .unwrap();

    assert_eq!(report.files_written, 3);
    assert!(report.failed_assets.is_empty());
    assert_eq!(
        read(&out, "dist/app.py"),
        "from pkg.util import greet\ngreet('friendly-name')\n"
    );
    // unused_helper is gone, locals are renamed, the repeated literal
    // reuses the (renamed) preceding assignment
    assert_eq!(
        read(&out, "dist/pkg/util.py"),
        "def greet(person):\n    a = 'friendly-greeting'\n    b = a\n    print(a, b, person)\n"
    );
    assert!(out.join("dist/pkg/__init__.py").is_file());
}

#[test]
fn hoist_and_rename_scenario_is_stable_over_two_runs() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out1 = dir.path().join("out1");
    let out2 = dir.path().join("out2");
    write(&src, "app.py", "x = 'a'\ny = 'a'\nprint(x, y)\n");

    let transformers = serde_json::json!([
        {"name": "rename_identifiers"},
        {"name": "hoist_literals"}
    ]);
    run_pipeline(standard_config(
        &src,
        &out1,
        entry_loader("app.py"),
        transformers.clone(),
    ))
    .unwrap();
    // the repeated 'a' reuses the preceding binding of x
    assert_eq!(read(&out1, "dist/app.py"), "x = 'a'\ny = x\nprint(x, y)\n");

    // feed the output back through the pipeline: byte-identical
    run_pipeline(standard_config(
        &out1.join("dist"),
        &out2,
        entry_loader("app.py"),
        transformers,
    ))
    .unwrap();
    assert_eq!(read(&out2, "dist/app.py"), read(&out1, "dist/app.py"));
}

#[test]
fn full_pipeline_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out1 = dir.path().join("out1");
    let out2 = dir.path().join("out2");
    write(
        &src,
        "app.py",
        "from pkg.work import process\nresult = process('repeated-input', 'repeated-input')\nprint(result)\n",
    );
    write(&src, "pkg/__init__.py", "");
    write(
        &src,
        "pkg/work.py",
        "def process(first, second):\n    combined = first + second\n    pass\n    return combined\ndef leftover():\n    pass\n",
    );

    let transformers = serde_json::json!([
        {"name": "remove_unreferenced_code"},
        {"name": "rename_identifiers"},
        {"name": "hoist_literals"},
        {"name": "remove_pass"}
    ]);
    run_pipeline(standard_config(
        &src,
        &out1,
        entry_loader("app.py"),
        transformers.clone(),
    ))
    .unwrap();
    run_pipeline(standard_config(
        &out1.join("dist"),
        &out2,
        entry_loader("app.py"),
        transformers,
    ))
    .unwrap();

    let first = snapshot(&out1.join("dist"));
    let second = snapshot(&out2.join("dist"));
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn every_output_reparses_and_never_grows() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    let app = "from pkg.work import process\nprint(process('repeated-value', 'repeated-value'))\n";
    let work = "def process(first, second):\n    total = first + second\n    assert total\n    return total\n";
    write(&src, "app.py", app);
    write(&src, "pkg/__init__.py", "");
    write(&src, "pkg/work.py", work);

    run_pipeline(standard_config(
        &src,
        &out,
        entry_loader("app.py"),
        serde_json::json!([
            {"name": "remove_unreferenced_code"},
            {"name": "rename_identifiers"},
            {"name": "hoist_literals"},
            {"name": "remove_pass"},
            {"name": "remove_assertions"}
        ]),
    ))
    .unwrap();

    for (path, original) in [("dist/app.py", app), ("dist/pkg/work.py", work)] {
        let output = read(&out, path);
        molt_python_cst::parse_module(&output)
            .unwrap_or_else(|e| panic!("{path} does not reparse: {e}"));
        assert!(output.len() <= original.len(), "{path} grew");
    }
}

#[test]
fn directory_loader_forces_conservative_transforms() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    // nothing imports this module, but without a whole-program graph the
    // module-level definition must survive
    write(&src, "lib.py", "def maybe_used():\n    pass\n");

    run_pipeline(standard_config(
        &src,
        &out,
        serde_json::json!({"name": "source_directory"}),
        serde_json::json!([{"name": "remove_unreferenced_code"}]),
    ))
    .unwrap();

    assert_eq!(read(&out, "dist/lib.py"), "def maybe_used():\n    pass\n");
}

#[test]
fn batchable_passes_run_across_the_worker_pool() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    for index in 0..8 {
        write(
            &src,
            &format!("mod{index}.py"),
            "def f(x):\n    assert x\n    pass\n    return x\n",
        );
    }

    let config = serde_json::json!({
        "source_base_path": src,
        "target_base_path": out,
        "workers": 2,
        "packages": {
            "dist": {
                "packager": {"name": "directory"},
                "bundles": {
                    "app": {
                        "loader": {"name": "source_directory"},
                        "transformers": [
                            {"name": "remove_pass"},
                            {"name": "remove_assertions"}
                        ]
                    }
                }
            }
        }
    });
    let report = run_pipeline(config).unwrap();
    assert_eq!(report.files_written, 8);
    for index in 0..8 {
        assert_eq!(
            read(&out, &format!("dist/mod{index}.py")),
            "def f(x):\n    return x\n"
        );
    }
}

#[test]
fn transformer_excludes_leave_selected_modules_alone() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("out");
    write(&src, "touched.py", "def f(x):\n    pass\n    return x\n");
    write(&src, "frozen.py", "def f(x):\n    pass\n    return x\n");

    run_pipeline(standard_config(
        &src,
        &out,
        serde_json::json!({"name": "source_directory"}),
        serde_json::json!([
            {"name": "remove_pass", "options": {"excludes": ["frozen"]}}
        ]),
    ))
    .unwrap();

    assert_eq!(read(&out, "dist/touched.py"), "def f(x):\n    return x\n");
    assert_eq!(
        read(&out, "dist/frozen.py"),
        "def f(x):\n    pass\n    return x\n"
    );
}

#[test]
fn unknown_transformer_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src, "app.py", "x = 1\n");

    let err = run_pipeline(standard_config(
        &src,
        &dir.path().join("out"),
        entry_loader("app.py"),
        serde_json::json!([{"name": "frobnicate"}]),
    ))
    .unwrap_err();
    assert_eq!(err.exit_status().code(), 2);
}

#[test]
fn missing_entry_point_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_pipeline(standard_config(
        &dir.path().join("src-absent"),
        &dir.path().join("out"),
        entry_loader("app.py"),
        serde_json::json!([]),
    ))
    .unwrap_err();
    assert_eq!(err.exit_status().code(), 3);
}
