//! Loading invocation manifests and binding them to providers.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use spindle_engine::{BatchCollector, CollectorProvider, ConstantProvider, FileProvider, InvocationRequest, JsonLinesTarget, TargetFunction};
use spindle_types::{InvocationManifest, ParameterBinding};
use tracing::debug;

/// Reads a YAML or JSON manifest and checks it.
///
/// Relative binding paths are resolved against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<InvocationManifest> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let mut manifest: InvocationManifest =
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse manifest: {}", path.display()))?;

    if let Err(violations) = manifest.validate() {
        bail!("invalid manifest {}:\n  - {}", path.display(), violations.join("\n  - "));
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for binding in manifest.parameters.values_mut() {
        match binding {
            ParameterBinding::File { path, .. } | ParameterBinding::Queue { path, .. } => *path = resolve_relative(base, path),
            ParameterBinding::Constant { .. } => {}
        }
    }
    Ok(manifest)
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

/// Builds the invocation request for `manifest` against `catalog`.
pub fn bind_manifest(manifest: &InvocationManifest, catalog: &IndexMap<String, Arc<dyn TargetFunction>>) -> Result<InvocationRequest> {
    let function = catalog.get(&manifest.function).cloned().ok_or_else(|| {
        let known: Vec<&str> = catalog.keys().map(String::as_str).collect();
        anyhow!("unknown function '{}' (available: {})", manifest.function, known.join(", "))
    })?;

    let mut request = InvocationRequest::new(function);
    for (parameter, binding) in &manifest.parameters {
        debug!(parameter = %parameter, kind = %binding.kind(), "binding parameter");
        match binding {
            ParameterBinding::Constant { value } => request.bind(parameter, Box::new(ConstantProvider::new(value.clone()))),
            ParameterBinding::File { path, step_order } => {
                let mut provider = FileProvider::new(path);
                if let Some(step_order) = step_order {
                    provider = provider.with_step_order(*step_order);
                }
                request.bind(parameter, Box::new(provider));
            }
            ParameterBinding::Queue { path, batch_size } => {
                let collector = BatchCollector::new(Arc::new(JsonLinesTarget::new(path)), *batch_size);
                request.bind(parameter, Box::new(CollectorProvider::new(Arc::new(collector))));
            }
        }
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use serde_json::json;
    use spindle_engine::{DiagnosticLog, ExecutorConfig, FunctionExecutor};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn relative_paths_follow_the_manifest() {
        let directory = tempfile::tempdir().expect("tempdir");
        let manifest_path = directory.path().join("invoke.yaml");
        fs::write(
            &manifest_path,
            "function: uppercase\nparameters:\n  input: { kind: constant, value: hi }\n  output: { kind: file, path: out/result.txt }\n",
        )
        .expect("write manifest");

        let manifest = load_manifest(&manifest_path).expect("load");
        match &manifest.parameters["output"] {
            ParameterBinding::File { path, .. } => assert_eq!(path, &directory.path().join("out/result.txt")),
            other => panic!("unexpected binding {other:?}"),
        }
    }

    #[test]
    fn invalid_manifests_report_every_violation() {
        let directory = tempfile::tempdir().expect("tempdir");
        let manifest_path = directory.path().join("invoke.json");
        fs::write(&manifest_path, r#"{"function": "", "parameters": {"q": {"kind": "queue", "path": "q.jsonl", "batch_size": 0}}}"#)
            .expect("write manifest");

        let error = load_manifest(&manifest_path).expect_err("invalid").to_string();
        assert!(error.contains("function name must not be empty"), "{error}");
        assert!(error.contains("batch_size must be greater than zero"), "{error}");
    }

    #[test]
    fn fanout_manifest_enqueues_one_item_per_word() {
        let directory = tempfile::tempdir().expect("tempdir");
        let manifest_path = directory.path().join("fanout.yaml");
        fs::write(
            &manifest_path,
            "function: fanout\nparameters:\n  input: { kind: constant, value: \"one two three\" }\n  messages: { kind: queue, path: queue.jsonl, batch_size: 2 }\n",
        )
        .expect("write manifest");

        let manifest = load_manifest(&manifest_path).expect("load");
        let request = bind_manifest(&manifest, &builtin_catalog()).expect("bind");
        let (log, _transcript) = DiagnosticLog::memory();
        let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(request, &CancellationToken::new());

        assert!(result.is_success(), "{result:?}");
        let queued = fs::read_to_string(directory.path().join("queue.jsonl")).expect("queue file");
        let words: Vec<serde_json::Value> = queued.lines().map(|line| serde_json::from_str(line).expect("json line")).collect();
        assert_eq!(words, vec![json!({"word": "one"}), json!({"word": "two"}), json!({"word": "three"})]);
    }

    #[test]
    fn uppercase_manifest_writes_the_output_file() {
        let directory = tempfile::tempdir().expect("tempdir");
        let manifest_path = directory.path().join("uppercase.yaml");
        fs::write(
            &manifest_path,
            "function: uppercase\nparameters:\n  input: { kind: constant, value: shout }\n  output: { kind: file, path: out.txt }\n",
        )
        .expect("write manifest");

        let manifest = load_manifest(&manifest_path).expect("load");
        let request = bind_manifest(&manifest, &builtin_catalog()).expect("bind");
        let (log, _transcript) = DiagnosticLog::memory();
        let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(request, &CancellationToken::new());

        assert!(result.is_success(), "{result:?}");
        assert_eq!(fs::read_to_string(directory.path().join("out.txt")).expect("output"), "SHOUT");
    }

    #[test]
    fn unknown_functions_are_rejected() {
        let manifest = InvocationManifest {
            function: "missing".into(),
            parameters: IndexMap::new(),
        };
        let error = bind_manifest(&manifest, &builtin_catalog()).expect_err("unknown").to_string();
        assert!(error.contains("available: uppercase, fanout, measure"), "{error}");
    }
}
