//! Layered policy loading
//!
//! Layers apply in order: built-in defaults, policy files, `RAPIDTAP_POLICY__*`
//! variables, the JSON variable and finally the comma-separated CLI override
//! variable. Each non-empty layer bumps the revision.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::defaults::default_snapshot;
use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource};
use crate::overlay::apply_override_to_snapshot;

const ENV_PREFIX: &str = "RAPIDTAP_POLICY__";
const ENV_JSON: &str = "RAPIDTAP_POLICY_OVERRIDE_JSON";
const ENV_CLI_OVERRIDES: &str = "RAPIDTAP_POLICY_CLI_OVERRIDES";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    pub include_cli_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            include_cli_env: true,
        }
    }
}

/// Loads defaults, the optional file at `path` and every environment layer.
pub fn load_snapshot(path: Option<&Path>) -> Result<PolicySnapshot, PolicyError> {
    let options = LoadOptions {
        paths: path.map(Path::to_path_buf).into_iter().collect(),
        include_env: true,
        include_cli_env: true,
    };
    load_snapshot_with_options(&options)
}

pub fn load_snapshot_with_options(options: &LoadOptions) -> Result<PolicySnapshot, PolicyError> {
    let mut snapshot = default_snapshot();
    record_builtin_sources(&mut snapshot)?;

    for path in &options.paths {
        if !path.exists() {
            debug!(path = %path.display(), "policy file not found; skipping");
            continue;
        }
        let layer = file_layer(path)?;
        debug!(path = %path.display(), entries = layer.len(), "applying policy file");
        apply_layer(&mut snapshot, layer)?;
    }
    if options.include_env {
        apply_layer(&mut snapshot, env_layer()?)?;
    }
    if options.include_cli_env {
        let layer = env::var(ENV_CLI_OVERRIDES)
            .map(|raw| cli_layer(&raw))
            .unwrap_or_default();
        apply_layer(&mut snapshot, layer)?;
    }

    snapshot.validate()?;
    Ok(snapshot)
}

/// One dotted-path assignment.
struct Assignment {
    path: String,
    value: Value,
    source: PolicySource,
}

fn apply_layer(snapshot: &mut PolicySnapshot, layer: Vec<Assignment>) -> Result<(), PolicyError> {
    if layer.is_empty() {
        return Ok(());
    }
    for assignment in &layer {
        apply_override_to_snapshot(
            snapshot,
            &assignment.path,
            &assignment.value,
            assignment.source,
        )?;
    }
    snapshot.rev = snapshot.rev.saturating_add(1);
    Ok(())
}

fn file_layer(path: &Path) -> Result<Vec<Assignment>, PolicyError> {
    let raw = fs::read_to_string(path).map_err(|err| PolicyError::Io(err.to_string()))?;
    let document: serde_yaml::Value =
        serde_yaml::from_str(&raw).map_err(|err| PolicyError::Invalid(err.to_string()))?;
    let document = to_json(&document)?;
    let mut layer = Vec::new();
    collect_leaves(document, String::new(), PolicySource::File, &mut layer);
    Ok(layer)
}

fn env_layer() -> Result<Vec<Assignment>, PolicyError> {
    let mut layer: Vec<Assignment> = env::vars()
        .filter_map(|(key, raw)| {
            let path = env_key_to_path(key.strip_prefix(ENV_PREFIX)?)?;
            Some(Assignment {
                path,
                value: parse_scalar(&raw),
                source: PolicySource::Env,
            })
        })
        .collect();

    if let Ok(raw) = env::var(ENV_JSON) {
        if !raw.trim().is_empty() {
            let document: Value =
                serde_json::from_str(&raw).map_err(|err| PolicyError::Invalid(err.to_string()))?;
            collect_leaves(document, String::new(), PolicySource::Env, &mut layer);
        }
    }
    Ok(layer)
}

/// `STRATEGY__NORMAL__MAX_RETRIES` becomes `strategy.normal.max_retries`.
fn env_key_to_path(key: &str) -> Option<String> {
    let segments: Vec<String> = key
        .split("__")
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!segments.is_empty()).then(|| segments.join("."))
}

/// Parses `a.b=1,c.d=true`. A token without `=` assigns null.
fn cli_layer(raw: &str) -> Vec<Assignment> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (path, value) = token.split_once('=').unwrap_or((token, ""));
            let path = path.trim();
            (!path.is_empty()).then(|| Assignment {
                path: path.to_string(),
                value: parse_scalar(value.trim()),
                source: PolicySource::Cli,
            })
        })
        .collect()
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Objects are walked; everything else, arrays included, is a leaf.
fn collect_leaves(value: Value, prefix: String, source: PolicySource, out: &mut Vec<Assignment>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = key.trim().to_ascii_lowercase();
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, path, source, out);
            }
        }
        leaf if !prefix.is_empty() => out.push(Assignment {
            path: prefix,
            value: leaf,
            source,
        }),
        _ => {}
    }
}

fn record_builtin_sources(snapshot: &mut PolicySnapshot) -> Result<(), PolicyError> {
    let sections = [
        ("host", to_json(&snapshot.host)?),
        ("strategy", to_json(&snapshot.strategy)?),
        ("cache", to_json(&snapshot.cache)?),
        ("dispatch", to_json(&snapshot.dispatch)?),
        ("monitor", to_json(&snapshot.monitor)?),
        ("patterns", to_json(&snapshot.patterns)?),
    ];
    let mut leaves = Vec::new();
    for (name, value) in sections {
        collect_leaves(value, name.to_string(), PolicySource::Builtin, &mut leaves);
    }
    for leaf in leaves {
        snapshot.set_provenance(&leaf.path, leaf.source);
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, PolicyError> {
    serde_json::to_value(value).map_err(|err| PolicyError::Invalid(err.to_string()))
}
