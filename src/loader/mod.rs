//! Rule Pack Loading
//!
//! Rule packs are directories of JSON files, each file holding an array of
//! typed rule objects. A malformed file or rule is reported to the operator
//! via the log and skipped — the offending rule is not installed, loading
//! continues for the rest of the pack.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::registry::{ConfigError, RuleRegistry};
use crate::rules::ToolRule;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} must contain a JSON array of rules", path.display())]
    NotAnArray { path: PathBuf },
    #[error("Rule {index} in {} failed to load: {source}", path.display())]
    Rule {
        path: PathBuf,
        index: usize,
        #[source]
        source: ConfigError,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::NotAnArray { path }
            | Self::Rule { path, .. } => path,
        }
    }
}

/// A rule plus where it came from
pub struct LoadedRule {
    pub rule: Arc<dyn ToolRule>,
    pub source: PathBuf,
    pub index: usize,
}

/// Outcome of loading a pack directory
#[derive(Default)]
pub struct LoadReport {
    pub rules: Vec<LoadedRule>,
    pub errors: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Loads one rule file strictly: any malformed rule fails the whole file
pub fn load_rule_file(
    registry: &RuleRegistry,
    path: &Path,
) -> Result<Vec<LoadedRule>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = value.as_array().ok_or_else(|| LoadError::NotAnArray {
        path: path.to_path_buf(),
    })?;

    let mut rules = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let rule = registry
            .rule_from_value(entry)
            .map_err(|source| LoadError::Rule {
                path: path.to_path_buf(),
                index,
                source,
            })?;
        rules.push(LoadedRule {
            rule,
            source: path.to_path_buf(),
            index,
        });
    }
    Ok(rules)
}

/// Loads every `.json` file in the directory, skipping malformed files
pub fn load_rule_dir(registry: &RuleRegistry, dir: &Path) -> Result<LoadReport, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    // deterministic load order
    paths.sort();

    let mut report = LoadReport::default();
    for path in paths {
        match load_rule_file(registry, &path) {
            Ok(rules) => report.rules.extend(rules),
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "rule file not installed");
                report.errors.push(error);
            }
        }
    }
    tracing::info!(
        rules = report.rules.len(),
        errors = report.errors.len(),
        path = %dir.display(),
        "rule pack loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::standard_registry;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    const GOOD_RULES: &str = r#"[
        {
            "type": "conditional_mining_speed",
            "blocks": { "type": "tag", "tag": "mineable/pickaxe" },
            "amount": { "flat": 2.0 }
        },
        {
            "type": "conditional_mining_speed",
            "blocks": { "type": "blocks", "blocks": ["quarry:stone"] },
            "percent": true,
            "amount": 0.25
        }
    ]"#;

    #[test]
    fn test_load_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "boosts.json", GOOD_RULES);
        let registry = standard_registry();
        let rules = load_rule_file(&registry, &path).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].index, 1);
    }

    #[test]
    fn test_bad_rule_fails_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bad.json",
            r#"[ { "type": "conditional_mining_speed", "blocks": { "type": "any" } } ]"#,
        );
        let registry = standard_registry();
        let result = load_rule_file(&registry, &path);
        assert!(matches!(result, Err(LoadError::Rule { index: 0, .. })));
    }

    #[test]
    fn test_not_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "obj.json", r#"{ "rules": [] }"#);
        let registry = standard_registry();
        assert!(matches!(
            load_rule_file(&registry, &path),
            Err(LoadError::NotAnArray { .. })
        ));
    }

    #[test]
    fn test_dir_load_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a_good.json", GOOD_RULES);
        write_file(dir.path(), "b_bad.json", "not json at all");
        write_file(dir.path(), "notes.txt", "ignored");

        let registry = standard_registry();
        let report = load_rule_dir(&registry, dir.path()).unwrap();
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.is_clean());
        assert!(report.errors[0].path().ends_with("b_bad.json"));
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let registry = standard_registry();
        let result = load_rule_dir(&registry, Path::new("/no/such/dir"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
