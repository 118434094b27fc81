// crashlog-sleuth - app/config.rs
//
// Hierarchical key/value configuration store. Backed by one or more
// merged TOML documents; typed reads are read-through cached so repeated
// dotted-path walks are amortized across analyzers.
//
// Parse-then-validate at load time, never at read time; unreadable or
// missing values degrade to a caller-supplied default rather than failing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;

use crate::util::error::ConfigError;

/// A hierarchical configuration document with typed, cached reads.
pub struct ConfigStore {
    root: toml::Value,
    cache: RwLock<HashMap<String, toml::Value>>,
}

impl ConfigStore {
    /// Build a store from an already-parsed TOML document (mainly for
    /// tests; production code should prefer [`ConfigStore::load`] or
    /// [`load_multiple`]).
    pub fn from_value(root: toml::Value) -> Self {
        ConfigStore {
            root,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Parse a single TOML file into a store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ConfigStore::from_value(root))
    }

    /// Resolve a dotted key (e.g. `"Game_Info.CRASHGEN_LogName"`) against
    /// the merged document, returning the raw TOML value if present.
    fn resolve(&self, dotted_key: &str) -> Option<toml::Value> {
        if let Some(cached) = self.cache.read().unwrap().get(dotted_key) {
            return Some(cached.clone());
        }

        let mut current = &self.root;
        for segment in dotted_key.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return None,
            }
        }

        let value = current.clone();
        self.cache
            .write()
            .unwrap()
            .insert(dotted_key.to_string(), value.clone());
        Some(value)
    }

    /// Typed read with a caller-supplied default. A missing path or a type
    /// mismatch logs at `warn!` and returns `default`; it never fails the caller.
    pub fn get<T: DeserializeOwned>(&self, dotted_key: &str, default: T) -> T {
        match self.resolve(dotted_key) {
            Some(value) => match value.try_into() {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(key = dotted_key, error = %e, "Config value has unexpected shape, using default");
                    default
                }
            },
            None => {
                tracing::debug!(key = dotted_key, "Config key not found, using default");
                default
            }
        }
    }

    /// Fetch many keys' raw values in one call, amortizing lookups.
    pub fn batch_get(&self, keys: &[&str]) -> Vec<Option<toml::Value>> {
        keys.iter().map(|k| self.resolve(k)).collect()
    }

    /// Fetch a key's raw TOML value, preserving table key order (the `toml`
    /// crate orders tables alphabetically). Used by analyzers that need a
    /// deterministic iteration order over a rule table rather than a single
    /// typed value.
    pub fn get_raw(&self, dotted_key: &str) -> Option<toml::Value> {
        self.resolve(dotted_key)
    }

    /// Walk every top-level table recursively, warming the settings cache.
    pub fn prefetch_all(&self) {
        fn walk(store: &ConfigStore, prefix: &str, value: &toml::Value) {
            if let toml::Value::Table(table) = value {
                for (key, nested) in table {
                    let dotted = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    store
                        .cache
                        .write()
                        .unwrap()
                        .insert(dotted.clone(), nested.clone());
                    walk(store, &dotted, nested);
                }
            }
        }
        walk(self, "", &self.root);
        tracing::debug!(entries = self.cache.read().unwrap().len(), "Config cache prefetched");
    }

    /// Drop every cached typed read; subsequent `get` calls re-walk the
    /// document. Used by tests and a CLI hot-reload flag.
    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }
}

/// Merge several TOML files in order; later files override earlier ones at
/// the top-level-table granularity (shallow merge, matching the base +
/// user-override convention).
pub fn load_multiple(paths: &[PathBuf]) -> Result<ConfigStore, ConfigError> {
    let mut merged = toml::Value::Table(Default::default());

    for path in paths {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let doc: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.clone(),
            source,
        })?;
        shallow_merge(&mut merged, doc);
    }

    Ok(ConfigStore::from_value(merged))
}

fn shallow_merge(base: &mut toml::Value, overlay: toml::Value) {
    let (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) = (base, overlay) else {
        return;
    };
    for (key, value) in overlay_table {
        base_table.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(toml_src: &str) -> ConfigStore {
        ConfigStore::from_value(toml::from_str(toml_src).unwrap())
    }

    #[test]
    fn get_resolves_nested_dotted_key() {
        let s = store(
            r#"
            [Game_Info]
            CRASHGEN_LogName = "Buffout 4"
            "#,
        );
        let value: String = s.get("Game_Info.CRASHGEN_LogName", "default".to_string());
        assert_eq!(value, "Buffout 4");
    }

    #[test]
    fn get_returns_default_on_missing_key() {
        let s = store("");
        let value: bool = s.get("FcxMode", false);
        assert!(!value);
    }

    #[test]
    fn get_returns_default_on_type_mismatch() {
        let s = store(r#"FcxMode = "not a bool""#);
        let value: bool = s.get("FcxMode", false);
        assert!(!value);
    }

    #[test]
    fn batch_get_resolves_multiple_keys() {
        let s = store(
            r#"
            FcxMode = true
            AutoDetectModManagers = false
            "#,
        );
        let results = s.batch_get(&["FcxMode", "AutoDetectModManagers", "Missing.Key"]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_some());
        assert!(results[2].is_none());
    }

    #[test]
    fn prefetch_then_clear_cache_round_trips() {
        let s = store(
            r#"
            [Game_Info]
            CRASHGEN_LogName = "Buffout 4"
            "#,
        );
        s.prefetch_all();
        assert!(!s.cache.read().unwrap().is_empty());
        s.clear_cache();
        assert!(s.cache.read().unwrap().is_empty());
    }

    #[test]
    fn shallow_merge_overrides_top_level_tables() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [Game_Info]
            CRASHGEN_LogName = "Buffout 4"
            other = "kept"
            "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [Game_Info]
            CRASHGEN_LogName = "Override"
            "#,
        )
        .unwrap();
        shallow_merge(&mut base, overlay);
        let store = ConfigStore::from_value(base);
        let name: String = store.get("Game_Info.CRASHGEN_LogName", String::new());
        assert_eq!(name, "Override");
    }
}
