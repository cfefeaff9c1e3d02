// src/core/config_store.rs
//! The validated key/value store synthesized commands write resolved field
//! values into. Every write goes through [`ConfigStore::apply`]; there is no
//! bypass path. The store provides no interior locking: the hosting CLI
//! runtime invokes commands one at a time, and the `Rc<RefCell<_>>` handle
//! keeps the store on a single thread by construction.

use crate::constants::{ARGFORM_DIR, CONFIG_STORE_FILENAME, ENV_CONFIG_PATH};
use crate::models::{FieldValue, ParamKind, ValueMap};
use lazy_static::lazy_static;
use regex::Regex;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

lazy_static! {
    static ref KEY_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Shared handle to the one mutable collaborator in the subsystem.
pub type SharedConfig = Rc<RefCell<ConfigStore>>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration key '{key}': keys must be plain identifiers")]
    InvalidKey { key: String },
    #[error("configuration key '{key}' holds a {stored} value and cannot take a {offered}")]
    KindMismatch {
        key: String,
        stored: ParamKind,
        offered: ParamKind,
    },
    #[error("could not find a system config directory")]
    ConfigDirNotFound,
    #[error("could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read configuration store at '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write configuration store at '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration store at '{path}' is not valid TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("configuration store could not be serialized: {source}")]
    Serialize {
        #[from]
        source: toml::ser::Error,
    },
    #[error("configuration store has no backing file to save to")]
    NoBackingFile,
}

/// Journal of the store's values. The original snapshot is only materialized
/// on the first mutation, so a read-only session never clones the map.
enum StoreState {
    Pristine(ValueMap),
    Dirty { original: ValueMap, current: ValueMap },
}

pub struct ConfigStore {
    state: StoreState,
    path: Option<PathBuf>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// An empty, in-memory store with no backing file.
    pub fn new() -> Self {
        Self {
            state: StoreState::Pristine(ValueMap::new()),
            path: None,
        }
    }

    /// Loads the store from `path`. A missing file is not an error: it yields
    /// an empty store already bound to that path, ready for the first save.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!(
                "No configuration store at '{}', starting empty.",
                path.display()
            );
            return Ok(Self {
                state: StoreState::Pristine(ValueMap::new()),
                path: Some(path.to_path_buf()),
            });
        }

        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let table: toml::Table = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut values = ValueMap::new();
        for (key, raw) in table {
            match scalar_from_toml(&raw) {
                Some(value) => {
                    values.insert(key, value);
                }
                None => {
                    // Tables, arrays and datetimes have no field-value shape.
                    log::warn!(
                        "Ignoring non-scalar entry '{}' in configuration store '{}'.",
                        key,
                        path.display()
                    );
                }
            }
        }

        Ok(Self {
            state: StoreState::Pristine(values),
            path: Some(path.to_path_buf()),
        })
    }

    /// Loads the store from its conventional location, creating the parent
    /// directory on first use.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_store_path()?)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values().get(key)
    }

    /// Checks whether [`ConfigStore::apply`] would accept this write, without
    /// performing it. Callers staging several writes can verify the whole
    /// batch before the first one lands.
    pub fn check(&self, key: &str, value: &FieldValue) -> Result<(), ConfigError> {
        if !KEY_RE.is_match(key) {
            return Err(ConfigError::InvalidKey {
                key: key.to_string(),
            });
        }
        if let Some(stored) = self.get(key)
            && stored.kind() != value.kind()
        {
            return Err(ConfigError::KindMismatch {
                key: key.to_string(),
                stored: stored.kind(),
                offered: value.kind(),
            });
        }
        Ok(())
    }

    /// The single validated write path. Rejects keys that are not plain
    /// identifiers, and pins each set key to the kind of the value it holds:
    /// overwrites must keep the kind until the key is removed.
    pub fn apply(&mut self, key: &str, value: FieldValue) -> Result<(), ConfigError> {
        self.check(key, &value)?;
        log::trace!("Config store write: {} = {}", key, value);
        self.values_mut().insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values_mut().remove(key)
    }

    /// Read-only view of the current values.
    pub fn values(&self) -> &ValueMap {
        match &self.state {
            StoreState::Pristine(values) => values,
            StoreState::Dirty { current, .. } => current,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// True only when the current values actually differ from the snapshot
    /// taken at the first mutation. A write that restores the original state
    /// leaves nothing to save.
    pub fn needs_saving(&self) -> bool {
        match &self.state {
            StoreState::Pristine(_) => false,
            StoreState::Dirty { original, current } => original != current,
        }
    }

    /// Persists the current values to the backing file and resets the
    /// journal, so a following `needs_saving` reports false.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let path = self.path.clone().ok_or(ConfigError::NoBackingFile)?;
        let rendered = toml::to_string_pretty(self.values())?;
        fs::write(&path, rendered).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })?;

        let current = match std::mem::replace(&mut self.state, StoreState::Pristine(ValueMap::new()))
        {
            StoreState::Pristine(values) => values,
            StoreState::Dirty { current, .. } => current,
        };
        self.state = StoreState::Pristine(current);
        Ok(())
    }

    pub fn into_shared(self) -> SharedConfig {
        Rc::new(RefCell::new(self))
    }

    /// Mutable access to the values, transitioning the journal to `Dirty` on
    /// first use. The one and only clone of the map happens here.
    fn values_mut(&mut self) -> &mut ValueMap {
        if let StoreState::Pristine(values) = &mut self.state {
            let original = values.clone();
            let current = std::mem::take(values);
            self.state = StoreState::Dirty { original, current };
        }
        match &mut self.state {
            StoreState::Dirty { current, .. } => current,
            StoreState::Pristine(values) => values,
        }
    }
}

/// The conventional store location: `$ARGFORM_CONFIG` when set, otherwise
/// `<system config dir>/argform/config.toml`.
pub fn default_store_path() -> Result<PathBuf, ConfigError> {
    if let Ok(overridden) = std::env::var(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(overridden));
    }

    let dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(ARGFORM_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| ConfigError::ConfigDirCreation {
            path: dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(dir.join(CONFIG_STORE_FILENAME))
}

fn scalar_from_toml(value: &toml::Value) -> Option<FieldValue> {
    match value {
        toml::Value::String(s) => Some(FieldValue::String(s.clone())),
        toml::Value::Integer(i) => Some(FieldValue::Integer(*i)),
        toml::Value::Float(v) => Some(FieldValue::Float(*v)),
        toml::Value::Boolean(b) => Some(FieldValue::Bool(*b)),
        _ => None,
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rejects_non_identifier_keys() {
        let mut store = ConfigStore::new();
        for bad in ["", "9lives", "with-dash", "a b", "über"] {
            let result = store.apply(bad, FieldValue::from(1i64));
            assert!(
                matches!(result, Err(ConfigError::InvalidKey { .. })),
                "key '{}' should have been rejected",
                bad
            );
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_accepts_identifiers_and_overwrites() {
        let mut store = ConfigStore::new();
        store.apply("count", FieldValue::from(1i64)).unwrap();
        store.apply("_private", FieldValue::from(true)).unwrap();
        store.apply("count", FieldValue::from(5i64)).unwrap();
        assert_eq!(store.get("count"), Some(&FieldValue::Integer(5)));
        assert_eq!(store.get("_private"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_apply_pins_each_key_to_its_kind() {
        let mut store = ConfigStore::new();
        store.apply("port", FieldValue::from(5432i64)).unwrap();

        // Same kind overwrites freely; a different kind is rejected.
        store.apply("port", FieldValue::from(9000i64)).unwrap();
        let err = store.apply("port", FieldValue::from("nine thousand"));
        assert!(matches!(
            err,
            Err(ConfigError::KindMismatch {
                stored: ParamKind::Integer,
                offered: ParamKind::String,
                ..
            })
        ));
        assert_eq!(store.get("port"), Some(&FieldValue::Integer(9000)));

        // Removing the key releases the pin.
        store.remove("port");
        store.apply("port", FieldValue::from("default")).unwrap();
    }

    #[test]
    fn test_check_previews_apply_without_writing() {
        let mut store = ConfigStore::new();
        store.apply("port", FieldValue::from(5432i64)).unwrap();

        assert!(matches!(
            store.check("9lives", &FieldValue::from(1i64)),
            Err(ConfigError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.check("port", &FieldValue::from("five")),
            Err(ConfigError::KindMismatch { .. })
        ));
        store.check("port", &FieldValue::from(9000i64)).unwrap();
        store.check("fresh", &FieldValue::from(true)).unwrap();

        // Checks never write: the store still holds exactly the applied key.
        assert_eq!(store.get("port"), Some(&FieldValue::Integer(5432)));
        assert_eq!(store.values().len(), 1);
    }

    #[test]
    fn test_journal_only_reports_real_changes() {
        let mut store = ConfigStore::new();
        assert!(!store.needs_saving());

        store.apply("k", FieldValue::from("v")).unwrap();
        assert!(store.needs_saving());

        // Undoing the write restores the original snapshot.
        store.remove("k");
        assert!(!store.needs_saving());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut store = ConfigStore::load(&path).unwrap();
        assert!(store.is_empty());

        store.apply("host", FieldValue::from("localhost")).unwrap();
        store.apply("port", FieldValue::from(5432i64)).unwrap();
        store.apply("ratio", FieldValue::from(0.75)).unwrap();
        store.apply("verbose", FieldValue::from(true)).unwrap();
        store.save().unwrap();
        assert!(!store.needs_saving());

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.values(), store.values());
    }

    #[test]
    fn test_load_skips_non_scalar_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "keep = 1\nskip = [1, 2, 3]\n").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.get("keep"), Some(&FieldValue::Integer(1)));
        assert!(store.get("skip").is_none());
    }

    #[test]
    fn test_save_without_backing_file_fails() {
        let mut store = ConfigStore::new();
        store.apply("k", FieldValue::from(1i64)).unwrap();
        assert!(matches!(store.save(), Err(ConfigError::NoBackingFile)));
    }
}
