// src/constants.rs

/// The name of the directory containing argform configuration (in ~/.config/).
pub const ARGFORM_DIR: &str = "argform";

/// The name of the persisted configuration store file (inside the argform dir).
pub const CONFIG_STORE_FILENAME: &str = "config.toml";

/// Nesting ceiling for declared type reduction. Anything deeper collapses to
/// the opaque kind instead of recursing further.
pub const MAX_TYPE_DEPTH: usize = 16;

pub const ENV_CONFIG_PATH: &str = "ARGFORM_CONFIG";
