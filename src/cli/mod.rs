// src/cli/mod.rs

pub mod flags;
pub mod registry;
