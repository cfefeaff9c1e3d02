// src/core/mod.rs

pub mod config_store;
pub mod factory;
pub mod instance_builder;
pub mod parameters;
pub mod synthesizer;
pub mod type_resolver;
