// src/core/factory.rs

use crate::core::config_store::SharedConfig;
use crate::core::parameters::{self, ExtractError};
use crate::core::synthesizer::{self, SynthesisError, SynthesizedCommand};
use crate::models::CliModel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Spec(#[from] ExtractError),
    #[error("internal invariant violation: {0}")]
    Invariant(#[from] SynthesisError),
}

impl BuildError {
    /// Invariant violations point at a bug in this crate, not at the model
    /// being registered. Callers report them differently.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// The single entry point for turning a model type plus a handler into a
/// ready-to-register command: extract the parameter specs, then synthesize
/// the callable. No logic of its own beyond propagating the first failure.
///
/// A failure here is fatal only to this one command; callers registering
/// several commands keep going with the rest.
pub fn build<M, H>(handler: H, config: Option<SharedConfig>) -> Result<SynthesizedCommand, BuildError>
where
    M: CliModel + 'static,
    H: Fn(M) -> anyhow::Result<serde_json::Value> + 'static,
{
    let descriptor = M::descriptor();
    log::debug!("Synthesizing command for model '{}'.", descriptor.model());

    let specs = {
        let store = config.as_ref().map(|shared| shared.borrow());
        parameters::extract(descriptor, store.as_deref())?
    };

    Ok(synthesizer::synthesize::<M, H>(specs, handler, config)?)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_store::ConfigStore;
    use crate::models::{FieldDef, FieldFault, FieldType, FieldValue, ModelDescriptor, ValueMap};
    use serde_json::json;
    use std::sync::OnceLock;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        host: String,
    }

    impl CliModel for Ping {
        fn descriptor() -> &'static ModelDescriptor {
            static DESCRIPTOR: OnceLock<ModelDescriptor> = OnceLock::new();
            DESCRIPTOR
                .get_or_init(|| ModelDescriptor::new("Ping", vec![FieldDef::new("host", FieldType::String)]))
        }

        fn from_values(values: &ValueMap) -> Result<Self, FieldFault> {
            let host = values
                .get("host")
                .and_then(FieldValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| FieldFault::missing("host"))?;
            Ok(Self { host })
        }

        fn to_values(&self) -> ValueMap {
            let mut map = ValueMap::new();
            map.insert("host".to_string(), FieldValue::from(self.host.clone()));
            map
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Hollow;

    impl CliModel for Hollow {
        fn descriptor() -> &'static ModelDescriptor {
            static DESCRIPTOR: OnceLock<ModelDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| ModelDescriptor::new("Hollow", vec![]))
        }

        fn from_values(_values: &ValueMap) -> Result<Self, FieldFault> {
            Ok(Self)
        }

        fn to_values(&self) -> ValueMap {
            ValueMap::new()
        }
    }

    #[test]
    fn test_build_wires_extraction_into_synthesis() {
        let command = build::<Ping, _>(|ping| Ok(json!(ping.host)), None).unwrap();
        assert_eq!(command.model(), "Ping");
        assert_eq!(command.specs().len(), 1);
        assert!(command.specs()[0].required);

        let mut values = ValueMap::new();
        values.insert("host".to_string(), FieldValue::from("db1"));
        assert_eq!(command.call(&values).unwrap(), json!("db1"));
    }

    #[test]
    fn test_empty_models_fail_to_build_as_a_spec_error() {
        let err = build::<Hollow, _>(|_| Ok(json!(null)), None).unwrap_err();
        assert!(matches!(err, BuildError::Spec(ExtractError::EmptyModel { .. })));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_store_overrides_flow_through_the_factory() {
        let mut store = ConfigStore::new();
        store.apply("host", FieldValue::from("cached-host")).unwrap();
        let shared = store.into_shared();

        let command = build::<Ping, _>(|ping| Ok(json!(ping.host)), Some(shared)).unwrap();
        assert!(!command.specs()[0].required);

        // With the override standing in as default, the bag may be empty.
        assert_eq!(command.call(&ValueMap::new()).unwrap(), json!("cached-host"));
    }
}
