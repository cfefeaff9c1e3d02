// src/core/synthesizer.rs

use crate::core::config_store::{ConfigError, SharedConfig};
use crate::core::instance_builder::{self, InstanceError};
use crate::models::{CliModel, ModelDescriptor, ParamSpec, ValueMap};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Construction-time failures. Both variants indicate a broken spec sequence
/// rather than bad user input: `core::parameters` cannot legally produce
/// either shape, so hitting one means a bug upstream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("duplicate parameter name '{flag}' while synthesizing '{model}'")]
    DuplicateParameterName { model: String, flag: String },
    #[error(
        "optional parameter '{optional}' precedes required parameter '{required}' \
         while synthesizing '{model}'"
    )]
    InvalidOrdering {
        model: String,
        optional: String,
        required: String,
    },
}

/// Call-time failures of a synthesized command. These are returned, never
/// panicked: the hosting CLI runtime decides how to render them.
#[derive(Error, Debug)]
pub enum CallError {
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error("could not record '{key}' in the configuration store: {source}")]
    Config {
        key: String,
        #[source]
        source: ConfigError,
    },
    #[error("handler failed: {0:#}")]
    Handler(anyhow::Error),
}

type Runner = Box<dyn Fn(&ValueMap) -> Result<serde_json::Value, CallError>>;

/// The produced command: one callable over an argument bag, plus the
/// parameter specs the CLI integration registers flags from. Created once at
/// registration time, invoked many times, never mutated in between; the
/// runner is a pure function of the construction inputs.
pub struct SynthesizedCommand {
    descriptor: &'static ModelDescriptor,
    specs: Vec<ParamSpec>,
    runner: Runner,
}

impl SynthesizedCommand {
    /// Runs the command against a bag of supplied argument values.
    ///
    /// The bag only needs the values the caller actually provided; parameter
    /// defaults are merged in here, so the handler always sees a fully
    /// populated model.
    pub fn call(&self, supplied: &ValueMap) -> Result<serde_json::Value, CallError> {
        (self.runner)(supplied)
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn descriptor(&self) -> &'static ModelDescriptor {
        self.descriptor
    }

    pub fn model(&self) -> &str {
        self.descriptor.model()
    }
}

impl fmt::Debug for SynthesizedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedCommand")
            .field("model", &self.model())
            .field("specs", &self.specs.len())
            .finish()
    }
}

/// Turns a verified spec sequence plus a handler into a ready-to-register
/// command.
///
/// Invocation order inside the produced callable: merge spec defaults into
/// the supplied bag, rebuild and validate the typed instance, record the
/// resolved values in the shared store when one was supplied (the whole
/// batch is checked before the first write lands), then hand the instance
/// to the handler and pass its result through unmodified.
pub fn synthesize<M, H>(
    specs: Vec<ParamSpec>,
    handler: H,
    config: Option<SharedConfig>,
) -> Result<SynthesizedCommand, SynthesisError>
where
    M: CliModel + 'static,
    H: Fn(M) -> anyhow::Result<serde_json::Value> + 'static,
{
    let descriptor = M::descriptor();
    verify_unique_flags(descriptor.model(), &specs)?;
    verify_ordering(descriptor.model(), &specs)?;

    let call_specs = specs.clone();
    let runner: Runner = Box::new(move |supplied: &ValueMap| {
        // 1. Fill in defaults for anything the caller left out. Optionals
        //    without a default simply stay absent.
        let mut values = supplied.clone();
        for spec in &call_specs {
            if !values.contains_key(&spec.field)
                && let Some(default) = &spec.default
            {
                values.insert(spec.field.clone(), default.clone());
            }
        }

        // 2. Coerce, assemble and validate the typed instance.
        let instance: M = instance_builder::build(&call_specs, &values)?;

        // 3. Record the resolved field values before the handler runs. Every
        //    write is checked up front, so a rejected key leaves the store
        //    untouched instead of half-applied. The store borrow must end
        //    here; the handler may hold its own handle.
        if let Some(store) = &config {
            let mut store = store.borrow_mut();
            let resolved = instance.to_values();
            for (field, value) in &resolved {
                store
                    .check(field, value)
                    .map_err(|source| CallError::Config {
                        key: field.clone(),
                        source,
                    })?;
            }
            for (field, value) in resolved {
                store
                    .apply(&field, value)
                    .map_err(|source| CallError::Config {
                        key: field.clone(),
                        source,
                    })?;
            }
        }

        // 4. The handler's result travels through untouched.
        handler(instance).map_err(CallError::Handler)
    });

    Ok(SynthesizedCommand {
        descriptor,
        specs,
        runner,
    })
}

fn verify_unique_flags(model: &str, specs: &[ParamSpec]) -> Result<(), SynthesisError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.flag.as_str()) {
            return Err(SynthesisError::DuplicateParameterName {
                model: model.to_string(),
                flag: spec.flag.clone(),
            });
        }
    }
    Ok(())
}

fn verify_ordering(model: &str, specs: &[ParamSpec]) -> Result<(), SynthesisError> {
    let mut first_optional: Option<&str> = None;
    for spec in specs {
        if spec.required {
            if let Some(optional) = first_optional {
                return Err(SynthesisError::InvalidOrdering {
                    model: model.to_string(),
                    optional: optional.to_string(),
                    required: spec.field.clone(),
                });
            }
        } else if first_optional.is_none() {
            first_optional = Some(&spec.field);
        }
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---
