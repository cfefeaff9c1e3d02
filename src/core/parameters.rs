// src/core/parameters.rs

use crate::core::config_store::ConfigStore;
use crate::core::type_resolver::{self, TypeError};
use crate::models::{FieldDef, ModelDescriptor, ParamKind, ParamSpec};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("model '{model}' declares no fields")]
    EmptyModel { model: String },
    #[error("model '{model}', field '{field}': {source}")]
    Type {
        model: String,
        field: String,
        #[source]
        source: TypeError,
    },
}

/// Produces the full parameter spec sequence for a model, required fields
/// first. The relative order inside each group follows field declaration
/// order; the synthesizer depends on that grouping and re-checks it.
///
/// When an `overrides` store is supplied, a value stored under a field's name
/// becomes that field's effective default and makes the parameter optional,
/// winning over any default declared on the model itself.
pub fn extract(
    descriptor: &ModelDescriptor,
    overrides: Option<&ConfigStore>,
) -> Result<Vec<ParamSpec>, ExtractError> {
    if descriptor.is_empty() {
        return Err(ExtractError::EmptyModel {
            model: descriptor.model().to_string(),
        });
    }

    let mut required = Vec::new();
    let mut optional = Vec::new();

    for field in descriptor.fields() {
        let spec = spec_for_field(descriptor.model(), field, overrides)?;
        if spec.required {
            required.push(spec);
        } else {
            optional.push(spec);
        }
    }

    log::debug!(
        "Extracted {} parameter spec(s) for model '{}' ({} required).",
        required.len() + optional.len(),
        descriptor.model(),
        required.len()
    );

    let mut specs = required;
    specs.extend(optional);
    Ok(specs)
}

fn spec_for_field(
    model: &str,
    field: &FieldDef,
    overrides: Option<&ConfigStore>,
) -> Result<ParamSpec, ExtractError> {
    let kind = type_resolver::resolve(&field.ty).map_err(|source| ExtractError::Type {
        model: model.to_string(),
        field: field.name.clone(),
        source,
    })?;

    if kind == ParamKind::Opaque {
        // Documented trade-off: the command still builds and the value
        // travels as a raw string, deferring validation to the model layer.
        log::debug!(
            "Field '{}' of model '{}' (declared '{}') has no precise CLI kind; \
             accepting raw string input for it.",
            field.name,
            model,
            field.ty
        );
    }

    let override_value = overrides.and_then(|store| store.get(&field.name)).cloned();
    if override_value.is_some() {
        log::debug!(
            "Default for '{}.{}' supplied by the configuration store.",
            model,
            field.name
        );
    }
    let default = override_value.or_else(|| field.default.clone());

    // A field is required only when nothing can stand in for a missing
    // value: no default, no override, and a type that cannot be absent.
    let required = default.is_none() && !field.ty.admits_absence();

    Ok(ParamSpec {
        field: field.name.clone(),
        kind,
        declared: field.ty.clone(),
        default,
        required,
        help: field.help.clone(),
        flag: field.name.replace('_', "-"),
    })
}

// MARK: --- UNIT TESTS ---
