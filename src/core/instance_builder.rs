// src/core/instance_builder.rs

use crate::models::{CliModel, FieldFault, FieldValue, ParamKind, ParamSpec, ValueMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("model '{model}': {} field value(s) were rejected", .faults.len())]
    Coercion {
        model: String,
        faults: Vec<FieldFault>,
    },
    #[error("model '{model}' rejected the instance: {message}")]
    Validation { model: String, message: String },
}

/// Reconstructs a validated model instance from a flat argument bag.
///
/// Every field is coerced according to its spec's resolved kind before the
/// typed instance is assembled, and every offending field is reported, not
/// just the first: a `Coercion` failure carries one fault per bad field.
/// Model-level validation runs last, only once all fields coerced cleanly.
pub fn build<M: CliModel>(specs: &[ParamSpec], values: &ValueMap) -> Result<M, InstanceError> {
    let model = M::descriptor().model();
    let mut coerced = ValueMap::new();
    let mut faults = Vec::new();

    for spec in specs {
        match values.get(&spec.field) {
            Some(raw) => match coerce(raw, spec.kind) {
                Ok(value) => {
                    coerced.insert(spec.field.clone(), value);
                }
                Err(reason) => faults.push(FieldFault::new(&spec.field, reason)),
            },
            None if spec.required => faults.push(FieldFault::missing(&spec.field)),
            None => {}
        }
    }

    // The bag mirrors a keyword-argument list, so a key no spec claims is a
    // caller error rather than something to ignore.
    for key in values.keys() {
        if !specs.iter().any(|spec| &spec.field == key) {
            faults.push(FieldFault::new(key, "unknown field"));
        }
    }

    if !faults.is_empty() {
        log::debug!(
            "Instance build for model '{}' rejected {} field(s).",
            model,
            faults.len()
        );
        return Err(InstanceError::Coercion {
            model: model.to_string(),
            faults,
        });
    }

    let instance = M::from_values(&coerced).map_err(|fault| InstanceError::Coercion {
        model: model.to_string(),
        faults: vec![fault],
    })?;

    instance
        .validate()
        .map_err(|message| InstanceError::Validation {
            model: model.to_string(),
            message,
        })?;

    Ok(instance)
}

/// Coerces one supplied value to the kind its spec resolved to.
///
/// Strings parse into the numeric and boolean kinds; integers widen into
/// floats. Nothing narrows, and opaque kinds pass through untouched for the
/// model layer to judge.
fn coerce(value: &FieldValue, kind: ParamKind) -> Result<FieldValue, String> {
    match kind {
        ParamKind::Opaque => Ok(value.clone()),

        ParamKind::String => match value {
            FieldValue::String(_) => Ok(value.clone()),
            other => Err(mismatch_reason(ParamKind::String, other)),
        },

        ParamKind::Integer => match value {
            FieldValue::Integer(_) => Ok(value.clone()),
            FieldValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| format!("'{}' is not an integer", s)),
            other => Err(mismatch_reason(ParamKind::Integer, other)),
        },

        ParamKind::Float => match value {
            FieldValue::Float(_) => Ok(value.clone()),
            FieldValue::Integer(i) => Ok(FieldValue::Float(*i as f64)),
            FieldValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| format!("'{}' is not a number", s)),
            other => Err(mismatch_reason(ParamKind::Float, other)),
        },

        ParamKind::Boolean => match value {
            FieldValue::Bool(_) => Ok(value.clone()),
            FieldValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(FieldValue::Bool(true)),
                "false" => Ok(FieldValue::Bool(false)),
                _ => Err(format!("'{}' is not a boolean (expected true or false)", s)),
            },
            other => Err(mismatch_reason(ParamKind::Boolean, other)),
        },
    }
}

fn mismatch_reason(expected: ParamKind, got: &FieldValue) -> String {
    format!("expected {} but got {} '{}'", expected, got.kind(), got)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters;
    use crate::models::{FieldDef, FieldType, ModelDescriptor};
    use std::sync::OnceLock;

    // Hand-written fixture model; the `cli_model!` macro generates the same
    // shape for real models.
    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        name: String,
        count: i64,
        ratio: Option<f64>,
    }

    impl CliModel for Reading {
        fn descriptor() -> &'static ModelDescriptor {
            static DESCRIPTOR: OnceLock<ModelDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                ModelDescriptor::new(
                    "Reading",
                    vec![
                        FieldDef::new("name", FieldType::String),
                        FieldDef::new("count", FieldType::Integer).with_default(1i64),
                        FieldDef::new("ratio", FieldType::Optional(Box::new(FieldType::Float))),
                    ],
                )
            })
        }

        fn from_values(values: &ValueMap) -> Result<Self, FieldFault> {
            let name = match values.get("name") {
                Some(v) => v
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FieldFault::mismatch("name", ParamKind::String, v))?,
                None => return Err(FieldFault::missing("name")),
            };
            let count = match values.get("count") {
                Some(v) => v
                    .as_integer()
                    .ok_or_else(|| FieldFault::mismatch("count", ParamKind::Integer, v))?,
                None => 1,
            };
            let ratio = match values.get("ratio") {
                Some(v) => Some(
                    v.as_float()
                        .ok_or_else(|| FieldFault::mismatch("ratio", ParamKind::Float, v))?,
                ),
                None => None,
            };
            Ok(Self { name, count, ratio })
        }

        fn to_values(&self) -> ValueMap {
            let mut map = ValueMap::new();
            map.insert("name".to_string(), FieldValue::from(self.name.clone()));
            map.insert("count".to_string(), FieldValue::from(self.count));
            if let Some(ratio) = self.ratio {
                map.insert("ratio".to_string(), FieldValue::from(ratio));
            }
            map
        }

        fn validate(&self) -> Result<(), String> {
            if self.count < 0 {
                return Err("count must be non-negative".to_string());
            }
            Ok(())
        }
    }

    fn reading_specs() -> Vec<ParamSpec> {
        parameters::extract(Reading::descriptor(), None).unwrap()
    }

    fn bag(entries: &[(&str, FieldValue)]) -> ValueMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // --- Build pipeline ---

    #[test]
    fn test_round_trip_reproduces_the_instance() {
        let original = Reading {
            name: "build".to_string(),
            count: 3,
            ratio: Some(0.5),
        };
        let rebuilt: Reading = build(&reading_specs(), &original.to_values()).unwrap();
        assert_eq!(rebuilt, original);

        // Absent optionals survive the trip too.
        let sparse = Reading {
            name: "x".to_string(),
            count: 1,
            ratio: None,
        };
        let rebuilt: Reading = build(&reading_specs(), &sparse.to_values()).unwrap();
        assert_eq!(rebuilt, sparse);
    }

    #[test]
    fn test_string_arguments_parse_into_declared_kinds() {
        let values = bag(&[
            ("name", FieldValue::from("deploy")),
            ("count", FieldValue::from("7")),
            ("ratio", FieldValue::from("0.25")),
        ]);
        let reading: Reading = build(&reading_specs(), &values).unwrap();
        assert_eq!(reading.count, 7);
        assert_eq!(reading.ratio, Some(0.25));
    }

    #[test]
    fn test_every_bad_field_is_reported_not_just_the_first() {
        let values = bag(&[
            ("count", FieldValue::from("many")),
            ("ratio", FieldValue::from("most")),
        ]);
        let err = build::<Reading>(&reading_specs(), &values).unwrap_err();
        match err {
            InstanceError::Coercion { faults, .. } => {
                let fields: Vec<_> = faults.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "count", "ratio"]);
            }
            other => panic!("expected a coercion failure, got: {other}"),
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let values = bag(&[
            ("name", FieldValue::from("x")),
            ("shape", FieldValue::from("round")),
        ]);
        let err = build::<Reading>(&reading_specs(), &values).unwrap_err();
        match err {
            InstanceError::Coercion { faults, .. } => {
                assert_eq!(faults.len(), 1);
                assert_eq!(faults[0].field, "shape");
                assert!(faults[0].reason.contains("unknown"));
            }
            other => panic!("expected a coercion failure, got: {other}"),
        }
    }

    #[test]
    fn test_model_validation_runs_after_coercion() {
        let values = bag(&[
            ("name", FieldValue::from("x")),
            ("count", FieldValue::from(-2i64)),
        ]);
        let err = build::<Reading>(&reading_specs(), &values).unwrap_err();
        match err {
            InstanceError::Validation { message, .. } => {
                assert_eq!(message, "count must be non-negative");
            }
            other => panic!("expected a validation failure, got: {other}"),
        }
    }

    // --- Coercion table ---

    #[test]
    fn test_integers_widen_to_float_but_floats_never_narrow() {
        assert_eq!(
            coerce(&FieldValue::Integer(2), ParamKind::Float),
            Ok(FieldValue::Float(2.0))
        );
        assert!(coerce(&FieldValue::Float(2.5), ParamKind::Integer).is_err());
    }

    #[test]
    fn test_boolean_strings_are_strict() {
        assert_eq!(
            coerce(&FieldValue::from("TRUE"), ParamKind::Boolean),
            Ok(FieldValue::Bool(true))
        );
        assert!(coerce(&FieldValue::from("yes"), ParamKind::Boolean).is_err());
    }

    #[test]
    fn test_opaque_values_pass_through_unchanged() {
        let raw = FieldValue::from("[1, 2, 3]");
        assert_eq!(coerce(&raw, ParamKind::Opaque), Ok(raw.clone()));
        assert_eq!(
            coerce(&FieldValue::Integer(4), ParamKind::Opaque),
            Ok(FieldValue::Integer(4))
        );
    }

    #[test]
    fn test_non_string_values_do_not_satisfy_string_kind() {
        let err = coerce(&FieldValue::Integer(1), ParamKind::String).unwrap_err();
        assert!(err.contains("expected string"));
    }
}
