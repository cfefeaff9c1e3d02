// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// --- TYPE ALGEBRA ---
// The closed set of declared field types and the reduced, CLI-representable
// kinds they collapse into. Both are tagged enums on purpose: no name-string
// matching happens anywhere in the crate.

/// The declared type of a model field, as written in the model definition.
///
/// Unions and optionals may nest arbitrarily; `core::type_resolver` reduces
/// any expression to a single [`ParamKind`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// `T or absent`. Shorthand for a union of `T` with [`FieldType::Absent`].
    Optional(Box<FieldType>),
    /// Several candidate types. Absent arms are discarded during resolution.
    Union(Vec<FieldType>),
    /// The explicit "no value" arm of a union. Meaningless on its own.
    Absent,
    /// A parametrized container. The element type is deliberately opaque to
    /// the CLI layer and is never inspected during resolution.
    List(Box<FieldType>),
    /// Any other named type the CLI cannot represent natively.
    Custom(&'static str),
}

impl FieldType {
    /// Whether this declaration allows the value to be missing entirely.
    /// Such fields are optional even when they carry no default.
    pub fn admits_absence(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Optional(_) => true,
            Self::Union(arms) => arms.iter().any(Self::admits_absence),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Optional(inner) => write!(f, "optional<{}>", inner),
            Self::Union(arms) => {
                write!(f, "union<")?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", arm)?;
                }
                write!(f, ">")
            }
            Self::Absent => write!(f, "absent"),
            Self::List(inner) => write!(f, "list<{}>", inner),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// The reduced kind a declared type collapses into. This is what the CLI
/// integration understands: anything it cannot represent natively becomes
/// `Opaque` and travels as an uninterpreted string.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Opaque,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Opaque => "opaque",
        };
        write!(f, "{}", name)
    }
}

// --- RUNTIME VALUES ---

/// A single runtime value flowing between the CLI matches, the instance
/// builder, the typed model and the configuration store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// The kind this value satisfies without any coercion.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Boolean,
            Self::Integer(_) => ParamKind::Integer,
            Self::Float(_) => ParamKind::Float,
            Self::String(_) => ParamKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen losslessly into floats; the reverse never happens.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// The flat argument bag: field name to supplied value. Ordered so that
/// iteration (config write-back, error reports, tests) is deterministic.
pub type ValueMap = BTreeMap<String, FieldValue>;

/// A problem with one specific field, reported by value conversions and by
/// the instance builder. Coercion failures carry one of these per field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field '{field}': {reason}")]
pub struct FieldFault {
    pub field: String,
    pub reason: String,
}

impl FieldFault {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "required value is missing")
    }

    pub fn mismatch(field: impl Into<String>, expected: ParamKind, got: &FieldValue) -> Self {
        Self::new(
            field,
            format!("expected {} but got {} '{}'", expected, got.kind(), got),
        )
    }
}

// --- MODEL DESCRIPTORS ---

/// One field of a model: name, declared type, default and help text as
/// written in the model definition.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub default: Option<FieldValue>,
    pub help: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            help: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// The derived view of a model type: its name and its fields in declaration
/// order. Built once per model type (the `cli_model!` macro caches it in a
/// `OnceLock`) and never mutated afterwards, which is why the fields are
/// only reachable through accessors.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    model: String,
    fields: Vec<FieldDef>,
}

impl ModelDescriptor {
    pub fn new(model: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            model: model.into(),
            fields,
        }
    }

    /// The model's type name, used in diagnostics.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One field's CLI-facing contract, produced by `core::parameters`.
///
/// A spec is required exactly when its field has no effective default: no
/// declared default, no override from the configuration store, and a
/// declared type that does not admit absence. Flag names are unique within
/// one synthesized command; `core::synthesizer` refuses to build otherwise.
#[derive(Serialize, Debug, Clone)]
pub struct ParamSpec {
    /// Field name exactly as declared on the model.
    pub field: String,
    /// Reduced kind the CLI layer registers the flag with.
    pub kind: ParamKind,
    /// The original declared type, kept for diagnostics.
    pub declared: FieldType,
    /// Effective default after configuration overrides.
    pub default: Option<FieldValue>,
    pub required: bool,
    pub help: Option<String>,
    /// CLI flag name: the field name with `_` replaced by `-`.
    pub flag: String,
}

// --- MODEL CONTRACT ---

/// Implemented by every type that can act as a command model. Normally
/// generated by the [`cli_model!`](crate::cli_model) macro; hand-written
/// implementations only need to uphold one rule: `to_values` followed by
/// `from_values` must reproduce an equal instance.
pub trait CliModel: Sized {
    /// The cached, process-lifetime descriptor for this model type.
    fn descriptor() -> &'static ModelDescriptor;

    /// Builds the typed instance from an argument bag whose values have
    /// already been coerced to each field's resolved kind.
    fn from_values(values: &ValueMap) -> Result<Self, FieldFault>;

    /// Flattens the instance back into an argument bag. Absent optional
    /// fields stay absent from the map.
    fn to_values(&self) -> ValueMap;

    /// The model's own cross-field validation. The default accepts
    /// everything; models override this to enforce business rules and the
    /// returned message is surfaced verbatim to the caller.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_kinds() {
        assert_eq!(FieldValue::from(true).kind(), ParamKind::Boolean);
        assert_eq!(FieldValue::from(7i64).kind(), ParamKind::Integer);
        assert_eq!(FieldValue::from(0.5).kind(), ParamKind::Float);
        assert_eq!(FieldValue::from("x").kind(), ParamKind::String);
    }

    #[test]
    fn test_integer_widens_to_float_but_not_back() {
        assert_eq!(FieldValue::Integer(3).as_float(), Some(3.0));
        assert_eq!(FieldValue::Float(3.0).as_integer(), None);
    }

    #[test]
    fn test_field_type_rendering() {
        let ty = FieldType::Union(vec![
            FieldType::String,
            FieldType::List(Box::new(FieldType::Integer)),
        ]);
        assert_eq!(ty.to_string(), "union<string | list<integer>>");
        assert_eq!(
            FieldType::Optional(Box::new(FieldType::Boolean)).to_string(),
            "optional<boolean>"
        );
    }

    #[test]
    fn test_descriptor_lookup_preserves_declaration_order() {
        let descriptor = ModelDescriptor::new(
            "Sample",
            vec![
                FieldDef::new("b_field", FieldType::String),
                FieldDef::new("a_field", FieldType::Integer).with_default(4i64),
            ],
        );
        let names: Vec<_> = descriptor.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b_field", "a_field"]);
        assert!(descriptor.field("a_field").is_some());
        assert!(descriptor.field("missing").is_none());
    }

    #[test]
    fn test_absence_is_visible_through_nesting() {
        assert!(FieldType::Optional(Box::new(FieldType::String)).admits_absence());
        assert!(
            FieldType::Union(vec![FieldType::Integer, FieldType::Absent]).admits_absence()
        );
        assert!(!FieldType::Union(vec![FieldType::Integer, FieldType::Float]).admits_absence());
        assert!(!FieldType::List(Box::new(FieldType::Absent)).admits_absence());
    }

    #[test]
    fn test_fault_messages_name_the_field() {
        let fault = FieldFault::mismatch("count", ParamKind::Integer, &FieldValue::from("x"));
        assert!(fault.to_string().contains("count"));
        assert!(fault.to_string().contains("integer"));
    }
}
