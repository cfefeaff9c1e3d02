// src/core/type_resolver.rs

use crate::constants::MAX_TYPE_DEPTH;
use crate::models::{FieldType, ParamKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error(
        "ambiguous type '{declared}': {arms} candidate types remain after discarding absent arms"
    )]
    Ambiguous { declared: FieldType, arms: usize },
}

/// Reduces a declared field type to the single kind the CLI layer can
/// register a flag with.
///
/// The reduction is total over everything except genuinely ambiguous unions:
/// unknown and compound types collapse to [`ParamKind::Opaque`] instead of
/// failing, so command synthesis never refuses a model for having a field the
/// CLI cannot type precisely. Pure function, no side effects.
pub fn resolve(declared: &FieldType) -> Result<ParamKind, TypeError> {
    reduce(declared, 0)
}

fn reduce(ty: &FieldType, depth: usize) -> Result<ParamKind, TypeError> {
    // Pathologically nested declarations stop recursing and go opaque.
    if depth > MAX_TYPE_DEPTH {
        return Ok(ParamKind::Opaque);
    }

    match ty {
        FieldType::String => Ok(ParamKind::String),
        FieldType::Integer => Ok(ParamKind::Integer),
        FieldType::Float => Ok(ParamKind::Float),
        FieldType::Boolean => Ok(ParamKind::Boolean),

        // Optionality only affects requiredness, never the kind.
        FieldType::Optional(inner) => reduce(inner, depth + 1),

        FieldType::Union(arms) => {
            // Drop absent arms and exact duplicates, then decide on what is
            // left: one candidate recurses, several are ambiguous, none
            // degenerates to opaque.
            let mut candidates: Vec<&FieldType> = Vec::new();
            for arm in arms {
                if matches!(arm, FieldType::Absent) {
                    continue;
                }
                if !candidates.contains(&arm) {
                    candidates.push(arm);
                }
            }
            match candidates.as_slice() {
                [] => Ok(ParamKind::Opaque),
                [only] => reduce(only, depth + 1),
                _ => Err(TypeError::Ambiguous {
                    declared: ty.clone(),
                    arms: candidates.len(),
                }),
            }
        }

        // A lone absent arm carries no representable value.
        FieldType::Absent => Ok(ParamKind::Opaque),

        // Containers keep their outer shape only; the element type is never
        // inspected, so `list<union<...>>` is opaque rather than ambiguous.
        FieldType::List(_) => Ok(ParamKind::Opaque),

        FieldType::Custom(_) => Ok(ParamKind::Opaque),
    }
}

// MARK: --- UNIT TESTS ---
