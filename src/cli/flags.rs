// src/cli/flags.rs

use crate::models::{FieldValue, ParamKind, ParamSpec, ValueMap};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

/// Registers one flag per spec on `command`. Flag name, type hint, default,
/// requiredness and help all come straight from the parameter specs.
pub fn apply_specs(mut command: Command, specs: &[ParamSpec]) -> Command {
    for spec in specs {
        command = command.arg(build_arg(spec));
    }
    command
}

/// Collects the values the user actually typed into an argument bag, keyed
/// by field name. Values clap filled in from its own default tracking are
/// left out on purpose: the synthesized command merges defaults itself, and
/// it is the only place allowed to (configuration overrides live there).
pub fn matches_to_values(matches: &ArgMatches, specs: &[ParamSpec]) -> ValueMap {
    let mut values = ValueMap::new();
    for spec in specs {
        if matches.value_source(&spec.field) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = if is_switch(spec) {
            Some(FieldValue::Bool(matches.get_flag(&spec.field)))
        } else {
            match spec.kind {
                ParamKind::Boolean => matches
                    .get_one::<bool>(&spec.field)
                    .map(|b| FieldValue::Bool(*b)),
                ParamKind::Integer => matches
                    .get_one::<i64>(&spec.field)
                    .map(|i| FieldValue::Integer(*i)),
                ParamKind::Float => matches
                    .get_one::<f64>(&spec.field)
                    .map(|v| FieldValue::Float(*v)),
                ParamKind::String | ParamKind::Opaque => matches
                    .get_one::<String>(&spec.field)
                    .map(|s| FieldValue::String(s.clone())),
            }
        };
        if let Some(value) = value {
            values.insert(spec.field.clone(), value);
        }
    }
    values
}

fn build_arg(spec: &ParamSpec) -> Arg {
    let mut arg = Arg::new(spec.field.clone()).long(spec.flag.clone());

    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    if spec.required {
        arg = arg.required(true);
    }

    // Optional booleans read best as plain presence flags.
    if is_switch(spec) {
        return arg.action(ArgAction::SetTrue);
    }

    arg = match spec.kind {
        ParamKind::Boolean => arg
            .value_parser(clap::value_parser!(bool))
            .value_name("BOOL"),
        ParamKind::Integer => arg
            .value_parser(clap::value_parser!(i64))
            .value_name("NUMBER"),
        ParamKind::Float => arg
            .value_parser(clap::value_parser!(f64))
            .value_name("NUMBER"),
        ParamKind::String => arg.value_name("TEXT"),
        // Opaque values stay raw strings; the model layer judges them.
        ParamKind::Opaque => arg.value_name("VALUE"),
    };

    // The synthesized command merges defaults itself; registering them here
    // as well only makes `--help` honest about what absent flags mean.
    if let Some(default) = &spec.default {
        arg = arg.default_value(default.to_string());
    }

    arg
}

fn is_switch(spec: &ParamSpec) -> bool {
    spec.kind == ParamKind::Boolean && !spec.required
}

// MARK: --- UNIT TESTS ---
