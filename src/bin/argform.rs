// src/bin/argform.rs

use anyhow::Result;
use argform::cli::registry::{CommandRegistry, DispatchError};
use argform::cli_model;
use argform::core::config_store::{ConfigStore, SharedConfig};
use argform::core::synthesizer::CallError;
use clap::Command;
use colored::*;
use serde_json::json;

// --- Command Models ---

cli_model! {
    /// Copies rows out of the local store into a file.
    pub struct Export {
        path: string, "Destination file";
        format: string = "csv", "Output format, csv or json";
        row_limit: integer?, "Stop after this many rows";
        overwrite: boolean = false, "Replace the destination if it already exists";
    }
    validate = sane_export;
}

fn sane_export(export: &Export) -> Result<(), String> {
    match export.format.as_str() {
        "csv" | "json" => Ok(()),
        other => Err(format!("unsupported format '{other}'")),
    }
}

cli_model! {
    /// Opens a connection against a database host.
    pub struct Connect {
        host: string, "Host to reach";
        port: integer = 5432, "TCP port";
        timeout: float?, "Seconds before giving up";
    }
    validate = sane_connect;
}

fn sane_connect(connect: &Connect) -> Result<(), String> {
    if connect.port <= 0 || connect.port > 65535 {
        return Err(format!("port {} is outside 1..=65535", connect.port));
    }
    Ok(())
}

// --- Registry Construction ---

/// Registers every shipped command. Models that fail synthesis are logged
/// and skipped inside the registry, so one bad model never takes down the
/// whole binary.
fn build_registry(config: &SharedConfig) -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register::<Export, _>(
        "export",
        |export: Export| {
            Ok(json!({
                "path": export.path,
                "format": export.format,
                "row_limit": export.row_limit,
                "overwrite": export.overwrite,
            }))
        },
        Some(config.clone()),
    );

    registry.register::<Connect, _>(
        "connect",
        |connect: Connect| {
            let dsn = format!("db://{}:{}", connect.host, connect.port);
            Ok(json!({
                "dsn": dsn,
                "timeout": connect.timeout,
            }))
        },
        Some(config.clone()),
    );

    registry
}

/// The main entry point of the `argform` binary.
/// It sets up logging, synthesizes the command set, dispatches the chosen
/// subcommand, and performs centralized error handling.
fn main() {
    env_logger::init();

    if let Err(e) = run() {
        // --- Centralized Error Handling ---
        eprintln!("\n{}: {}", "Error".red().bold(), e);

        // Rejected field values are a usage problem, not a program failure,
        // so they get the same exit code clap uses for bad arguments.
        let usage = e
            .downcast_ref::<DispatchError>()
            .is_some_and(|err| matches!(err, DispatchError::Call(CallError::Instance(_))));
        std::process::exit(if usage { 2 } else { 1 });
    }
}

fn run() -> Result<()> {
    let config = ConfigStore::load_default()?.into_shared();
    let registry = build_registry(&config);

    let cli = registry
        .to_clap(
            Command::new("argform")
                .about("Commands synthesized from declarative data models")
                .version(env!("CARGO_PKG_VERSION"))
                .subcommand_required(true)
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("spec").about("Print every command's parameter contract as JSON"),
        );

    let matches = cli.get_matches();
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(());
    };

    // --- Dispatch ---
    if name == "spec" {
        println!("{}", serde_json::to_string_pretty(&registry.describe())?);
        return Ok(());
    }

    let result = registry.dispatch(name, sub)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    // Persist configuration values the call wrote back.
    let mut store = config.borrow_mut();
    if store.needs_saving() {
        store.save()?;
        log::debug!("Saved configuration overrides");
    }

    Ok(())
}
