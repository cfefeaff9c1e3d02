// src/cli/registry.rs

use std::collections::BTreeMap;

use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::cli::flags;
use crate::core::config_store::SharedConfig;
use crate::core::factory::{self, BuildError};
use crate::core::synthesizer::{CallError, SynthesizedCommand};
use crate::models::CliModel;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },

    #[error(transparent)]
    Call(#[from] CallError),
}

/// The single source of truth for every synthesized command.
///
/// Models are registered by name; each registration runs the full factory
/// pipeline immediately, so a broken model surfaces at startup instead of
/// at call time. A failed build skips that command and records the error,
/// leaving the rest of the registry usable.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, SynthesizedCommand>,
    failures: Vec<(String, BuildError)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an already-synthesized command under `name`.
    pub fn insert(&mut self, name: &str, command: SynthesizedCommand) {
        log::debug!("Registered command '{}' (model '{}')", name, command.model());
        if self.commands.insert(name.to_string(), command).is_some() {
            log::warn!("Command '{}' registered twice; the later one wins", name);
        }
    }

    /// Synthesizes a command from `M` and files it under `name`.
    pub fn register<M, H>(&mut self, name: &str, handler: H, config: Option<SharedConfig>)
    where
        M: CliModel + 'static,
        H: Fn(M) -> anyhow::Result<serde_json::Value> + 'static,
    {
        match factory::build::<M, H>(handler, config) {
            Ok(command) => self.insert(name, command),
            Err(err) => {
                log::error!("Skipping command '{}': {}", name, err);
                self.failures.push((name.to_string(), err));
            }
        }
    }

    /// Adds one subcommand per registered command to `base`, flags included.
    pub fn to_clap(&self, mut base: Command) -> Command {
        for (name, command) in &self.commands {
            let sub = Command::new(name.clone())
                .about(format!("Synthesized from the {} model", command.model()));
            base = base.subcommand(flags::apply_specs(sub, command.specs()));
        }
        base
    }

    /// Runs the named command against already-parsed matches.
    pub fn dispatch(
        &self,
        name: &str,
        matches: &ArgMatches,
    ) -> Result<serde_json::Value, DispatchError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand {
                name: name.to_string(),
            })?;
        let values = flags::matches_to_values(matches, command.specs());
        Ok(command.call(&values)?)
    }

    pub fn get(&self, name: &str) -> Option<&SynthesizedCommand> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Build errors recorded during registration, in registration order.
    pub fn failures(&self) -> &[(String, BuildError)] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// A machine-readable dump of every command's parameter contract,
    /// keyed by command name. Keys come out in sorted order.
    pub fn describe(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        for (name, command) in &self.commands {
            doc.insert(
                name.clone(),
                serde_json::json!({
                    "model": command.model(),
                    "parameters": command.specs(),
                }),
            );
        }
        serde_json::Value::Object(doc)
    }
}

// MARK: --- UNIT TESTS ---
