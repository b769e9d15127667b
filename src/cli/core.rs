//! Core CLI dispatch, errors, and shell context helpers.

use std::io;

use dialoguer::{theme::ColorfulTheme, Confirm};
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;

use crate::{
    config::{Config, ConfigError, ConfigManager},
    core::{services::ServiceError, BookManager, LoadMetadata},
    currency::LocaleConfig,
    storage::JsonStore,
};

use super::commands;
use super::output::{self, OutputPreferences};
use super::registry::{CommandEntry, CommandRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Errors raised by a single command; the shell reports them and keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Service(ServiceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<ServiceError> for CommandError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(message) => CommandError::InvalidArguments(message),
            other => CommandError::Service(other),
        }
    }
}

/// Errors that stop the shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub manager: BookManager,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub theme: ColorfulTheme,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_config_manager(
        mode: CliMode,
        config_manager: ConfigManager,
    ) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        output::set_preferences(OutputPreferences {
            color_enabled: true,
            plain_mode: mode == CliMode::Script,
        });
        let config = config_manager.load()?;
        output::apply_config(&config);

        let (manager, metadata) = open_manager(&config_manager, &config)?;
        let context = ShellContext {
            mode,
            registry,
            manager,
            config_manager,
            config,
            theme: ColorfulTheme::default(),
            last_command: None,
            running: true,
        };
        context.report_load(&metadata);
        Ok(context)
    }

    /// Reopens the record store after a setting that affects it changed.
    pub(crate) fn reopen_store(&mut self) -> CommandResult {
        let (manager, metadata) = open_manager(&self.config_manager, &self.config)?;
        self.manager = manager;
        self.report_load(&metadata);
        Ok(())
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn locale(&self) -> LocaleConfig {
        self.config.locale_config()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn report_load(&self, metadata: &LoadMetadata) {
        for note in &metadata.migrations {
            output::info(format!("Migration: {}", note));
        }
        for warning in &metadata.warnings {
            output::warning(warning);
        }
        if metadata.seeded {
            output::info("Created sample data in the empty store.");
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|key| (levenshtein(key, &needle), key))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = best {
            if distance <= 3 {
                output::hint(format!("Did you mean `{}`?", best));
            }
        }
    }

    /// Asks for confirmation interactively; scripted runs always proceed.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(CommandError::from)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        self.confirm("Exit shell?").map_err(CliError::from)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                self.error_line(&message);
                output::hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Service(ServiceError::MissingRate { currency, period }) => {
                self.error_line(format!("No FX rate for {} in {}.", currency, period));
                output::hint(format!("Add one with `fx set month={} usd=... eur=...`.", period));
                Ok(())
            }
            other => {
                self.error_line(&other);
                Ok(())
            }
        }
    }

    /// Scripted runs name the failing line, since nothing was echoed.
    fn error_line(&self, message: impl std::fmt::Display) {
        match (&self.mode, &self.last_command) {
            (CliMode::Script, Some(line)) => output::error(format!("{}: {}", line, message)),
            _ => output::error(message),
        }
    }
}

fn open_manager(
    config_manager: &ConfigManager,
    config: &Config,
) -> Result<(BookManager, LoadMetadata), ServiceError> {
    let paths = config.store_paths(config_manager.default_data_dir());
    let store = JsonStore::new(paths, Some(config.backup_retention));
    BookManager::open(
        Box::new(store),
        config.home_currency.clone(),
        config.seed_sample_data,
    )
}

#[cfg(test)]
pub(crate) fn process_script(
    config_manager: ConfigManager,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut context = ShellContext::with_config_manager(CliMode::Script, config_manager)?;
    for line in lines {
        match crate::cli::shell::handle_line(&mut context, line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(context)
}
