use crate::cli::args::subcommand;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, info, section, success};
use crate::cli::registry::CommandEntry;

const USAGE: &str = "config show
config set <key> <value>
config backup [note]
config backups
config restore <backup name>";

/// Settings that change where or how records are stored.
const STORE_KEYS: [&str; 4] = ["data_dir", "legacy_data_dir", "backup_retention", "seed_sample_data"];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Show and change preferences",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(
        "config",
        args,
        &["show", "set", "backup", "backups", "restore"],
    )?;
    match action.as_str() {
        "show" => show(context),
        "set" => set(context, rest),
        "backup" => backup(context, rest),
        "backups" => list_backups(context),
        _ => restore(context, rest),
    }
}

fn show(context: &mut ShellContext) -> CommandResult {
    section("Configuration");
    for (key, value) in context.config.entries() {
        info(format!("  {:<18} {}", key, value));
    }
    info(format!("  {:<18} {}", "(file)", context.config_manager.path().display()));
    Ok(())
}

fn set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    // accepts both `key value` and `key=value`
    let (key, value) = match args {
        [pair] => pair
            .split_once('=')
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .ok_or_else(|| CommandError::InvalidArguments("usage: config set <key> <value>".into()))?,
        [key, rest @ ..] if !rest.is_empty() => (key.to_string(), rest.join(" ")),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: config set <key> <value>".into(),
            ))
        }
    };
    let key = key.trim().to_ascii_lowercase().replace('-', "_");

    let mut updated = context.config.clone();
    updated.set(&key, &value)?;
    context.config_manager.save(&updated)?;
    context.config = updated;

    match key.as_str() {
        "home_currency" => context
            .manager
            .set_home_currency(context.config.home_currency.clone()),
        "ui_color_enabled" => output::apply_config(&context.config),
        key if STORE_KEYS.contains(&key) => context.reopen_store()?,
        _ => {}
    }
    success(format!("{} set to {}.", key, value.trim()));
    Ok(())
}

fn backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let name = context
        .config_manager
        .backup(&context.config, note.as_deref())?;
    success(format!("Configuration saved as {}.", name));
    Ok(())
}

fn list_backups(context: &mut ShellContext) -> CommandResult {
    let backups = context.config_manager.list_backups()?;
    if backups.is_empty() {
        info("No configuration backups.");
        return Ok(());
    }
    section("Configuration backups");
    for name in backups {
        info(format!("  {}", name));
    }
    Ok(())
}

fn restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: config restore <backup name>".into()))?;
    let previous = context.config.clone();
    context.config = context.config_manager.restore(name)?;
    output::apply_config(&context.config);
    context
        .manager
        .set_home_currency(context.config.home_currency.clone());
    let config = &context.config;
    if config.data_dir != previous.data_dir
        || config.legacy_data_dir != previous.legacy_data_dir
        || config.backup_retention != previous.backup_retention
    {
        context.reopen_store()?;
    }
    success(format!("Configuration restored from {}.", name));
    Ok(())
}
