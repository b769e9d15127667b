use crate::cli::args::{subcommand, ArgMap};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, info, success};
use crate::cli::registry::CommandEntry;
use crate::cli::ui::table::{Table, TableColumn};
use crate::storage::RecordFile;

const USAGE: &str = "backup list [file=invoices|fx]
backup restore file=invoices|fx name=<backup file>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "backup",
        "List or restore record file backups",
        USAGE,
        cmd_backup,
    )]
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand("backup", args, &["list", "restore"])?;
    let args = ArgMap::parse(rest);
    match action.as_str() {
        "list" => list(context, &args),
        _ => restore(context, &args),
    }
}

fn record_file(raw: &str) -> Result<RecordFile, CommandError> {
    raw.parse::<RecordFile>()
        .map_err(CommandError::InvalidArguments)
}

fn list(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["file"])?;
    let files = match args.str("file") {
        Some(raw) => vec![record_file(raw)?],
        None => RecordFile::ALL.to_vec(),
    };

    let mut table = Table::new(vec![
        TableColumn::left("File"),
        TableColumn::left("Backup"),
        TableColumn::left("Taken"),
    ]);
    for file in files {
        for backup in context.manager.list_backups(file)? {
            let taken = backup
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into());
            table.push(vec![file.to_string(), backup.name, taken]);
        }
    }
    if table.rows.is_empty() {
        info("No backups yet. One is taken each time a record file is rewritten.");
        return Ok(());
    }
    output::render_table(&table);
    Ok(())
}

fn restore(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["file", "name"])?;
    let file = record_file(args.required("file")?)?;
    let name = args.required("name")?;
    if !context.confirm(&format!("Replace {} with backup {}?", file.file_name(), name))? {
        info("Restore cancelled.");
        return Ok(());
    }
    let metadata = context.manager.restore_backup(file, name)?;
    context.report_load(&metadata);
    success(format!("Restored {} from {}.", file.file_name(), name));
    Ok(())
}
