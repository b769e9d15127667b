use std::io::{self, BufRead};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use tracing::debug;

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

/// Setting this variable runs commands read from stdin without prompts.
pub const SCRIPT_ENV: &str = "TAX_TRACKER_CLI_SCRIPT";

const PROMPT: &str = "tax-tracker> ";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => {
            let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
            editor.set_helper(Some(CommandHelper::from_entries(context.registry.list())));
            editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
            output::info("Tax Tracker shell. Type `help` for commands.");
            drive(&mut context, |context| prompted_line(&mut editor, context))
        }
        CliMode::Script => {
            let mut lines = io::stdin().lock().lines();
            drive(&mut context, |_| lines.next().transpose().map_err(CliError::from))
        }
    }
}

/// Feeds lines to the dispatcher until the source dries up or `exit` runs.
fn drive<F>(context: &mut ShellContext, mut next_line: F) -> Result<(), CliError>
where
    F: FnMut(&ShellContext) -> Result<Option<String>, CliError>,
{
    while context.running {
        let Some(line) = next_line(context)? else {
            break;
        };
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

/// Reads one line at the prompt; Ctrl-C asks before leaving, Ctrl-D leaves.
fn prompted_line(
    editor: &mut Editor<CommandHelper, DefaultHistory>,
    context: &ShellContext,
) -> Result<Option<String>, CliError> {
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.trim()).ok();
                }
                return Ok(Some(line));
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    return Ok(None);
                }
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Runs one input line. Blank lines and `#` comments are skipped.
pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(LoopControl::Continue);
    }
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not read `{}`: {}", line, err));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    debug!(%command, "dispatching command");
    context.last_command = Some(line.to_string());

    let control = context.dispatch(&command, raw, &args)?;
    if matches!(control, LoopControl::Exit) {
        context.running = false;
    }
    Ok(control)
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, shell_words::ParseError> {
    shell_words::split(input)
}

/// Completion and hints drawn from the registered commands' usage lines.
struct CommandHelper {
    /// Command name, its subcommands, and the first usage line.
    commands: Vec<(String, Vec<String>, String)>,
}

impl CommandHelper {
    fn from_entries<'a>(entries: impl Iterator<Item = &'a CommandEntry>) -> Self {
        let mut commands: Vec<_> = entries
            .map(|entry| {
                let subcommands = entry
                    .usage
                    .lines()
                    .filter_map(|usage| usage.split_whitespace().nth(1))
                    .filter(|word| word.chars().all(|c| c.is_ascii_lowercase()))
                    .map(str::to_string)
                    .collect();
                let first_usage = entry.usage.lines().next().unwrap_or(entry.name);
                (entry.name.to_string(), subcommands, first_usage.to_string())
            })
            .collect();
        commands.sort_by(|a, b| a.0.cmp(&b.0));
        Self { commands }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<String> {
        let needle = needle.to_ascii_lowercase();
        let pool: Vec<&String> = match words {
            [] => self.commands.iter().map(|(name, _, _)| name).collect(),
            [command] => self
                .commands
                .iter()
                .filter(|(name, _, _)| name.eq_ignore_ascii_case(command))
                .flat_map(|(_, subcommands, _)| subcommands)
                .collect(),
            _ => Vec::new(),
        };
        let mut matches: Vec<String> = pool
            .into_iter()
            .filter(|word| word.starts_with(&needle))
            .cloned()
            .collect();
        matches.dedup();
        matches
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let pairs = self
            .candidates(&words, &prefix[start..])
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    /// After a bare command and a space, shows how it is used.
    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos != line.len() || !line.ends_with(' ') {
            return None;
        }
        let command = line.trim();
        if command.contains(char::is_whitespace) {
            return None;
        }
        self.commands
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(command))
            .and_then(|(name, _, usage)| usage.strip_prefix(name.as_str()))
            .map(|rest| rest.trim_start().to_string())
            .filter(|rest| !rest.is_empty())
    }
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {
    /// An unterminated quote continues the entry on the next line.
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(match parse_command_line(ctx.input()) {
            Ok(_) => ValidationResult::Valid(None),
            Err(_) => ValidationResult::Incomplete,
        })
    }
}
