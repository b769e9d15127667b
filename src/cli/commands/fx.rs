use crate::cli::args::{subcommand, ArgMap};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, info, success};
use crate::cli::registry::CommandEntry;
use crate::cli::ui::table::{Table, TableColumn};
use crate::core::services::FxRateService;
use crate::currency::format_number;
use crate::domain::{FxRateDraft, YearMonth};

const SUBCOMMANDS: [&str; 3] = ["list", "set", "edit"];

const USAGE: &str = "fx list [year=YYYY] [month=M]
fx set month=YYYY-MM usd=<rate> eur=<rate>
fx edit <id> [month=YYYY-MM] [usd=<rate>] [eur=<rate>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "fx",
        "Manage monthly USD/EUR rates to the home currency",
        USAGE,
        cmd_fx,
    )]
}

fn cmd_fx(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand("fx", args, &SUBCOMMANDS)?;
    let args = ArgMap::parse(rest);
    match action.as_str() {
        "list" => list(context, &args),
        "set" => set(context, &args),
        "edit" => edit(context, &args),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown subcommand `fx {}`",
            other
        ))),
    }
}

fn list(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["year", "month"])?;
    let (year, month) = match args.str("month") {
        // `month=2024-05` narrows to a single period
        Some(raw) if raw.contains('-') => {
            let period = args.year_month("month")?.ok_or_else(|| {
                CommandError::InvalidArguments(format!("invalid month `{}`", raw))
            })?;
            (Some(period.year), Some(period.month))
        }
        _ => (args.integer::<i32>("year")?, args.integer::<u32>("month")?),
    };

    let rates = context.manager.fx_rates(year, month);
    if rates.is_empty() {
        info("No FX rates recorded for that period.");
        return Ok(());
    }

    let locale = context.locale();
    let mut table = Table::new(vec![
        TableColumn::right("ID"),
        TableColumn::left("Period"),
        TableColumn::right("USD"),
        TableColumn::right("EUR"),
    ]);
    for rate in rates {
        let period = rate
            .period()
            .map(|period| period.to_string())
            .unwrap_or_else(|| format!("{}-{:02}?", rate.year, rate.month));
        table.push(vec![
            rate.id.to_string(),
            period,
            format_number(&locale, rate.usd, 4),
            format_number(&locale, rate.eur, 4),
        ]);
    }
    output::render_table(&table);
    Ok(())
}

/// Period from `month=YYYY-MM`, or `year=` with a numeric `month=`.
fn period_arg(args: &ArgMap) -> Result<Option<YearMonth>, CommandError> {
    match (args.str("month"), args.integer::<i32>("year")?) {
        (Some(raw), Some(year)) if !raw.contains('-') => {
            let month = args.integer::<u32>("month")?.unwrap_or_default();
            YearMonth::new(year, month).map(Some).ok_or_else(|| {
                CommandError::InvalidArguments(format!("month must be 1-12 (got {})", raw))
            })
        }
        _ => args.year_month("month"),
    }
}

fn set(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["month", "year", "usd", "eur"])?;
    let period = period_arg(args)?
        .ok_or_else(|| CommandError::InvalidArguments("missing `month=YYYY-MM`".into()))?;
    let existing = context
        .manager
        .rate_for_period(period)
        .map(|rate| (rate.usd, rate.eur));

    // an update may give just one of the two rates
    let (usd, eur) = match (args.amount("usd")?, args.amount("eur")?, existing) {
        (Some(usd), Some(eur), _) => (usd, eur),
        (usd, eur, Some((old_usd, old_eur))) => (usd.unwrap_or(old_usd), eur.unwrap_or(old_eur)),
        _ => {
            return Err(CommandError::InvalidArguments(
                "a new period needs both `usd=` and `eur=`".into(),
            ))
        }
    };

    let replaced = existing.is_some();
    let rate = context.manager.add_fx_rate(FxRateDraft::new(period, usd, eur))?;
    let verb = if replaced { "updated" } else { "added" };
    success(format!("FX rate {} for {} {}.", rate.id, period, verb));
    Ok(())
}

fn edit(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["id", "month", "year", "usd", "eur"])?;
    let id = args.id()?;
    let current = FxRateService::get(context.manager.book(), id)?;
    let mut draft = FxRateDraft::from_rate(current);
    if let Some(period) = period_arg(args)? {
        draft.year = period.year;
        draft.month = period.month;
    }
    if let Some(usd) = args.amount("usd")? {
        draft.usd = usd;
    }
    if let Some(eur) = args.amount("eur")? {
        draft.eur = eur;
    }
    let rate = context.manager.update_fx_rate(id, draft)?;
    success(format!("FX rate {} updated.", rate.id));
    Ok(())
}
