use crate::cli::args::ArgMap;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, info, section, warning};
use crate::cli::registry::CommandEntry;
use crate::cli::ui::table::{Table, TableColumn};
use crate::core::services::DashboardData;
use crate::currency::{format_amount, format_number, format_with_symbol, LocaleConfig};
use crate::domain::DashboardFilter;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "dashboard",
        "VAT by month, currency mix and monthly totals",
        "dashboard [from=YYYY-MM-DD] [to=YYYY-MM-DD] [month=YYYY-MM] [type=purchase|sale] [json]",
        cmd_dashboard,
    )]
}

fn cmd_dashboard(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let args = ArgMap::parse(args);
    args.ensure_known(&["from", "to", "month", "type", "json"])?;
    let filter = DashboardFilter {
        range: args.date_range()?,
        invoice_type: args.invoice_type()?,
    };
    let data = context.manager.dashboard(&filter);

    if args.flag("json")? {
        let json = serde_json::to_string_pretty(&data)
            .map_err(|err| CommandError::Message(err.to_string()))?;
        info(json);
        return Ok(());
    }

    if data.raw_invoices.is_empty() {
        info("No invoices in the selected range.");
        return Ok(());
    }
    let locale = context.locale();
    print_summary(&data, &locale);
    print_vat_by_month(&data, &locale);
    print_distribution(&data, &locale);
    print_monthly_totals(&data, &locale);
    Ok(())
}

fn print_summary(data: &DashboardData, locale: &LocaleConfig) {
    let summary = &data.summary;
    let home = &summary.home_currency;
    section(format!("Summary ({})", home));
    info(format!("  Invoices     : {}", summary.invoice_count));
    info(format!("  Total amount : {}", format_with_symbol(summary.total_amount, home, locale)));
    info(format!("  Total VAT    : {}", format_with_symbol(summary.total_vat, home, locale)));
    info(format!("  Purchase VAT : {}", format_with_symbol(summary.purchase_vat, home, locale)));
    info(format!("  Sale VAT     : {}", format_with_symbol(summary.sale_vat, home, locale)));
    info(format!("  Net VAT      : {}", format_with_symbol(summary.net_vat(), home, locale)));
    if !summary.unconverted.is_empty() {
        let ids: Vec<String> = summary.unconverted.iter().map(u64::to_string).collect();
        warning(format!(
            "Left out of the {} sums for lack of an FX rate: invoice(s) {}.",
            home,
            ids.join(", ")
        ));
    }
}

fn print_vat_by_month(data: &DashboardData, locale: &LocaleConfig) {
    let mut table = Table::new(vec![
        TableColumn::left("Month"),
        TableColumn::left("Cur"),
        TableColumn::left("Type"),
        TableColumn::right("Count"),
        TableColumn::right("VAT"),
    ]);
    for row in &data.vat_by_month {
        table.push(vec![
            row.month.to_string(),
            row.currency.to_string(),
            row.invoice_type.to_string(),
            row.count.to_string(),
            format_amount(row.vat_amount, &row.currency, locale),
        ]);
    }
    section("VAT by month");
    output::render_table(&table);
}

fn print_distribution(data: &DashboardData, locale: &LocaleConfig) {
    let mut table = Table::new(vec![
        TableColumn::left("Cur"),
        TableColumn::left("Type"),
        TableColumn::right("Count"),
        TableColumn::right("Total"),
    ]);
    for row in &data.currency_distribution {
        table.push(vec![
            row.currency.to_string(),
            row.invoice_type.to_string(),
            row.count.to_string(),
            format_amount(row.total_amount, &row.currency, locale),
        ]);
    }
    section("Currency distribution");
    output::render_table(&table);
}

/// Totals here add invoice amounts as recorded, across currencies.
fn print_monthly_totals(data: &DashboardData, locale: &LocaleConfig) {
    let mut table = Table::new(vec![
        TableColumn::left("Month"),
        TableColumn::left("Type"),
        TableColumn::right("Count"),
        TableColumn::right("Total (mixed)"),
    ]);
    for row in &data.monthly_totals {
        table.push(vec![
            row.month.to_string(),
            row.invoice_type.to_string(),
            row.count.to_string(),
            format_number(locale, row.total_amount, 2),
        ]);
    }
    section("Monthly totals");
    output::render_table(&table);
}
