use chrono::Local;

use crate::cli::args::{subcommand, ArgMap};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output::{self, hint, info, section, success, warning};
use crate::cli::registry::CommandEntry;
use crate::cli::ui::table::{Table, TableColumn};
use crate::core::services::InvoiceService;
use crate::currency::{format_amount, format_date, format_number, LocaleConfig};
use crate::domain::{Invoice, InvoiceDraft, InvoiceFilter};

const SUBCOMMANDS: [&str; 7] = ["list", "show", "add", "edit", "remove", "totals", "convert"];
const FILTER_KEYS: [&str; 6] = ["from", "to", "month", "company", "currency", "type"];
const FIELD_KEYS: [&str; 10] = [
    "date",
    "company",
    "no",
    "invoice_no",
    "subtotal",
    "amount",
    "vat",
    "vat_rate",
    "currency",
    "type",
];

const USAGE: &str = "invoice list [from=YYYY-MM-DD] [to=...] [month=YYYY-MM] [company=..] [currency=..] [type=purchase|sale] [group=type]
invoice show <id>
invoice add company=.. no=.. subtotal=.. [date=..] [vat=..] [currency=..] [type=..] [total=..] [description=..]
invoice edit <id> [field=value ...]
invoice remove <id> [force]
invoice totals [filters]
invoice convert <id> [store=true]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "invoice",
        "List, record and maintain invoices",
        USAGE,
        cmd_invoice,
    )]
}

fn cmd_invoice(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand("invoice", args, &SUBCOMMANDS)?;
    let args = ArgMap::parse(rest);
    match action.as_str() {
        "list" => list(context, &args),
        "show" => show(context, &args),
        "add" => add(context, &args),
        "edit" => edit(context, &args),
        "remove" => remove(context, &args),
        "totals" => totals(context, &args),
        "convert" => convert(context, &args),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown subcommand `invoice {}`",
            other
        ))),
    }
}

fn filter_from(args: &ArgMap) -> Result<InvoiceFilter, CommandError> {
    Ok(InvoiceFilter {
        range: args.date_range()?,
        company: args.str("company").map(str::to_string),
        currency: args.currency(),
        invoice_type: args.invoice_type()?,
    })
}

fn list(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    let mut allowed = FILTER_KEYS.to_vec();
    allowed.push("group");
    args.ensure_known(&allowed)?;
    let filter = filter_from(args)?;
    let mut invoices = context.manager.invoices(&filter);
    match args.str("group") {
        None => {}
        Some("type") => InvoiceService::group_by_type(&mut invoices),
        Some(other) => {
            return Err(CommandError::InvalidArguments(format!(
                "cannot group by `{}` (only group=type)",
                other
            )))
        }
    }

    if invoices.is_empty() {
        info("No invoices match.");
        return Ok(());
    }

    let locale = context.locale();
    let mut table = Table::new(vec![
        TableColumn::right("ID"),
        TableColumn::left("Date"),
        TableColumn::left("Company").max(28),
        TableColumn::left("No"),
        TableColumn::left("Type"),
        TableColumn::left("Cur"),
        TableColumn::right("Subtotal"),
        TableColumn::right("VAT %"),
        TableColumn::right("VAT"),
        TableColumn::right("Total"),
    ]);
    for invoice in &invoices {
        table.push(invoice_row(invoice, &locale));
    }
    output::render_table(&table);
    print_totals(&invoices, &locale);

    let drifting = invoices
        .iter()
        .filter(|invoice| !invoice.has_consistent_total())
        .count();
    if drifting > 0 {
        hint(format!(
            "{} invoice(s) carry a total that differs from subtotal + VAT.",
            drifting
        ));
    }
    Ok(())
}

fn invoice_row(invoice: &Invoice, locale: &LocaleConfig) -> Vec<String> {
    vec![
        invoice.id.to_string(),
        format_date(locale, invoice.date),
        invoice.company.clone(),
        invoice.invoice_no.clone(),
        invoice.invoice_type.to_string(),
        invoice.currency.to_string(),
        format_amount(invoice.subtotal, &invoice.currency, locale),
        format_number(locale, invoice.vat_rate, 2),
        format_amount(invoice.vat_amount(), &invoice.currency, locale),
        format_amount(invoice.total(), &invoice.currency, locale),
    ]
}

fn print_totals(invoices: &[&Invoice], locale: &LocaleConfig) {
    let totals = InvoiceService::totals_by_currency(invoices.iter().copied());
    let mut table = Table::new(vec![
        TableColumn::left("Currency"),
        TableColumn::right("Count"),
        TableColumn::right("Subtotal"),
        TableColumn::right("VAT"),
        TableColumn::right("Total"),
    ]);
    for (currency, sums) in &totals {
        table.push(vec![
            currency.to_string(),
            sums.count.to_string(),
            format_amount(sums.subtotal, currency, locale),
            format_amount(sums.vat, currency, locale),
            format_amount(sums.total, currency, locale),
        ]);
    }
    section("Totals by currency");
    output::render_table(&table);
}

fn show(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["id"])?;
    let id = args.id()?;
    let locale = context.locale();
    let invoice = context.manager.invoice(id)?;
    let code = &invoice.currency;

    section(format!("Invoice {} ({})", invoice.id, invoice.invoice_no));
    info(format!("  Date        : {}", format_date(&locale, invoice.date)));
    info(format!("  Company     : {}", invoice.company));
    info(format!("  Type        : {}", invoice.invoice_type));
    info(format!("  Subtotal    : {}", format_amount(invoice.subtotal, code, &locale)));
    info(format!(
        "  VAT         : {} ({}%)",
        format_amount(invoice.vat_amount(), code, &locale),
        format_number(&locale, invoice.vat_rate, 2)
    ));
    info(format!("  Total       : {}", format_amount(invoice.total(), code, &locale)));
    if let Some(description) = &invoice.description {
        info(format!("  Description : {}", description));
    }
    if !invoice.has_consistent_total() {
        warning(format!(
            "Stored total differs from subtotal + VAT by {}.",
            format_amount(invoice.total_drift(), code, &locale)
        ));
    }

    match context.manager.convert_invoice(id) {
        Ok(conversion) => {
            let home = context.manager.home_currency();
            info(format!(
                "  In {}      : {} ({})",
                home,
                format_amount(conversion.equivalent.total, home, &locale),
                conversion.detail.disclosure()
            ));
        }
        Err(err) => hint(format!("No home-currency figure: {}", err)),
    }
    Ok(())
}

fn add(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    let mut allowed = FIELD_KEYS.to_vec();
    allowed.extend(["total", "description"]);
    args.ensure_known(&allowed)?;

    let date = args
        .date("date")?
        .unwrap_or_else(|| Local::now().date_naive());
    let company = args.required("company")?;
    let invoice_no = args
        .str("no")
        .or_else(|| args.str("invoice_no"))
        .ok_or_else(|| CommandError::InvalidArguments("missing `no=`".into()))?;
    let subtotal = match args.amount("subtotal")? {
        Some(value) => value,
        None => args
            .amount("amount")?
            .ok_or_else(|| CommandError::InvalidArguments("missing `subtotal=`".into()))?,
    };
    let vat_rate = vat_rate(args)?.unwrap_or(context.config.default_vat_rate);
    let currency = args
        .currency()
        .unwrap_or_else(|| context.manager.home_currency().clone());

    let mut draft = InvoiceDraft::new(date, company, invoice_no, subtotal, vat_rate, currency)
        .with_type(args.invoice_type()?.unwrap_or_default());
    if let Some(total) = args.amount("total")? {
        draft = draft.with_total(total);
    }
    if let Some(description) = args.str("description") {
        draft = draft.with_description(description);
    }

    let invoice = context.manager.add_invoice(draft)?;
    success(format!(
        "Invoice {} added ({} {}).",
        invoice.id,
        invoice.invoice_type,
        format_amount(invoice.total(), &invoice.currency, &context.locale())
    ));
    Ok(())
}

fn vat_rate(args: &ArgMap) -> Result<Option<f64>, CommandError> {
    match args.amount("vat")? {
        Some(rate) => Ok(Some(rate)),
        None => args.amount("vat_rate"),
    }
}

fn edit(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    let mut allowed = FIELD_KEYS.to_vec();
    allowed.extend(["total", "description", "id"]);
    args.ensure_known(&allowed)?;
    let id = args.id()?;
    let mut draft = InvoiceDraft::from_invoice(context.manager.invoice(id)?);

    if let Some(date) = args.date("date")? {
        draft.date = date;
    }
    if let Some(company) = args.str("company") {
        draft.company = company.to_string();
    }
    if let Some(number) = args.str("no").or_else(|| args.str("invoice_no")) {
        draft.invoice_no = number.to_string();
    }
    let subtotal = match args.amount("subtotal")? {
        Some(value) => Some(value),
        None => args.amount("amount")?,
    };
    let vat = vat_rate(args)?;
    if let Some(value) = subtotal {
        draft.subtotal = value;
    }
    if let Some(value) = vat {
        draft.vat_rate = value;
    }
    if let Some(currency) = args.currency() {
        draft.currency = currency;
    }
    if let Some(kind) = args.invoice_type()? {
        draft.invoice_type = Some(kind);
    }
    if let Some(description) = args.str("description") {
        draft.description = Some(description.to_string());
    }

    let amounts_changed = subtotal.is_some() || vat.is_some();
    match args.amount("total")? {
        Some(total) => draft.total = Some(total),
        // a new subtotal or rate invalidates the stored total
        None if amounts_changed => draft.total = None,
        None => {}
    }
    if amounts_changed || args.has("total") || args.has("currency") || args.has("date") {
        draft.home_equivalent = None;
    }

    let invoice = context.manager.update_invoice(id, draft)?;
    success(format!(
        "Invoice {} updated (total {}).",
        invoice.id,
        format_amount(invoice.total(), &invoice.currency, &context.locale())
    ));
    Ok(())
}

fn remove(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["id", "force"])?;
    let id = args.id()?;
    let summary = {
        let invoice = context.manager.invoice(id)?;
        format!("{} {} ({})", invoice.invoice_no, invoice.company, invoice.date)
    };
    if !args.flag("force")? && !context.confirm(&format!("Delete invoice {}?", summary))? {
        info("Nothing deleted.");
        return Ok(());
    }
    context.manager.delete_invoice(id)?;
    success(format!("Invoice {} deleted.", id));
    Ok(())
}

fn totals(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&FILTER_KEYS)?;
    let filter = filter_from(args)?;
    let invoices = context.manager.invoices(&filter);
    if invoices.is_empty() {
        info("No invoices match.");
        return Ok(());
    }
    print_totals(&invoices, &context.locale());
    Ok(())
}

fn convert(context: &mut ShellContext, args: &ArgMap) -> CommandResult {
    args.ensure_known(&["id", "store"])?;
    let id = args.id()?;
    let conversion = if args.flag("store")? {
        context.manager.attach_home_equivalent(id)?
    } else {
        context.manager.convert_invoice(id)?
    };
    let locale = context.locale();
    let home = context.manager.home_currency();
    let equivalent = &conversion.equivalent;

    section(format!("Invoice {} in {}", conversion.invoice_id, home));
    info(format!("  Subtotal : {}", format_amount(equivalent.subtotal, home, &locale)));
    info(format!("  VAT      : {}", format_amount(equivalent.vat_amount, home, &locale)));
    info(format!("  Total    : {}", format_amount(equivalent.total, home, &locale)));
    info(format!("  Rate     : {}", conversion.detail.disclosure()));
    if args.flag("store")? {
        success(format!("Home equivalent stored on invoice {}.", id));
    }
    Ok(())
}
