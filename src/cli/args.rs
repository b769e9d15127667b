//! `key=value` argument parsing for shell commands.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use strsim::levenshtein;

use crate::cli::core::CommandError;
use crate::currency::CurrencyCode;
use crate::domain::{DateRange, InvoiceType, RecordId, YearMonth};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Splits a command's arguments into its subcommand and the remainder.
pub fn subcommand<'a, 'b>(
    command: &str,
    args: &'b [&'a str],
    known: &[&str],
) -> Result<(String, &'b [&'a str]), CommandError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(format!(
            "`{}` needs a subcommand: {}",
            command,
            known.join(", ")
        )));
    };
    let name = first.to_ascii_lowercase();
    if known.contains(&name.as_str()) {
        return Ok((name, rest));
    }
    let mut message = format!("unknown subcommand `{} {}`", command, first);
    if let Some(best) = closest(&name, known) {
        message.push_str(&format!(". Did you mean `{} {}`?", command, best));
    }
    Err(CommandError::InvalidArguments(message))
}

fn closest<'k>(input: &str, candidates: &[&'k str]) -> Option<&'k str> {
    candidates
        .iter()
        .map(|candidate| (levenshtein(input, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Parsed `key=value` pairs plus bare positional words.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArgMap {
    values: BTreeMap<String, String>,
    positional: Vec<String>,
}

impl ArgMap {
    pub fn parse(args: &[&str]) -> Self {
        let mut map = Self::default();
        for arg in args {
            match arg.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    let key = key.trim().to_ascii_lowercase().replace('-', "_");
                    map.values.insert(key, value.trim().to_string());
                }
                _ => map.positional.push(arg.to_string()),
            }
        }
        map
    }

    /// Rejects keys outside `allowed`, suggesting the nearest match.
    pub fn ensure_known(&self, allowed: &[&str]) -> Result<(), CommandError> {
        for key in self.values.keys() {
            if allowed.contains(&key.as_str()) {
                continue;
            }
            let mut message = format!("unknown argument `{}`", key);
            if let Some(best) = closest(key, allowed) {
                message.push_str(&format!(". Did you mean `{}`?", best));
            }
            return Err(CommandError::InvalidArguments(message));
        }
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn required(&self, key: &str) -> Result<&str, CommandError> {
        self.str(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| CommandError::InvalidArguments(format!("missing `{}=`", key)))
    }

    /// Record id from `id=` or the first positional word.
    pub fn id(&self) -> Result<RecordId, CommandError> {
        let raw = self
            .str("id")
            .or_else(|| self.positional(0))
            .ok_or_else(|| CommandError::InvalidArguments("missing record id".into()))?;
        raw.parse::<RecordId>()
            .map_err(|_| CommandError::InvalidArguments(format!("`{}` is not a valid id", raw)))
    }

    pub fn date(&self, key: &str) -> Result<Option<NaiveDate>, CommandError> {
        self.str(key).map(parse_date).transpose()
    }

    pub fn amount(&self, key: &str) -> Result<Option<f64>, CommandError> {
        self.str(key)
            .map(|raw| {
                parse_amount(raw).ok_or_else(|| {
                    CommandError::InvalidArguments(format!("`{}` is not a number for {}", raw, key))
                })
            })
            .transpose()
    }

    pub fn integer<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, CommandError> {
        self.str(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    CommandError::InvalidArguments(format!("`{}` is not a whole number for {}", raw, key))
                })
            })
            .transpose()
    }

    pub fn year_month(&self, key: &str) -> Result<Option<YearMonth>, CommandError> {
        self.str(key)
            .map(|raw| raw.parse::<YearMonth>().map_err(CommandError::InvalidArguments))
            .transpose()
    }

    pub fn invoice_type(&self) -> Result<Option<InvoiceType>, CommandError> {
        self.str("type")
            .map(|raw| raw.parse::<InvoiceType>().map_err(CommandError::InvalidArguments))
            .transpose()
    }

    pub fn currency(&self) -> Option<CurrencyCode> {
        self.str("currency")
            .filter(|raw| !raw.is_empty())
            .map(CurrencyCode::new)
    }

    /// `from=`/`to=` bounds, or a whole `month=YYYY-MM`.
    pub fn date_range(&self) -> Result<DateRange, CommandError> {
        if let Some(period) = self.year_month("month")? {
            if self.has("from") || self.has("to") {
                return Err(CommandError::InvalidArguments(
                    "use either month= or from=/to=, not both".into(),
                ));
            }
            return Ok(DateRange::month(period));
        }
        let range = DateRange::new(self.date("from")?, self.date("to")?);
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(CommandError::InvalidArguments(format!(
                    "from={} is after to={}",
                    start, end
                )));
            }
        }
        Ok(range)
    }

    pub fn flag(&self, key: &str) -> Result<bool, CommandError> {
        if self.positional.iter().any(|word| word == key) {
            return Ok(true);
        }
        match self.str(key).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(false),
            Some("" | "true" | "yes" | "1") => Ok(true),
            Some("false" | "no" | "0") => Ok(false),
            Some(other) => Err(CommandError::InvalidArguments(format!(
                "{} expects true or false (got `{}`)",
                key, other
            ))),
        }
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CommandError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("today") {
        return Ok(chrono::Local::now().date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "`{}` is not a date (use YYYY-MM-DD or DD/MM/YYYY)",
                raw
            ))
        })
}

/// Accepts `1234.5`, `1234,5`, `1.234,50` and `1,234.50`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ' ' && *ch != '_').collect();
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}
