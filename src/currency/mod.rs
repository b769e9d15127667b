use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::YearMonth;

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";
pub const TRY: &str = "TRY";

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, code: &str) -> bool {
        self.0.eq_ignore_ascii_case(code)
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new(TRY)
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: DateFormatStyle,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: DateFormatStyle::Iso,
        }
    }
}

impl LocaleConfig {
    /// Derives separators and date style from a BCP 47 tag such as `tr-TR`.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let (decimal_separator, grouping_separator, date_format) = match language.as_str() {
            "tr" | "de" | "nl" | "it" | "es" | "pt" => (',', '.', DateFormatStyle::DayFirst),
            "fr" => (',', ' ', DateFormatStyle::DayFirst),
            "en" => ('.', ',', DateFormatStyle::Iso),
            _ => ('.', ',', DateFormatStyle::Medium),
        };
        Self {
            language_tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
            date_format,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateFormatStyle {
    /// `2024-03-15`
    Iso,
    /// `15/03/2024`
    DayFirst,
    /// `15 Mar 2024`
    Medium,
}

/// Where a conversion rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Amount was already in the home currency.
    Parity,
    /// Monthly rate stored for the invoice period.
    MonthlyRate,
    /// Equivalent precomputed and stored on the invoice.
    Precomputed,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RateSource::Parity => "parity",
            RateSource::MonthlyRate => "monthly rate",
            RateSource::Precomputed => "precomputed",
        };
        f.write_str(label)
    }
}

/// Results of a currency conversion for disclosure.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedAmount {
    pub amount: f64,
    pub rate_used: f64,
    pub period: YearMonth,
    pub source: RateSource,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl ConvertedAmount {
    pub fn disclosure(&self) -> String {
        format!(
            "{} -> {} @ {} ({}, {})",
            self.from, self.to, self.rate_used, self.period, self.source
        )
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "TRY" => "₺".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Rounds to the currency's minor unit.
pub fn round_minor(amount: f64, code: &CurrencyCode) -> f64 {
    let factor = 10f64.powi(minor_units_for(code.as_str()) as i32);
    (amount * factor).round() / factor
}

pub fn format_number(locale: &LocaleConfig, value: f64, precision: u8) -> String {
    let body = format!("{:.*}", precision as usize, value);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac)) => (int_part.to_string(), Some(frac.to_string())),
        None => (body, None),
    };
    let grouped = insert_grouping(&int_part, locale.grouping_separator);
    match frac_part {
        Some(frac) => format!("{}{}{}", grouped, locale.decimal_separator, frac),
        None => grouped,
    }
}

fn insert_grouping(int_part: &str, separator: char) -> String {
    match int_part.strip_prefix('-') {
        Some(digits) => format!("-{}", group_digits(digits, separator)),
        None => group_digits(int_part, separator),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

/// Renders `amount` followed by its currency code, e.g. `1,180.00 TRY`.
pub fn format_amount(amount: f64, code: &CurrencyCode, locale: &LocaleConfig) -> String {
    let precision = minor_units_for(code.as_str());
    format!("{} {}", format_number(locale, amount, precision), code)
}

/// Renders `amount` with the currency symbol prefix, e.g. `₺1.180,00`.
pub fn format_with_symbol(amount: f64, code: &CurrencyCode, locale: &LocaleConfig) -> String {
    let precision = minor_units_for(code.as_str());
    let body = format_number(locale, amount.abs(), precision);
    let symbol = symbol_for(code.as_str());
    if amount < 0.0 {
        format!("-{}{}", symbol, body)
    } else {
        format!("{}{}", symbol, body)
    }
}

pub fn format_date(locale: &LocaleConfig, date: NaiveDate) -> String {
    match locale.date_format {
        DateFormatStyle::Iso => date.format("%Y-%m-%d").to_string(),
        DateFormatStyle::DayFirst => date.format("%d/%m/%Y").to_string(),
        DateFormatStyle::Medium => format!(
            "{:02} {} {}",
            date.day(),
            month_label(date.month()),
            date.year()
        ),
    }
}

pub fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_are_normalized() {
        let code = CurrencyCode::new(" usd ");
        assert_eq!(code.as_str(), "USD");
        assert!(code.is("usd"));
        let parsed: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(parsed, CurrencyCode::new("EUR"));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"EUR\"");
    }

    #[test]
    fn turkish_locale_swaps_separators() {
        let locale = LocaleConfig::from_tag("tr-TR");
        assert_eq!(format_number(&locale, 1234567.891, 2), "1.234.567,89");
        assert_eq!(
            format_date(&locale, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            "05/03/2024"
        );
    }

    #[test]
    fn negative_numbers_keep_sign_before_groups() {
        let locale = LocaleConfig::default();
        assert_eq!(format_number(&locale, -1234.5, 2), "-1,234.50");
        assert_eq!(format_number(&locale, 999.0, 0), "999");
    }

    #[test]
    fn round_minor_respects_currency_precision() {
        assert_eq!(round_minor(10.005_1, &CurrencyCode::new("TRY")), 10.01);
        assert_eq!(round_minor(10.6, &CurrencyCode::new("JPY")), 11.0);
    }
}
