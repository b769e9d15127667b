use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyCode, EUR, TRY, USD};
use crate::domain::common::{Identifiable, RecordId, YearMonth};

/// Currency every stored rate is quoted in.
pub const QUOTE_CURRENCY: &str = TRY;

/// Currencies a monthly rate can price.
pub const QUOTED_CURRENCIES: [&str; 3] = [TRY, USD, EUR];

/// Monthly prices of one USD and one EUR in the quote currency (TRY).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    pub id: RecordId,
    pub year: i32,
    pub month: u32,
    #[serde(rename = "usd_to_try", alias = "usd_rate")]
    pub usd: f64,
    #[serde(rename = "eur_to_try", alias = "eur_rate")]
    pub eur: f64,
}

impl FxRate {
    pub fn from_draft(id: RecordId, draft: FxRateDraft) -> Self {
        Self {
            id,
            year: draft.year,
            month: draft.month,
            usd: draft.usd,
            eur: draft.eur,
        }
    }

    /// Returns `None` for records written with an out-of-range month.
    pub fn period(&self) -> Option<YearMonth> {
        YearMonth::new(self.year, self.month)
    }

    pub fn matches_period(&self, period: YearMonth) -> bool {
        self.year == period.year && self.month == period.month
    }

    /// Quote-currency units per one unit of `code`.
    pub fn quote_units(&self, code: &CurrencyCode) -> Option<f64> {
        if code.is(QUOTE_CURRENCY) {
            Some(1.0)
        } else if code.is(USD) {
            Some(self.usd)
        } else if code.is(EUR) {
            Some(self.eur)
        } else {
            None
        }
    }

    /// Units of `to` per one unit of `from` for this month, crossing through
    /// the quote currency.
    pub fn cross_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<f64> {
        let from = self.quote_units(from)?;
        let to = self.quote_units(to).filter(|units| *units > 0.0)?;
        Some(from / to)
    }

    pub fn is_quoted(code: &CurrencyCode) -> bool {
        QUOTED_CURRENCIES.iter().any(|quoted| code.is(quoted))
    }
}

impl Identifiable for FxRate {
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRateDraft {
    pub year: i32,
    pub month: u32,
    #[serde(rename = "usd_to_try", alias = "usd_rate")]
    pub usd: f64,
    #[serde(rename = "eur_to_try", alias = "eur_rate")]
    pub eur: f64,
}

impl FxRateDraft {
    pub fn new(period: YearMonth, usd: f64, eur: f64) -> Self {
        Self {
            year: period.year,
            month: period.month,
            usd,
            eur,
        }
    }

    pub fn from_rate(rate: &FxRate) -> Self {
        Self {
            year: rate.year,
            month: rate.month,
            usd: rate.usd,
            eur: rate.eur,
        }
    }

    pub fn validate(&self) -> Result<YearMonth, String> {
        let period = YearMonth::new(self.year, self.month)
            .ok_or_else(|| format!("month must be between 1 and 12 (got {})", self.month))?;
        for (label, value) in [("USD", self.usd), ("EUR", self.eur)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{} rate must be a non-negative number (got {})",
                    label, value
                ));
            }
        }
        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_field_spellings() {
        let current: FxRate =
            serde_json::from_str(r#"{"id":1,"year":2024,"month":3,"usd_to_try":32.1,"eur_to_try":34.9}"#)
                .unwrap();
        let seeded: FxRate =
            serde_json::from_str(r#"{"id":1,"year":2024,"month":3,"usd_rate":32.1,"eur_rate":34.9}"#)
                .unwrap();
        assert_eq!(current, seeded);
        let written = serde_json::to_string(&seeded).unwrap();
        assert!(written.contains("usd_to_try"));
    }

    #[test]
    fn rate_lookup_covers_quoted_currencies_only() {
        let rate = FxRate::from_draft(
            4,
            FxRateDraft::new(YearMonth::new(2024, 1).unwrap(), 30.0, 33.0),
        );
        assert_eq!(rate.quote_units(&CurrencyCode::new("usd")), Some(30.0));
        assert_eq!(rate.quote_units(&CurrencyCode::new("EUR")), Some(33.0));
        assert_eq!(rate.quote_units(&CurrencyCode::new("try")), Some(1.0));
        assert_eq!(rate.quote_units(&CurrencyCode::new("GBP")), None);
        assert!(!FxRate::is_quoted(&CurrencyCode::new("GBP")));
    }

    #[test]
    fn cross_rates_go_through_the_quote_currency() {
        let rate = FxRate::from_draft(
            4,
            FxRateDraft::new(YearMonth::new(2024, 1).unwrap(), 30.0, 33.0),
        );
        let usd = CurrencyCode::new("USD");
        let eur = CurrencyCode::new("EUR");
        let lira = CurrencyCode::new("TRY");
        assert_eq!(rate.cross_rate(&usd, &lira), Some(30.0));
        assert!((rate.cross_rate(&usd, &eur).unwrap() - 30.0 / 33.0).abs() < 1e-12);
        assert!((rate.cross_rate(&lira, &eur).unwrap() - 1.0 / 33.0).abs() < 1e-12);
        assert_eq!(rate.cross_rate(&usd, &CurrencyCode::new("GBP")), None);
    }

    #[test]
    fn validation_rejects_bad_month_and_negative_rates() {
        let mut draft = FxRateDraft::new(YearMonth::new(2024, 1).unwrap(), 30.0, 33.0);
        assert!(draft.validate().is_ok());
        draft.month = 13;
        assert!(draft.validate().is_err());
        draft.month = 2;
        draft.eur = -1.0;
        assert!(draft.validate().is_err());
    }
}
