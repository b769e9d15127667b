use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyCode;
use crate::domain::{common::YearMonth, invoice::Invoice, InvoiceType};

/// Inclusive date bounds; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Covers every day of `period`.
    pub fn month(period: YearMonth) -> Self {
        Self {
            start: period.first_day(),
            end: period.last_day(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Criteria for listing invoices. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    pub range: DateRange,
    /// Case-insensitive substring of the company name.
    pub company: Option<String>,
    pub currency: Option<CurrencyCode>,
    pub invoice_type: Option<InvoiceType>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if !self.range.contains(invoice.date) {
            return false;
        }
        if let Some(needle) = self.company.as_deref().map(str::trim) {
            if !needle.is_empty()
                && !invoice
                    .company
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(currency) = &self.currency {
            if &invoice.currency != currency {
                return false;
            }
        }
        if let Some(kind) = self.invoice_type {
            if invoice.invoice_type != kind {
                return false;
            }
        }
        true
    }
}

/// Criteria for dashboard aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub range: DateRange,
    pub invoice_type: Option<InvoiceType>,
}

impl From<DashboardFilter> for InvoiceFilter {
    fn from(filter: DashboardFilter) -> Self {
        InvoiceFilter {
            range: filter.range,
            invoice_type: filter.invoice_type,
            ..InvoiceFilter::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvoiceDraft;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(company: &str, on: NaiveDate, currency: &str) -> Invoice {
        Invoice::from_draft(
            1,
            InvoiceDraft::new(on, company, "1", 100.0, 18.0, CurrencyCode::new(currency)),
        )
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(DateRange::default().contains(date(1999, 12, 31)));
    }

    #[test]
    fn company_match_ignores_case() {
        let filter = InvoiceFilter {
            company: Some("acme".into()),
            ..InvoiceFilter::default()
        };
        assert!(filter.matches(&invoice("ACME Trading", date(2024, 1, 2), "TRY")));
        assert!(!filter.matches(&invoice("Globex", date(2024, 1, 2), "TRY")));
    }

    #[test]
    fn currency_and_type_must_match_exactly() {
        let filter = InvoiceFilter {
            currency: Some(CurrencyCode::new("USD")),
            invoice_type: Some(InvoiceType::Sale),
            ..InvoiceFilter::default()
        };
        let usd_purchase = invoice("A", date(2024, 1, 2), "USD");
        assert!(!filter.matches(&usd_purchase));
        let mut usd_sale = usd_purchase.clone();
        usd_sale.invoice_type = InvoiceType::Sale;
        assert!(filter.matches(&usd_sale));
    }

    #[test]
    fn month_range_spans_whole_month() {
        let range = DateRange::month(YearMonth::new(2024, 2).unwrap());
        assert_eq!(range.start, Some(date(2024, 2, 1)));
        assert_eq!(range.end, Some(date(2024, 2, 29)));
    }
}
