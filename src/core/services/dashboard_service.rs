//! Dashboard aggregation: VAT per month, currency mix and monthly totals.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::core::services::{ConversionService, InvoiceService};
use crate::currency::CurrencyCode;
use crate::domain::{Book, DashboardFilter, Invoice, InvoiceFilter, InvoiceType, RecordId, YearMonth};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VatByMonth {
    pub month: YearMonth,
    pub currency: CurrencyCode,
    pub invoice_type: InvoiceType,
    pub vat_amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyDistribution {
    pub currency: CurrencyCode,
    pub invoice_type: InvoiceType,
    pub count: usize,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: YearMonth,
    pub invoice_type: InvoiceType,
    pub total_amount: f64,
    pub count: usize,
}

/// Headline figures in the home currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub home_currency: CurrencyCode,
    pub invoice_count: usize,
    pub total_vat: f64,
    pub total_amount: f64,
    pub purchase_vat: f64,
    pub sale_vat: f64,
    /// Invoices left out of the converted sums for lack of a rate.
    pub unconverted: Vec<RecordId>,
}

impl DashboardSummary {
    fn empty(home: &CurrencyCode) -> Self {
        Self {
            home_currency: home.clone(),
            invoice_count: 0,
            total_vat: 0.0,
            total_amount: 0.0,
            purchase_vat: 0.0,
            sale_vat: 0.0,
            unconverted: Vec::new(),
        }
    }

    /// VAT collected on sales minus VAT paid on purchases.
    pub fn net_vat(&self) -> f64 {
        self.sale_vat - self.purchase_vat
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardData {
    pub vat_by_month: Vec<VatByMonth>,
    pub currency_distribution: Vec<CurrencyDistribution>,
    pub monthly_totals: Vec<MonthlyTotal>,
    pub summary: DashboardSummary,
    pub raw_invoices: Vec<Invoice>,
}

#[derive(Default)]
struct Bucket {
    amount: f64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, amount: f64) {
        self.amount += amount;
        self.count += 1;
    }
}

pub struct DashboardService;

impl DashboardService {
    pub fn build(book: &Book, filter: &DashboardFilter, home: &CurrencyCode) -> DashboardData {
        let invoices = InvoiceService::list(book, &InvoiceFilter::from(*filter));

        let mut vat: BTreeMap<(YearMonth, CurrencyCode, InvoiceType), Bucket> = BTreeMap::new();
        let mut distribution: BTreeMap<(CurrencyCode, InvoiceType), Bucket> = BTreeMap::new();
        let mut monthly: BTreeMap<(YearMonth, InvoiceType), Bucket> = BTreeMap::new();
        let mut summary = DashboardSummary::empty(home);

        for invoice in &invoices {
            let month = invoice.period();
            let kind = invoice.invoice_type;
            vat.entry((month, invoice.currency.clone(), kind))
                .or_default()
                .add(invoice.vat_amount());
            distribution
                .entry((invoice.currency.clone(), kind))
                .or_default()
                .add(invoice.total());
            monthly.entry((month, kind)).or_default().add(invoice.total());

            summary.invoice_count += 1;
            match ConversionService::convert(book, invoice, home) {
                Ok(conversion) => {
                    summary.total_vat += conversion.equivalent.vat_amount;
                    summary.total_amount += conversion.equivalent.total;
                    match kind {
                        InvoiceType::Purchase => {
                            summary.purchase_vat += conversion.equivalent.vat_amount
                        }
                        InvoiceType::Sale => summary.sale_vat += conversion.equivalent.vat_amount,
                    }
                }
                Err(err) => {
                    debug!(invoice = invoice.id, error = %err, "left out of home-currency summary");
                    summary.unconverted.push(invoice.id);
                }
            }
        }

        DashboardData {
            vat_by_month: vat
                .into_iter()
                .map(|((month, currency, invoice_type), bucket)| VatByMonth {
                    month,
                    currency,
                    invoice_type,
                    vat_amount: bucket.amount,
                    count: bucket.count,
                })
                .collect(),
            currency_distribution: distribution
                .into_iter()
                .map(|((currency, invoice_type), bucket)| CurrencyDistribution {
                    currency,
                    invoice_type,
                    count: bucket.count,
                    total_amount: bucket.amount,
                })
                .collect(),
            monthly_totals: monthly
                .into_iter()
                .map(|((month, invoice_type), bucket)| MonthlyTotal {
                    month,
                    invoice_type,
                    total_amount: bucket.amount,
                    count: bucket.count,
                })
                .collect(),
            summary,
            raw_invoices: invoices.into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::FxRateService;
    use crate::domain::{DateRange, FxRateDraft, InvoiceDraft};
    use chrono::NaiveDate;

    fn add(book: &mut Book, (y, m, d): (i32, u32, u32), currency: &str, kind: InvoiceType) {
        InvoiceService::add(
            book,
            InvoiceDraft::new(
                NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                "Acme",
                "X",
                100.0,
                10.0,
                CurrencyCode::new(currency),
            )
            .with_type(kind),
        )
        .unwrap();
    }

    fn book() -> Book {
        let mut book = Book::default();
        add(&mut book, (2024, 2, 3), "TRY", InvoiceType::Purchase);
        add(&mut book, (2024, 1, 9), "TRY", InvoiceType::Purchase);
        add(&mut book, (2024, 1, 20), "USD", InvoiceType::Sale);
        add(&mut book, (2024, 1, 21), "TRY", InvoiceType::Purchase);
        add(&mut book, (2024, 3, 1), "EUR", InvoiceType::Sale);
        FxRateService::upsert(
            &mut book,
            FxRateDraft::new(YearMonth::new(2024, 1).unwrap(), 30.0, 33.0),
        )
        .unwrap();
        book
    }

    fn home() -> CurrencyCode {
        CurrencyCode::new("TRY")
    }

    #[test]
    fn groups_are_keyed_and_ordered() {
        let data = DashboardService::build(&book(), &DashboardFilter::default(), &home());

        let jan_try = &data.vat_by_month[0];
        assert_eq!(jan_try.month.to_string(), "2024-01");
        assert_eq!(jan_try.currency.as_str(), "TRY");
        assert_eq!(jan_try.count, 2);
        assert!((jan_try.vat_amount - 20.0).abs() < 1e-9);
        assert_eq!(data.vat_by_month.len(), 4);

        let months: Vec<_> = data
            .monthly_totals
            .iter()
            .map(|row| (row.month.to_string(), row.invoice_type))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2024-01".to_string(), InvoiceType::Purchase),
                ("2024-01".to_string(), InvoiceType::Sale),
                ("2024-02".to_string(), InvoiceType::Purchase),
                ("2024-03".to_string(), InvoiceType::Sale),
            ]
        );
        assert_eq!(data.currency_distribution.len(), 3);
    }

    #[test]
    fn each_invoice_counted_once_per_grouping() {
        let book = book();
        let data = DashboardService::build(&book, &DashboardFilter::default(), &home());
        let expected: f64 = book.invoices.iter().map(Invoice::total).sum();
        let distributed: f64 = data.currency_distribution.iter().map(|r| r.total_amount).sum();
        let monthly: f64 = data.monthly_totals.iter().map(|r| r.total_amount).sum();
        let vat_count: usize = data.vat_by_month.iter().map(|r| r.count).sum();
        assert!((expected - distributed).abs() < 1e-9);
        assert!((expected - monthly).abs() < 1e-9);
        assert_eq!(vat_count, book.invoices.len());
        assert_eq!(data.raw_invoices.len(), book.invoices.len());
    }

    #[test]
    fn filter_limits_range_and_type() {
        let filter = DashboardFilter {
            range: DateRange::month(YearMonth::new(2024, 1).unwrap()),
            invoice_type: Some(InvoiceType::Purchase),
        };
        let data = DashboardService::build(&book(), &filter, &home());
        assert_eq!(data.raw_invoices.len(), 2);
        assert_eq!(data.monthly_totals.len(), 1);
        assert!((data.monthly_totals[0].total_amount - 220.0).abs() < 1e-9);
    }

    #[test]
    fn summary_converts_and_lists_unconverted() {
        let data = DashboardService::build(&book(), &DashboardFilter::default(), &home());
        let summary = &data.summary;
        assert_eq!(summary.invoice_count, 5);
        assert_eq!(summary.unconverted, vec![5]);
        // three TRY purchases at parity plus one USD sale at 30
        assert!((summary.total_vat - (30.0 + 300.0)).abs() < 1e-9);
        assert!((summary.total_amount - (330.0 + 3300.0)).abs() < 1e-9);
        assert!((summary.net_vat() - 270.0).abs() < 1e-9);
    }
}
