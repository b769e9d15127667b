//! Business logic helpers for managing invoices.

use std::collections::BTreeMap;

use crate::core::services::{ServiceError, ServiceResult};
use crate::currency::CurrencyCode;
use crate::domain::{next_id, Book, Invoice, InvoiceDraft, InvoiceFilter, RecordId};

/// Sums for the invoices of one currency in a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyTotals {
    pub count: usize,
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
}

/// Provides validated CRUD helpers for invoices.
pub struct InvoiceService;

impl InvoiceService {
    /// Returns matching invoices, newest first; equal dates keep insertion order.
    pub fn list<'a>(book: &'a Book, filter: &InvoiceFilter) -> Vec<&'a Invoice> {
        let mut matches: Vec<&Invoice> = book
            .invoices
            .iter()
            .filter(|invoice| filter.matches(invoice))
            .collect();
        matches.sort_by(|a, b| b.date.cmp(&a.date));
        matches
    }

    pub fn get(book: &Book, id: RecordId) -> ServiceResult<&Invoice> {
        book.invoice(id)
            .ok_or_else(|| ServiceError::invoice_not_found(id))
    }

    /// Adds a new invoice and returns a copy of the stored record.
    pub fn add(book: &mut Book, draft: InvoiceDraft) -> ServiceResult<Invoice> {
        draft.validate().map_err(ServiceError::Invalid)?;
        let invoice = Invoice::from_draft(next_id(&book.invoices), draft);
        book.invoices.push(invoice.clone());
        Ok(invoice)
    }

    /// Replaces every field of invoice `id` with the draft contents.
    pub fn update(book: &mut Book, id: RecordId, draft: InvoiceDraft) -> ServiceResult<Invoice> {
        draft.validate().map_err(ServiceError::Invalid)?;
        let slot = book
            .invoice_mut(id)
            .ok_or_else(|| ServiceError::invoice_not_found(id))?;
        *slot = Invoice::from_draft(id, draft);
        Ok(slot.clone())
    }

    pub fn remove(book: &mut Book, id: RecordId) -> ServiceResult<Invoice> {
        let index = book
            .invoices
            .iter()
            .position(|invoice| invoice.id == id)
            .ok_or_else(|| ServiceError::invoice_not_found(id))?;
        Ok(book.invoices.remove(index))
    }

    /// Per-currency sums over a listing, ordered by currency code.
    pub fn totals_by_currency<'a, I>(invoices: I) -> BTreeMap<CurrencyCode, CurrencyTotals>
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut totals: BTreeMap<CurrencyCode, CurrencyTotals> = BTreeMap::new();
        for invoice in invoices {
            let entry = totals.entry(invoice.currency.clone()).or_default();
            entry.count += 1;
            entry.subtotal += invoice.subtotal;
            entry.vat += invoice.vat_amount();
            entry.total += invoice.total();
        }
        totals
    }

    /// Orders a listing purchases first, then sales, each newest first.
    pub fn group_by_type(invoices: &mut [&Invoice]) {
        invoices.sort_by(|a, b| {
            a.invoice_type
                .cmp(&b.invoice_type)
                .then_with(|| b.date.cmp(&a.date))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, InvoiceType};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn draft(day: u32, company: &str, currency: &str) -> InvoiceDraft {
        InvoiceDraft::new(
            date(day),
            company,
            format!("N-{day}"),
            100.0,
            20.0,
            CurrencyCode::new(currency),
        )
    }

    fn book() -> Book {
        let mut book = Book::default();
        InvoiceService::add(&mut book, draft(3, "Acme", "TRY")).unwrap();
        InvoiceService::add(&mut book, draft(9, "Globex", "USD").with_type(InvoiceType::Sale))
            .unwrap();
        InvoiceService::add(&mut book, draft(6, "acme east", "TRY")).unwrap();
        book
    }

    #[test]
    fn add_assigns_increasing_ids_and_defaults_type() {
        let book = book();
        let ids: Vec<_> = book.invoices.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(book.invoices[0].invoice_type, InvoiceType::Purchase);
        assert_eq!(book.invoices[0].total, Some(120.0));
    }

    #[test]
    fn ids_follow_highest_after_removal() {
        let mut book = book();
        InvoiceService::remove(&mut book, 2).unwrap();
        let added = InvoiceService::add(&mut book, draft(1, "Initech", "EUR")).unwrap();
        assert_eq!(added.id, 4);
    }

    #[test]
    fn list_filters_and_sorts_newest_first() {
        let book = book();
        let filter = InvoiceFilter {
            company: Some("ACME".into()),
            ..InvoiceFilter::default()
        };
        let listed: Vec<_> = InvoiceService::list(&book, &filter)
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(listed, vec![3, 1]);

        let ranged = InvoiceFilter {
            range: DateRange::new(Some(date(6)), Some(date(9))),
            ..InvoiceFilter::default()
        };
        assert_eq!(InvoiceService::list(&book, &ranged).len(), 2);
    }

    #[test]
    fn update_replaces_record_and_keeps_id() {
        let mut book = book();
        let updated = InvoiceService::update(
            &mut book,
            1,
            draft(20, "Acme Holding", "EUR").with_total(130.0),
        )
        .unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(book.invoice(1).unwrap().company, "Acme Holding");
        assert_eq!(book.invoice(1).unwrap().total(), 130.0);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut book = book();
        let err = InvoiceService::remove(&mut book, 99).expect_err("missing id");
        assert!(matches!(err, ServiceError::NotFound { id: 99, .. }));
        assert!(InvoiceService::update(&mut book, 42, draft(1, "X", "TRY")).is_err());
        assert!(InvoiceService::get(&book, 42).is_err());
    }

    #[test]
    fn invalid_drafts_are_rejected() {
        let mut book = Book::default();
        let mut bad = draft(1, "Acme", "TRY");
        bad.vat_rate = -1.0;
        let err = InvoiceService::add(&mut book, bad).expect_err("invalid VAT");
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert!(book.invoices.is_empty());
    }

    #[test]
    fn totals_are_grouped_per_currency() {
        let book = book();
        let totals = InvoiceService::totals_by_currency(&book.invoices);
        let try_totals = &totals[&CurrencyCode::new("TRY")];
        assert_eq!(try_totals.count, 2);
        assert!((try_totals.vat - 40.0).abs() < 1e-9);
        assert!((try_totals.total - 240.0).abs() < 1e-9);
        assert_eq!(totals[&CurrencyCode::new("USD")].count, 1);
    }

    #[test]
    fn grouping_puts_purchases_before_sales() {
        let book = book();
        let mut listed = InvoiceService::list(&book, &InvoiceFilter::default());
        InvoiceService::group_by_type(&mut listed);
        let ids: Vec<_> = listed.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
