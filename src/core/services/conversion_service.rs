//! Home-currency conversion of invoices using the monthly FX table.

use crate::core::services::{ServiceError, ServiceResult};
use crate::currency::{round_minor, ConvertedAmount, CurrencyCode, RateSource, TRY};
use crate::domain::{Book, FxRate, HomeEquivalent, Invoice, RecordId};

/// An invoice's figures expressed in the home currency.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceConversion {
    pub invoice_id: RecordId,
    pub equivalent: HomeEquivalent,
    pub detail: ConvertedAmount,
}

pub struct ConversionService;

impl ConversionService {
    /// Rate from the invoice currency to `home` for the invoice's month.
    ///
    /// Monthly rates are quoted in TRY, so any pair of TRY, USD and EUR
    /// converts through them.
    pub fn rate(
        book: &Book,
        invoice: &Invoice,
        home: &CurrencyCode,
    ) -> ServiceResult<(f64, RateSource)> {
        if &invoice.currency == home {
            return Ok((1.0, RateSource::Parity));
        }
        for code in [&invoice.currency, home] {
            if !FxRate::is_quoted(code) {
                return Err(ServiceError::UnsupportedCurrency(code.clone()));
            }
        }
        let period = invoice.period();
        book.fx_rate_for(period)
            .and_then(|rate| rate.cross_rate(&invoice.currency, home))
            .map(|rate| (rate, RateSource::MonthlyRate))
            .ok_or_else(|| ServiceError::MissingRate {
                currency: if invoice.currency.is(TRY) {
                    home.clone()
                } else {
                    invoice.currency.clone()
                },
                period,
            })
    }

    /// Converts an invoice, preferring an equivalent already stored on it
    /// in the same home currency.
    pub fn convert(
        book: &Book,
        invoice: &Invoice,
        home: &CurrencyCode,
    ) -> ServiceResult<InvoiceConversion> {
        let stored = invoice
            .home_equivalent
            .as_ref()
            .filter(|equivalent| equivalent.is_in(home));
        if let Some(equivalent) = stored {
            let total = invoice.total();
            let rate_used = if total.abs() > f64::EPSILON {
                equivalent.total / total
            } else {
                1.0
            };
            return Ok(Self::conversion(
                invoice,
                home,
                equivalent.clone(),
                rate_used,
                RateSource::Precomputed,
            ));
        }
        Self::convert_with_rate(book, invoice, home)
    }

    /// Converts from the rate table, ignoring any stored equivalent.
    pub fn convert_with_rate(
        book: &Book,
        invoice: &Invoice,
        home: &CurrencyCode,
    ) -> ServiceResult<InvoiceConversion> {
        let (rate, source) = Self::rate(book, invoice, home)?;
        let equivalent = HomeEquivalent::scaled(
            invoice.subtotal,
            invoice.vat_amount(),
            invoice.total(),
            rate,
            home.clone(),
        );
        Ok(Self::conversion(invoice, home, equivalent, rate, source))
    }

    /// Computes the equivalent for invoice `id` and stores it on the record,
    /// rounded to the home currency's minor unit.
    pub fn attach(
        book: &mut Book,
        id: RecordId,
        home: &CurrencyCode,
    ) -> ServiceResult<InvoiceConversion> {
        let invoice = book
            .invoice(id)
            .ok_or_else(|| ServiceError::invoice_not_found(id))?;
        let mut conversion = Self::convert_with_rate(book, invoice, home)?;
        let equivalent = &mut conversion.equivalent;
        equivalent.subtotal = round_minor(equivalent.subtotal, home);
        equivalent.vat_amount = round_minor(equivalent.vat_amount, home);
        equivalent.total = round_minor(equivalent.total, home);
        conversion.detail.amount = conversion.equivalent.total;
        if let Some(slot) = book.invoice_mut(id) {
            slot.home_equivalent = Some(conversion.equivalent.clone());
        }
        Ok(conversion)
    }

    fn conversion(
        invoice: &Invoice,
        home: &CurrencyCode,
        equivalent: HomeEquivalent,
        rate_used: f64,
        source: RateSource,
    ) -> InvoiceConversion {
        let amount = equivalent.total;
        InvoiceConversion {
            invoice_id: invoice.id,
            equivalent,
            detail: ConvertedAmount {
                amount,
                rate_used,
                period: invoice.period(),
                source,
                from: invoice.currency.clone(),
                to: home.clone(),
            },
        }
    }
}
