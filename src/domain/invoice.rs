//! Domain models for purchase and sale invoices.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::currency::CurrencyCode;
use crate::domain::common::{Identifiable, RecordId, YearMonth};

/// Largest difference between a stored and a computed total that is not reported.
pub const TOTAL_TOLERANCE: f64 = 0.01;

/// Classifies an invoice as money going out (purchase) or coming in (sale).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    #[default]
    Purchase,
    Sale,
}

impl InvoiceType {
    pub const ALL: [InvoiceType; 2] = [InvoiceType::Purchase, InvoiceType::Sale];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Purchase => "purchase",
            InvoiceType::Sale => "sale",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceType::Purchase => "Purchase",
            InvoiceType::Sale => "Sale",
        };
        f.write_str(label)
    }
}

impl FromStr for InvoiceType {
    type Err = String;

    /// Accepts the English names and the labels written by earlier releases.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "purchase" | "p" | "alış" | "alis" => Ok(InvoiceType::Purchase),
            "sale" | "s" | "satış" | "satis" => Ok(InvoiceType::Sale),
            other => Err(format!(
                "unknown invoice type `{}` (use purchase or sale)",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for InvoiceType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        match value.as_deref().map(str::trim) {
            None | Some("") => Ok(InvoiceType::default()),
            Some(raw) => raw.parse().map_err(de::Error::custom),
        }
    }
}

/// Home-currency figures computed once and stored alongside the invoice.
///
/// Records written before the currency was stored carry rate-table figures,
/// so a missing `currency` reads as TRY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeEquivalent {
    pub subtotal: f64,
    pub vat_amount: f64,
    pub total: f64,
    #[serde(default)]
    pub currency: CurrencyCode,
}

impl HomeEquivalent {
    pub fn scaled(
        subtotal: f64,
        vat_amount: f64,
        total: f64,
        rate: f64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            subtotal: subtotal * rate,
            vat_amount: vat_amount * rate,
            total: total * rate,
            currency,
        }
    }

    /// Whether these figures are expressed in `home`.
    pub fn is_in(&self, home: &CurrencyCode) -> bool {
        &self.currency == home
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: RecordId,
    pub date: NaiveDate,
    pub company: String,
    #[serde(default)]
    pub invoice_no: String,
    #[serde(alias = "amount")]
    pub subtotal: f64,
    pub vat_rate: f64,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub invoice_type: InvoiceType,
    /// Stored total; may differ from `subtotal + VAT` when entered by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_equivalent: Option<HomeEquivalent>,
}

impl Invoice {
    pub fn from_draft(id: RecordId, draft: InvoiceDraft) -> Self {
        let mut invoice = Self {
            id,
            date: draft.date,
            company: draft.company.trim().to_string(),
            invoice_no: draft.invoice_no.trim().to_string(),
            subtotal: draft.subtotal,
            vat_rate: draft.vat_rate,
            currency: draft.currency,
            invoice_type: draft.invoice_type.unwrap_or_default(),
            total: None,
            description: draft.description.filter(|text| !text.trim().is_empty()),
            home_equivalent: draft.home_equivalent,
        };
        invoice.total = Some(draft.total.unwrap_or_else(|| invoice.computed_total()));
        invoice
    }

    pub fn vat_amount(&self) -> f64 {
        self.subtotal * (self.vat_rate / 100.0)
    }

    pub fn computed_total(&self) -> f64 {
        self.subtotal + self.vat_amount()
    }

    /// Effective total: the stored value when present, otherwise the computed one.
    pub fn total(&self) -> f64 {
        self.total.unwrap_or_else(|| self.computed_total())
    }

    pub fn total_drift(&self) -> f64 {
        self.total() - self.computed_total()
    }

    pub fn has_consistent_total(&self) -> bool {
        self.total_drift().abs() <= TOTAL_TOLERANCE + f64::EPSILON
    }

    pub fn period(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

impl Identifiable for Invoice {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// User-supplied invoice contents, used for both inserts and full replacements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub date: NaiveDate,
    pub company: String,
    #[serde(default)]
    pub invoice_no: String,
    #[serde(alias = "amount")]
    pub subtotal: f64,
    pub vat_rate: f64,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub invoice_type: Option<InvoiceType>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub home_equivalent: Option<HomeEquivalent>,
}

impl InvoiceDraft {
    pub fn new(
        date: NaiveDate,
        company: impl Into<String>,
        invoice_no: impl Into<String>,
        subtotal: f64,
        vat_rate: f64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            date,
            company: company.into(),
            invoice_no: invoice_no.into(),
            subtotal,
            vat_rate,
            currency,
            invoice_type: None,
            total: None,
            description: None,
            home_equivalent: None,
        }
    }

    pub fn with_type(mut self, invoice_type: InvoiceType) -> Self {
        self.invoice_type = Some(invoice_type);
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Seeds a draft with the stored contents of `invoice`, ready for editing.
    pub fn from_invoice(invoice: &Invoice) -> Self {
        Self {
            date: invoice.date,
            company: invoice.company.clone(),
            invoice_no: invoice.invoice_no.clone(),
            subtotal: invoice.subtotal,
            vat_rate: invoice.vat_rate,
            currency: invoice.currency.clone(),
            invoice_type: Some(invoice.invoice_type),
            total: invoice.total,
            description: invoice.description.clone(),
            home_equivalent: invoice.home_equivalent.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.company.trim().is_empty() {
            return Err("company name is required".into());
        }
        if self.invoice_no.trim().is_empty() {
            return Err("invoice number is required".into());
        }
        if !self.subtotal.is_finite() || self.subtotal < 0.0 {
            return Err(format!(
                "subtotal must be a non-negative amount (got {})",
                self.subtotal
            ));
        }
        if !self.vat_rate.is_finite() || !(0.0..=100.0).contains(&self.vat_rate) {
            return Err(format!(
                "VAT rate must be between 0 and 100 (got {})",
                self.vat_rate
            ));
        }
        if let Some(total) = self.total {
            if !total.is_finite() || total < 0.0 {
                return Err(format!("total must be a non-negative amount (got {})", total));
            }
        }
        if self.currency.as_str().len() != 3 {
            return Err(format!(
                "currency must be a three-letter code (got `{}`)",
                self.currency
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> InvoiceDraft {
        InvoiceDraft::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            "Acme Ltd.",
            "INV-1",
            1000.0,
            18.0,
            CurrencyCode::new("TRY"),
        )
    }

    #[test]
    fn vat_and_total_follow_rate() {
        let invoice = Invoice::from_draft(1, draft());
        assert!((invoice.vat_amount() - 180.0).abs() < 1e-9);
        assert!((invoice.total() - 1180.0).abs() < 1e-9);
        assert_eq!(invoice.invoice_type, InvoiceType::Purchase);
        assert!(invoice.has_consistent_total());
    }

    #[test]
    fn manual_total_is_kept_and_flagged() {
        let invoice = Invoice::from_draft(1, draft().with_total(1200.0));
        assert_eq!(invoice.total(), 1200.0);
        assert!((invoice.total_drift() - 20.0).abs() < 1e-9);
        assert!(!invoice.has_consistent_total());
    }

    #[test]
    fn legacy_records_deserialize_with_defaults() {
        let raw = r#"{
            "id": 1,
            "date": "2024-01-05",
            "company": "Örnek Şirket A.Ş.",
            "amount": 1000,
            "vat_rate": 18,
            "vat_amount": 180,
            "currency": "TRY",
            "invoice_type": "Satış",
            "description": "Örnek fatura"
        }"#;
        let invoice: Invoice = serde_json::from_str(raw).expect("legacy invoice");
        assert_eq!(invoice.subtotal, 1000.0);
        assert_eq!(invoice.invoice_type, InvoiceType::Sale);
        assert_eq!(invoice.invoice_no, "");
        assert_eq!(invoice.total, None);
        assert!((invoice.total() - 1180.0).abs() < 1e-9);
    }

    #[test]
    fn missing_or_blank_type_defaults_to_purchase() {
        let base = r#"{"id":2,"date":"2024-01-05","company":"A","invoice_no":"1","subtotal":10,"vat_rate":0,"currency":"USD""#;
        for suffix in ["}", r#","invoice_type":null}"#, r#","invoice_type":""}"#] {
            let invoice: Invoice = serde_json::from_str(&format!("{base}{suffix}")).unwrap();
            assert_eq!(invoice.invoice_type, InvoiceType::Purchase, "{suffix}");
        }
    }

    #[test]
    fn invoice_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InvoiceType::Sale).unwrap(),
            "\"sale\""
        );
        assert!("refund".parse::<InvoiceType>().is_err());
    }

    #[test]
    fn validation_rejects_bad_drafts() {
        assert!(draft().validate().is_ok());

        let mut missing_company = draft();
        missing_company.company = "  ".into();
        assert!(missing_company.validate().is_err());

        let mut bad_rate = draft();
        bad_rate.vat_rate = 120.0;
        assert!(bad_rate.validate().is_err());

        let mut negative = draft();
        negative.subtotal = -5.0;
        assert!(negative.validate().is_err());
    }
}
