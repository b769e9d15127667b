use serde::{Deserialize, Serialize};

use crate::domain::{
    common::{RecordId, YearMonth},
    fx_rate::FxRate,
    invoice::Invoice,
};

/// In-memory copy of both record collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub fx_rates: Vec<FxRate>,
}

impl Book {
    pub fn new(invoices: Vec<Invoice>, fx_rates: Vec<FxRate>) -> Self {
        Self { invoices, fx_rates }
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty() && self.fx_rates.is_empty()
    }

    pub fn invoice(&self, id: RecordId) -> Option<&Invoice> {
        self.invoices.iter().find(|invoice| invoice.id == id)
    }

    pub fn invoice_mut(&mut self, id: RecordId) -> Option<&mut Invoice> {
        self.invoices.iter_mut().find(|invoice| invoice.id == id)
    }

    pub fn fx_rate(&self, id: RecordId) -> Option<&FxRate> {
        self.fx_rates.iter().find(|rate| rate.id == id)
    }

    pub fn fx_rate_for(&self, period: YearMonth) -> Option<&FxRate> {
        self.fx_rates.iter().find(|rate| rate.matches_period(period))
    }
}
