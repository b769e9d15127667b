pub mod conversion_service;
pub mod dashboard_service;
pub mod fx_rate_service;
pub mod invoice_service;

pub use conversion_service::{ConversionService, InvoiceConversion};
pub use dashboard_service::{
    CurrencyDistribution, DashboardData, DashboardService, DashboardSummary, MonthlyTotal,
    VatByMonth,
};
pub use fx_rate_service::FxRateService;
pub use invoice_service::{CurrencyTotals, InvoiceService};

use crate::currency::CurrencyCode;
use crate::domain::{RecordId, RecordKind, YearMonth};
use crate::errors::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: RecordId },
    #[error("{0}")]
    Invalid(String),
    #[error("no FX rate for {currency} in {period}")]
    MissingRate {
        currency: CurrencyCode,
        period: YearMonth,
    },
    #[error("currency {0} cannot be converted to the home currency")]
    UnsupportedCurrency(CurrencyCode),
}

impl ServiceError {
    pub fn invoice_not_found(id: RecordId) -> Self {
        ServiceError::NotFound {
            kind: RecordKind::Invoice,
            id,
        }
    }

    pub fn fx_rate_not_found(id: RecordId) -> Self {
        ServiceError::NotFound {
            kind: RecordKind::FxRate,
            id,
        }
    }
}
