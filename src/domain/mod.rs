pub mod book;
pub mod common;
pub mod filter;
pub mod fx_rate;
pub mod invoice;

pub use book::Book;
pub use common::{next_id, Identifiable, RecordId, RecordKind, YearMonth};
pub use filter::{DashboardFilter, DateRange, InvoiceFilter};
pub use fx_rate::{FxRate, FxRateDraft, QUOTED_CURRENCIES};
pub use invoice::{HomeEquivalent, Invoice, InvoiceDraft, InvoiceType, TOTAL_TOLERANCE};
