use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tax_tracker::core::services::DashboardService;
use tax_tracker::currency::CurrencyCode;
use tax_tracker::domain::{
    Book, DashboardFilter, FxRate, FxRateDraft, Invoice, InvoiceDraft, InvoiceType, YearMonth,
};
use tax_tracker::storage::{JsonStore, RecordStore, StorePaths};
use tempfile::tempdir;

const CURRENCIES: [&str; 3] = ["TRY", "USD", "EUR"];

fn build_sample_book(invoice_count: usize) -> Book {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let invoices: Vec<Invoice> = (0..invoice_count)
        .map(|idx| {
            let date = start + Duration::days((idx % 730) as i64);
            let mut draft = InvoiceDraft::new(
                date,
                format!("Company {}", idx % 50),
                format!("INV-{idx}"),
                100.0 + (idx % 400) as f64,
                if idx % 4 == 0 { 8.0 } else { 18.0 },
                CurrencyCode::new(CURRENCIES[idx % CURRENCIES.len()]),
            );
            if idx % 3 == 0 {
                draft = draft.with_type(InvoiceType::Sale);
            }
            Invoice::from_draft(idx as u64 + 1, draft)
        })
        .collect();

    let fx_rates: Vec<FxRate> = (0..24u32)
        .map(|offset| {
            let period = YearMonth::new(2023 + (offset / 12) as i32, offset % 12 + 1).unwrap();
            let base = 20.0 + offset as f64 * 0.5;
            FxRate::from_draft(offset as u64 + 1, FxRateDraft::new(period, base, base * 1.08))
        })
        .collect();

    Book::new(invoices, fx_rates)
}

fn bench_dashboard(c: &mut Criterion) {
    let book = build_sample_book(black_box(10_000));
    let home = CurrencyCode::default();

    c.bench_function("dashboard_all_10k", |b| {
        b.iter(|| {
            let data = DashboardService::build(&book, &DashboardFilter::default(), &home);
            black_box(data);
        })
    });

    let sales = DashboardFilter {
        invoice_type: Some(InvoiceType::Sale),
        ..DashboardFilter::default()
    };
    c.bench_function("dashboard_sales_10k", |b| {
        b.iter(|| black_box(DashboardService::build(&book, &sales, &home)))
    });
}

fn bench_store_io(c: &mut Criterion) {
    let book = build_sample_book(black_box(10_000));
    let dir = tempdir().expect("tempdir");
    let store = JsonStore::new(StorePaths::new(dir.path().join("data")), Some(2));
    store.load().expect("initialise store");

    c.bench_function("invoices_save_10k", |b| {
        b.iter(|| store.save_invoices(&book.invoices).expect("save invoices"))
    });

    c.bench_function("store_load_10k", |b| {
        b.iter(|| black_box(store.load().expect("load store")))
    });
}

criterion_group!(benches, bench_dashboard, bench_store_io);
criterion_main!(benches);
