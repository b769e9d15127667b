use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::{next_id, Book, FxRate, FxRateDraft, RecordId, YearMonth};

/// CRUD helpers for monthly FX rates. One record per (year, month).
pub struct FxRateService;

impl FxRateService {
    /// Both given: that period only. Year only: that year. Neither: everything.
    /// A month without a year is ignored. Newest period first.
    pub fn list(book: &Book, year: Option<i32>, month: Option<u32>) -> Vec<&FxRate> {
        let mut rates: Vec<&FxRate> = book
            .fx_rates
            .iter()
            .filter(|rate| match (year, month) {
                (Some(year), Some(month)) => rate.year == year && rate.month == month,
                (Some(year), None) => rate.year == year,
                (None, _) => true,
            })
            .collect();
        rates.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| b.month.cmp(&a.month)));
        rates
    }

    pub fn get(book: &Book, id: RecordId) -> ServiceResult<&FxRate> {
        book.fx_rate(id)
            .ok_or_else(|| ServiceError::fx_rate_not_found(id))
    }

    pub fn rate_for_period(book: &Book, period: YearMonth) -> Option<&FxRate> {
        book.fx_rate_for(period)
    }

    /// Inserts a rate or overwrites the one already stored for the same period.
    pub fn upsert(book: &mut Book, draft: FxRateDraft) -> ServiceResult<FxRate> {
        let period = draft.validate().map_err(ServiceError::Invalid)?;
        let id = match book.fx_rate_for(period) {
            Some(existing) => existing.id,
            None => next_id(&book.fx_rates),
        };
        let rate = FxRate::from_draft(id, draft);
        match book.fx_rates.iter_mut().find(|stored| stored.id == id) {
            Some(slot) => *slot = rate.clone(),
            None => book.fx_rates.push(rate.clone()),
        }
        Ok(rate)
    }

    /// Replaces rate `id`; moving it onto another record's period is rejected.
    pub fn update(book: &mut Book, id: RecordId, draft: FxRateDraft) -> ServiceResult<FxRate> {
        let period = draft.validate().map_err(ServiceError::Invalid)?;
        if let Some(other) = book
            .fx_rates
            .iter()
            .find(|rate| rate.id != id && rate.matches_period(period))
        {
            return Err(ServiceError::Invalid(format!(
                "FX rate {} already covers {}",
                other.id, period
            )));
        }
        let slot = book
            .fx_rates
            .iter_mut()
            .find(|rate| rate.id == id)
            .ok_or_else(|| ServiceError::fx_rate_not_found(id))?;
        *slot = FxRate::from_draft(id, draft);
        Ok(slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn book() -> Book {
        let mut book = Book::default();
        FxRateService::upsert(&mut book, FxRateDraft::new(period(2023, 11), 28.5, 31.0)).unwrap();
        FxRateService::upsert(&mut book, FxRateDraft::new(period(2024, 2), 30.9, 33.4)).unwrap();
        FxRateService::upsert(&mut book, FxRateDraft::new(period(2024, 1), 30.2, 33.0)).unwrap();
        book
    }

    #[test]
    fn upsert_on_existing_period_keeps_single_record_and_id() {
        let mut book = book();
        let updated =
            FxRateService::upsert(&mut book, FxRateDraft::new(period(2024, 2), 31.5, 34.0))
                .unwrap();
        assert_eq!(updated.id, 2);
        assert_eq!(book.fx_rates.len(), 3);
        assert_eq!(book.fx_rate(2).unwrap().usd, 31.5);
    }

    #[test]
    fn list_filters_by_year_and_month() {
        let book = book();
        let all: Vec<_> = FxRateService::list(&book, None, None)
            .iter()
            .map(|r| (r.year, r.month))
            .collect();
        assert_eq!(all, vec![(2024, 2), (2024, 1), (2023, 11)]);
        assert_eq!(FxRateService::list(&book, Some(2024), None).len(), 2);
        assert_eq!(FxRateService::list(&book, Some(2024), Some(1))[0].id, 3);
        assert_eq!(FxRateService::list(&book, None, Some(1)).len(), 3);
    }

    #[test]
    fn update_rejects_period_collision_and_unknown_id() {
        let mut book = book();
        let err = FxRateService::update(&mut book, 1, FxRateDraft::new(period(2024, 1), 1.0, 1.0))
            .expect_err("collision");
        assert!(matches!(err, ServiceError::Invalid(_)));

        let err = FxRateService::update(&mut book, 9, FxRateDraft::new(period(2020, 1), 1.0, 1.0))
            .expect_err("unknown");
        assert!(matches!(err, ServiceError::NotFound { id: 9, .. }));

        let moved =
            FxRateService::update(&mut book, 1, FxRateDraft::new(period(2023, 12), 29.0, 31.5))
                .unwrap();
        assert_eq!((moved.id, moved.month), (1, 12));
    }
}
