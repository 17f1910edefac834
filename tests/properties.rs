//! Property-based tests for the metrics and period catalog

use std::collections::BTreeSet;

use chrono::NaiveDate;
use clinic_satisfaction::catalog::{available_periods_at, parse_period_label};
use clinic_satisfaction::filter::filter_by_period_at;
use clinic_satisfaction::locale::Locale;
use clinic_satisfaction::metrics::{nps, pct_detractors, pct_neutral, pct_promoters};
use clinic_satisfaction::models::{Cell, EvaluationRecord, PeriodSelector, RawTable, YearMonth};
use clinic_satisfaction::normalize::normalize;
use proptest::prelude::*;

fn arb_year_month() -> impl Strategy<Value = YearMonth> {
    (1990i32..2100, 1u32..=12).prop_map(|(year, month)| YearMonth::new(year, month).unwrap())
}

fn arb_locale() -> impl Strategy<Value = Locale> {
    prop_oneof![Just(Locale::PtBr), Just(Locale::En)]
}

fn record_in(period: YearMonth, day: u32) -> EvaluationRecord {
    EvaluationRecord {
        reception: "Térreo".to_string(),
        timestamp: NaiveDate::from_ymd_opt(period.year(), period.month(), day)
            .and_then(|date| date.and_hms_opt(10, 0, 0)),
        service_rating: Some(8),
        recommendation_rating: Some(9),
        comment: String::new(),
    }
}

proptest! {
    #[test]
    fn percentages_sum_to_one_hundred(ratings in prop::collection::vec(-20i32..30, 1..200)) {
        let total = pct_promoters(&ratings) + pct_neutral(&ratings) + pct_detractors(&ratings);
        prop_assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn nps_stays_in_range(ratings in prop::collection::vec(0i32..=10, 1..200)) {
        let score = nps(&ratings);
        prop_assert!((-100.0..=100.0).contains(&score));
        let expected = pct_promoters(&ratings) - pct_detractors(&ratings);
        prop_assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn catalog_labels_round_trip(
        periods in prop::collection::btree_set(arb_year_month(), 1..24),
        current in arb_year_month(),
        locale in arb_locale(),
    ) {
        let records: Vec<EvaluationRecord> = periods.iter().map(|p| record_in(*p, 15)).collect();
        let labels = available_periods_at(&records, locale, current);

        prop_assert_eq!(labels[0].as_str(), locale.current_period_label());
        prop_assert_eq!(labels[1].as_str(), locale.all_periods_label());

        let mut expected: BTreeSet<YearMonth> = periods.clone();
        expected.insert(current);

        let mut recovered = Vec::new();
        for label in &labels[2..] {
            match parse_period_label(label, locale) {
                Some(PeriodSelector::Month(period)) => recovered.push(period),
                other => prop_assert!(false, "label {} mapped to {:?}", label, other),
            }
        }
        let unique: BTreeSet<YearMonth> = recovered.iter().copied().collect();
        prop_assert_eq!(unique.len(), recovered.len());
        prop_assert_eq!(unique, expected);

        let data_labels: Vec<YearMonth> = recovered
            .iter()
            .copied()
            .skip(usize::from(!periods.contains(&current)))
            .collect();
        let mut newest_first = data_labels.clone();
        newest_first.sort_by(|a, b| b.cmp(a));
        prop_assert_eq!(data_labels, newest_first);
    }

    #[test]
    fn current_filter_keeps_only_the_current_month(
        periods in prop::collection::vec(arb_year_month(), 0..40),
        current in arb_year_month(),
    ) {
        let records: Vec<EvaluationRecord> = periods.iter().map(|p| record_in(*p, 1)).collect();
        let filtered = filter_by_period_at(&records, Some(PeriodSelector::Current), current);

        let all_in_current = filtered.iter().all(|r| {
            r.year() == Some(current.year()) && r.month() == Some(current.month())
        });
        prop_assert!(all_in_current);
        prop_assert_eq!(filtered.len(), periods.iter().filter(|p| **p == current).count());
    }

    #[test]
    fn normalization_keeps_every_row(
        rows in prop::collection::vec(prop::collection::vec(".{0,12}", 0..8), 1..30)
    ) {
        let table = RawTable::positional(
            rows.iter()
                .map(|row| row.iter().map(|text| Cell::from(text.as_str())).collect())
                .collect(),
        );
        let records = normalize(&table);
        prop_assert_eq!(records.len(), rows.len());
        for record in &records {
            prop_assert!(!record.reception.is_empty());
            prop_assert_eq!(record.year().is_some(), record.year_month().is_some());
        }
    }
}

#[test]
fn empty_ratings_use_zero_defaults() {
    assert_eq!(nps(&[]), 0.0);
    assert_eq!(pct_promoters(&[]), 0.0);
    assert_eq!(pct_neutral(&[]), 0.0);
    assert_eq!(pct_detractors(&[]), 0.0);
}
