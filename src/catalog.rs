//! Selectable periods derived from the loaded evaluations.

use std::collections::BTreeSet;

use crate::locale::Locale;
use crate::models::{EvaluationRecord, PeriodSelector, YearMonth};

/// Period labels against the local wall clock.
pub fn available_periods(records: &[EvaluationRecord], locale: Locale) -> Vec<String> {
    available_periods_at(records, locale, YearMonth::now())
}

/// Period labels, newest first, preceded by the "current" and "all"
/// sentinels. The current month is always offered even before it has data.
pub fn available_periods_at(
    records: &[EvaluationRecord],
    locale: Locale,
    current: YearMonth,
) -> Vec<String> {
    let periods: BTreeSet<YearMonth> = records.iter().filter_map(|r| r.year_month()).collect();
    if periods.is_empty() {
        return vec![locale.all_periods_label().to_string()];
    }

    let mut labels: Vec<String> = periods
        .into_iter()
        .rev()
        .map(|period| locale.period_label(period))
        .collect();

    let current_label = locale.period_label(current);
    if !labels.contains(&current_label) {
        labels.insert(0, current_label);
    }

    let mut options = Vec::with_capacity(labels.len() + 2);
    options.push(locale.current_period_label().to_string());
    options.push(locale.all_periods_label().to_string());
    options.extend(labels);
    options
}

/// Forward mapping for any selector, sentinels included.
pub fn period_label(selector: PeriodSelector, locale: Locale) -> String {
    match selector {
        PeriodSelector::All => locale.all_periods_label().to_string(),
        PeriodSelector::Current => locale.current_period_label().to_string(),
        PeriodSelector::Month(period) => locale.period_label(period),
    }
}

/// Inverse of [`period_label`]. Returns `None` when the label names no
/// period.
pub fn parse_period_label(label: &str, locale: Locale) -> Option<PeriodSelector> {
    let label = label.trim();
    if label == locale.all_periods_label() {
        return Some(PeriodSelector::All);
    }
    if label == locale.current_period_label() {
        return Some(PeriodSelector::Current);
    }

    let (month, year) = label.split_once('/')?;
    let month = locale.month_number(month).or_else(|| month.parse().ok())?;
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    YearMonth::new(year, month).map(PeriodSelector::Month)
}
