use crate::locale::Locale;
use crate::models::{EvaluationRecord, PeriodSelector, ReceptionSelector, YearMonth};

/// Filters by period, resolving `Current` to `current`.
pub fn filter_by_period_at(
    records: &[EvaluationRecord],
    selector: Option<PeriodSelector>,
    current: YearMonth,
) -> Vec<EvaluationRecord> {
    let target = match selector {
        None | Some(PeriodSelector::All) => return records.to_vec(),
        Some(PeriodSelector::Current) => current,
        Some(PeriodSelector::Month(period)) => period,
    };

    records
        .iter()
        .filter(|record| record.year_month() == Some(target))
        .cloned()
        .collect()
}

pub fn filter_by_reception(
    records: &[EvaluationRecord],
    selector: &ReceptionSelector,
) -> Vec<EvaluationRecord> {
    match selector {
        ReceptionSelector::All => records.to_vec(),
        ReceptionSelector::Named(name) => records
            .iter()
            .filter(|record| record.reception == *name)
            .cloned()
            .collect(),
    }
}

/// Reception choices: the "all" label followed by the distinct receptions in
/// sorted order.
pub fn available_receptions(records: &[EvaluationRecord], locale: Locale) -> Vec<String> {
    let mut receptions: Vec<String> = records.iter().map(|r| r.reception.clone()).collect();
    receptions.sort();
    receptions.dedup();

    let mut options = Vec::with_capacity(receptions.len() + 1);
    options.push(locale.all_receptions_label().to_string());
    options.extend(receptions);
    options
}

/// Maps a reception choice back to a selector. The "all" label selects
/// everything.
pub fn parse_reception_label(label: &str, locale: Locale) -> ReceptionSelector {
    if label == locale.all_receptions_label() {
        ReceptionSelector::All
    } else {
        ReceptionSelector::Named(label.to_string())
    }
}
