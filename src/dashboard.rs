//! One query pass over the loaded evaluations.
//!
//! The period catalog, reception list and monthly evolution are computed from
//! the full record set; everything else from the filtered subset.

use serde::Serialize;

use crate::catalog::{available_periods_at, period_label};
use crate::filter::{available_receptions, filter_by_period_at, filter_by_reception};
use crate::locale::Locale;
use crate::metrics::{hourly_trend, latest_evaluations, monthly_evolution, snapshot};
use crate::models::{
    EvaluationRecord, HourlyBucket, LatestEvaluation, MetricSnapshot, MonthlyBucket,
    PeriodSelector, ReceptionSelector, YearMonth,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardQuery {
    pub period: PeriodSelector,
    pub reception: ReceptionSelector,
    pub latest_limit: Option<usize>,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            period: PeriodSelector::Current,
            reception: ReceptionSelector::All,
            latest_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub period_label: String,
    pub period_description: String,
    pub reception_label: String,
    pub snapshot: MetricSnapshot,
    pub category_label: String,
    pub category_color: String,
    pub recommendation_headline: String,
    pub periods: Vec<String>,
    pub receptions: Vec<String>,
    pub monthly_evolution: Vec<MonthlyBucket>,
    /// Only computed for the current-month view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_trend: Option<Vec<HourlyBucket>>,
    pub latest: Vec<LatestEvaluation>,
}

pub fn build_view(
    records: &[EvaluationRecord],
    query: &DashboardQuery,
    locale: Locale,
    current: YearMonth,
) -> DashboardView {
    let by_period = filter_by_period_at(records, Some(query.period), current);
    let filtered = filter_by_reception(&by_period, &query.reception);

    let metrics = snapshot(&filtered);
    let period_description = match query.period {
        PeriodSelector::All => locale.all_periods_description(),
        PeriodSelector::Current => locale.current_period_description(current),
        PeriodSelector::Month(period) => locale.period_description(period),
    };
    let reception_label = match &query.reception {
        ReceptionSelector::All => locale.all_receptions_label().to_string(),
        ReceptionSelector::Named(name) => name.clone(),
    };
    let hourly = (query.period == PeriodSelector::Current).then(|| hourly_trend(&filtered));

    DashboardView {
        period_label: period_label(query.period, locale),
        period_description,
        reception_label,
        category_label: locale.category_label(metrics.category).to_string(),
        category_color: metrics.category.color().to_string(),
        recommendation_headline: locale
            .recommendation_headline(metrics.recommendation_mean)
            .to_string(),
        periods: available_periods_at(records, locale, current),
        receptions: available_receptions(records, locale),
        monthly_evolution: monthly_evolution(records, locale),
        hourly_trend: hourly,
        latest: latest_evaluations(&filtered, query.latest_limit),
        snapshot: metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NpsCategory;
    use chrono::NaiveDate;

    fn record(reception: &str, month: u32, hour: u32, recommendation: i32) -> EvaluationRecord {
        EvaluationRecord {
            reception: reception.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, month, 4)
                .and_then(|d| d.and_hms_opt(hour, 0, 0)),
            service_rating: Some(recommendation - 1),
            recommendation_rating: Some(recommendation),
            comment: String::new(),
        }
    }

    fn sample() -> Vec<EvaluationRecord> {
        vec![
            record("Térreo", 3, 9, 10),
            record("Térreo", 3, 11, 9),
            record("Primeiro andar", 3, 11, 4),
            record("Térreo", 2, 10, 7),
        ]
    }

    #[test]
    fn current_month_view_includes_hourly_trend() {
        let march = YearMonth::new(2024, 3).unwrap();
        let view = build_view(&sample(), &DashboardQuery::default(), Locale::PtBr, march);

        assert_eq!(view.snapshot.evaluation_count, 3);
        assert_eq!(view.period_label, "Atual");
        assert_eq!(view.period_description, "Visualizando dados do mês atual (Março/2024)");
        assert_eq!(view.hourly_trend.as_ref().map(Vec::len), Some(2));
        assert_eq!(view.monthly_evolution.len(), 2);
        assert_eq!(view.periods, vec!["Atual", "Todos", "Março/2024", "Fevereiro/2024"]);
    }

    #[test]
    fn reception_filter_narrows_metrics_but_not_catalogs() {
        let query = DashboardQuery {
            period: PeriodSelector::All,
            reception: ReceptionSelector::Named("Térreo".to_string()),
            latest_limit: Some(2),
        };
        let view = build_view(&sample(), &query, Locale::En, YearMonth::new(2024, 3).unwrap());

        assert_eq!(view.snapshot.evaluation_count, 3);
        assert!(view.hourly_trend.is_none());
        assert_eq!(view.latest.len(), 2);
        assert_eq!(view.receptions, vec!["All", "Primeiro andar", "Térreo"]);
        assert_eq!(view.reception_label, "Térreo");
        assert_eq!(view.period_description, "Showing data for the whole period");
        assert!((view.snapshot.nps - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(view.snapshot.category, NpsCategory::Good);
        assert_eq!(view.category_label, "Good");
    }

    #[test]
    fn empty_period_yields_default_metrics() {
        let query = DashboardQuery {
            period: PeriodSelector::Month(YearMonth::new(2022, 1).unwrap()),
            ..DashboardQuery::default()
        };
        let view = build_view(&sample(), &query, Locale::PtBr, YearMonth::new(2024, 3).unwrap());
        assert_eq!(view.snapshot.evaluation_count, 0);
        assert_eq!(view.snapshot.nps, 0.0);
        assert_eq!(view.period_label, "Janeiro/2022");
        assert_eq!(view.recommendation_headline, "Há oportunidades para melhorias");
        assert!(view.latest.is_empty());
    }
}
