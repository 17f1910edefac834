use std::fmt::Write;

use crate::dashboard::DashboardView;

fn format_mean(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{:.1}", value)
    }
}

fn format_rating(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn build_report(branch: &str, view: &DashboardView) -> String {
    let snapshot = &view.snapshot;
    let mut output = String::new();

    let _ = writeln!(output, "# Patient Satisfaction Report - {}", branch);
    let _ = writeln!(
        output,
        "{} · reception: {} · {} evaluations",
        view.period_description, view.reception_label, snapshot.evaluation_count
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Net Promoter Score");
    let _ = writeln!(
        output,
        "**{}** points ({})",
        snapshot.nps.round() as i64,
        view.category_label
    );
    let _ = writeln!(
        output,
        "- Promoters: {:.1}%\n- Neutrals: {:.1}%\n- Detractors: {:.1}%",
        snapshot.promoters_pct, snapshot.neutral_pct, snapshot.detractors_pct
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Averages");
    let _ = writeln!(
        output,
        "- Service: {:.1} / 10 (based on {} ratings)",
        snapshot.service_mean, snapshot.service_count
    );
    let _ = writeln!(
        output,
        "- Recommendation: {:.1} / 10 (based on {} ratings)",
        snapshot.recommendation_mean, snapshot.recommendation_count
    );
    let _ = writeln!(output, "- {}", view.recommendation_headline);
    let _ = writeln!(output);

    let _ = writeln!(output, "## Rating Distribution");
    let _ = writeln!(output, "| Rating | Service | Recommendation |");
    let _ = writeln!(output, "|---|---|---|");
    for row in &snapshot.distribution {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            row.rating, row.service, row.recommendation
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Monthly Evolution");
    if view.monthly_evolution.is_empty() {
        let _ = writeln!(output, "Not enough data to show the evolution by period.");
    } else {
        let _ = writeln!(output, "| Period | Service | Recommendation |");
        let _ = writeln!(output, "|---|---|---|");
        for bucket in &view.monthly_evolution {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                bucket.label,
                format_mean(bucket.service_mean),
                format_mean(bucket.recommendation_mean)
            );
        }
    }

    if let Some(trend) = &view.hourly_trend {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Trend by Hour of Day");
        if trend.is_empty() {
            let _ = writeln!(output, "Not enough data to show the trend by hour of day.");
        } else {
            let _ = writeln!(output, "| Hour | Service | Recommendation |");
            let _ = writeln!(output, "|---|---|---|");
            for bucket in trend {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} |",
                    bucket.label,
                    format_mean(bucket.service_mean),
                    format_mean(bucket.recommendation_mean)
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Evaluations");
    if view.latest.is_empty() {
        let _ = writeln!(output, "No evaluations recorded for this period.");
    } else {
        for evaluation in &view.latest {
            let comment = if evaluation.comment.is_empty() {
                String::new()
            } else {
                format!(": {}", evaluation.comment)
            };
            let _ = writeln!(
                output,
                "- {} ({}) service {} / recommendation {}{}",
                evaluation.submitted_at.as_deref().unwrap_or("-"),
                evaluation.reception,
                format_rating(evaluation.service_rating),
                format_rating(evaluation.recommendation_rating),
                comment
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{build_view, DashboardQuery};
    use crate::locale::Locale;
    use crate::models::{EvaluationRecord, PeriodSelector, YearMonth};
    use chrono::NaiveDate;

    fn record(day: u32, service: Option<i32>, recommendation: Option<i32>, comment: &str) -> EvaluationRecord {
        EvaluationRecord {
            reception: "Térreo".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, day).and_then(|d| d.and_hms_opt(10, 5, 0)),
            service_rating: service,
            recommendation_rating: recommendation,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn report_includes_headline_sections() {
        let records = vec![
            record(1, Some(9), Some(10), "Excelente"),
            record(2, Some(5), None, ""),
        ];
        let view = build_view(
            &records,
            &DashboardQuery::default(),
            Locale::PtBr,
            YearMonth::new(2024, 3).unwrap(),
        );
        let report = build_report("CEOP Belém", &view);

        assert!(report.starts_with("# Patient Satisfaction Report - CEOP Belém"));
        assert!(report.contains("**100** points (Excelente)"));
        assert!(report.contains("- Service: 7.0 / 10 (based on 2 ratings)"));
        assert!(report.contains("| 10 | 0 | 1 |"));
        assert!(report.contains("| Mar/24 | 7.0 | 10.0 |"));
        assert!(report.contains("## Trend by Hour of Day"));
        assert!(report.contains("| 10:00 | 7.0 | 10.0 |"));
        assert!(report.contains("- 02/03/2024 10:05 (Térreo) service 5 / recommendation -"));
        assert!(report.contains("- 01/03/2024 10:05 (Térreo) service 9 / recommendation 10: Excelente"));
    }

    #[test]
    fn empty_view_reports_missing_data() {
        let query = DashboardQuery {
            period: PeriodSelector::All,
            ..DashboardQuery::default()
        };
        let view = build_view(&[], &query, Locale::En, YearMonth::new(2024, 3).unwrap());
        let report = build_report("CEOP Castanhal", &view);

        assert!(report.contains("**0** points (Regular)"));
        assert!(report.contains("Not enough data to show the evolution by period."));
        assert!(report.contains("No evaluations recorded for this period."));
        assert!(!report.contains("Trend by Hour of Day"));
    }
}
