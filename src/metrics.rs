use std::collections::BTreeMap;

use crate::locale::Locale;
use crate::models::{
    DistributionRow, EvaluationRecord, HourlyBucket, LatestEvaluation, MetricSnapshot,
    MonthlyBucket, NpsCategory, RatingTone, YearMonth,
};

pub fn nps(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let n = ratings.len() as f64;
    let promoters = ratings.iter().filter(|r| **r >= 9).count() as f64;
    let detractors = ratings.iter().filter(|r| **r <= 6).count() as f64;
    (promoters / n - detractors / n) * 100.0
}

pub fn pct_promoters(ratings: &[i32]) -> f64 {
    share(ratings, |r| r >= 9)
}

pub fn pct_neutral(ratings: &[i32]) -> f64 {
    share(ratings, |r| (7..=8).contains(&r))
}

pub fn pct_detractors(ratings: &[i32]) -> f64 {
    share(ratings, |r| r <= 6)
}

fn share(ratings: &[i32], matches: impl Fn(i32) -> bool) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let hits = ratings.iter().filter(|r| matches(**r)).count();
    100.0 * hits as f64 / ratings.len() as f64
}

pub fn nps_category(score: f64) -> NpsCategory {
    if score >= 75.0 {
        NpsCategory::Excellent
    } else if score >= 50.0 {
        NpsCategory::Good
    } else if score >= 0.0 {
        NpsCategory::Regular
    } else {
        NpsCategory::Critical
    }
}

pub fn rating_tone(rating: i32) -> RatingTone {
    match rating {
        r if r >= 9 => RatingTone::Positive,
        7..=8 => RatingTone::Good,
        5..=6 => RatingTone::Warning,
        _ => RatingTone::Negative,
    }
}

pub fn service_ratings(records: &[EvaluationRecord]) -> Vec<i32> {
    records.iter().filter_map(|r| r.service_rating).collect()
}

pub fn recommendation_ratings(records: &[EvaluationRecord]) -> Vec<i32> {
    records.iter().filter_map(|r| r.recommendation_rating).collect()
}

/// Arithmetic mean, `None` for no values.
pub fn mean(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64)
}

/// Counts per rating 0..=10. Ratings outside that range land in no row.
pub fn rating_distribution(records: &[EvaluationRecord]) -> Vec<DistributionRow> {
    let mut rows: Vec<DistributionRow> = (0..=10u8)
        .map(|rating| DistributionRow {
            rating,
            service: 0,
            recommendation: 0,
        })
        .collect();

    for record in records {
        if let Some(rating) = record.service_rating {
            if let Some(row) = distribution_slot(&mut rows, rating) {
                row.service += 1;
            }
        }
        if let Some(rating) = record.recommendation_rating {
            if let Some(row) = distribution_slot(&mut rows, rating) {
                row.recommendation += 1;
            }
        }
    }

    rows
}

fn distribution_slot(rows: &mut [DistributionRow], rating: i32) -> Option<&mut DistributionRow> {
    usize::try_from(rating).ok().and_then(|index| rows.get_mut(index))
}

/// Running sums for the two rating columns of one bucket.
#[derive(Default)]
struct MeanPair {
    service: (f64, usize),
    recommendation: (f64, usize),
}

impl MeanPair {
    fn add(&mut self, record: &EvaluationRecord) {
        if let Some(rating) = record.service_rating {
            self.service.0 += f64::from(rating);
            self.service.1 += 1;
        }
        if let Some(rating) = record.recommendation_rating {
            self.recommendation.0 += f64::from(rating);
            self.recommendation.1 += 1;
        }
    }

    fn means(&self) -> (f64, f64) {
        (mean_or_nan(self.service), mean_or_nan(self.recommendation))
    }
}

fn mean_or_nan((sum, count): (f64, usize)) -> f64 {
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Mean ratings per hour of day, ascending. Empty when no record carries a
/// timestamp. A column with no ratings in a bucket is NaN.
pub fn hourly_trend(records: &[EvaluationRecord]) -> Vec<HourlyBucket> {
    let mut buckets: BTreeMap<u32, MeanPair> = BTreeMap::new();
    for record in records {
        if let Some(hour) = record.hour() {
            buckets.entry(hour).or_default().add(record);
        }
    }

    buckets
        .into_iter()
        .map(|(hour, pair)| {
            let (service_mean, recommendation_mean) = pair.means();
            HourlyBucket {
                label: format!("{:02}:00", hour),
                hour,
                service_mean,
                recommendation_mean,
            }
        })
        .collect()
}

/// Mean ratings per calendar month, oldest first.
pub fn monthly_evolution(records: &[EvaluationRecord], locale: Locale) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<YearMonth, MeanPair> = BTreeMap::new();
    for record in records {
        if let Some(period) = record.year_month() {
            buckets.entry(period).or_default().add(record);
        }
    }

    buckets
        .into_iter()
        .map(|(period, pair)| {
            let (service_mean, recommendation_mean) = pair.means();
            MonthlyBucket {
                period,
                label: locale.short_period_label(period),
                service_mean,
                recommendation_mean,
            }
        })
        .collect()
}

/// Most recent evaluations first; undated ones sort last.
pub fn latest_evaluations(records: &[EvaluationRecord], limit: Option<usize>) -> Vec<LatestEvaluation> {
    let mut sorted: Vec<&EvaluationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    sorted
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| LatestEvaluation {
            reception: record.reception.clone(),
            submitted_at: record
                .timestamp
                .map(|ts| ts.format("%d/%m/%Y %H:%M").to_string()),
            service_rating: record.service_rating,
            service_tone: record.service_rating.map(rating_tone),
            recommendation_rating: record.recommendation_rating,
            recommendation_tone: record.recommendation_rating.map(rating_tone),
            comment: record.comment.clone(),
        })
        .collect()
}

/// Headline metrics for one filtered set. NPS and its bands use the
/// recommendation rating.
pub fn snapshot(records: &[EvaluationRecord]) -> MetricSnapshot {
    let service = service_ratings(records);
    let recommendation = recommendation_ratings(records);
    let score = nps(&recommendation);

    MetricSnapshot {
        evaluation_count: records.len(),
        nps: score,
        category: nps_category(score),
        promoters_pct: pct_promoters(&recommendation),
        neutral_pct: pct_neutral(&recommendation),
        detractors_pct: pct_detractors(&recommendation),
        service_mean: mean(&service).unwrap_or(0.0),
        service_count: service.len(),
        recommendation_mean: mean(&recommendation).unwrap_or(0.0),
        recommendation_count: recommendation.len(),
        distribution: rating_distribution(records),
    }
}
