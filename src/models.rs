use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};

use crate::error::Error;

/// Reception value stored when the source leaves the desk empty.
pub const NOT_INFORMED: &str = "Não informado";

/// A single scalar cell as delivered by a tabular source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Rows as read from a source, with optional column labels.
///
/// Rows may be ragged; a missing trailing cell reads the same as `Cell::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn positional(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            headers: None,
            rows,
        }
    }

    pub fn with_headers(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            headers: Some(headers),
            rows,
        }
    }

    /// Builds a table from label/value rows. Columns are the union of labels
    /// in first-seen order.
    pub fn from_named_rows(named: Vec<Vec<(String, Cell)>>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in &named {
            for (label, _) in row {
                if !headers.contains(label) {
                    headers.push(label.clone());
                }
            }
        }

        let rows = named
            .into_iter()
            .map(|row| {
                let mut cells = vec![Cell::Null; headers.len()];
                for (label, cell) in row {
                    if let Some(index) = headers.iter().position(|h| *h == label) {
                        cells[index] = cell;
                    }
                }
                cells
            })
            .collect();

        Self::with_headers(headers, rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Calendar month used as the period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month of the local wall clock at the time of the call.
    pub fn now() -> Self {
        Self::of(&Local::now().naive_local())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One survey response after normalization.
///
/// Calendar fields are derived from `timestamp` on demand, so they are always
/// present or absent together.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub reception: String,
    pub timestamp: Option<NaiveDateTime>,
    pub service_rating: Option<i32>,
    pub recommendation_rating: Option<i32>,
    pub comment: String,
}

impl EvaluationRecord {
    pub fn year(&self) -> Option<i32> {
        self.timestamp.map(|ts| ts.year())
    }

    pub fn month(&self) -> Option<u32> {
        self.timestamp.map(|ts| ts.month())
    }

    pub fn year_month(&self) -> Option<YearMonth> {
        self.timestamp.as_ref().map(YearMonth::of)
    }

    pub fn hour(&self) -> Option<u32> {
        self.timestamp.map(|ts| ts.hour())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSelector {
    All,
    /// The wall-clock month, resolved each time a filter runs.
    Current,
    Month(YearMonth),
}

impl FromStr for PeriodSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(PeriodSelector::All),
            "current" => Ok(PeriodSelector::Current),
            other => other.parse().map(PeriodSelector::Month),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReceptionSelector {
    #[default]
    All,
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NpsCategory {
    Excellent,
    Good,
    Regular,
    Critical,
}

impl NpsCategory {
    pub fn color(&self) -> &'static str {
        match self {
            NpsCategory::Excellent => "#22c55e",
            NpsCategory::Good => "#3b82f6",
            NpsCategory::Regular => "#eab308",
            NpsCategory::Critical => "#ef4444",
        }
    }
}

/// Display tone attached to an individual rating in the evaluations table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingTone {
    Positive,
    Good,
    Warning,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    pub rating: u8,
    pub service: usize,
    pub recommendation: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub label: String,
    pub hour: u32,
    pub service_mean: f64,
    pub recommendation_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub period: YearMonth,
    pub label: String,
    pub service_mean: f64,
    pub recommendation_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub evaluation_count: usize,
    pub nps: f64,
    pub category: NpsCategory,
    pub promoters_pct: f64,
    pub neutral_pct: f64,
    pub detractors_pct: f64,
    /// Zero when no service rating is present.
    pub service_mean: f64,
    pub service_count: usize,
    /// Zero when no recommendation rating is present.
    pub recommendation_mean: f64,
    pub recommendation_count: usize,
    pub distribution: Vec<DistributionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestEvaluation {
    pub reception: String,
    pub submitted_at: Option<String>,
    pub service_rating: Option<i32>,
    pub service_tone: Option<RatingTone>,
    pub recommendation_rating: Option<i32>,
    pub recommendation_tone: Option<RatingTone>,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn year_month_parses_zero_padded_keys_only() {
        let parsed: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(parsed, YearMonth::new(2024, 3).unwrap());
        assert_eq!(parsed.to_string(), "2024-03");
        assert!("2024-3".parse::<YearMonth>().is_err());
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
    }

    #[test]
    fn calendar_fields_follow_timestamp() {
        let mut record = EvaluationRecord {
            reception: "Desk 1".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 10)
                .and_then(|d| d.and_hms_opt(10, 0, 0)),
            service_rating: Some(9),
            recommendation_rating: Some(10),
            comment: String::new(),
        };
        assert_eq!(record.year(), Some(2024));
        assert_eq!(record.month(), Some(3));
        assert_eq!(record.year_month().map(|ym| ym.to_string()).as_deref(), Some("2024-03"));
        assert_eq!(record.hour(), Some(10));

        record.timestamp = None;
        assert_eq!(record.year(), None);
        assert_eq!(record.month(), None);
        assert_eq!(record.year_month(), None);
    }

    #[test]
    fn named_rows_keep_first_seen_column_order() {
        let table = RawTable::from_named_rows(vec![
            vec![("b".to_string(), Cell::from("1")), ("a".to_string(), Cell::from("2"))],
            vec![("c".to_string(), Cell::from("3")), ("b".to_string(), Cell::from("4"))],
        ]);
        assert_eq!(
            table.headers,
            Some(vec!["b".to_string(), "a".to_string(), "c".to_string()])
        );
        assert_eq!(table.rows[1], vec![Cell::from("4"), Cell::Null, Cell::from("3")]);
    }

    #[test]
    fn period_selector_accepts_machine_forms() {
        assert_eq!("all".parse::<PeriodSelector>().unwrap(), PeriodSelector::All);
        assert_eq!("CURRENT".parse::<PeriodSelector>().unwrap(), PeriodSelector::Current);
        assert_eq!(
            "2023-11".parse::<PeriodSelector>().unwrap(),
            PeriodSelector::Month(YearMonth::new(2023, 11).unwrap())
        );
        assert!("Novembro/2023".parse::<PeriodSelector>().is_err());
    }
}
