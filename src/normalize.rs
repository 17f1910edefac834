//! Maps raw tabular rows onto [`EvaluationRecord`]s.
//!
//! Columns are matched by header name when every mandatory field can be found
//! through the alias table; otherwise the fixed survey-form layout is used:
//! reception, timestamp, email, service rating, recommendation rating, comment.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{Cell, EvaluationRecord, RawTable, NOT_INFORMED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Reception,
    Timestamp,
    Email,
    ServiceRating,
    RecommendationRating,
    Comment,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Reception,
        Field::Timestamp,
        Field::Email,
        Field::ServiceRating,
        Field::RecommendationRating,
        Field::Comment,
    ];

    /// Column index in the positional layout.
    pub fn position(self) -> usize {
        match self {
            Field::Reception => 0,
            Field::Timestamp => 1,
            Field::Email => 2,
            Field::ServiceRating => 3,
            Field::RecommendationRating => 4,
            Field::Comment => 5,
        }
    }

    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            Field::Reception | Field::Timestamp | Field::ServiceRating | Field::RecommendationRating
        )
    }

    /// Accepted header spellings, already lowercased.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Reception => &["recepção", "recepcao", "recepcão", "reception", "desk"],
            Field::Timestamp => &[
                "timestamp",
                "carimbo de data/hora",
                "data/hora",
                "data",
                "date",
                "datetime",
            ],
            Field::Email => &[
                "e-mail",
                "email",
                "endereço de e-mail",
                "endereco de e-mail",
                "email address",
            ],
            Field::ServiceRating => &[
                "atendimento",
                "nota atendimento",
                "nota do atendimento",
                "avaliação do atendimento",
                "avaliacao do atendimento",
                "service",
                "service rating",
            ],
            Field::RecommendationRating => &[
                "recomendação",
                "recomendacao",
                "nota recomendação",
                "nota recomendacao",
                "recommendation",
                "recommendation rating",
            ],
            Field::Comment => &[
                "comentário",
                "comentario",
                "comentários",
                "comentarios",
                "comment",
                "comments",
            ],
        }
    }

    fn matches_header(self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        self.aliases().iter().any(|alias| *alias == header)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStrategy {
    ByName,
    ByPosition,
}

/// Resolved column index per field. `None` means the field reads as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub strategy: MappingStrategy,
    columns: [Option<usize>; 6],
}

impl ColumnMapping {
    pub fn positional() -> Self {
        let mut columns = [None; 6];
        for field in Field::ALL {
            columns[field.position()] = Some(field.position());
        }
        Self {
            strategy: MappingStrategy::ByPosition,
            columns,
        }
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns[field.position()]
    }

    /// Name-based mapping, or `None` unless every mandatory field is found.
    pub fn by_name(headers: &[String]) -> Option<Self> {
        let mut columns = [None; 6];
        for field in Field::ALL {
            columns[field.position()] = headers.iter().position(|h| field.matches_header(h));
        }

        let complete = Field::ALL
            .iter()
            .filter(|field| field.is_mandatory())
            .all(|field| columns[field.position()].is_some());

        complete.then_some(Self {
            strategy: MappingStrategy::ByName,
            columns,
        })
    }

    pub fn resolve(table: &RawTable) -> Self {
        match table.headers.as_deref().and_then(Self::by_name) {
            Some(mapping) => {
                debug!(?mapping, "mapped columns by header name");
                mapping
            }
            None => {
                debug!(
                    has_headers = table.headers.is_some(),
                    "falling back to positional column mapping"
                );
                Self::positional()
            }
        }
    }

    fn cell<'a>(&self, row: &'a [Cell], field: Field) -> &'a Cell {
        self.column(field)
            .and_then(|index| row.get(index))
            .unwrap_or(&Cell::Null)
    }
}

pub fn normalize(table: &RawTable) -> Vec<EvaluationRecord> {
    if table.is_empty() {
        return Vec::new();
    }

    let mapping = ColumnMapping::resolve(table);
    table
        .rows
        .iter()
        .map(|row| normalize_row(row, &mapping))
        .collect()
}

pub fn normalize_row(row: &[Cell], mapping: &ColumnMapping) -> EvaluationRecord {
    EvaluationRecord {
        reception: parse_reception(mapping.cell(row, Field::Reception)),
        timestamp: parse_timestamp(mapping.cell(row, Field::Timestamp)),
        service_rating: parse_rating(mapping.cell(row, Field::ServiceRating)),
        recommendation_rating: parse_rating(mapping.cell(row, Field::RecommendationRating)),
        comment: parse_comment(mapping.cell(row, Field::Comment)),
    }
}

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parses a timestamp cell. Slash dates are read day-first.
pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    let Cell::Text(text) = cell else {
        return None;
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses a rating cell. Whole numbers are kept as-is, including values
/// outside 0..=10; anything else is absent.
pub fn parse_rating(cell: &Cell) -> Option<i32> {
    let value = match cell {
        Cell::Number(value) => *value,
        Cell::Text(text) => text.trim().parse::<f64>().ok()?,
        Cell::Null | Cell::Bool(_) => return None,
    };

    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i32)
}

fn parse_reception(cell: &Cell) -> String {
    match display_cell(cell) {
        Some(text) if !text.trim().is_empty() => text,
        _ => NOT_INFORMED.to_string(),
    }
}

fn parse_comment(cell: &Cell) -> String {
    display_cell(cell).unwrap_or_default()
}

fn display_cell(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Text(text) => Some(text.clone()),
        Cell::Number(value) if value.fract() == 0.0 && value.is_finite() => {
            Some(format!("{}", *value as i64))
        }
        Cell::Number(value) => Some(value.to_string()),
        Cell::Bool(value) => Some(value.to_string()),
    }
}
