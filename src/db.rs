use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Cell, EvaluationRecord, RawTable};
use crate::normalize::normalize;
use crate::source::{parse_csv, TableSource};

/// Column labels for fetched rows; each one is a name the normalizer maps.
const FETCH_HEADERS: [&str; 5] = [
    "reception",
    "timestamp",
    "service",
    "recommendation",
    "comment",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool, branch: &str) -> Result<usize> {
    let evaluations = vec![
        ("seed-001", "Térreo", (2024, 1, 9, 8, 12), Some(10), Some(10), "Atendimento rápido e cordial"),
        ("seed-002", "Térreo", (2024, 1, 22, 15, 40), Some(7), Some(8), ""),
        ("seed-003", "Primeiro andar", (2024, 2, 2, 9, 5), Some(4), Some(5), "Demora na recepção"),
        ("seed-004", "Primeiro andar", (2024, 2, 14, 10, 30), Some(9), Some(9), ""),
        ("seed-005", "Térreo", (2024, 3, 1, 11, 0), Some(10), Some(9), "Equipe muito atenciosa"),
        ("seed-006", "Térreo", (2024, 3, 7, 16, 20), Some(6), Some(6), "Sala de espera cheia"),
    ];

    let mut inserted = 0usize;
    for (key, reception, (year, month, day, hour, minute), service, recommendation, comment) in
        evaluations
    {
        let timestamp = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| Error::InvalidInput(format!("invalid seed date for {key}")))?;
        let record = EvaluationRecord {
            reception: reception.to_string(),
            timestamp: Some(timestamp),
            service_rating: service,
            recommendation_rating: recommendation,
            comment: comment.to_string(),
        };

        let source_key = format!("{branch}:{key}");
        if insert_evaluation(pool, branch, &record, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Normalizes a CSV file and stores every row under `branch`.
pub async fn import_csv(
    pool: &PgPool,
    branch: &str,
    csv_path: &Path,
    has_headers: bool,
) -> Result<usize> {
    let file = std::fs::File::open(csv_path)?;
    let records = normalize(&parse_csv(file, has_headers)?);

    let mut inserted = 0usize;
    for record in &records {
        let source_key = format!("import-{}", Uuid::new_v4());
        if insert_evaluation(pool, branch, record, &source_key).await? {
            inserted += 1;
        }
    }

    info!(branch, inserted, total = records.len(), "imported evaluations");
    Ok(inserted)
}

async fn insert_evaluation(
    pool: &PgPool,
    branch: &str,
    record: &EvaluationRecord,
    source_key: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO satisfaction.evaluations
        (id, branch, reception, submitted_at, service_rating, recommendation_rating, comment, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(branch)
    .bind(&record.reception)
    .bind(record.timestamp)
    .bind(record.service_rating)
    .bind(record.recommendation_rating)
    .bind(&record.comment)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_table(pool: &PgPool, branch: &str) -> Result<RawTable> {
    let rows = sqlx::query(
        "SELECT reception, submitted_at, service_rating, recommendation_rating, comment \
         FROM satisfaction.evaluations \
         WHERE branch = $1 \
         ORDER BY submitted_at NULLS LAST, created_at",
    )
    .bind(branch)
    .fetch_all(pool)
    .await?;

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let submitted_at: Option<NaiveDateTime> = row.try_get("submitted_at")?;
        let service: Option<i32> = row.try_get("service_rating")?;
        let recommendation: Option<i32> = row.try_get("recommendation_rating")?;

        cells.push(vec![
            Cell::from(row.try_get::<Option<String>, _>("reception")?),
            Cell::from(submitted_at.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())),
            Cell::from(service.map(i64::from)),
            Cell::from(recommendation.map(i64::from)),
            Cell::from(row.try_get::<String, _>("comment")?),
        ]);
    }

    Ok(RawTable::with_headers(
        FETCH_HEADERS.iter().map(|h| h.to_string()).collect(),
        cells,
    ))
}

/// Evaluations of one branch stored in Postgres.
pub struct PostgresSource {
    pool: PgPool,
    branch: String,
}

impl PostgresSource {
    pub fn new(pool: PgPool, branch: impl Into<String>) -> Self {
        Self {
            pool,
            branch: branch.into(),
        }
    }
}

#[async_trait]
impl TableSource for PostgresSource {
    fn describe(&self) -> String {
        format!("postgres:{}", self.branch)
    }

    async fn read_table(&self) -> Result<RawTable> {
        fetch_table(&self.pool, &self.branch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ColumnMapping, Field, MappingStrategy};

    #[test]
    fn fetched_headers_map_by_name() {
        let table = RawTable::with_headers(
            FETCH_HEADERS.iter().map(|h| h.to_string()).collect(),
            vec![vec![
                Cell::from("Térreo"),
                Cell::from("2024-03-01 11:00:00"),
                Cell::from(10_i64),
                Cell::from(9_i64),
                Cell::from(""),
            ]],
        );
        let mapping = ColumnMapping::resolve(&table);
        assert_eq!(mapping.strategy, MappingStrategy::ByName);
        assert_eq!(mapping.column(Field::Email), None);

        let record = &normalize(&table)[0];
        assert_eq!(record.service_rating, Some(10));
        assert_eq!(record.recommendation_rating, Some(9));
        assert_eq!(
            record.timestamp.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()).as_deref(),
            Some("2024-03-01 11:00:00")
        );
    }

    #[test]
    fn schema_stores_only_fetched_fields() {
        let schema = include_str!("../migrations/20240301000000_create_evaluations.sql");
        assert!(!schema.contains("email"));
        for column in ["reception", "submitted_at", "service_rating", "recommendation_rating", "comment"] {
            assert!(schema.contains(column), "missing column {column}");
        }
    }
}
