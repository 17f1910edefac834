//! Tabular sources and the read path that feeds the normalizer.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Cell, EvaluationRecord, RawTable};
use crate::normalize::normalize;

#[async_trait]
pub trait TableSource: Send + Sync {
    fn describe(&self) -> String;

    async fn read_table(&self) -> Result<RawTable>;
}

#[async_trait]
impl<S: TableSource + ?Sized> TableSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn read_table(&self) -> Result<RawTable> {
        (**self).read_table().await
    }
}

pub struct CsvFileSource {
    path: PathBuf,
    has_headers: bool,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            has_headers: true,
        }
    }

    pub fn without_headers(mut self) -> Self {
        self.has_headers = false;
        self
    }
}

#[async_trait]
impl TableSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    async fn read_table(&self) -> Result<RawTable> {
        let file = std::fs::File::open(&self.path)?;
        parse_csv(file, self.has_headers)
    }
}

/// Reads CSV into a raw table. Rows may have differing lengths; blank cells
/// become `Cell::Null`. Fields that are not UTF-8 are read as Latin-1, which
/// covers Windows spreadsheet exports.
pub fn parse_csv<R: io::Read>(reader: R, has_headers: bool) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = if has_headers {
        Some(reader.byte_headers()?.iter().map(decode_field).collect())
    } else {
        None
    };

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        match result {
            Ok(record) => rows.push(
                record
                    .iter()
                    .map(|field| text_cell(&decode_field(field)))
                    .collect(),
            ),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => warn!(error = %err, "skipping malformed CSV row"),
        }
    }

    Ok(RawTable { headers, rows })
}

fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

fn text_cell(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Null
    } else {
        Cell::Text(value.to_string())
    }
}

pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TableSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    async fn read_table(&self) -> Result<RawTable> {
        let contents = std::fs::read_to_string(&self.path)?;
        table_from_json(serde_json::from_str(&contents)?)
    }
}

/// How long an HTTP read may take before the source counts as unavailable.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

pub struct HttpJsonSource {
    client: reqwest::Client,
    url: String,
}

impl HttpJsonSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, HTTP_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TableSource for HttpJsonSource {
    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }

    async fn read_table(&self) -> Result<RawTable> {
        let payload: Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        table_from_json(payload)
    }
}

/// Accepts an array of arrays (positional), an array of objects (named), or
/// a spreadsheet-style `{"values": [[header...], [row...], ...]}` payload.
pub fn table_from_json(value: Value) -> Result<RawTable> {
    match value {
        Value::Array(rows) => table_from_json_rows(rows),
        Value::Object(mut object) => match object.remove("values") {
            Some(Value::Array(values)) => table_from_sheet_values(values),
            _ => Err(Error::InvalidInput(
                "JSON object payload must carry a `values` array".to_string(),
            )),
        },
        _ => Err(Error::InvalidInput(
            "JSON payload must be an array of rows".to_string(),
        )),
    }
}

/// Object rows win when any are present. Elements that do not match the row
/// shape are dropped with a warning instead of failing the table.
fn table_from_json_rows(rows: Vec<Value>) -> Result<RawTable> {
    if rows.is_empty() {
        return Ok(RawTable::default());
    }

    let total = rows.len();
    if rows.iter().any(Value::is_object) {
        let named: Vec<Vec<(String, Cell)>> = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(object) => Some(
                    object
                        .into_iter()
                        .map(|(label, value)| (label, json_cell(value)))
                        .collect(),
                ),
                _ => None,
            })
            .collect();
        warn_dropped(total, named.len());
        return Ok(RawTable::from_named_rows(named));
    }

    let rows = json_rows(rows);
    warn_dropped(total, rows.len());
    Ok(RawTable::positional(rows))
}

fn table_from_sheet_values(values: Vec<Value>) -> Result<RawTable> {
    let total = values.len();
    let values = json_rows(values);
    warn_dropped(total, values.len());

    let mut rows = values.into_iter();
    let Some(header_row) = rows.next() else {
        return Ok(RawTable::default());
    };
    let headers = header_row
        .into_iter()
        .map(|cell| match cell {
            Cell::Text(text) => text,
            Cell::Number(number) => number.to_string(),
            Cell::Bool(flag) => flag.to_string(),
            Cell::Null => String::new(),
        })
        .collect();

    Ok(RawTable::with_headers(headers, rows.collect()))
}

fn warn_dropped(total: usize, kept: usize) {
    if kept < total {
        warn!(dropped = total - kept, "skipping JSON rows of the wrong shape");
    }
}

fn json_rows(rows: Vec<Value>) -> Vec<Vec<Cell>> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Array(cells) => Some(cells.into_iter().map(json_cell).collect()),
            _ => None,
        })
        .collect()
}

fn json_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(flag) => Cell::Bool(flag),
        Value::Number(number) => number.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
        Value::String(text) => text_cell(text.trim()),
        other => Cell::Text(other.to_string()),
    }
}

/// Picks a file source by extension: `.json` reads JSON, anything else CSV.
pub fn file_source(path: &Path, has_headers: bool) -> Box<dyn TableSource> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Box::new(JsonFileSource::new(path))
    } else if has_headers {
        Box::new(CsvFileSource::new(path))
    } else {
        Box::new(CsvFileSource::new(path).without_headers())
    }
}

/// Read-through cache in front of another source. A read older than `ttl`
/// is repeated; failed reads are not cached.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entry: Mutex<Option<(Instant, RawTable)>>,
}

impl<S: TableSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Drops the cached table so the next read goes to the source.
    pub async fn clear(&self) {
        *self.entry.lock().await = None;
    }
}

#[async_trait]
impl<S: TableSource> TableSource for CachedSource<S> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn read_table(&self) -> Result<RawTable> {
        let mut entry = self.entry.lock().await;
        if let Some((read_at, table)) = entry.as_ref() {
            if read_at.elapsed() < self.ttl {
                debug!(source = %self.inner.describe(), "serving cached table");
                return Ok(table.clone());
            }
        }

        debug!(source = %self.inner.describe(), "reading table from source");
        let table = self.inner.read_table().await?;
        *entry = Some((Instant::now(), table.clone()));
        Ok(table)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<EvaluationRecord>,
    /// User-facing reason the record set is empty, if any.
    pub warning: Option<String>,
}

/// Reads and normalizes a source. Failures never propagate: they are logged
/// and turned into an empty record set with a warning.
pub async fn load_records<S: TableSource + ?Sized>(source: &S) -> LoadOutcome {
    match source.read_table().await {
        Ok(table) if table.is_empty() => {
            warn!(source = %source.describe(), "source contains no rows");
            LoadOutcome {
                records: Vec::new(),
                warning: Some(format!("{} contains no data", source.describe())),
            }
        }
        Ok(table) => {
            let records = normalize(&table);
            debug!(source = %source.describe(), count = records.len(), "normalized evaluations");
            LoadOutcome {
                records,
                warning: None,
            }
        }
        Err(err) => {
            warn!(source = %source.describe(), error = %err, "failed to read source");
            LoadOutcome {
                records: Vec::new(),
                warning: Some(format!("Could not read {}: {}", source.describe(), err)),
            }
        }
    }
}
