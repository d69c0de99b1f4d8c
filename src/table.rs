//! Interpretation of the CSV returned by the InfluxDB query API.

use crate::error::{CheckError, Result};
use crate::executor::QueryResponse;

/// Marker InfluxDB puts in the `result` column of every data row.
const RESULT_MARKER: &str = "_result";

/// Name of the `result` column as it appears in a header row.
const RESULT_HEADER: &str = "result";

/// Column carrying the message of an error table.
const ERROR_HEADER: &str = "error";

/// A single (field, value) pair extracted from the response.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuePoint {
    pub field: String,
    pub value: f64,
}

impl ValuePoint {
    pub fn new(field: impl Into<String>, value: f64) -> Self {
        ValuePoint {
            field: field.into(),
            value,
        }
    }
}

/// What a query response turned out to contain.
#[derive(Clone, Debug, PartialEq)]
pub enum Interpretation {
    /// The body was empty: the query did not match anything.
    Empty,
    /// At least one value was extracted.
    Points(Vec<ValuePoint>),
}

/// Positions of the columns the check cares about, resolved from a header row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schema {
    pub value: usize,
    pub field: Option<usize>,
    pub stop: Option<usize>,
    pub time: Option<usize>,
}

impl Schema {
    /// Resolves the columns by exact name. `_value` is required, the rest are only needed when
    /// several rows have to be told apart.
    pub fn resolve(header: &[String]) -> Result<Schema> {
        let position = |name: &str| header.iter().position(|cell| cell == name);

        Ok(Schema {
            value: position("_value").ok_or(CheckError::MissingColumn("_value"))?,
            field: position("_field"),
            stop: position("_stop"),
            time: position("_time"),
        })
    }

    fn series_columns(&self) -> Result<(usize, usize, usize)> {
        Ok((
            self.field.ok_or(CheckError::MissingColumn("_field"))?,
            self.stop.ok_or(CheckError::MissingColumn("_stop"))?,
            self.time.ok_or(CheckError::MissingColumn("_time"))?,
        ))
    }
}

/// Rows of a CSV response. The first row is the header.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable {
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Parses the body. Annotation rows (`#datatype`, `#group`, ...) and blank lines are dropped.
    pub fn parse(body: &str) -> Result<ResultTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(body.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(ResultTable { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Extracts the values.
    ///
    /// A table with at most two data rows is a single series: the value of the first data row
    /// is reported under `field_label`. Larger tables are walked row by row and only terminal
    /// points are kept, i.e. `_result` rows whose `_stop` equals their `_time`.
    pub fn value_points(&self, field_label: &str) -> Result<Vec<ValuePoint>> {
        let header = self.rows.first().ok_or(CheckError::MissingHeader)?;
        if let Some(message) = self.error_message(header) {
            return Err(CheckError::Query(message));
        }
        let mut schema = Schema::resolve(header)?;

        if self.rows.len() <= 3 {
            let row = self.rows.get(1).ok_or(CheckError::NoData)?;
            let value = parse_value(1, cell(row, 1, schema.value, "_value")?)?;
            return Ok(vec![ValuePoint::new(field_label, value)]);
        }

        let mut points = Vec::new();
        for (index, row) in self.rows.iter().enumerate().skip(1) {
            if row.len() < 2 {
                continue;
            }
            if row[1] == RESULT_HEADER {
                log::debug!("row {index} starts a new table, resolving columns again");
                schema = Schema::resolve(row)?;
                continue;
            }
            if row[1] != RESULT_MARKER {
                continue;
            }

            let (field, stop, time) = schema.series_columns()?;
            if cell(row, index, stop, "_stop")? != cell(row, index, time, "_time")? {
                continue;
            }

            points.push(ValuePoint::new(
                cell(row, index, field, "_field")?,
                parse_value(index, cell(row, index, schema.value, "_value")?)?,
            ));
        }

        if points.is_empty() {
            return Err(CheckError::NoData);
        }

        Ok(points)
    }

    // error tables come with HTTP 200 and an `error,reference` header
    fn error_message(&self, header: &[String]) -> Option<String> {
        if header.iter().any(|cell| cell == "_value") {
            return None;
        }
        let column = header.iter().position(|cell| cell == ERROR_HEADER)?;

        Some(
            self.rows
                .get(1)
                .and_then(|row| row.get(column))
                .cloned()
                .unwrap_or_default(),
        )
    }
}

/// Turns a raw response into values, an empty outcome or an error.
pub fn interpret(response: &QueryResponse, field_label: &str) -> Result<Interpretation> {
    if !response.success {
        return Err(CheckError::Transport(response.body.clone()));
    }
    if response.body.trim().is_empty() {
        return Ok(Interpretation::Empty);
    }

    let table = ResultTable::parse(&response.body)?;
    log::debug!("parsed {} CSV rows", table.rows().len());

    Ok(Interpretation::Points(table.value_points(field_label)?))
}

fn cell<'a>(row: &'a [String], index: usize, column: usize, name: &'static str) -> Result<&'a str> {
    row.get(column)
        .map(String::as_str)
        .ok_or(CheckError::MissingCell { row: index, column: name })
}

fn parse_value(row: usize, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CheckError::InvalidNumber {
            row,
            value: raw.to_owned(),
        })
}
