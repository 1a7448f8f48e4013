//! Decoding of tabular query responses.
//!
//! Endpoints answer either with delimited text (CSV/TSV, first line is the
//! header) or with a SPARQL results document (`vars` + `bindings`). Both end
//! up as a stream of [`Row`]s whose width matches the header; rows of any
//! other width are skipped and remembered as [`RowIssue`]s.

use std::borrow::Cow;
use std::io::Cursor;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Delimiter;
use crate::error::ExplorerError;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const INTEGER_TYPES: &[&str] = &[
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];
const DECIMAL_TYPES: &[&str] = &["decimal", "double", "float"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: u64,
    pub fields: Vec<String>,
}

impl Row {
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A row that was dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub line: u64,
    pub message: String,
}

impl RowIssue {
    pub fn new(line: u64, error: &ExplorerError) -> Self {
        Self {
            line,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Delimited,
    SparqlJson,
}

impl ResponseFormat {
    pub fn detect(body: &str) -> Self {
        if body.trim_start().starts_with('{') {
            ResponseFormat::SparqlJson
        } else {
            ResponseFormat::Delimited
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TabularDecoder {
    delimiter: Delimiter,
    expected_columns: Option<usize>,
}

impl TabularDecoder {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            expected_columns: None,
        }
    }

    /// Reject responses whose header is not exactly `columns` wide.
    pub fn expect_columns(mut self, columns: usize) -> Self {
        self.expected_columns = Some(columns);
        self
    }

    /// Decodes delimited text.
    pub fn decode<'a>(&self, text: &'a str) -> Result<Rows<'a>, ExplorerError> {
        self.decode_bytes(Cow::Borrowed(text.as_bytes()))
    }

    /// Decodes a response body of either format.
    pub fn decode_response<'a>(&self, body: &'a str) -> Result<Rows<'a>, ExplorerError> {
        match ResponseFormat::detect(body) {
            ResponseFormat::Delimited => self.decode(body),
            ResponseFormat::SparqlJson => {
                let results: SparqlResults = serde_json::from_str(body)
                    .map_err(|err| ExplorerError::ResultsParse(err.to_string()))?;
                let text = results.to_delimited(self.delimiter)?;
                self.decode_bytes(Cow::Owned(text.into_bytes()))
            }
        }
    }

    /// Collects a whole response into a [`Table`].
    pub fn table(&self, body: &str) -> Result<Table, ExplorerError> {
        let mut rows = self.decode_response(body)?;
        let header = rows.header().to_vec();
        let data = rows.by_ref().map(|row| row.fields).collect();
        Ok(Table {
            header,
            rows: data,
            skipped: rows.finish()?,
        })
    }

    fn decode_bytes<'a>(&self, bytes: Cow<'a, [u8]>) -> Result<Rows<'a>, ExplorerError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter.as_byte())
            .from_reader(Cursor::new(bytes));
        let header = reader
            .headers()
            .map_err(|err| ExplorerError::ResultsParse(err.to_string()))?
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>();

        if let Some(expected) = self.expected_columns {
            if header.len() != expected {
                return Err(ExplorerError::HeaderMismatch {
                    expected,
                    found: header.len(),
                });
            }
        }

        Ok(Rows {
            reader,
            header,
            record: csv::StringRecord::new(),
            skipped: Vec::new(),
            failure: None,
        })
    }
}

/// Lazy stream of well-shaped data rows. Consumes its input.
pub struct Rows<'a> {
    reader: csv::Reader<Cursor<Cow<'a, [u8]>>>,
    header: Vec<String>,
    record: csv::StringRecord,
    skipped: Vec<RowIssue>,
    failure: Option<String>,
}

impl Rows<'_> {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn skipped(&self) -> &[RowIssue] {
        &self.skipped
    }

    /// Skipped rows, or an error if the reader gave up before the end of input.
    pub fn finish(self) -> Result<Vec<RowIssue>, ExplorerError> {
        match self.failure {
            Some(message) => Err(ExplorerError::ResultsParse(message)),
            None => Ok(self.skipped),
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.failure.is_some() {
            return None;
        }
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {
                    let line = self.record.position().map(|pos| pos.line()).unwrap_or(0);
                    if self.record.len() != self.header.len() {
                        let err = ExplorerError::RowShape {
                            line,
                            expected: self.header.len(),
                            found: self.record.len(),
                        };
                        warn!("skipping row: {err}");
                        self.skipped.push(RowIssue::new(line, &err));
                        continue;
                    }
                    return Some(Row {
                        line,
                        fields: self.record.iter().map(|value| value.to_string()).collect(),
                    });
                }
                Err(err) => {
                    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
                    // Only a bad UTF-8 row leaves the reader usable.
                    if !matches!(err.kind(), csv::ErrorKind::Utf8 { .. }) {
                        warn!(line, "decoding stopped: {err}");
                        self.failure = Some(format!("line {line}: {err}"));
                        return None;
                    }
                    warn!(line, "skipping undecodable row: {err}");
                    self.skipped.push(RowIssue {
                        line,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped: Vec<RowIssue>,
}

/// Writes a header and rows as delimited text.
pub fn encode(
    header: &[String],
    rows: &[Vec<String>],
    delimiter: Delimiter,
) -> Result<String, ExplorerError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|err| ExplorerError::ResultsParse(err.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|err| ExplorerError::ResultsParse(err.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExplorerError::ResultsParse(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ExplorerError::ResultsParse(err.to_string()))
}

/// `application/sparql-results+json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: ResultsHead,
    #[serde(default)]
    pub results: Option<ResultSet>,
    #[serde(default)]
    pub boolean: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<IndexMap<String, Binding>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Binding {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Decimal(value) => write!(f, "{value}"),
            FieldValue::Text(value) => write!(f, "{value}"),
        }
    }
}

impl Binding {
    /// Applies the datatype policy: integers truncate toward zero, decimals
    /// become floats, everything else keeps its lexical form.
    pub fn flatten(&self) -> FieldValue {
        let local = self
            .datatype
            .as_deref()
            .and_then(|datatype| datatype.strip_prefix(XSD));
        let lexical = self.value.trim();
        match local {
            Some(name) if INTEGER_TYPES.contains(&name) => {
                if let Ok(value) = lexical.parse::<i64>() {
                    return FieldValue::Integer(value);
                }
                match lexical.parse::<f64>() {
                    Ok(value) if value.is_finite() => FieldValue::Integer(value.trunc() as i64),
                    _ => FieldValue::Text(self.value.clone()),
                }
            }
            Some(name) if DECIMAL_TYPES.contains(&name) => match lexical.parse::<f64>() {
                Ok(value) => FieldValue::Decimal(value),
                Err(_) => FieldValue::Text(self.value.clone()),
            },
            _ => FieldValue::Text(self.value.clone()),
        }
    }
}

impl SparqlResults {
    /// Flattens every binding in `vars` order; unbound variables are empty.
    pub fn to_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        if let Some(boolean) = self.boolean {
            return (vec!["boolean".to_string()], vec![vec![boolean.to_string()]]);
        }
        let header = self.head.vars.clone();
        let rows = self
            .results
            .as_ref()
            .map(|set| {
                set.bindings
                    .iter()
                    .map(|binding| {
                        header
                            .iter()
                            .map(|var| {
                                binding
                                    .get(var)
                                    .map(|value| value.flatten().to_string())
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();
        (header, rows)
    }

    pub fn to_delimited(&self, delimiter: Delimiter) -> Result<String, ExplorerError> {
        let (header, rows) = self.to_rows();
        encode(&header, &rows, delimiter)
    }
}

/// Reads a single count out of a count query response.
pub fn parse_count(body: &str) -> Result<u64, ExplorerError> {
    let mut rows = TabularDecoder::new(Delimiter::Comma).decode_response(body)?;
    let row = rows.next().ok_or(ExplorerError::MissingCount)?;
    let value = row.field(0).trim();
    value
        .parse::<u64>()
        .or_else(|_| {
            value
                .parse::<f64>()
                .ok()
                .filter(|count| count.is_finite() && *count >= 0.0)
                .map(|count| count.trunc() as u64)
                .ok_or(())
        })
        .map_err(|_| ExplorerError::MissingCount)
}
