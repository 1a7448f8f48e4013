//! Folding of registry rows into the protein tree.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::domain::Delimiter;
use crate::error::ExplorerError;
use crate::protein::{Protein, Term};
use crate::tabular::{Row, RowIssue, TabularDecoder};

/// Column layout of the registry listing query.
pub const COLUMNS: [&str; 10] = [
    "sequenceID",
    "organismName",
    "taxonomy",
    "name",
    "source",
    "sourceID",
    "start",
    "end",
    "annotationName",
    "annotationCode",
];

const UNIPROT_URI: usize = 0;
const ORGANISM_NAME: usize = 1;
const TAXONOMY_URI: usize = 2;
const NAME: usize = 3;
const SOURCE_NAME: usize = 4;
const SOURCE_ID: usize = 5;
const START: usize = 6;
const END: usize = 7;
const ANNOTATION_NAME: usize = 8;
const ANNOTATION_CODE: usize = 9;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub proteins: Vec<Protein>,
    pub skipped: Vec<RowIssue>,
}

#[derive(Debug, Default)]
pub struct ProteinAggregator {
    proteins: IndexMap<String, Protein>,
    skipped: Vec<RowIssue>,
}

impl ProteinAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one row into the tree. A rejected row leaves the tree untouched.
    pub fn push(&mut self, row: &Row) -> Result<(), ExplorerError> {
        if row.fields.len() != COLUMNS.len() {
            return Err(ExplorerError::RowShape {
                line: row.line,
                expected: COLUMNS.len(),
                found: row.fields.len(),
            });
        }
        let start = parse_bound(row, START, "start")?;
        let end = parse_bound(row, END, "end")?;

        let protein = self
            .proteins
            .entry(row.field(UNIPROT_URI).to_string())
            .or_insert_with(|| {
                Protein::new(
                    row.field(UNIPROT_URI),
                    row.field(ORGANISM_NAME),
                    row.field(NAME),
                    row.field(TAXONOMY_URI),
                )
            });
        protein
            .source_or_insert(row.field(SOURCE_NAME), row.field(SOURCE_ID))
            .range_or_insert(start, end)
            .push_term(Term::new(
                row.field(ANNOTATION_NAME),
                row.field(ANNOTATION_CODE),
            ));
        Ok(())
    }

    /// Folds every row, recording the ones that had to be skipped.
    pub fn extend<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        for row in rows {
            if let Err(err) = self.push(&row) {
                warn!("skipping row: {err}");
                self.skipped.push(RowIssue::new(row.line, &err));
            }
        }
    }

    pub fn record_skipped(&mut self, issues: impl IntoIterator<Item = RowIssue>) {
        self.skipped.extend(issues);
    }

    pub fn finish(self) -> Aggregation {
        let mut skipped = self.skipped;
        skipped.sort_by_key(|issue| issue.line);
        Aggregation {
            proteins: self.proteins.into_values().collect(),
            skipped,
        }
    }
}

/// Decodes a listing response and builds its protein tree.
pub fn aggregate_response(body: &str, delimiter: Delimiter) -> Result<Aggregation, ExplorerError> {
    let mut rows = TabularDecoder::new(delimiter)
        .expect_columns(COLUMNS.len())
        .decode_response(body)?;
    let mut aggregator = ProteinAggregator::new();
    aggregator.extend(rows.by_ref());
    aggregator.record_skipped(rows.finish()?);
    Ok(aggregator.finish())
}

fn parse_bound(row: &Row, index: usize, field: &'static str) -> Result<i64, ExplorerError> {
    let value = row.field(index);
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ExplorerError::InvalidRange {
            line: row.line,
            field,
            value: value.to_string(),
        })
}
