use assert_matches::assert_matches;

use idp_registry_explorer::domain::Delimiter;
use idp_registry_explorer::error::ExplorerError;
use idp_registry_explorer::tabular::{ResponseFormat, TabularDecoder, parse_count};

const COUNT_JSON: &str = include_str!("fixtures/count.json");

#[test]
fn detects_structured_results() {
    assert_eq!(ResponseFormat::detect(COUNT_JSON), ResponseFormat::SparqlJson);
    assert_eq!(ResponseFormat::detect("count\n1\n"), ResponseFormat::Delimited);
    assert_eq!(parse_count(COUNT_JSON).unwrap(), 1523);
}

#[test]
fn ask_result_becomes_single_cell() {
    let table = TabularDecoder::new(Delimiter::Comma)
        .table(r#"{"head": {}, "boolean": true}"#)
        .unwrap();
    assert_eq!(table.header, vec!["boolean"]);
    assert_eq!(table.rows, vec![vec!["true"]]);
}

#[test]
fn broken_json_is_a_results_error() {
    assert_matches!(
        TabularDecoder::new(Delimiter::Comma).table("{\"head\": "),
        Err(ExplorerError::ResultsParse(_))
    );
}

#[test]
fn tab_rows_keep_commas() {
    let table = TabularDecoder::new(Delimiter::Tab)
        .table("name\tcode\nlipid binding, membrane\tGO:0008289\n\n")
        .unwrap();
    assert_eq!(table.rows, vec![vec!["lipid binding, membrane", "GO:0008289"]]);
    assert!(table.skipped.is_empty());
}

#[test]
fn decoding_continues_after_bad_rows() {
    let mut rows = TabularDecoder::new(Delimiter::Comma)
        .decode("a,b,c\n1,2,3\n4,5\n6,7,8,9\n10,11,12\n")
        .unwrap();
    let lines = rows.by_ref().map(|row| row.line).collect::<Vec<_>>();
    assert_eq!(lines, vec![2, 5]);
    let skipped = rows.finish().unwrap();
    assert_eq!(
        skipped.iter().map(|issue| issue.line).collect::<Vec<_>>(),
        vec![3, 4]
    );
}
