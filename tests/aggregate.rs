use assert_matches::assert_matches;

use idp_registry_explorer::aggregate::{ProteinAggregator, aggregate_response};
use idp_registry_explorer::domain::Delimiter;
use idp_registry_explorer::error::ExplorerError;
use idp_registry_explorer::tabular::{Row, TabularDecoder};

const REGISTRY_PAGE: &str = include_str!("fixtures/registry_page.csv");

#[test]
fn fixture_page_builds_protein_tree() {
    let aggregation = aggregate_response(REGISTRY_PAGE, Delimiter::Comma).unwrap();
    let accessions = aggregation
        .proteins
        .iter()
        .map(|protein| protein.accession())
        .collect::<Vec<_>>();
    assert_eq!(accessions, vec!["P37840", "P04637"]);

    let synuclein = &aggregation.proteins[0];
    assert_eq!(synuclein.taxonomy_number(), "9606");
    assert_eq!(synuclein.source_count(), 2);

    let disprot = synuclein.source("DP00070").unwrap();
    assert_eq!(disprot.url(), "https://disprot.org/DP00070");
    let keys = disprot
        .ranges()
        .iter()
        .map(|range| range.key())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![(1, 140), (61, 95), (96, 140)]);
    assert_eq!(disprot.ranges()[0].terms.len(), 2);
    assert_eq!(disprot.ranges()[1].terms[0].name, "lipid binding, membrane");
    assert_eq!(
        disprot.ranges()[1].terms[0].uri(),
        "http://purl.obolibrary.org/obo/GO_0008289"
    );

    let mobidb = synuclein.source("P37840").unwrap();
    assert_eq!(mobidb.url(), "https://mobidb.org/P37840");
}

#[test]
fn first_row_wins_for_protein_attributes() {
    let aggregation = aggregate_response(REGISTRY_PAGE, Delimiter::Comma).unwrap();
    let synuclein = &aggregation.proteins[0];
    assert_eq!(synuclein.organism_name, "Homo sapiens");
    assert_eq!(synuclein.name, "Alpha-synuclein");
}

#[test]
fn malformed_rows_are_reported_in_line_order() {
    let aggregation = aggregate_response(REGISTRY_PAGE, Delimiter::Comma).unwrap();
    let lines = aggregation
        .skipped
        .iter()
        .map(|issue| issue.line)
        .collect::<Vec<_>>();
    assert_eq!(lines, vec![8, 9]);

    let p53 = &aggregation.proteins[1];
    let ped = p53.source("PED00024").unwrap();
    assert_eq!(ped.url(), "https://proteinensemble.org/PED00024");
    assert_eq!(ped.ranges().len(), 1);
    assert_eq!(ped.ranges()[0].terms.len(), 1);
}

#[test]
fn invalid_bound_leaves_tree_untouched() {
    let mut aggregator = ProteinAggregator::new();
    let row = Row {
        line: 2,
        fields: vec![
            "http://purl.uniprot.org/uniprot/Q9XYZ1",
            "Mus musculus",
            "http://purl.uniprot.org/taxonomy/10090",
            "Example",
            "DisProt",
            "DP99999",
            "1",
            "ten",
            "disorder",
            "IDPO:00076",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    };
    assert_matches!(
        aggregator.push(&row),
        Err(ExplorerError::InvalidRange { line: 2, field: "end", .. })
    );
    assert!(aggregator.finish().proteins.is_empty());
}

#[test]
fn tab_separated_page_with_wrong_header_fails() {
    let body = "sequenceID\tname\nhttp://purl.uniprot.org/uniprot/P1\tx\n";
    assert_matches!(
        aggregate_response(body, Delimiter::Tab),
        Err(ExplorerError::HeaderMismatch { expected: 10, found: 2 })
    );
}

#[test]
fn same_rows_fold_the_same_through_extend() {
    let rows = TabularDecoder::new(Delimiter::Comma)
        .decode(REGISTRY_PAGE)
        .unwrap();
    let mut aggregator = ProteinAggregator::new();
    aggregator.extend(rows);
    let aggregation = aggregator.finish();
    assert_eq!(aggregation.proteins.len(), 2);
    // the short row never reaches the aggregator when decoding separately
    assert_eq!(aggregation.skipped.len(), 1);
    assert_eq!(aggregation.skipped[0].line, 9);
}
