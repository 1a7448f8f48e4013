use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::domain::{SourceName, last_segment};

static ONTOLOGY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(GO|IDPO):(\S+)$").expect("valid ontology code pattern"));

/// One UniProt entry with everything the registry knows about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Protein {
    pub uniprot_uri: String,
    pub organism_name: String,
    pub name: String,
    pub taxonomy_uri: String,
    #[serde(serialize_with = "serialize_sources")]
    sources: IndexMap<String, ExternalSource>,
}

impl Protein {
    pub fn new(
        uniprot_uri: impl Into<String>,
        organism_name: impl Into<String>,
        name: impl Into<String>,
        taxonomy_uri: impl Into<String>,
    ) -> Self {
        Self {
            uniprot_uri: uniprot_uri.into(),
            organism_name: organism_name.into(),
            name: name.into(),
            taxonomy_uri: taxonomy_uri.into(),
            sources: IndexMap::new(),
        }
    }

    pub fn accession(&self) -> &str {
        last_segment(&self.uniprot_uri)
    }

    pub fn taxonomy_number(&self) -> &str {
        last_segment(&self.taxonomy_uri)
    }

    pub fn is_isoform(&self) -> bool {
        self.accession().contains('-')
    }

    pub fn sources(&self) -> impl Iterator<Item = &ExternalSource> {
        self.sources.values()
    }

    pub fn source(&self, source_id: &str) -> Option<&ExternalSource> {
        self.sources.get(source_id)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Existing source for `source_id`, or a new one appended after the others.
    pub fn source_or_insert(&mut self, name: &str, source_id: &str) -> &mut ExternalSource {
        self.sources
            .entry(source_id.to_string())
            .or_insert_with(|| ExternalSource::new(name, source_id))
    }
}

fn serialize_sources<S: Serializer>(
    sources: &IndexMap<String, ExternalSource>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(sources.values())
}

/// A protein as recorded by one upstream dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalSource {
    pub name: String,
    pub source_id: String,
    ranges: Vec<AnnotationRange>,
}

impl ExternalSource {
    pub fn new(name: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_id: source_id.into(),
            ranges: Vec::new(),
        }
    }

    pub fn kind(&self) -> Option<SourceName> {
        SourceName::from_label(&self.name)
    }

    /// Entry page in the upstream dataset; empty for unknown datasets.
    pub fn url(&self) -> String {
        self.kind()
            .map(|kind| kind.entry_url(&self.source_id))
            .unwrap_or_default()
    }

    /// Ranges ordered by `(start, end)`.
    pub fn ranges(&self) -> &[AnnotationRange] {
        &self.ranges
    }

    /// Range for `(start, end)`, inserted at its sorted position if new.
    pub fn range_or_insert(&mut self, start: i64, end: i64) -> &mut AnnotationRange {
        let index = match self
            .ranges
            .binary_search_by(|range| range.key().cmp(&(start, end)))
        {
            Ok(index) => index,
            Err(index) => {
                self.ranges.insert(index, AnnotationRange::new(start, end));
                index
            }
        };
        &mut self.ranges[index]
    }
}

/// Residue interval, bounds kept as the upstream dataset numbers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRange {
    pub start: i64,
    pub end: i64,
    pub terms: Vec<Term>,
}

impl AnnotationRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            terms: Vec::new(),
        }
    }

    pub fn key(&self) -> (i64, i64) {
        (self.start, self.end)
    }

    pub fn push_term(&mut self, term: Term) {
        self.terms.push(term);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub name: String,
    pub code: String,
}

impl Term {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Ontology IRI for GO and IDPO codes, empty otherwise.
    pub fn uri(&self) -> String {
        let Some(captures) = ONTOLOGY_CODE.captures(self.code.trim()) else {
            return String::new();
        };
        let local = &captures[2];
        match &captures[1] {
            "GO" => format!("http://purl.obolibrary.org/obo/GO_{local}"),
            "IDPO" => format!("https://disprot.org/idpo/IDPO:{local}"),
            _ => String::new(),
        }
    }
}

impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Term", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("uri", &self.uri())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_uris() {
        assert_eq!(
            Term::new("protein binding", "GO:0005515").uri(),
            "http://purl.obolibrary.org/obo/GO_0005515"
        );
        assert_eq!(
            Term::new("disorder", "IDPO:00076").uri(),
            "https://disprot.org/idpo/IDPO:00076"
        );
        assert_eq!(Term::new("x", "XYZ:1").uri(), "");
        assert_eq!(Term::new("x", "").uri(), "");
    }

    #[test]
    fn ranges_stay_sorted_and_unique() {
        let mut source = ExternalSource::new("DisProt", "DP00003");
        source.range_or_insert(50, 80).push_term(Term::new("a", ""));
        source.range_or_insert(1, 30).push_term(Term::new("b", ""));
        source.range_or_insert(1, 20).push_term(Term::new("c", ""));
        source.range_or_insert(50, 80).push_term(Term::new("d", ""));

        let keys = source.ranges().iter().map(|r| r.key()).collect::<Vec<_>>();
        assert_eq!(keys, vec![(1, 20), (1, 30), (50, 80)]);
        assert_eq!(source.ranges()[2].terms.len(), 2);
    }

    #[test]
    fn derived_identifiers() {
        let protein = Protein::new(
            "http://purl.uniprot.org/uniprot/P04637-2",
            "Homo sapiens",
            "Cellular tumor antigen p53",
            "http://purl.uniprot.org/taxonomy/9606",
        );
        assert_eq!(protein.accession(), "P04637-2");
        assert_eq!(protein.taxonomy_number(), "9606");
        assert!(protein.is_isoform());
    }

    #[test]
    fn unknown_source_has_no_url() {
        assert_eq!(ExternalSource::new("Elsewhere", "X1").url(), "");
        assert_eq!(
            ExternalSource::new("MobiDB", "P04637").url(),
            "https://mobidb.org/P04637"
        );
    }
}
