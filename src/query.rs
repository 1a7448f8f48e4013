//! SPARQL text for the registry listing.

use serde::Serialize;

/// Query offered in the console before the user writes their own.
pub const EXAMPLE_QUERY: &str = r#"PREFIX schema: <https://schema.org/>

SELECT ?graph (COUNT(DISTINCT ?s) AS ?Proteins)
WHERE {
    GRAPH ?graph {
        ?s a schema:Protein
    }
}
GROUP BY ?graph"#;

const IDENTIFIER: &str = r#"REPLACE(STR(?sequenceID), "^.*/", "")"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// Window for a 1-based page.
    pub fn for_page(page: usize, items_per_page: usize) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(items_per_page),
            limit: items_per_page,
        }
    }
}

/// Substring filter on the UniProt accession.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter(String);

impl SearchFilter {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// FILTER clauses over `?sequenceID`.
    pub fn clause(&self) -> String {
        let mut clause = format!(r#"FILTER(!CONTAINS({IDENTIFIER}, "-"))"#);
        if !self.is_empty() {
            clause.push_str(&format!(
                "\n    FILTER(CONTAINS({IDENTIFIER}, \"{}\"))",
                escape_literal(&self.0)
            ));
        }
        clause
    }
}

fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn count_query(filter: &SearchFilter) -> String {
    format!(
        r#"PREFIX schema: <https://schema.org/>

SELECT (COUNT(DISTINCT ?sequenceID) AS ?Proteins)
WHERE {{
    GRAPH ?g {{
        ?s a schema:Protein ;
           schema:sameAs ?sequenceID .
    }}
    {clause}
}}"#,
        clause = filter.clause()
    )
}

pub fn registry_query(window: Window, filter: &SearchFilter) -> String {
    format!(
        r#"PREFIX schema: <https://schema.org/>
PREFIX idp: <https://idpcentral.org/registry/>
PREFIX dc: <http://purl.org/dc/terms/>
PREFIX up: <http://purl.uniprot.org/core/>

SELECT DISTINCT ?sequenceID ?organismName ?taxonomy ?name ?source ?sourceID ?start ?end ?annotationName ?annotationCode
WHERE {{
    {{
        GRAPH idp:disprot {{
            ?protein schema:sameAs ?sequenceID ;
                schema:hasSequenceAnnotation ?annotationID ;
                schema:name ?name ;
                schema:identifier ?identifier ;
                dc:title ?source .
        }}
    }} UNION {{
        GRAPH idp:mobidb {{
            ?protein schema:sameAs ?sequenceID ;
                schema:hasSequenceAnnotation ?annotationID ;
                schema:name ?name ;
                schema:identifier ?identifier ;
                dc:title ?source .
        }}
    }} UNION {{
        GRAPH idp:ped {{
            ?collection a schema:CollectionPage ;
                dc:title ?source ;
                schema:mainEntity ?e ;
                schema:identifier ?identifier .
            ?e schema:itemListElement ?protein .
            ?protein schema:sameAs ?sequenceID ;
                schema:name ?name ;
                schema:hasSequenceAnnotation ?annotationID .
        }}
    }}
    BIND(REPLACE(?identifier, "(^.+:)", "") AS ?sourceID)

    ?annotationID schema:sequenceLocation ?sequenceLocation ;
        schema:additionalProperty/schema:value ?annotation .
    ?sequenceLocation schema:rangeStart ?start ;
        schema:rangeEnd ?end .
    ?annotation schema:name ?annotationName ;
        schema:termCode ?annotationCode .

    {{
        SELECT DISTINCT ?sequenceID ?organismName ?taxonomy
        WHERE {{
            {{
                SELECT DISTINCT ?sequenceID
                WHERE {{
                    ?protein a schema:Protein ;
                        schema:sameAs ?sequenceID .
                    {clause}
                }}
                ORDER BY ?sequenceID
                OFFSET {offset}
                LIMIT {limit}
            }}

            SERVICE <https://sparql.uniprot.org/sparql> {{
                ?sequenceID a up:Protein ;
                    up:organism ?taxonomy .
                ?taxonomy up:scientificName ?organismName .
            }}
        }}
    }}
}}"#,
        clause = filter.clause(),
        offset = window.offset,
        limit = window.limit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_for_page() {
        assert_eq!(Window::for_page(1, 5), Window { offset: 0, limit: 5 });
        assert_eq!(Window::for_page(3, 20), Window { offset: 40, limit: 20 });
    }

    #[test]
    fn registry_query_is_windowed() {
        let query = registry_query(Window::for_page(2, 10), &SearchFilter::default());
        assert!(query.contains("OFFSET 10"));
        assert!(query.contains("LIMIT 10"));
        assert!(query.contains(r#"FILTER(!CONTAINS(REPLACE(STR(?sequenceID), "^.*/", ""), "-"))"#));
        assert!(!query.contains("FILTER(CONTAINS("));
    }

    #[test]
    fn filter_text_is_escaped() {
        let filter = SearchFilter::new(r#"P0"))} DROP ALL #"#);
        let clause = filter.clause();
        assert!(clause.contains(r#""P0\"))} DROP ALL #""#));
        assert!(count_query(&filter).contains(&clause));
    }

    #[test]
    fn window_offset_saturates_on_huge_pages() {
        let window = Window::for_page(usize::MAX, 50);
        assert_eq!(window.offset, usize::MAX);
        assert_eq!(window.limit, 50);
    }
}
