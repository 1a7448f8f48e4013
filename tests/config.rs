use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use idp_registry_explorer::config::ConfigLoader;
use idp_registry_explorer::domain::Endpoint;
use idp_registry_explorer::error::ExplorerError;

#[test]
fn resolve_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idp-explorer.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "endpoint": "virtuoso",
            "items_per_page": 50,
            "timeout_secs": 5,
            "endpoints": { "graphdb": "http://localhost:7200/repositories/idp" }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.endpoint, Endpoint::Virtuoso);
    assert_eq!(resolved.items_per_page, 50);
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(
        resolved.endpoints.get(Endpoint::GraphDb).base_url,
        "http://localhost:7200/repositories/idp"
    );
    assert_eq!(
        resolved.endpoints.get(Endpoint::Virtuoso).base_url,
        "https://registry.idpcentral.org/virtuoso/sparql"
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(ExplorerError::ConfigRead(_))
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idp-explorer.json");
    fs::write(&path, r#"{"endpoint": "blazegraph"}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(ExplorerError::ConfigParse(_))
    );
}
