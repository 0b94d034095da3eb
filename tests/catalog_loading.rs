//! Tests for loading the tracker catalog and consent word list from disk.

use consent_crawl::TrackerCatalog;
use tempfile::tempdir;

const SERVICES_FIXTURE: &str = r#"{
    "license": "test",
    "categories": {
        "Advertising": [
            {
                "AdCo": {
                    "http://adco.example/": ["adco.example", "ads.example"]
                }
            }
        ],
        "Analytics": [
            {
                "MetricsInc": {
                    "http://metrics.example/": ["metrics.example", ["deep.example"]]
                }
            },
            {
                "AdCo Analytics": {
                    "http://adco.example/analytics": ["adco.example"]
                }
            }
        ]
    }
}"#;

#[test]
fn catalog_loads_nested_definition_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("services.json");
    std::fs::write(&path, SERVICES_FIXTURE).unwrap();

    let catalog = TrackerCatalog::load(&path).unwrap();
    assert!(catalog.is_tracker_domain("adco.example"));
    assert!(catalog.is_tracker_domain("ads.example"));
    assert!(catalog.is_tracker_domain("metrics.example"));
    // Strings inside nested arrays are collected too.
    assert!(catalog.is_tracker_domain("deep.example"));
    assert!(!catalog.is_tracker_domain("example.com"));
}

#[test]
fn first_definition_wins_for_shared_domains() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("services.json");
    std::fs::write(&path, SERVICES_FIXTURE).unwrap();

    let catalog = TrackerCatalog::load(&path).unwrap();
    // adco.example is listed under two entities; attribution goes to the one
    // defined first in the file.
    assert_eq!(
        catalog.entity_for("adco.example"),
        Some("http://adco.example/")
    );
}

#[test]
fn missing_or_empty_catalog_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(TrackerCatalog::load(&dir.path().join("nope.json")).is_err());

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, r#"{"categories": {}}"#).unwrap();
    assert!(TrackerCatalog::load(&empty).is_err());
}
