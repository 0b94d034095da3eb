//! Tracker catalog loader.
//!
//! Turns a Disconnect-style `services.json` definition — categories mapping
//! to lists of entities, each entity mapping its URL to a list of associated
//! domains — into a flat catalog: entity list in definition order, a
//! flattened set of all tracker domains, and a precomputed domain-to-entity
//! attribution map.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;

use crate::error_handling::CatalogError;

/// One tracker entity with its accumulated domain list.
#[derive(Debug, Clone)]
pub struct TrackerEntity {
    pub name: String,
    pub domains: Vec<String>,
}

/// Read-only tracker catalog, derived once from the definition file and
/// shared across the lifetime of a crawl or analysis run.
#[derive(Debug, Default)]
pub struct TrackerCatalog {
    entities: Vec<TrackerEntity>,
    domain_set: HashSet<String>,
    /// Domain -> index into `entities`. First write wins: a domain listed
    /// under several entities is attributed to the entity whose definition
    /// appears first in the file.
    attribution: HashMap<String, usize>,
}

impl TrackerCatalog {
    /// Loads a catalog from a `services.json` file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_value(&value);
        if catalog.entities.is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }
        log::info!(
            "Loaded tracker catalog: {} entities, {} domains",
            catalog.entities.len(),
            catalog.domain_set.len()
        );
        Ok(catalog)
    }

    /// Builds a catalog from an already-parsed definition.
    ///
    /// Walks `categories` in definition order. Each entity entry is an
    /// object whose first key names the entity and maps to its domain list;
    /// non-list values (string flags in some catalog revisions) and
    /// malformed entries are skipped. An entity appearing under multiple
    /// categories accumulates domains from each occurrence.
    pub fn from_value(value: &Value) -> Self {
        let mut catalog = TrackerCatalog::default();
        let mut index_by_name: HashMap<String, usize> = HashMap::new();

        let Some(categories) = value.get("categories").and_then(Value::as_object) else {
            return catalog;
        };

        for entries in categories.values().filter_map(Value::as_array) {
            for entry in entries.iter().filter_map(Value::as_object) {
                // The entity entry nests once more: { display: { name: [domains] } }
                let Some(inner) = entry.values().next().and_then(Value::as_object) else {
                    continue;
                };
                let Some((name, domains_value)) = inner.iter().next() else {
                    continue;
                };

                let mut domains = Vec::new();
                flatten_domains(domains_value, &mut domains);
                catalog.add_entity(&mut index_by_name, name, domains);
            }
        }

        catalog
    }

    fn add_entity(
        &mut self,
        index_by_name: &mut HashMap<String, usize>,
        name: &str,
        domains: Vec<String>,
    ) {
        let index = match index_by_name.get(name) {
            Some(&index) => index,
            None => {
                let index = self.entities.len();
                index_by_name.insert(name.to_string(), index);
                self.entities.push(TrackerEntity {
                    name: name.to_string(),
                    domains: Vec::new(),
                });
                index
            }
        };
        for domain in domains {
            self.domain_set.insert(domain.clone());
            self.attribution.entry(domain.clone()).or_insert(index);
            self.entities[index].domains.push(domain);
        }
    }

    /// Whether the registrable domain is known tracker infrastructure.
    pub fn is_tracker_domain(&self, domain: &str) -> bool {
        self.domain_set.contains(domain)
    }

    /// The entity a tracker domain is attributed to, if it is known.
    pub fn entity_for(&self, domain: &str) -> Option<&str> {
        self.attribution
            .get(domain)
            .map(|&index| self.entities[index].name.as_str())
    }

    pub fn entities(&self) -> &[TrackerEntity] {
        &self.entities
    }

    pub fn domain_count(&self) -> usize {
        self.domain_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collects every string reachable from `value`, recursing through nested
/// arrays. Non-string leaves are ignored.
fn flatten_domains(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                flatten_domains(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catalog() -> TrackerCatalog {
        TrackerCatalog::from_value(&json!({
            "categories": {
                "Advertising": [
                    { "AdCo": { "http://adco.com/": ["adco.com", "adco-cdn.net"] } },
                    { "Shared": { "http://shared.example/": ["shared.example"] } }
                ],
                "Analytics": [
                    { "http://adco.com/": { "http://adco.com/": ["adco-metrics.com"] } },
                    { "MetricsInc": { "http://metricsinc.io/": ["shared.example", "metricsinc.io"] } }
                ]
            }
        }))
    }

    #[test]
    fn flattens_categories_into_entities() {
        let catalog = sample_catalog();
        assert!(catalog.is_tracker_domain("adco.com"));
        assert!(catalog.is_tracker_domain("metricsinc.io"));
        assert!(!catalog.is_tracker_domain("example.com"));
        assert_eq!(catalog.domain_count(), 5);
    }

    #[test]
    fn entity_under_multiple_categories_accumulates() {
        let catalog = TrackerCatalog::from_value(&json!({
            "categories": {
                "Advertising": [
                    { "AdCo": { "http://adco.com/": ["adco.com"] } }
                ],
                "Analytics": [
                    { "AdCo display": { "http://adco.com/": ["adco-metrics.com"] } }
                ]
            }
        }));
        let entity = catalog
            .entities()
            .iter()
            .find(|e| e.name == "http://adco.com/")
            .expect("entity present");
        assert_eq!(entity.domains, vec!["adco.com", "adco-metrics.com"]);
    }

    #[test]
    fn attribution_is_first_definition_wins() {
        let catalog = sample_catalog();
        // "shared.example" is listed under both Shared and MetricsInc; the
        // earlier definition owns it.
        assert_eq!(
            catalog.entity_for("shared.example"),
            Some("http://shared.example/")
        );
    }

    #[test]
    fn every_domain_traces_back_to_an_entity() {
        let catalog = sample_catalog();
        for entity in catalog.entities() {
            for domain in &entity.domains {
                assert!(catalog.is_tracker_domain(domain));
                assert!(catalog.entity_for(domain).is_some());
            }
        }
        // And the reverse: the flattened set holds nothing orphaned.
        assert_eq!(
            catalog.domain_count(),
            catalog
                .entities()
                .iter()
                .flat_map(|e| e.domains.iter())
                .collect::<std::collections::HashSet<_>>()
                .len()
        );
    }

    #[test]
    fn nested_arrays_and_string_flags_are_handled() {
        let catalog = TrackerCatalog::from_value(&json!({
            "categories": {
                "Content": [
                    { "Nested": { "http://nested.example/": [["a.com"], ["b.com", ["c.com"]]] } },
                    { "Flagged": { "http://flagged.example/": { "performance": "true" } } }
                ]
            }
        }));
        assert!(catalog.is_tracker_domain("a.com"));
        assert!(catalog.is_tracker_domain("c.com"));
        assert!(!catalog.is_tracker_domain("true"));
    }

    #[test]
    fn missing_categories_yields_empty_catalog() {
        let catalog = TrackerCatalog::from_value(&json!({ "license": "x" }));
        assert!(catalog.is_empty());
    }
}
