// SPDX-License-Identifier: GPL-3.0-only
//! Validation of the service's loosely-shaped JSON into catalog records.
//!
//! Individual entries that lack a required field are dropped with a warning;
//! only a wrong top-level shape is reported as an error.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::models::{CatalogError, Category, Resource, ResourceParseError};
use crate::utils::resolve_download_url;

/// Keys that may carry a category's name, in order of preference
const NAME_KEYS: [&str; 3] = ["title", "name", "display_name"];

#[derive(Deserialize)]
struct LatestBenchmark {
    #[serde(default)]
    tech_path: Option<String>,
    #[serde(default)]
    resource_list: Vec<Value>,
}

/// Parse the technology listing.
///
/// Accepts a flat array of category objects, or a mapping of group name to
/// such arrays.
pub fn parse_categories(value: Value) -> Result<Vec<Category>, CatalogError> {
    match value {
        Value::Array(entries) => Ok(collect_categories(&entries, None)),
        Value::Object(groups) => {
            let mut categories = Vec::new();
            for (group, entries) in &groups {
                let Value::Array(entries) = entries else {
                    return Err(CatalogError::Shape(format!(
                        "group '{}' holds {} instead of an array",
                        group,
                        kind(entries)
                    )));
                };
                categories.extend(collect_categories(entries, Some(group.as_str())));
            }
            Ok(categories)
        }
        other => Err(CatalogError::Shape(format!("expected an array, got {}", kind(&other)))),
    }
}

fn collect_categories(entries: &[Value], group: Option<&str>) -> Vec<Category> {
    entries
        .iter()
        .filter_map(|entry| {
            let category = parse_category(entry, group);
            if category.is_none() {
                warn!(entry = %entry, "Dropping technology entry without id or name");
            }
            category
        })
        .collect()
}

fn parse_category(entry: &Value, group: Option<&str>) -> Option<Category> {
    let obj = entry.as_object()?;
    let id = obj.get("id").and_then(as_id)?;
    let display_name = NAME_KEYS
        .iter()
        .find_map(|key| non_empty_str(obj, key))?;

    Some(Category {
        id,
        display_name: display_name.to_string(),
        group: group.map(str::to_string),
    })
}

/// Parse one category's `latest benchmarks` response.
///
/// The documented shape is a mapping of benchmark id to
/// `{tech_path, resource_list}`. The older array-of-benchmarks shape, where
/// each benchmark lists `documents` with a relative `pardot-id` location, is
/// also understood. `null`, `{}` and `[]` all mean "nothing published".
pub fn parse_latest_resources(
    category: &Category,
    value: Value,
    resource_base: &Url,
) -> Result<Vec<Resource>, ResourceParseError> {
    let shape_error = |reason: String| ResourceParseError::Shape {
        category_id: category.id,
        reason,
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let benchmarks: BTreeMap<String, LatestBenchmark> =
                serde_json::from_value(Value::Object(map)).map_err(|e| shape_error(e.to_string()))?;

            let mut resources = Vec::new();
            for (benchmark_id, benchmark) in benchmarks {
                debug!(
                    category_id = category.id,
                    benchmark_id = %benchmark_id,
                    tech_path = ?benchmark.tech_path,
                    entries = benchmark.resource_list.len(),
                    "Latest benchmark listed"
                );
                resources.extend(benchmark.resource_list.iter().filter_map(|entry| {
                    let obj = entry.as_object()?;
                    build_resource(
                        category,
                        non_empty_str(obj, "resource_filename"),
                        non_empty_str(obj, "resource_pdf_url"),
                        obj.get("resource_id").or_else(|| obj.get("id")),
                        resource_base,
                    )
                }));
            }
            Ok(resources)
        }
        Value::Array(benchmarks) => {
            let mut resources = Vec::new();
            for benchmark in &benchmarks {
                let Some(documents) = benchmark.get("documents").and_then(Value::as_array) else {
                    return Err(shape_error(format!(
                        "benchmark entry without a documents array: {}",
                        benchmark
                    )));
                };
                resources.extend(documents.iter().filter_map(|doc| {
                    let obj = doc.as_object()?;
                    build_resource(
                        category,
                        non_empty_str(obj, "filename"),
                        non_empty_str(obj, "pardot-id").or_else(|| non_empty_str(obj, "url")),
                        obj.get("id"),
                        resource_base,
                    )
                }));
            }
            Ok(resources)
        }
        other => Err(shape_error(format!("expected an object, got {}", kind(&other)))),
    }
}

fn build_resource(
    category: &Category,
    filename: Option<&str>,
    location: Option<&str>,
    document_id: Option<&Value>,
    resource_base: &Url,
) -> Option<Resource> {
    let Some(filename) = filename else {
        warn!(category = %category.display_name, "Dropping resource without a filename");
        return None;
    };

    let Some(source_url) = location.and_then(|raw| resolve_download_url(raw, resource_base)) else {
        warn!(
            category = %category.display_name,
            filename = %filename,
            location = ?location,
            "Dropping resource without a usable download URL"
        );
        return None;
    };

    Some(Resource {
        category_id: category.id,
        filename: filename.to_string(),
        source_url: source_url.to_string(),
        document_id: document_id.and_then(as_document_id),
    })
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn as_id(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_document_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://learn.cisecurity.org").unwrap()
    }

    fn safari() -> Category {
        Category {
            id: 7618,
            display_name: "CIS macOS Safari Benchmark".to_string(),
            group: None,
        }
    }

    #[test]
    fn test_parse_categories_flat_array() {
        let value = json!([
            {"id": 7618, "title": "CIS macOS Safari Benchmark"},
            {"id": "12", "name": "Ubuntu Linux"},
        ]);

        let categories = parse_categories(value).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0], safari());
        assert_eq!(categories[1].id, 12);
        assert_eq!(categories[1].display_name, "Ubuntu Linux");
    }

    #[test]
    fn test_parse_categories_drops_incomplete_entries() {
        let value = json!([
            {"id": 1, "title": "Kept"},
            {"title": "No id"},
            {"id": 3},
            {"id": 4, "title": "   "},
            {"id": "not-a-number", "title": "Bad id"},
            "just a string",
        ]);

        let categories = parse_categories(value).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].display_name, "Kept");
    }

    #[test]
    fn test_parse_categories_grouped_mapping() {
        let value = json!({
            "Desktop Software": [{"id": 7618, "title": "CIS macOS Safari Benchmark"}],
            "Operating Systems": [{"id": 1, "title": "Debian Linux"}, {"id": 2}],
        });

        let categories = parse_categories(value).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].group.as_deref(), Some("Desktop Software"));
        assert_eq!(categories[1].group.as_deref(), Some("Operating Systems"));
        assert_eq!(categories[1].display_name, "Debian Linux");
    }

    #[test]
    fn test_parse_categories_rejects_wrong_shape() {
        assert!(matches!(parse_categories(json!("maintenance")), Err(CatalogError::Shape(_))));
        assert!(matches!(parse_categories(json!(null)), Err(CatalogError::Shape(_))));
        assert!(matches!(
            parse_categories(json!({"message": "rate limited"})),
            Err(CatalogError::Shape(_))
        ));
    }

    #[test]
    fn test_parse_latest_mapping_flattens_all_benchmarks() {
        let value = json!({
            "b2": {
                "tech_path": "Desktop Software/Safari",
                "resource_list": [
                    {"resource_filename": "b.pdf", "resource_pdf_url": "https://cdn.example.com/b.pdf"}
                ]
            },
            "b1": {
                "tech_path": "Desktop Software/Safari",
                "resource_list": [
                    {
                        "resource_id": 99,
                        "resource_filename": "CIS_macOS_Safari_Benchmark_v2.0.0.pdf",
                        "resource_pdf_url": "/e/799059/download"
                    },
                    {"resource_filename": "missing-url.pdf"}
                ]
            }
        });

        let resources = parse_latest_resources(&safari(), value, &base()).unwrap();
        assert_eq!(resources.len(), 2);

        // Benchmark ids are visited in sorted order
        assert_eq!(resources[0].filename, "CIS_macOS_Safari_Benchmark_v2.0.0.pdf");
        assert_eq!(resources[0].source_url, "https://learn.cisecurity.org/e/799059/download");
        assert_eq!(resources[0].document_id.as_deref(), Some("99"));
        assert_eq!(resources[0].category_id, 7618);
        assert_eq!(resources[1].filename, "b.pdf");
        assert_eq!(resources[1].document_id, None);
    }

    #[test]
    fn test_parse_latest_empty_resource_lists() {
        let value = json!({
            "b1": {"tech_path": "x", "resource_list": []},
            "b2": {"tech_path": "x"},
        });
        assert!(parse_latest_resources(&safari(), value, &base()).unwrap().is_empty());
        assert!(parse_latest_resources(&safari(), json!({}), &base()).unwrap().is_empty());
        assert!(parse_latest_resources(&safari(), json!([]), &base()).unwrap().is_empty());
        assert!(parse_latest_resources(&safari(), json!(null), &base()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_latest_documents_array() {
        let value = json!([
            {"documents": [
                {"id": 4242, "pardot-id": "/e/799059/safari-v2", "filename": "Safari.pdf"}
            ]}
        ]);

        let resources = parse_latest_resources(&safari(), value, &base()).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].source_url, "https://learn.cisecurity.org/e/799059/safari-v2");
        assert_eq!(resources[0].document_id.as_deref(), Some("4242"));
    }

    #[test]
    fn test_parse_latest_malformed() {
        let err = parse_latest_resources(&safari(), json!({"b1": {"resource_list": "nope"}}), &base())
            .unwrap_err();
        assert!(matches!(err, ResourceParseError::Shape { category_id: 7618, .. }));

        assert!(parse_latest_resources(&safari(), json!([{"title": "x"}]), &base()).is_err());
        assert!(parse_latest_resources(&safari(), json!(42), &base()).is_err());
    }
}
