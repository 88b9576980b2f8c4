//! Searchset Bundle wire model and page translation.
//!
//! A remote search returns its results one Bundle at a time. Each Bundle may carry a `total`,
//! always identifies itself with a `self` link when well formed, and advertises the following
//! page only through a `next` link. This module turns that wire shape into a [`BundlePage`]
//! and back.
//!
//! Notes:
//! - Entries without a usable resource (no `resource`, `resourceType` or `id`) are skipped.
//!   No attempt is made to repair or validate clinical content.
//! - Unknown Bundle keys are ignored; servers routinely add `meta`, `id`, `timestamp` and so on.

use crate::record::Record;
use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// One page of search results.
#[derive(Clone, Debug, PartialEq)]
pub struct BundlePage {
    /// Total number of matches, present only on some pages.
    pub total: Option<u64>,

    /// Address of this page.
    pub self_link: Option<String>,

    /// Address of the following page, if any.
    pub next_link: Option<String>,

    /// Records carried by this page, in entry order.
    pub records: Vec<Record>,
}

// ============================================================================
// Public Bundle operations
// ============================================================================

/// Reads and writes FHIR searchset Bundles.
pub struct Bundle;

impl Bundle {
    /// Parse a searchset Bundle from JSON text.
    ///
    /// Uses `serde_path_to_error` to report the path (for example `link.0.url`) of the first
    /// field that does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the text is not JSON or does not match the Bundle wire schema,
    /// - resourceType is not "Bundle".
    pub fn parse_json(json_text: &str) -> FhirResult<BundlePage> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = match serde_path_to_error::deserialize::<_, BundleWire>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };
        wire_to_domain(wire)
    }

    /// Parse a searchset Bundle from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`Bundle::parse_json`].
    pub fn from_value(value: Value) -> FhirResult<BundlePage> {
        let wire: BundleWire = serde_json::from_value(value)
            .map_err(|e| FhirError::Translation(format!("Bundle schema mismatch: {e}")))?;
        wire_to_domain(wire)
    }

    /// Render a page back into a searchset Bundle JSON value.
    pub fn render(page: &BundlePage) -> Value {
        let wire = domain_to_wire(page);
        // BundleWire only holds strings, integers and JSON values, so this cannot fail.
        serde_json::to_value(&wire).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BundleWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    bundle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    total: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    link: Vec<BundleLinkWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entry: Vec<BundleEntryWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BundleLinkWire {
    relation: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BundleEntryWire {
    #[serde(rename = "fullUrl", default, skip_serializing_if = "Option::is_none")]
    full_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<Value>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

const RELATION_SELF: &str = "self";
const RELATION_NEXT: &str = "next";

fn link_for(links: &[BundleLinkWire], relation: &str) -> Option<String> {
    links
        .iter()
        .find(|l| l.relation == relation && !l.url.trim().is_empty())
        .map(|l| l.url.clone())
}

fn wire_to_domain(wire: BundleWire) -> FhirResult<BundlePage> {
    if wire.resource_type != "Bundle" {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType 'Bundle', got '{}'",
            wire.resource_type
        )));
    }

    let records = wire
        .entry
        .into_iter()
        .filter_map(|e| e.resource)
        .filter_map(|resource| Record::from_value(resource).ok())
        .collect();

    Ok(BundlePage {
        total: wire.total,
        self_link: link_for(&wire.link, RELATION_SELF),
        next_link: link_for(&wire.link, RELATION_NEXT),
        records,
    })
}

fn domain_to_wire(page: &BundlePage) -> BundleWire {
    let link = [
        (RELATION_SELF, &page.self_link),
        (RELATION_NEXT, &page.next_link),
    ]
    .into_iter()
    .filter_map(|(relation, url)| {
        url.as_ref().map(|url| BundleLinkWire {
            relation: relation.to_string(),
            url: url.clone(),
        })
    })
    .collect();

    BundleWire {
        resource_type: "Bundle".to_string(),
        bundle_type: Some("searchset".to_string()),
        total: page.total,
        link,
        entry: page
            .records
            .iter()
            .map(|r| BundleEntryWire {
                full_url: Some(r.key().to_string()),
                resource: Some(r.body().clone()),
            })
            .collect(),
    }
}
