//! JSON and SARIF output for firewall results.
//!
//! Produces two output formats:
//!
//! 1. **JSON**: native format via `serde_json` serialization of
//!    [`WallResult`], for audit logs and the enforcement layer.
//!
//! 2. **SARIF v2.1.0**: Static Analysis Results Interchange Format, so SQL
//!    shipped with an application can be screened in code-scanning pipelines.
//!
//! ## SARIF Field Mapping
//!
//! | Violation field | SARIF location |
//! |---|---|
//! | `kind.code()` | `result.ruleId` |
//! | `message` | `result.message.text` |
//! | `severity` | `result.level` (Error→error, Warning→warning, Info→note) |
//! | source URI argument | `result.locations[0].physicalLocation.artifactLocation.uri` |
//! | `line` | `result.locations[0].physicalLocation.region.startLine` |
//! | `column` | `result.locations[0].physicalLocation.region.startColumn` |
//! | `sql` | `result.locations[0].physicalLocation.contextRegion.snippet.text` |

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{Severity, Violation, ViolationKind, WallResult};

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json";

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

/// Serialize a [`WallResult`] to pretty-printed JSON.
///
/// # Errors
///
/// Returns the serializer error if serialization fails.
pub fn to_json(result: &WallResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

// ---------------------------------------------------------------------------
// SARIF output
// ---------------------------------------------------------------------------

/// Serialize a [`WallResult`] to SARIF v2.1.0 JSON.
///
/// `source_uri` names the artifact the SQL came from (a file path, or a
/// logical name such as `request:1234`).
///
/// # Errors
///
/// Returns the serializer error if serialization fails.
pub fn to_sarif(result: &WallResult, source_uri: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_sarif_log(result, source_uri))
}

fn build_sarif_log(result: &WallResult, source_uri: &str) -> SarifLog {
    // One rule entry per kind seen, ordered by code
    let mut rule_map: BTreeMap<&'static str, SarifRule> = BTreeMap::new();
    for violation in &result.violations {
        rule_map
            .entry(violation.kind.code())
            .or_insert_with(|| build_sarif_rule(violation.kind));
    }

    let results = result
        .violations
        .iter()
        .map(|v| build_sarif_result(v, source_uri))
        .collect();

    SarifLog {
        schema: SARIF_SCHEMA.to_owned(),
        version: "2.1.0".to_owned(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "sqlwall".to_owned(),
                    version: ENGINE_VERSION.to_owned(),
                    rules: rule_map.into_values().collect(),
                },
            },
            properties: SarifRunProperties {
                dialect: result.dialect.to_string(),
                policy_fingerprint: result.policy_fingerprint.clone(),
            },
            results,
        }],
    }
}

fn build_sarif_rule(kind: ViolationKind) -> SarifRule {
    SarifRule {
        id: kind.code().to_owned(),
        name: kind.to_string(),
        short_description: SarifMessage {
            text: kind.description().to_owned(),
        },
        default_configuration: SarifDefaultConfiguration {
            level: severity_to_sarif_level(kind.default_severity()),
        },
    }
}

fn build_sarif_result(violation: &Violation, source_uri: &str) -> SarifResult {
    let region = (violation.line > 0).then(|| SarifRegion {
        start_line: violation.line,
        start_column: (violation.column > 0).then_some(violation.column),
    });
    let context_region = (!violation.sql.is_empty()).then(|| SarifContextRegion {
        snippet: SarifSnippet {
            text: violation.sql.clone(),
        },
    });

    SarifResult {
        rule_id: violation.kind.code().to_owned(),
        level: severity_to_sarif_level(violation.severity),
        message: SarifMessage {
            text: violation.message.clone(),
        },
        locations: vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation {
                    uri: source_uri.to_owned(),
                },
                region,
                context_region,
            },
        }],
    }
}

fn severity_to_sarif_level(severity: Severity) -> String {
    match severity {
        Severity::Error => "error".to_owned(),
        Severity::Warning => "warning".to_owned(),
        Severity::Info => "note".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// SARIF v2.1.0 data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    properties: SarifRunProperties,
    results: Vec<SarifResult>,
}

/// Run-level property bag: which dialect and policy produced the results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRunProperties {
    dialect: String,
    policy_fingerprint: String,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    short_description: SarifMessage,
    default_configuration: SarifDefaultConfiguration,
}

#[derive(Debug, Serialize)]
struct SarifDefaultConfiguration {
    level: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<SarifRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_region: Option<SarifContextRegion>,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_column: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SarifContextRegion {
    snippet: SarifSnippet,
}

#[derive(Debug, Serialize)]
struct SarifSnippet {
    text: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
