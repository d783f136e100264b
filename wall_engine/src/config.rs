//! Policy configuration for the SQL wall engine.
//!
//! A [`PolicyConfig`] is built once per policy, normalized, and then shared
//! read-only by every traversal (`Arc<PolicyConfig>`). Policies can be built
//! in code or loaded from a TOML (`[policy]` table) or YAML (`policy:` key)
//! document via [`PolicyConfig::load_from_path`].
//!
//! All whitelist and deny-list entries are stored in canonical form (see
//! [`crate::names`]) so that lookups are insensitive to case and quoting.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

use crate::names;
use crate::types::{Severity, ViolationKind};

// ---------------------------------------------------------------------------
// Rule severity override
// ---------------------------------------------------------------------------

/// Per-kind severity override, or `Off` to stop recording a kind entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverityOverride {
    /// Override severity to Error.
    Error,
    /// Override severity to Warning.
    Warning,
    /// Override severity to Info.
    Info,
    /// Never record this kind.
    Off,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Functions that read or write files, stall execution, run OS commands or
/// leak server metadata. Called out by name in classic injection payloads.
const DEFAULT_DENIED_FUNCTIONS: &[&str] = &[
    "benchmark",
    "connection_id",
    "ctxsys.drithsx.sn",
    "current_user",
    "database",
    "dblink",
    "dblink_exec",
    "dbms_java.runjava",
    "dbms_lock.sleep",
    "dbms_pipe.receive_message",
    "extractvalue",
    "get_lock",
    "load_file",
    "lo_export",
    "lo_import",
    "master_pos_wait",
    "pg_ls_dir",
    "pg_read_binary_file",
    "pg_read_file",
    "pg_sleep",
    "pg_stat_file",
    "pg_terminate_backend",
    "session_user",
    "sleep",
    "sys_eval",
    "sys_exec",
    "system_user",
    "updatexml",
    "user",
    "utl_file.fopen",
    "utl_http.request",
    "utl_inaddr.get_host_address",
    "utl_inaddr.get_host_name",
    "version",
    "xp_cmdshell",
];

/// Identifiers and system variables that must not be referenced directly.
const DEFAULT_PERMITTED_VARIANTS: &[&str] = &[
    "@@basedir",
    "@@datadir",
    "@@hostname",
    "@@plugin_dir",
    "@@tmpdir",
    "@@version",
    "@@version_comment",
    "@@version_compile_machine",
    "@@version_compile_os",
    "current_user",
    "session_user",
    "system_user",
];

/// Metadata schemas whose objects leak catalog information.
const DEFAULT_DENIED_SCHEMAS: &[&str] = &[
    "information_schema",
    "mysql",
    "performance_schema",
    "pg_catalog",
    "sys",
];

fn string_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// Main config
// ---------------------------------------------------------------------------

/// Complete firewall policy.
///
/// Immutable during a traversal. Construct it, call
/// [`PolicyConfig::normalized`] (the [`crate::engine::Firewall`] constructor
/// does this), and share it.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Permit SELECT statements.
    pub allow_select: bool,
    /// Permit INSERT and multi-table INSERT statements.
    pub allow_insert: bool,
    /// Permit UPDATE statements.
    pub allow_update: bool,
    /// Permit DELETE statements.
    pub allow_delete: bool,
    /// Permit TRUNCATE statements.
    pub allow_truncate: bool,
    /// Permit statements outside the base DML allow-set (DDL, DCL, SET, ...).
    pub allow_none_base_statement: bool,
    /// Permit more than one statement per submission.
    pub multi_statement_allow: bool,

    /// Enforce `permitted_tables`.
    pub table_check_enabled: bool,
    /// Enforce `permitted_variants`.
    pub variant_check_enabled: bool,
    /// Flag UPDATE/DELETE statements that carry no WHERE clause.
    pub require_where_on_mutation: bool,

    /// Permit `SELECT *`.
    pub select_all_column_allow: bool,
    /// Permit `SELECT ... INTO OUTFILE/DUMPFILE`.
    pub select_into_outfile_allow: bool,
    /// Flag UNION branches that select constants without a FROM clause.
    pub select_union_check: bool,

    /// Do not record always-false conditions.
    pub condition_always_false_allow: bool,
    /// Do not fold `x LIKE '%'` to true.
    pub condition_like_true_allow: bool,
    /// Permit XOR inside conditions.
    pub condition_op_xor_allow: bool,
    /// Permit bitwise `&` / `|` inside conditions.
    pub condition_op_bitwise_allow: bool,

    /// Only functions in `permitted_functions` may be called.
    pub strict_function_whitelist: bool,

    /// Maximum nested SELECT depth (0 = unlimited).
    pub max_subquery_depth: usize,
    /// Maximum IN-list member count (0 = unlimited).
    pub max_in_list_items: usize,
    /// Maximum parse nesting depth accepted before traversal (0 = unlimited).
    pub max_ast_depth: usize,

    /// Tables that may be referenced when `table_check_enabled` is set.
    /// Entries may be globs (`report_*`).
    pub permitted_tables: BTreeSet<String>,
    /// Functions exempt from `denied_functions`; the whitelist in strict mode.
    pub permitted_functions: BTreeSet<String>,
    /// Identifiers and variables whose direct reference is forbidden.
    pub permitted_variants: BTreeSet<String>,
    /// Functions that are always unauthorized unless explicitly permitted.
    pub denied_functions: BTreeSet<String>,
    /// Schemas whose objects may not be referenced.
    pub denied_schemas: BTreeSet<String>,

    /// Per-kind severity overrides.
    pub rules: BTreeMap<ViolationKind, RuleSeverityOverride>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_select: true,
            allow_insert: true,
            allow_update: true,
            allow_delete: true,
            allow_truncate: false,
            allow_none_base_statement: false,
            multi_statement_allow: false,
            table_check_enabled: false,
            variant_check_enabled: true,
            require_where_on_mutation: true,
            select_all_column_allow: true,
            select_into_outfile_allow: false,
            select_union_check: true,
            condition_always_false_allow: false,
            condition_like_true_allow: false,
            condition_op_xor_allow: false,
            condition_op_bitwise_allow: true,
            strict_function_whitelist: false,
            max_subquery_depth: 8,
            max_in_list_items: 1000,
            max_ast_depth: 256,
            permitted_tables: BTreeSet::new(),
            permitted_functions: BTreeSet::new(),
            permitted_variants: string_set(DEFAULT_PERMITTED_VARIANTS),
            denied_functions: string_set(DEFAULT_DENIED_FUNCTIONS),
            denied_schemas: string_set(DEFAULT_DENIED_SCHEMAS),
            rules: BTreeMap::new(),
        }
    }
}

impl PolicyConfig {
    /// Canonicalize every name set.
    ///
    /// Idempotent; call it after any mutation of the name sets.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.permitted_tables = normalize_set(&self.permitted_tables, names::normalize_qualified);
        self.permitted_functions =
            normalize_set(&self.permitted_functions, names::normalize_qualified);
        self.denied_functions = normalize_set(&self.denied_functions, names::normalize_qualified);
        self.permitted_variants = normalize_set(&self.permitted_variants, names::normalize_name);
        self.denied_schemas = normalize_set(&self.denied_schemas, names::normalize_name);
        self
    }

    /// Compile `permitted_tables` for lookups.
    ///
    /// Build it once per policy; [`crate::engine::Firewall`] keeps the result
    /// next to the shared policy.
    #[must_use]
    pub fn table_matcher(&self) -> TableMatcher {
        TableMatcher::new(&self.permitted_tables)
    }

    /// Whether a canonical function name is explicitly permitted.
    ///
    /// Only the exact name matches: permitting `sleep` does not permit
    /// `dbms_lock.sleep`.
    #[must_use]
    pub fn is_function_permitted(&self, normalized: &str) -> bool {
        self.permitted_functions.contains(normalized)
    }

    /// Whether a canonical function name is on the deny list.
    ///
    /// Qualified deny entries (`dbms_lock.sleep`) only match qualified calls;
    /// bare entries match both `sleep(...)` and `any.sleep(...)`.
    #[must_use]
    pub fn is_function_denied(&self, normalized: &str) -> bool {
        self.denied_functions.contains(normalized)
            || self
                .denied_functions
                .contains(names::relation_part(normalized))
    }

    /// Whether a findings kind is recorded under this policy.
    #[must_use]
    pub fn is_kind_enabled(&self, kind: ViolationKind) -> bool {
        self.rules.get(&kind) != Some(&RuleSeverityOverride::Off)
    }

    /// Severity for a kind, considering the per-kind override.
    #[must_use]
    pub fn effective_severity(&self, kind: ViolationKind) -> Severity {
        match self.rules.get(&kind) {
            Some(RuleSeverityOverride::Error) => Severity::Error,
            Some(RuleSeverityOverride::Warning) => Severity::Warning,
            Some(RuleSeverityOverride::Info) => Severity::Info,
            Some(RuleSeverityOverride::Off) | None => kind.default_severity(),
        }
    }

    /// SHA-256 of the serialized policy.
    ///
    /// Sets and maps are ordered, so equal policies always hash equally.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Load a policy from a `.toml`, `.yaml` or `.yml` file.
    ///
    /// The returned policy is already normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown extension,
    /// or does not parse.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(display.clone(), e.to_string()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let parsed = match ext.as_str() {
            "toml" => toml::from_str::<PolicyFile>(&content)
                .map_err(|e| ConfigError::ParseError(display.clone(), e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str::<PolicyFile>(&content)
                .map_err(|e| ConfigError::ParseError(display.clone(), e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(display)),
        };

        let mut config = Self::default();
        if let Some(ref section) = parsed.policy {
            apply_policy_section(&mut config, section);
        }
        log::debug!("loaded policy from {display}");
        Ok(config.normalized())
    }

    /// Parse a policy from TOML text with a `[policy]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for a policy file.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: PolicyFile = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError("<inline>".to_owned(), e.to_string()))?;
        let mut config = Self::default();
        if let Some(ref section) = parsed.policy {
            apply_policy_section(&mut config, section);
        }
        Ok(config.normalized())
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl PolicyConfig {
    /// Create a policy with built-in defaults.
    #[new]
    fn py_new() -> Self {
        Self::default().normalized()
    }

    /// Load a policy file (`.toml`, `.yaml`, `.yml`).
    #[staticmethod]
    fn load(path: &str) -> PyResult<Self> {
        Self::load_from_path(Path::new(path))
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    #[getter]
    fn get_allow_select(&self) -> bool {
        self.allow_select
    }

    #[setter]
    fn set_allow_select(&mut self, value: bool) {
        self.allow_select = value;
    }

    #[getter]
    fn get_allow_truncate(&self) -> bool {
        self.allow_truncate
    }

    #[setter]
    fn set_allow_truncate(&mut self, value: bool) {
        self.allow_truncate = value;
    }

    #[getter]
    fn get_table_check_enabled(&self) -> bool {
        self.table_check_enabled
    }

    #[setter]
    fn set_table_check_enabled(&mut self, value: bool) {
        self.table_check_enabled = value;
    }

    /// Replace the permitted table set.
    #[setter]
    fn set_permitted_tables(&mut self, value: Vec<String>) {
        self.permitted_tables = value.into_iter().collect();
        *self = self.clone().normalized();
    }

    #[getter]
    fn get_permitted_tables(&self) -> Vec<String> {
        self.permitted_tables.iter().cloned().collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "PolicyConfig(table_check={}, permitted_tables={}, fingerprint={})",
            self.table_check_enabled,
            self.permitted_tables.len(),
            &self.fingerprint()[..12],
        )
    }
}

fn normalize_set(set: &BTreeSet<String>, f: fn(&str) -> String) -> BTreeSet<String> {
    set.iter().map(|s| f(s)).filter(|s| !s.is_empty()).collect()
}

fn is_glob(entry: &str) -> bool {
    entry.contains('*') || entry.contains('?')
}

// ---------------------------------------------------------------------------
// Table matching
// ---------------------------------------------------------------------------

/// Compiled form of a permitted table set.
///
/// Plain entries match the canonical name exactly, so `orders` admits
/// `orders` but not `otherdb.orders`. Glob entries (`report_*`,
/// `analytics.*`) match the whole canonical name, case-insensitively.
#[derive(Debug, Clone)]
pub struct TableMatcher {
    exact: BTreeSet<String>,
    patterns: GlobSet,
}

impl TableMatcher {
    /// Compile already-normalized table entries.
    #[must_use]
    pub fn new(entries: &BTreeSet<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        for entry in entries.iter().filter(|e| is_glob(e)) {
            match GlobBuilder::new(entry)
                .case_insensitive(true)
                .literal_separator(false)
                .build()
            {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => log::warn!("ignoring invalid table pattern '{entry}': {e}"),
            }
        }
        let patterns = builder.build().unwrap_or_else(|e| {
            log::warn!("failed to compile table patterns: {e}");
            GlobSet::empty()
        });
        Self {
            exact: entries.iter().filter(|e| !is_glob(e)).cloned().collect(),
            patterns,
        }
    }

    /// Whether a canonical table name is permitted.
    #[must_use]
    pub fn is_permitted(&self, normalized: &str) -> bool {
        self.exact.contains(normalized) || self.patterns.is_match(normalized)
    }
}

impl Default for TableMatcher {
    fn default() -> Self {
        Self::new(&BTreeSet::new())
    }
}

// ---------------------------------------------------------------------------
// File deserialization helpers
// ---------------------------------------------------------------------------

/// Raw structure of a policy file (TOML or YAML).
#[derive(Debug, Deserialize)]
struct PolicyFile {
    policy: Option<PolicySection>,
}

/// The `[policy]` section. Every key is optional; absent keys keep defaults.
#[derive(Debug, Default, Deserialize)]
struct PolicySection {
    allow_select: Option<bool>,
    allow_insert: Option<bool>,
    allow_update: Option<bool>,
    allow_delete: Option<bool>,
    allow_truncate: Option<bool>,
    allow_none_base_statement: Option<bool>,
    multi_statement_allow: Option<bool>,
    table_check_enabled: Option<bool>,
    variant_check_enabled: Option<bool>,
    require_where_on_mutation: Option<bool>,
    select_all_column_allow: Option<bool>,
    select_into_outfile_allow: Option<bool>,
    select_union_check: Option<bool>,
    condition_always_false_allow: Option<bool>,
    condition_like_true_allow: Option<bool>,
    condition_op_xor_allow: Option<bool>,
    condition_op_bitwise_allow: Option<bool>,
    strict_function_whitelist: Option<bool>,
    max_subquery_depth: Option<usize>,
    max_in_list_items: Option<usize>,
    max_ast_depth: Option<usize>,
    permitted_tables: Option<Vec<String>>,
    permitted_functions: Option<Vec<String>>,
    permitted_variants: Option<Vec<String>>,
    denied_functions: Option<Vec<String>>,
    extra_denied_functions: Option<Vec<String>>,
    denied_schemas: Option<Vec<String>>,
    rules: Option<HashMap<String, String>>,
}

/// Parse a string severity value into a [`RuleSeverityOverride`].
fn parse_rule_severity(s: &str) -> Option<RuleSeverityOverride> {
    match s.to_lowercase().as_str() {
        "error" => Some(RuleSeverityOverride::Error),
        "warning" | "warn" => Some(RuleSeverityOverride::Warning),
        "info" => Some(RuleSeverityOverride::Info),
        "off" | "disabled" | "false" => Some(RuleSeverityOverride::Off),
        _ => None,
    }
}

/// Apply a [`PolicySection`] onto a [`PolicyConfig`], overriding any set values.
fn apply_policy_section(config: &mut PolicyConfig, section: &PolicySection) {
    let flags: [(Option<bool>, &mut bool); 18] = [
        (section.allow_select, &mut config.allow_select),
        (section.allow_insert, &mut config.allow_insert),
        (section.allow_update, &mut config.allow_update),
        (section.allow_delete, &mut config.allow_delete),
        (section.allow_truncate, &mut config.allow_truncate),
        (
            section.allow_none_base_statement,
            &mut config.allow_none_base_statement,
        ),
        (section.multi_statement_allow, &mut config.multi_statement_allow),
        (section.table_check_enabled, &mut config.table_check_enabled),
        (section.variant_check_enabled, &mut config.variant_check_enabled),
        (
            section.require_where_on_mutation,
            &mut config.require_where_on_mutation,
        ),
        (
            section.select_all_column_allow,
            &mut config.select_all_column_allow,
        ),
        (
            section.select_into_outfile_allow,
            &mut config.select_into_outfile_allow,
        ),
        (section.select_union_check, &mut config.select_union_check),
        (
            section.condition_always_false_allow,
            &mut config.condition_always_false_allow,
        ),
        (
            section.condition_like_true_allow,
            &mut config.condition_like_true_allow,
        ),
        (
            section.condition_op_xor_allow,
            &mut config.condition_op_xor_allow,
        ),
        (
            section.condition_op_bitwise_allow,
            &mut config.condition_op_bitwise_allow,
        ),
        (
            section.strict_function_whitelist,
            &mut config.strict_function_whitelist,
        ),
    ];
    for (value, slot) in flags {
        if let Some(v) = value {
            *slot = v;
        }
    }

    if let Some(v) = section.max_subquery_depth {
        config.max_subquery_depth = v;
    }
    if let Some(v) = section.max_in_list_items {
        config.max_in_list_items = v;
    }
    if let Some(v) = section.max_ast_depth {
        config.max_ast_depth = v;
    }

    if let Some(ref v) = section.permitted_tables {
        config.permitted_tables = v.iter().cloned().collect();
    }
    if let Some(ref v) = section.permitted_functions {
        config.permitted_functions = v.iter().cloned().collect();
    }
    if let Some(ref v) = section.permitted_variants {
        config.permitted_variants = v.iter().cloned().collect();
    }
    if let Some(ref v) = section.denied_functions {
        config.denied_functions = v.iter().cloned().collect();
    }
    if let Some(ref v) = section.extra_denied_functions {
        config.denied_functions.extend(v.iter().cloned());
    }
    if let Some(ref v) = section.denied_schemas {
        config.denied_schemas = v.iter().cloned().collect();
    }

    if let Some(ref rules) = section.rules {
        for (kind_str, severity_str) in rules {
            match (
                kind_str.parse::<ViolationKind>(),
                parse_rule_severity(severity_str),
            ) {
                (Ok(kind), Some(sev)) => {
                    config.rules.insert(kind, sev);
                }
                _ => log::warn!("ignoring rule override {kind_str} = {severity_str}"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during policy loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a policy file.
    #[error("Failed to read policy file '{0}': {1}")]
    ReadError(String, String),

    /// Failed to parse a policy file.
    #[error("Failed to parse policy file '{0}': {1}")]
    ParseError(String, String),

    /// The file extension is not `.toml`, `.yaml` or `.yml`.
    #[error("Unsupported policy file format: '{0}'")]
    UnsupportedFormat(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
