//! Core type definitions for the SQL wall engine.
//!
//! These types form the contract between the engine and its callers
//! (Rust code, or Python via PyO3 when the `python` feature is enabled):
//!
//! - [`Dialect`] selects the traversal adapter and renderer
//! - [`Severity`] grades a finding
//! - [`ViolationKind`] is the finding taxonomy
//! - [`Violation`] is the atomic unit of engine output
//! - [`WallResult`] is the aggregate result of checking one submission

#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

/// SQL dialect a submission is written in.
///
/// Serialized as lowercase strings: `"mysql"`, `"oracle"`, `"postgres"`.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL / MariaDB (default).
    #[default]
    MySql,
    /// Oracle Database.
    Oracle,
    /// PostgreSQL.
    Postgres,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Oracle => write!(f, "oracle"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(format!("unknown SQL dialect '{other}'")),
        }
    }
}

/// Severity attached to a recorded finding.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The statement should be rejected.
    Error,
    /// Suspicious, but commonly legitimate.
    Warning,
    /// Informational notice.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// What a violation is about.
///
/// Every kind is a *finding*: the engine records it and keeps walking.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// The statement kind is not permitted by policy.
    DisallowedStatementType,
    /// A table outside the permitted set is referenced.
    UnauthorizedTable,
    /// A denied (or non-whitelisted, in strict mode) function is called.
    UnauthorizedFunction,
    /// A forbidden identifier, variable, schema or file target is referenced.
    IllegalObjectAccess,
    /// A predicate holds regardless of table data.
    AlwaysTrueCondition,
    /// A predicate can never hold.
    AlwaysFalseCondition,
    /// UPDATE or DELETE without a WHERE clause.
    UnboundedMutation,
    /// Suspicious composition matching no positive rule.
    StructuralAnomaly,
}

impl ViolationKind {
    /// All kinds, in code order.
    pub const ALL: [ViolationKind; 8] = [
        Self::DisallowedStatementType,
        Self::UnauthorizedTable,
        Self::UnauthorizedFunction,
        Self::IllegalObjectAccess,
        Self::AlwaysTrueCondition,
        Self::AlwaysFalseCondition,
        Self::UnboundedMutation,
        Self::StructuralAnomaly,
    ];

    /// Stable rule code used in SARIF output (`WALL001`..`WALL008`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::DisallowedStatementType => "WALL001",
            Self::UnauthorizedTable => "WALL002",
            Self::UnauthorizedFunction => "WALL003",
            Self::IllegalObjectAccess => "WALL004",
            Self::AlwaysTrueCondition => "WALL005",
            Self::AlwaysFalseCondition => "WALL006",
            Self::UnboundedMutation => "WALL007",
            Self::StructuralAnomaly => "WALL008",
        }
    }

    /// Severity used when the policy carries no override for this kind.
    #[must_use]
    pub fn default_severity(self) -> Severity {
        match self {
            Self::AlwaysFalseCondition | Self::StructuralAnomaly => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// One-line description for report rule tables.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::DisallowedStatementType => "Statement kind is not permitted by policy",
            Self::UnauthorizedTable => "Table is not in the permitted table set",
            Self::UnauthorizedFunction => "Function call is denied by policy",
            Self::IllegalObjectAccess => "Forbidden object, variable or schema is referenced",
            Self::AlwaysTrueCondition => "Condition is always true (tautology)",
            Self::AlwaysFalseCondition => "Condition is always false",
            Self::UnboundedMutation => "UPDATE or DELETE without a WHERE clause",
            Self::StructuralAnomaly => "Suspicious statement structure",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DisallowedStatementType => "DisallowedStatementType",
            Self::UnauthorizedTable => "UnauthorizedTable",
            Self::UnauthorizedFunction => "UnauthorizedFunction",
            Self::IllegalObjectAccess => "IllegalObjectAccess",
            Self::AlwaysTrueCondition => "AlwaysTrueCondition",
            Self::AlwaysFalseCondition => "AlwaysFalseCondition",
            Self::UnboundedMutation => "UnboundedMutation",
            Self::StructuralAnomaly => "StructuralAnomaly",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(wanted) || k.code() == wanted)
            .ok_or_else(|| format!("unknown violation kind '{wanted}'"))
    }
}

/// 1-based source position of a token or statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// 1-based line number (0 if unknown).
    pub line: u32,
    /// 1-based column number (0 if unknown).
    pub column: u32,
}

impl Span {
    /// Create a span from a line and column.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A single policy finding.
///
/// `sql` holds the offending construct rendered back to dialect SQL, so a
/// reviewer sees the exact clause that tripped the rule.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Finding taxonomy entry.
    pub kind: ViolationKind,
    /// Effective severity after policy overrides.
    pub severity: Severity,
    /// Human-readable explanation.
    pub message: String,
    /// Offending construct rendered as SQL.
    pub sql: String,
    /// 1-based line of the offending construct (statement start if unknown).
    pub line: u32,
    /// 1-based column of the offending construct (statement start if unknown).
    pub column: u32,
}

#[cfg(feature = "python")]
#[pymethods]
impl Violation {
    fn __repr__(&self) -> String {
        format!(
            "Violation(kind={}, severity={}, sql={:?}, line={})",
            self.kind, self.severity, self.sql, self.line,
        )
    }
}

/// Aggregate result of checking one SQL submission.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallResult {
    /// All findings, in discovery order.
    pub violations: Vec<Violation>,
    /// Number of statements in the submission.
    pub statements: u32,
    /// Dialect the submission was parsed as.
    pub dialect: Dialect,
    /// SHA-256 fingerprint of the policy that judged the submission.
    pub policy_fingerprint: String,
    /// Microseconds spent parsing and checking.
    pub elapsed_us: u64,
    /// Whether the submission produced no findings.
    pub passed: bool,
}

impl WallResult {
    /// Whether any finding of the given kind was recorded.
    #[must_use]
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Finding kinds in discovery order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ViolationKind> {
        self.violations.iter().map(|v| v.kind).collect()
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl WallResult {
    /// Serialize the result to JSON.
    fn to_json(&self) -> PyResult<String> {
        crate::reporter::to_json(self).map_err(|e| {
            pyo3::exceptions::PyValueError::new_err(format!("JSON serialization failed: {e}"))
        })
    }

    /// Serialize the result to SARIF v2.1.0 JSON.
    fn to_sarif_json(&self, source_uri: &str) -> PyResult<String> {
        crate::reporter::to_sarif(self, source_uri).map_err(|e| {
            pyo3::exceptions::PyValueError::new_err(format!("SARIF serialization failed: {e}"))
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "WallResult(passed={}, violations={}, statements={}, dialect={})",
            self.passed,
            self.violations.len(),
            self.statements,
            self.dialect,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<Dialect>(), Ok(Dialect::MySql));
        assert_eq!("oracle".parse::<Dialect>(), Ok(Dialect::Oracle));
        assert_eq!("postgresql".parse::<Dialect>(), Ok(Dialect::Postgres));
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_kind_codes_are_unique() {
        let mut codes: Vec<&str> = ViolationKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ViolationKind::ALL.len());
    }

    #[test]
    fn test_kind_from_str_accepts_name_and_code() {
        assert_eq!(
            "alwaystruecondition".parse::<ViolationKind>(),
            Ok(ViolationKind::AlwaysTrueCondition)
        );
        assert_eq!(
            "WALL007".parse::<ViolationKind>(),
            Ok(ViolationKind::UnboundedMutation)
        );
        assert!("Nope".parse::<ViolationKind>().is_err());
    }

    #[test]
    fn test_default_severity() {
        assert_eq!(
            ViolationKind::AlwaysTrueCondition.default_severity(),
            Severity::Error
        );
        assert_eq!(
            ViolationKind::StructuralAnomaly.default_severity(),
            Severity::Warning
        );
    }

    #[test]
    fn test_dialect_serde_lowercase() {
        let json = serde_json::to_string(&Dialect::Postgres).unwrap();
        assert_eq!(json, "\"postgres\"");
    }
}
