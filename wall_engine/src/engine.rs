//! Firewall orchestrator: the main entry point for checking SQL.
//!
//! Coordinates parsing under the policy's depth limit, the dialect-specific
//! traversal, and result assembly. A [`Firewall`] is immutable and
//! `Send + Sync`; one instance can serve any number of threads, each check
//! owning its own traversal session.
//!
//! Every traversal is wrapped in `catch_unwind` so that a bug in a rule
//! surfaces as [`WallError::Internal`] instead of crashing the host process.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::ast::Statement;
use crate::config::{PolicyConfig, TableMatcher};
use crate::dialect::{DialectHooks, MySqlDialect, OracleDialect, PostgresDialect};
use crate::parser::{self, ParseError};
use crate::types::{Dialect, Violation, WallResult};
use crate::visitor::WallVisitor;

/// Failures that prevent a submission from being judged at all.
///
/// Findings are never errors; they come back inside [`WallResult`].
#[derive(Debug, thiserror::Error)]
pub enum WallError {
    #[error("failed to parse SQL: {0}")]
    Parse(#[from] ParseError),

    /// The submission breaches a resource limit and was not traversed.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A rule panicked. This is a bug in the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A policy bound to a dialect.
#[derive(Debug, Clone)]
pub struct Firewall {
    config: Arc<PolicyConfig>,
    tables: Arc<TableMatcher>,
    dialect: Dialect,
    fingerprint: String,
}

impl Firewall {
    /// Create a firewall. The policy is normalized here.
    #[must_use]
    pub fn new(config: PolicyConfig, dialect: Dialect) -> Self {
        let config = config.normalized();
        let fingerprint = config.fingerprint();
        let tables = Arc::new(config.table_matcher());
        Self {
            config: Arc::new(config),
            tables,
            dialect,
            fingerprint,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse and judge one submission.
    ///
    /// # Errors
    ///
    /// Returns [`WallError::Parse`] for malformed or unsupported SQL,
    /// [`WallError::LimitExceeded`] when nesting exceeds `max_ast_depth`, and
    /// [`WallError::Internal`] if a rule panics.
    pub fn check(&self, sql: &str) -> Result<WallResult, WallError> {
        let start = Instant::now();

        let statements = match parser::parse_sql(sql, self.dialect, self.config.max_ast_depth) {
            Ok(statements) => statements,
            Err(ParseError::TooDeep {
                limit,
                line,
                column,
            }) => {
                log::warn!("rejecting SQL nested deeper than {limit} levels at {line}:{column}");
                return Err(WallError::LimitExceeded(format!(
                    "nesting deeper than {limit} levels at line {line}, column {column}"
                )));
            }
            Err(e) => {
                log::warn!("failed to parse {} SQL: {e}", self.dialect);
                return Err(e.into());
            }
        };

        let violations = self.check_statements(&statements)?;
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        log::debug!(
            "checked {} statement(s) as {} in {elapsed_us}us: {} violation(s)",
            statements.len(),
            self.dialect,
            violations.len()
        );

        Ok(WallResult {
            passed: violations.is_empty(),
            violations,
            statements: u32::try_from(statements.len()).unwrap_or(u32::MAX),
            dialect: self.dialect,
            policy_fingerprint: self.fingerprint.clone(),
            elapsed_us,
        })
    }

    /// Judge statements that were parsed elsewhere.
    ///
    /// The caller is responsible for bounding the depth of trees it builds.
    ///
    /// # Errors
    ///
    /// Returns [`WallError::Internal`] if a rule panics.
    pub fn check_statements(&self, statements: &[Statement]) -> Result<Vec<Violation>, WallError> {
        let config = Arc::clone(&self.config);
        let tables = Arc::clone(&self.tables);
        let result = catch_unwind(AssertUnwindSafe(|| match self.dialect {
            Dialect::MySql => walk(MySqlDialect, config, tables, statements),
            Dialect::Oracle => walk(OracleDialect, config, tables, statements),
            Dialect::Postgres => walk(PostgresDialect, config, tables, statements),
        }));

        result.map_err(|payload| {
            let message = panic_message(payload.as_ref());
            log::warn!("rule traversal panicked: {message}");
            WallError::Internal(format!("{message}. This is a bug, please report it."))
        })
    }

    /// Judge many submissions in parallel, preserving input order.
    #[must_use]
    pub fn check_batch(&self, submissions: &[String]) -> Vec<Result<WallResult, WallError>> {
        submissions.par_iter().map(|sql| self.check(sql)).collect()
    }
}

fn walk<D: DialectHooks>(
    hooks: D,
    config: Arc<PolicyConfig>,
    tables: Arc<TableMatcher>,
    statements: &[Statement],
) -> Vec<Violation> {
    let mut visitor = WallVisitor::with_tables(hooks, config, tables);
    visitor.visit_script(statements);
    visitor.into_violations()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic".to_owned()
    }
}

/// Check one submission under a default policy.
///
/// # Errors
///
/// See [`Firewall::check`].
pub fn check_sql(sql: &str, dialect: Dialect) -> Result<WallResult, WallError> {
    Firewall::new(PolicyConfig::default(), dialect).check(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationKind;
    use indoc::indoc;
    use proptest::prelude::*;

    fn table_policy() -> PolicyConfig {
        PolicyConfig {
            allow_select: true,
            table_check_enabled: true,
            permitted_tables: ["orders".to_owned()].into_iter().collect(),
            ..PolicyConfig::default()
        }
    }

    fn kinds(firewall: &Firewall, sql: &str) -> Vec<ViolationKind> {
        firewall.check(sql).unwrap().kinds()
    }

    #[test]
    fn test_tautology_on_permitted_table() {
        let firewall = Firewall::new(table_policy(), Dialect::MySql);
        assert_eq!(
            kinds(&firewall, "SELECT * FROM orders WHERE 1=1"),
            vec![ViolationKind::AlwaysTrueCondition]
        );
    }

    #[test]
    fn test_unpermitted_table() {
        let firewall = Firewall::new(table_policy(), Dialect::MySql);
        assert_eq!(
            kinds(&firewall, "SELECT * FROM secret_users"),
            vec![ViolationKind::UnauthorizedTable]
        );
    }

    #[test]
    fn test_truncate_disallowed() {
        let config = PolicyConfig {
            allow_none_base_statement: false,
            allow_truncate: false,
            ..PolicyConfig::default()
        };
        let firewall = Firewall::new(config, Dialect::MySql);
        assert_eq!(
            kinds(&firewall, "TRUNCATE TABLE orders"),
            vec![ViolationKind::DisallowedStatementType]
        );
    }

    #[test]
    fn test_update_without_where() {
        let config = PolicyConfig {
            require_where_on_mutation: true,
            ..PolicyConfig::default()
        };
        let firewall = Firewall::new(config, Dialect::MySql);
        assert_eq!(
            kinds(&firewall, "UPDATE orders SET status='x'"),
            vec![ViolationKind::UnboundedMutation]
        );
    }

    #[test]
    fn test_having_tautology_attributed_to_having() {
        let sql = indoc! {"
            SELECT dept, sum(x)
            FROM emp
            GROUP BY dept
            HAVING 1=1 OR sum(x)>0
        "};
        let result = check_sql(sql, Dialect::MySql).unwrap();
        let finding = result
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::AlwaysTrueCondition)
            .unwrap();
        assert!(finding.message.starts_with("HAVING"));
        assert_eq!(finding.sql, "1 = 1 OR sum(x) > 0");
        assert_eq!(finding.line, 4);
    }

    #[test]
    fn test_result_metadata() {
        let firewall = Firewall::new(table_policy(), Dialect::Oracle);
        let result = firewall.check("SELECT id FROM orders").unwrap();
        assert!(result.passed);
        assert_eq!(result.statements, 1);
        assert_eq!(result.dialect, Dialect::Oracle);
        assert_eq!(result.policy_fingerprint, firewall.config().fingerprint());
        assert_eq!(result.policy_fingerprint.len(), 64);
    }

    #[test]
    fn test_parse_error_is_distinct_from_findings() {
        let err = check_sql("SELECT * FROM orders WHERE (", Dialect::MySql).unwrap_err();
        assert!(matches!(err, WallError::Parse(_)));
        let err = check_sql("WITH x AS (SELECT 1) SELECT * FROM x", Dialect::Postgres).unwrap_err();
        assert!(matches!(err, WallError::Parse(ParseError::Unsupported { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let config = PolicyConfig {
            max_ast_depth: 8,
            ..PolicyConfig::default()
        };
        let firewall = Firewall::new(config, Dialect::MySql);
        let sql = format!("SELECT id FROM orders WHERE {}1{}", "(".repeat(50), ")".repeat(50));
        assert!(matches!(firewall.check(&sql), Err(WallError::LimitExceeded(_))));
        assert!(firewall.check("SELECT id FROM orders WHERE ((id = 1))").is_ok());
    }

    #[test]
    fn test_flat_or_chain_hits_depth_limit() {
        let firewall = Firewall::new(table_policy(), Dialect::MySql);
        let chain = |n: usize| {
            (0..n)
                .map(|i| format!("id = {i}"))
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        let long = format!("SELECT id FROM orders WHERE {}", chain(1000));
        assert!(matches!(firewall.check(&long), Err(WallError::LimitExceeded(_))));

        let short = format!("SELECT id FROM orders WHERE {}", chain(100));
        assert!(firewall.check(&short).unwrap().passed);
    }

    #[test]
    fn test_empty_submission_passes() {
        let result = check_sql("", Dialect::Postgres).unwrap();
        assert!(result.passed);
        assert_eq!(result.statements, 0);
    }

    #[test]
    fn test_check_batch_preserves_order() {
        let firewall = Firewall::new(table_policy(), Dialect::MySql);
        let batch = vec![
            "SELECT id FROM orders".to_owned(),
            "SELECT id FROM secret_users".to_owned(),
            "SELECT id FROM orders WHERE (".to_owned(),
        ];
        let results = firewall.check_batch(&batch);
        assert!(results[0].as_ref().unwrap().passed);
        assert!(results[1].as_ref().unwrap().has(ViolationKind::UnauthorizedTable));
        assert!(results[2].is_err());
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload = catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload = catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");
    }

    #[test]
    fn test_firewall_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Firewall>();
    }

    proptest! {
        #[test]
        fn prop_select_gate_reports_only_the_gate(
            table in "[a-z]{1,8}",
            func in prop::sample::select(vec!["sleep", "upper", "load_file"]),
        ) {
            let config = PolicyConfig {
                allow_select: false,
                table_check_enabled: true,
                ..PolicyConfig::default()
            };
            let firewall = Firewall::new(config, Dialect::MySql);
            let sql = format!("SELECT {func}(a), @@version FROM {table}_t WHERE 1 = 1");
            prop_assert_eq!(kinds(&firewall, &sql), vec![ViolationKind::DisallowedStatementType]);
        }

        #[test]
        fn prop_smuggled_tautology_reported_once(depth in 1usize..12) {
            let mut condition = "1 = 1".to_owned();
            for i in 0..depth {
                condition = if i % 2 == 0 {
                    format!("c{i} = {i} OR ({condition})")
                } else {
                    format!("c{i} = {i} AND ({condition})")
                };
            }
            let sql = format!("SELECT id FROM orders WHERE a = 0 AND ({condition})");
            let result = check_sql(&sql, Dialect::MySql).unwrap();
            let count = result
                .violations
                .iter()
                .filter(|v| v.kind == ViolationKind::AlwaysTrueCondition)
                .count();
            prop_assert_eq!(count, 1);
        }

        #[test]
        fn prop_table_case_and_quoting_equivalent(
            mask in prop::collection::vec(any::<bool>(), 6),
            quoted in any::<bool>(),
        ) {
            let name: String = "orders"
                .chars()
                .zip(mask)
                .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
                .collect();
            let name = if quoted { format!("`{name}`") } else { name };
            let firewall = Firewall::new(table_policy(), Dialect::MySql);
            let sql = format!("SELECT id FROM {name}");
            prop_assert!(firewall.check(&sql).unwrap().passed);
        }

        #[test]
        fn prop_traversal_is_idempotent(
            n in 0i64..1000,
            table in prop::sample::select(vec!["orders", "secret_users", "dual"]),
        ) {
            let firewall = Firewall::new(table_policy(), Dialect::MySql);
            let sql = format!(
                "SELECT *, sleep({n}) FROM {table} WHERE id = {n} OR {n} = {n}; DELETE FROM {table}"
            );
            let statements = parser::parse_sql(&sql, Dialect::MySql, 0).unwrap();
            let first = firewall.check_statements(&statements).unwrap();
            let second = firewall.check_statements(&statements).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
