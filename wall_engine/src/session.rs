//! Per-traversal mutable state.
//!
//! A [`TraversalSession`] owns the violation list for one walk over one
//! submission and borrows nothing mutable from anywhere else. The policy is
//! shared read-only through an `Arc`, so any number of sessions can run on
//! separate threads against the same [`PolicyConfig`].

use std::sync::Arc;

use crate::config::{PolicyConfig, TableMatcher};
use crate::types::{Span, Violation, ViolationKind};

#[derive(Debug)]
pub struct TraversalSession {
    config: Arc<PolicyConfig>,
    tables: Arc<TableMatcher>,
    violations: Vec<Violation>,
    /// Start of the statement being walked; fallback location for findings.
    statement_span: Span,
    /// Number of select blocks currently open on the walk.
    select_depth: usize,
    /// Whether the current statement already has a subquery depth finding.
    depth_reported: bool,
}

impl TraversalSession {
    #[must_use]
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        let tables = Arc::new(config.table_matcher());
        Self::with_tables(config, tables)
    }

    /// Session over a policy whose table matcher is already compiled.
    #[must_use]
    pub fn with_tables(config: Arc<PolicyConfig>, tables: Arc<TableMatcher>) -> Self {
        Self {
            config,
            tables,
            violations: Vec::new(),
            statement_span: Span::default(),
            select_depth: 0,
            depth_reported: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    #[must_use]
    pub fn tables(&self) -> &TableMatcher {
        &self.tables
    }

    /// Record a finding.
    ///
    /// Kinds switched off by the policy are dropped here, and the severity is
    /// resolved against the policy's per-kind overrides. Without a span the
    /// finding is located at the current statement.
    pub fn report(
        &mut self,
        kind: ViolationKind,
        message: impl Into<String>,
        sql: String,
        span: Option<Span>,
    ) {
        if !self.config.is_kind_enabled(kind) {
            return;
        }
        let at = span
            .filter(|s| *s != Span::default())
            .unwrap_or(self.statement_span);
        self.violations.push(Violation {
            kind,
            severity: self.config.effective_severity(kind),
            message: message.into(),
            sql,
            line: at.line,
            column: at.column,
        });
    }

    pub fn begin_statement(&mut self, span: Span) {
        self.statement_span = span;
        self.select_depth = 0;
        self.depth_reported = false;
    }

    /// Returns `true` the first time it is called within a statement.
    pub fn claim_depth_report(&mut self) -> bool {
        !std::mem::replace(&mut self.depth_reported, true)
    }

    /// Open a select block and return the new nesting depth (1 = top level).
    pub fn enter_select(&mut self) -> usize {
        self.select_depth += 1;
        self.select_depth
    }

    pub fn exit_select(&mut self) {
        self.select_depth = self.select_depth.saturating_sub(1);
    }

    #[must_use]
    pub fn select_depth(&self) -> usize {
        self.select_depth
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSeverityOverride;
    use crate::types::Severity;

    #[test]
    fn test_report_uses_statement_span_as_fallback() {
        let mut session = TraversalSession::new(Arc::new(PolicyConfig::default()));
        session.begin_statement(Span::new(3, 5));
        session.report(ViolationKind::UnauthorizedTable, "m", "t".into(), None);
        session.report(
            ViolationKind::UnauthorizedTable,
            "m",
            "u".into(),
            Some(Span::new(4, 1)),
        );

        let v = session.into_violations();
        assert_eq!((v[0].line, v[0].column), (3, 5));
        assert_eq!((v[1].line, v[1].column), (4, 1));
    }

    #[test]
    fn test_off_kind_is_not_recorded() {
        let mut config = PolicyConfig::default();
        config
            .rules
            .insert(ViolationKind::StructuralAnomaly, RuleSeverityOverride::Off);
        config
            .rules
            .insert(ViolationKind::UnboundedMutation, RuleSeverityOverride::Info);
        let mut session = TraversalSession::new(Arc::new(config));
        session.report(ViolationKind::StructuralAnomaly, "m", String::new(), None);
        session.report(ViolationKind::UnboundedMutation, "m", String::new(), None);

        assert_eq!(session.violations().len(), 1);
        assert_eq!(session.violations()[0].severity, Severity::Info);
    }

    #[test]
    fn test_select_depth_tracking() {
        let mut session = TraversalSession::new(Arc::new(PolicyConfig::default()));
        assert_eq!(session.enter_select(), 1);
        assert_eq!(session.enter_select(), 2);
        session.exit_select();
        assert_eq!(session.select_depth(), 1);
        session.begin_statement(Span::new(1, 1));
        assert_eq!(session.select_depth(), 0);
    }

    #[test]
    fn test_depth_report_claimed_once_per_statement() {
        let mut session = TraversalSession::new(Arc::new(PolicyConfig::default()));
        session.begin_statement(Span::new(1, 1));
        assert!(session.claim_depth_report());
        assert!(!session.claim_depth_report());
        session.begin_statement(Span::new(2, 1));
        assert!(session.claim_depth_report());
    }
}
