//! Generic pre-order traversal over the AST.
//!
//! [`WallVisitor`] is the single traversal adapter for every dialect. The
//! dialect is injected as a [`DialectHooks`] value; every match over the AST
//! is exhaustive, so a new node variant cannot slip past the rules unseen.
//!
//! Each node is checked before its children, and children are walked left to
//! right in source order. A rule may return `false` to stop the walk from
//! descending (statement gates, named table sources, denied-schema
//! properties).

use std::sync::Arc;

use crate::ast::{
    CaseExpr, Expr, GroupBy, InsertIntoClause, InsertSource, MergeClause, MethodInvoke, Query,
    SelectBlock, SelectInto, Statement, TableSource,
};
use crate::config::{PolicyConfig, TableMatcher};
use crate::dialect::DialectHooks;
use crate::rules::{condition, objects, statement, WallContext};
use crate::session::TraversalSession;
use crate::types::Violation;

/// Where an expression sits.
///
/// Everything under a WHERE / HAVING / ON / WHEN root is in condition
/// position, down to but not into nested subqueries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprPosition {
    Value,
    Condition,
}

pub struct WallVisitor<D: DialectHooks> {
    hooks: D,
    session: TraversalSession,
}

impl<D: DialectHooks> WallContext for WallVisitor<D> {
    fn hooks(&self) -> &dyn DialectHooks {
        &self.hooks
    }

    fn session(&self) -> &TraversalSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut TraversalSession {
        &mut self.session
    }
}

impl<D: DialectHooks> WallVisitor<D> {
    #[must_use]
    pub fn new(hooks: D, config: Arc<PolicyConfig>) -> Self {
        Self {
            hooks,
            session: TraversalSession::new(config),
        }
    }

    /// Visitor sharing a table matcher compiled ahead of time.
    #[must_use]
    pub fn with_tables(hooks: D, config: Arc<PolicyConfig>, tables: Arc<TableMatcher>) -> Self {
        Self {
            hooks,
            session: TraversalSession::with_tables(config, tables),
        }
    }

    /// Findings in discovery order.
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.session.into_violations()
    }

    /// Walk every statement of one submission.
    pub fn visit_script(&mut self, statements: &[Statement]) {
        statement::check_multi_statement(self, statements);
        for stmt in statements {
            self.visit_statement(stmt);
        }
    }

    pub fn visit_statement(&mut self, stmt: &Statement) {
        self.session.begin_statement(stmt.span());
        statement::check_statement_kind(self, stmt);

        match stmt {
            Statement::Select(select) => {
                if statement::check_select_statement(self, select) {
                    self.visit_query(&select.query);
                }
            }
            Statement::Insert(insert) => {
                statement::check_insert(self, insert);
                match &insert.source {
                    InsertSource::Values(rows) => {
                        for value in rows.iter().flatten() {
                            self.visit_expr(value, ExprPosition::Value);
                        }
                    }
                    InsertSource::Query(query) => self.visit_query(query),
                }
            }
            Statement::MultiInsert(multi) => {
                if statement::check_multi_insert(self, multi) {
                    for clause in &multi.clauses {
                        self.visit_insert_into(clause);
                    }
                    self.visit_query(&multi.source);
                }
            }
            Statement::Update(update) => {
                statement::check_update(self, update);
                self.visit_table_source(&update.table);
                for assignment in &update.assignments {
                    self.visit_expr(&assignment.value, ExprPosition::Value);
                }
                if let Some(from) = &update.from {
                    self.visit_table_source(from);
                }
                if let Some(selection) = &update.selection {
                    self.visit_condition(selection, "WHERE");
                }
            }
            Statement::Delete(delete) => {
                statement::check_delete(self, delete);
                self.visit_table_source(&delete.table);
                if let Some(using) = &delete.using {
                    self.visit_table_source(using);
                }
                if let Some(selection) = &delete.selection {
                    self.visit_condition(selection, "WHERE");
                }
            }
            Statement::Call(call) => {
                statement::check_call(self, call);
                for arg in &call.args {
                    self.visit_expr(arg, ExprPosition::Value);
                }
            }
            Statement::Truncate(truncate) => statement::check_truncate(self, truncate),
            Statement::Merge(merge) => {
                statement::check_merge(self, merge);
                self.visit_table_source(&merge.target);
                self.visit_table_source(&merge.source);
                self.visit_condition(&merge.on, "ON");
                for clause in &merge.clauses {
                    self.visit_merge_clause(clause);
                }
            }
            Statement::Other(_) => {}
        }
    }

    fn visit_insert_into(&mut self, clause: &InsertIntoClause) {
        statement::check_insert_into(self, clause);
        if let Some(condition) = &clause.condition {
            self.visit_condition(condition, "WHEN");
        }
        for value in &clause.values {
            self.visit_expr(value, ExprPosition::Value);
        }
    }

    fn visit_merge_clause(&mut self, clause: &MergeClause) {
        let selection = match clause {
            MergeClause::MatchedUpdate {
                assignments,
                selection,
            } => {
                for assignment in assignments {
                    self.visit_expr(&assignment.value, ExprPosition::Value);
                }
                selection
            }
            MergeClause::MatchedDelete { selection } => selection,
            MergeClause::NotMatchedInsert {
                values, selection, ..
            } => {
                for value in values {
                    self.visit_expr(value, ExprPosition::Value);
                }
                selection
            }
        };
        if let Some(selection) = selection {
            self.visit_condition(selection, "WHERE");
        }
    }

    /// Judge a condition root once, then walk it in condition position.
    fn visit_condition(&mut self, expr: &Expr, clause: &str) {
        condition::check_condition(self, expr, clause);
        self.visit_expr(expr, ExprPosition::Condition);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn visit_query(&mut self, query: &Query) {
        statement::check_query(self, query);
        match query {
            Query::Select(block) => self.visit_select_block(block),
            Query::Union(union) => {
                self.visit_query(&union.left);
                self.visit_query(&union.right);
            }
            Query::Nested(inner) => self.visit_query(inner),
        }
    }

    pub fn visit_select_block(&mut self, block: &SelectBlock) {
        let depth = self.session.enter_select();
        statement::check_select(self, block, depth);

        for item in &block.items {
            self.visit_expr(&item.expr, ExprPosition::Value);
        }
        if let Some(SelectInto::Variables(targets)) = &block.into {
            for target in targets {
                self.visit_expr(target, ExprPosition::Value);
            }
        }
        if let Some(from) = &block.from {
            self.visit_table_source(from);
        }
        if let Some(selection) = &block.selection {
            self.visit_condition(selection, "WHERE");
        }
        if let Some(group_by) = &block.group_by {
            self.visit_group_by(group_by);
        }
        for item in &block.order_by {
            self.visit_expr(&item.expr, ExprPosition::Value);
        }
        if let Some(limit) = &block.limit {
            self.visit_expr(&limit.count, ExprPosition::Value);
            if let Some(offset) = &limit.offset {
                self.visit_expr(offset, ExprPosition::Value);
            }
        }

        self.session.exit_select();
    }

    pub fn visit_group_by(&mut self, group_by: &GroupBy) {
        condition::check_having(self, group_by);
        for item in &group_by.items {
            self.visit_expr(item, ExprPosition::Value);
        }
        if let Some(having) = &group_by.having {
            self.visit_expr(having, ExprPosition::Condition);
        }
    }

    pub fn visit_table_source(&mut self, source: &TableSource) {
        if !objects::check_table_source(self, source) {
            return;
        }
        match source {
            TableSource::Named(_) | TableSource::OracleReference(_) => {}
            TableSource::Subquery { query, .. } => self.visit_query(query),
            TableSource::Function { call, .. } => {
                self.visit_method_invoke(call, ExprPosition::Value);
            }
            TableSource::Join(join) => {
                self.visit_table_source(&join.left);
                self.visit_table_source(&join.right);
                if let Some(on) = &join.on {
                    self.visit_condition(on, "ON");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn visit_expr(&mut self, expr: &Expr, position: ExprPosition) {
        match expr {
            Expr::Identifier(ident) | Expr::Variable(ident) => {
                objects::check_identifier(self, ident);
            }
            Expr::Property { owner, name } => {
                if objects::check_property(self, owner, name) {
                    self.visit_expr(owner, position);
                }
            }
            Expr::Literal(_) | Expr::Placeholder(_) | Expr::AllColumns(_) => {}
            Expr::BinaryOp(binary) => {
                if position == ExprPosition::Condition {
                    condition::check_binary_op(self, binary);
                }
                self.visit_expr(&binary.left, position);
                self.visit_expr(&binary.right, position);
            }
            Expr::Unary { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
                self.visit_expr(expr, position);
            }
            Expr::InList(list) => {
                condition::check_in_list(self, list);
                self.visit_expr(&list.expr, position);
                for item in &list.list {
                    self.visit_expr(item, position);
                }
            }
            Expr::InSubquery { expr, query, .. } => {
                self.visit_expr(expr, position);
                self.visit_query(query);
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.visit_expr(expr, position);
                self.visit_expr(low, position);
                self.visit_expr(high, position);
            }
            Expr::IsNull { expr, .. } => self.visit_expr(expr, position),
            Expr::Like { expr, pattern, .. } => {
                self.visit_expr(expr, position);
                self.visit_expr(pattern, position);
            }
            Expr::MethodInvoke(call) => self.visit_method_invoke(call, position),
            Expr::Exists { query, .. } | Expr::Subquery(query) => self.visit_query(query),
            Expr::Case(case) => self.visit_case(case, position),
        }
    }

    fn visit_method_invoke(&mut self, call: &MethodInvoke, position: ExprPosition) {
        objects::check_function(self, call);
        for arg in &call.args {
            self.visit_expr(arg, position);
        }
    }

    fn visit_case(&mut self, case: &CaseExpr, position: ExprPosition) {
        if let Some(operand) = &case.operand {
            self.visit_expr(operand, position);
        }
        for (when, then) in &case.branches {
            self.visit_expr(when, position);
            self.visit_expr(then, position);
        }
        if let Some(else_result) = &case.else_result {
            self.visit_expr(else_result, position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect};
    use crate::parser::parse_sql;
    use crate::types::ViolationKind;

    fn walk<D: DialectHooks>(hooks: D, sql: &str, config: PolicyConfig) -> Vec<Violation> {
        let statements = parse_sql(sql, hooks.dialect(), 0).unwrap();
        let mut visitor = WallVisitor::new(hooks, Arc::new(config.normalized()));
        visitor.visit_script(&statements);
        visitor.into_violations()
    }

    #[test]
    fn test_discovery_order_is_pre_order_left_to_right() {
        let violations = walk(
            MySqlDialect,
            "SELECT sleep(1), @@version FROM orders WHERE id = 1 OR 1 = 1",
            PolicyConfig::default(),
        );
        let kinds: Vec<_> = violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::UnauthorizedFunction,
                ViolationKind::IllegalObjectAccess,
                ViolationKind::AlwaysTrueCondition,
            ]
        );
    }

    #[test]
    fn test_violation_carries_rendered_sql_and_position() {
        let violations = walk(
            OracleDialect,
            "SELECT id\nFROM orders\nWHERE id = 7 OR 1 = 1",
            PolicyConfig::default(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].sql, "id = 7 OR 1 = 1");
        assert_eq!((violations[0].line, violations[0].column), (3, 7));
    }

    #[test]
    fn test_bitwise_and_xor_only_in_conditions() {
        let config = PolicyConfig {
            condition_op_bitwise_allow: false,
            ..PolicyConfig::default()
        };
        let violations = walk(
            MySqlDialect,
            "SELECT flags & 4 FROM t WHERE flags & 4 = 4",
            config,
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::StructuralAnomaly);

        let violations = walk(
            MySqlDialect,
            "SELECT id FROM t WHERE a = 1 XOR b = 2",
            PolicyConfig::default(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::StructuralAnomaly);
    }

    #[test]
    fn test_join_on_is_a_condition_root() {
        let violations = walk(
            MySqlDialect,
            "SELECT a.id FROM a JOIN b ON a.id = b.id OR 1 = 1",
            PolicyConfig::default(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::AlwaysTrueCondition);
    }

    #[test]
    fn test_in_list_limits() {
        let config = PolicyConfig {
            max_in_list_items: 3,
            ..PolicyConfig::default()
        };
        let violations = walk(
            MySqlDialect,
            "SELECT id FROM t WHERE id IN (1, 2, 3, 4)",
            config,
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::StructuralAnomaly);

        let violations = walk(
            MySqlDialect,
            "SELECT id FROM t WHERE id IN (1, (SELECT id FROM u))",
            PolicyConfig::default(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::StructuralAnomaly);
    }

    #[test]
    fn test_parenthesized_constant_mixed_with_subquery() {
        let violations = walk(
            MySqlDialect,
            "SELECT id FROM t WHERE id IN ((1), (SELECT id FROM u))",
            PolicyConfig::default(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::StructuralAnomaly);
    }

    #[test]
    fn test_generic_over_dialect() {
        let sql = "SELECT 1 FROM dual";
        let config = PolicyConfig {
            table_check_enabled: true,
            ..PolicyConfig::default()
        };
        assert!(walk(OracleDialect, sql, config.clone()).is_empty());
        assert!(walk(MySqlDialect, sql, config.clone()).is_empty());
        assert_eq!(walk(PostgresDialect, sql, config).len(), 1);
    }
}
