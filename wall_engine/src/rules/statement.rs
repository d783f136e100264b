//! Statement rules: kind gates, select / union shape and DML checks.

use crate::ast::{
    CallStatement, DeleteStatement, Expr, InsertIntoClause, InsertStatement, MergeClause,
    MergeStatement, MultiInsertStatement, Query, SelectBlock, SelectInto, SelectStatement,
    Statement, StatementKind, TruncateStatement, UnionQuery, UpdateStatement,
};
use crate::rules::{objects, WallContext};
use crate::types::ViolationKind;

fn report_disallowed<C: WallContext>(cx: &mut C, kind: StatementKind, sql: String) {
    cx.report(
        ViolationKind::DisallowedStatementType,
        format!("{kind} statements are not permitted"),
        sql,
        None,
    );
}

/// Pre-visit gate applied to every statement.
///
/// Unless the policy allows non-base statements, only the base set
/// (select, insert, update, delete, multi-insert, merge, call, and truncate
/// when allowed) may run. The walk continues either way.
pub fn check_statement_kind<C: WallContext>(cx: &mut C, stmt: &Statement) {
    let config = cx.config();
    if config.allow_none_base_statement {
        return;
    }
    let allowed = match stmt.kind() {
        StatementKind::Select
        | StatementKind::Insert
        | StatementKind::Update
        | StatementKind::Delete
        | StatementKind::MultiInsert
        | StatementKind::Merge
        | StatementKind::Call => true,
        StatementKind::Truncate => config.allow_truncate,
        _ => false,
    };
    if !allowed {
        let sql = cx.render(stmt);
        report_disallowed(cx, stmt.kind(), sql);
    }
}

/// More than one statement in a submission is stacked-query injection unless
/// the policy allows it.
pub fn check_multi_statement<C: WallContext>(cx: &mut C, statements: &[Statement]) {
    if statements.len() < 2 || cx.config().multi_statement_allow {
        return;
    }
    let second = &statements[1];
    let sql = cx.render(second);
    cx.report(
        ViolationKind::StructuralAnomaly,
        format!("{} statements in one submission", statements.len()),
        sql,
        Some(second.span()),
    );
}

/// Select gate. Returns false when the statement is rejected outright and
/// its children must not be visited.
pub fn check_select_statement<C: WallContext>(cx: &mut C, stmt: &SelectStatement) -> bool {
    if cx.config().allow_select {
        return true;
    }
    let sql = cx.render(&stmt.query);
    report_disallowed(cx, StatementKind::Select, sql);
    false
}

/// Multi-insert gate, same contract as [`check_select_statement`].
pub fn check_multi_insert<C: WallContext>(cx: &mut C, stmt: &MultiInsertStatement) -> bool {
    if cx.config().allow_insert {
        return true;
    }
    let sql = cx.render(stmt);
    report_disallowed(cx, StatementKind::MultiInsert, sql);
    false
}

/// Select block shape: `SELECT *`, nesting depth, file targets.
///
/// `depth` is the block's nesting level, 1 for a top-level select.
pub fn check_select<C: WallContext>(cx: &mut C, block: &SelectBlock, depth: usize) {
    let config = cx.config();
    let star_denied = !config.select_all_column_allow;
    let outfile_denied = !config.select_into_outfile_allow;
    let max_depth = config.max_subquery_depth;

    if star_denied {
        let star = block
            .items
            .iter()
            .find(|item| matches!(item.expr, Expr::AllColumns(_)));
        if let Some(item) = star {
            let sql = cx.render(&item.expr);
            cx.report(
                ViolationKind::IllegalObjectAccess,
                "SELECT * is not permitted",
                sql,
                Some(block.span),
            );
        }
    }

    // One finding per statement, however many branches go too deep.
    if max_depth > 0 && depth > max_depth && cx.session_mut().claim_depth_report() {
        let sql = cx.render(block);
        cx.report(
            ViolationKind::StructuralAnomaly,
            format!("subquery nesting exceeds {max_depth} levels"),
            sql,
            Some(block.span),
        );
    }

    if outfile_denied {
        let target = match &block.into {
            Some(SelectInto::Outfile(path)) => Some(("OUTFILE", path)),
            Some(SelectInto::Dumpfile(path)) => Some(("DUMPFILE", path)),
            _ => None,
        };
        if let Some((clause, path)) = target {
            let sql = cx.render(block);
            cx.report(
                ViolationKind::IllegalObjectAccess,
                format!("SELECT ... INTO {clause} '{path}' is not permitted"),
                sql,
                Some(block.span),
            );
        }
    }
}

/// A UNION branch without FROM (`UNION SELECT 1, user()`) is the classic
/// exfiltration shape.
pub fn check_union<C: WallContext>(cx: &mut C, union: &UnionQuery) {
    if !cx.config().select_union_check {
        return;
    }
    let right = union.right.first_block();
    if right.from.is_some() {
        return;
    }
    let sql = cx.render(&union.right);
    cx.report(
        ViolationKind::StructuralAnomaly,
        format!("{} branch without FROM", union.op.as_sql()),
        sql,
        Some(right.span),
    );
}

pub fn check_insert<C: WallContext>(cx: &mut C, stmt: &InsertStatement) {
    if !cx.config().allow_insert {
        let sql = cx.render(stmt);
        report_disallowed(cx, StatementKind::Insert, sql);
    }
    objects::check_expr_table_source(cx, &stmt.table);
}

/// Each `INTO` arm of a multi-insert checks its target like a plain insert.
pub fn check_insert_into<C: WallContext>(cx: &mut C, clause: &InsertIntoClause) {
    objects::check_expr_table_source(cx, &clause.table);
}

fn check_unbounded<C: WallContext>(
    cx: &mut C,
    kind: StatementKind,
    selection: Option<&Expr>,
    sql: String,
) {
    if selection.is_none() && cx.config().require_where_on_mutation {
        cx.report(
            ViolationKind::UnboundedMutation,
            format!("{kind} without WHERE clause"),
            sql,
            None,
        );
    }
}

/// Update gate and WHERE presence. The target and the WHERE predicate are
/// checked when the visitor reaches them.
pub fn check_update<C: WallContext>(cx: &mut C, stmt: &UpdateStatement) {
    let sql = cx.render(stmt);
    if !cx.config().allow_update {
        report_disallowed(cx, StatementKind::Update, sql.clone());
    }
    check_unbounded(cx, StatementKind::Update, stmt.selection.as_ref(), sql);
}

pub fn check_delete<C: WallContext>(cx: &mut C, stmt: &DeleteStatement) {
    let sql = cx.render(stmt);
    if !cx.config().allow_delete {
        report_disallowed(cx, StatementKind::Delete, sql.clone());
    }
    check_unbounded(cx, StatementKind::Delete, stmt.selection.as_ref(), sql);
}

/// Truncate targets are checked as tables.
///
/// The pre-visit gate already rejects truncate when non-base statements are
/// disallowed, so this only reports the gate when they are allowed.
pub fn check_truncate<C: WallContext>(cx: &mut C, stmt: &TruncateStatement) {
    let config = cx.config();
    if config.allow_none_base_statement && !config.allow_truncate {
        let sql = cx.render(stmt);
        report_disallowed(cx, StatementKind::Truncate, sql);
    }
    for table in &stmt.tables {
        objects::check_table_name(cx, table);
    }
}

/// Procedures go through the function deny list.
pub fn check_call<C: WallContext>(cx: &mut C, stmt: &CallStatement) {
    let sql = cx.render(stmt);
    objects::check_callable(cx, &stmt.procedure, sql, stmt.procedure.span());
}

/// MERGE is gated by the actions it performs.
pub fn check_merge<C: WallContext>(cx: &mut C, stmt: &MergeStatement) {
    let config = cx.config();
    let mut denied: Vec<StatementKind> = Vec::new();
    for clause in &stmt.clauses {
        let (kind, allowed) = match clause {
            MergeClause::MatchedUpdate { .. } => (StatementKind::Update, config.allow_update),
            MergeClause::MatchedDelete { .. } => (StatementKind::Delete, config.allow_delete),
            MergeClause::NotMatchedInsert { .. } => (StatementKind::Insert, config.allow_insert),
        };
        if !allowed && !denied.contains(&kind) {
            denied.push(kind);
        }
    }
    if denied.is_empty() {
        return;
    }
    let sql = cx.render(stmt);
    for kind in denied {
        cx.report(
            ViolationKind::DisallowedStatementType,
            format!("MERGE performs {kind}, which is not permitted"),
            sql.clone(),
            None,
        );
    }
}

/// Query nodes have no rules of their own beyond unions.
pub fn check_query<C: WallContext>(cx: &mut C, query: &Query) {
    if let Query::Union(union) = query {
        check_union(cx, union);
    }
}
