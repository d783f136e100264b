//! Object rules: identifiers, variables, property access, tables, functions.

use crate::ast::{
    Expr, ExprTableSource, Ident, MethodInvoke, ObjectName, OracleTableReference, TableSource,
};
use crate::names;
use crate::rules::WallContext;
use crate::types::{Span, ViolationKind};

/// Forbidden variant identifiers and system variables.
///
/// Applies to bare identifiers (`current_user`) and `@` / `@@` variables.
pub fn check_identifier<C: WallContext>(cx: &mut C, ident: &Ident) {
    if !cx.config().variant_check_enabled {
        return;
    }
    let normalized = cx.normalize_ident(ident);
    let name = names::strip_variable_scope(&normalized);
    if cx.config().permitted_variants.contains(name.as_ref()) {
        let sql = cx.render(ident);
        cx.report(
            ViolationKind::IllegalObjectAccess,
            format!("direct reference to '{name}' is not permitted"),
            sql,
            Some(ident.span),
        );
    }
}

/// Property access `owner.name`.
///
/// Returns whether the visitor should descend into the owner. A property on
/// a denied schema is reported here and its owner is not revisited.
pub fn check_property<C: WallContext>(cx: &mut C, owner: &Expr, name: &Ident) -> bool {
    let Expr::Identifier(schema) = owner else {
        return true;
    };
    let normalized = cx.normalize_ident(schema);
    if !cx.config().denied_schemas.contains(&normalized) {
        return true;
    }
    let property = Expr::Property {
        owner: Box::new(owner.clone()),
        name: name.clone(),
    };
    let sql = cx.render(&property);
    cx.report(
        ViolationKind::IllegalObjectAccess,
        format!("access to schema '{normalized}' is not permitted"),
        sql,
        Some(schema.span),
    );
    false
}

/// Table permission and schema checks for a (possibly qualified) name.
pub fn check_table_name<C: WallContext>(cx: &mut C, name: &ObjectName) {
    let denied_schema = name.qualifiers().iter().find_map(|q| {
        let schema = cx.normalize_ident(q);
        cx.config().denied_schemas.contains(&schema).then_some(schema)
    });
    if let Some(schema) = denied_schema {
        let sql = cx.render(name);
        cx.report(
            ViolationKind::IllegalObjectAccess,
            format!("access to schema '{schema}' is not permitted"),
            sql,
            Some(name.span()),
        );
        return;
    }

    if !cx.is_permit_table(name) {
        let normalized = cx.normalize(name);
        let sql = cx.render(name);
        cx.report(
            ViolationKind::UnauthorizedTable,
            format!("table '{normalized}' is not in the permitted set"),
            sql,
            Some(name.span()),
        );
    }
}

pub fn check_expr_table_source<C: WallContext>(cx: &mut C, table: &ExprTableSource) {
    check_table_name(cx, &table.name);
}

/// Oracle decorations do not change which table is read.
pub fn check_oracle_table_reference<C: WallContext>(cx: &mut C, reference: &OracleTableReference) {
    check_expr_table_source(cx, &reference.table);
}

/// Check a table source; returns whether its children need visiting.
///
/// Named sources are fully handled here. Subqueries, joins and table
/// functions are left to the visitor.
pub fn check_table_source<C: WallContext>(cx: &mut C, source: &TableSource) -> bool {
    match source {
        TableSource::Named(table) => {
            check_expr_table_source(cx, table);
            false
        }
        TableSource::OracleReference(reference) => {
            check_oracle_table_reference(cx, reference);
            false
        }
        TableSource::Subquery { .. } | TableSource::Function { .. } | TableSource::Join(_) => true,
    }
}

/// Deny-list and strict-whitelist check for a callable name.
pub fn check_callable<C: WallContext>(cx: &mut C, name: &ObjectName, sql: String, span: Span) {
    let normalized = cx.normalize(name);
    let config = cx.config();
    if config.is_function_permitted(&normalized) {
        return;
    }
    let message = if config.is_function_denied(&normalized) {
        format!("function '{normalized}' is denied")
    } else if config.strict_function_whitelist {
        format!("function '{normalized}' is not in the permitted set")
    } else {
        return;
    };
    cx.report(ViolationKind::UnauthorizedFunction, message, sql, Some(span));
}

pub fn check_function<C: WallContext>(cx: &mut C, call: &MethodInvoke) {
    let sql = cx.render(call);
    check_callable(cx, &call.name, sql, call.span);
}
