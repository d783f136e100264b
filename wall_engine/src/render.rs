//! Deterministic rendering of AST nodes back to dialect SQL.
//!
//! Violations carry the offending construct as text, so rendering must keep
//! clause order and operator grouping intact. Keywords are emitted uppercase,
//! quoted identifiers use the dialect's quote character, and parentheses are
//! inserted only where operator precedence requires them.

use crate::ast::{
    Assignment, BinaryExpr, BinaryOperator, CallStatement, CaseExpr, DeleteStatement, Expr,
    ExprTableSource, GroupBy, Ident, InListExpr, InsertIntoClause, InsertSource, InsertStatement,
    JoinKind, Literal, MergeClause, MergeStatement, MethodInvoke, MultiInsertKind,
    MultiInsertStatement, ObjectName, OracleTableReference, Query, SelectBlock, SelectInto,
    Statement, TableSource, TruncateStatement, UnaryOperator, UpdateStatement,
};
use crate::dialect::DialectHooks;

/// Output buffer bound to a dialect.
pub struct SqlWriter<'h> {
    out: String,
    hooks: &'h dyn DialectHooks,
}

impl<'h> SqlWriter<'h> {
    #[must_use]
    pub fn new(hooks: &'h dyn DialectHooks) -> Self {
        Self {
            out: String::new(),
            hooks,
        }
    }

    pub fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn node<N: ToSql + ?Sized>(&mut self, node: &N) {
        node.write_sql(self);
    }

    /// Write `items` separated by `sep`.
    pub fn list<N: ToSql>(&mut self, items: &[N], sep: &str) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            item.write_sql(self);
        }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

/// A node that can render itself as SQL.
pub trait ToSql {
    fn write_sql(&self, w: &mut SqlWriter<'_>);
}

/// Render any node with the given dialect hooks.
#[must_use]
pub fn to_sql<N: ToSql + ?Sized>(node: &N, hooks: &dyn DialectHooks) -> String {
    let mut w = SqlWriter::new(hooks);
    node.write_sql(&mut w);
    w.finish()
}

// ---------------------------------------------------------------------------
// Names and literals
// ---------------------------------------------------------------------------

impl ToSql for Ident {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        if self.quote.is_none() {
            w.push(&self.value);
            return;
        }
        let q = w.hooks.quote_char();
        let mut quoted = String::with_capacity(self.value.len() + 2);
        quoted.push(q);
        for c in self.value.chars() {
            if c == q {
                quoted.push(q);
            }
            quoted.push(c);
        }
        quoted.push(q);
        w.push(&quoted);
    }
}

impl ToSql for ObjectName {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.list(&self.0, ".");
    }
}

impl ToSql for Literal {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::Number(n) => w.push(n),
            Self::String(s) => {
                let escaped = if w.hooks.backslash_escapes() {
                    s.replace('\\', "\\\\").replace('\'', "''")
                } else {
                    s.replace('\'', "''")
                };
                w.push("'");
                w.push(&escaped);
                w.push("'");
            }
            Self::Boolean(true) => w.push("TRUE"),
            Self::Boolean(false) => w.push("FALSE"),
            Self::Null => w.push("NULL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

const PREC_PREDICATE: u8 = 5;
const PREC_UNARY: u8 = 11;
const PREC_PRIMARY: u8 = 12;

fn binary_precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or => 1,
        BinaryOperator::Xor => 2,
        BinaryOperator::And => 3,
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => PREC_PREDICATE,
        BinaryOperator::BitOr => 6,
        BinaryOperator::BitAnd => 7,
        BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 8,
        BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 9,
        BinaryOperator::BitXor => 10,
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::BinaryOp(b) => binary_precedence(b.op),
        Expr::Unary {
            op: UnaryOperator::Not,
            ..
        } => 4,
        Expr::Unary { .. } => PREC_UNARY,
        Expr::InList(_)
        | Expr::InSubquery { .. }
        | Expr::Between { .. }
        | Expr::IsNull { .. }
        | Expr::Like { .. } => PREC_PREDICATE,
        _ => PREC_PRIMARY,
    }
}

/// Write `expr`, parenthesized when it binds looser than `min`.
fn write_operand(w: &mut SqlWriter<'_>, expr: &Expr, min: u8) {
    if precedence(expr) < min {
        w.push("(");
        expr.write_sql(w);
        w.push(")");
    } else {
        expr.write_sql(w);
    }
}

fn write_not(w: &mut SqlWriter<'_>, negated: bool, keyword: &str) {
    w.push(if negated { " NOT " } else { " " });
    w.push(keyword);
    w.push(" ");
}

impl ToSql for BinaryExpr {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        let prec = binary_precedence(self.op);
        write_operand(w, &self.left, prec);
        w.push(" ");
        w.push(self.op.as_sql());
        w.push(" ");
        write_operand(w, &self.right, prec + 1);
    }
}

impl ToSql for InListExpr {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        write_operand(w, &self.expr, PREC_PREDICATE + 1);
        write_not(w, self.negated, "IN");
        w.push("(");
        w.list(&self.list, ", ");
        w.push(")");
    }
}

impl ToSql for MethodInvoke {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.node(&self.name);
        w.push("(");
        if self.distinct {
            w.push("DISTINCT ");
        }
        w.list(&self.args, ", ");
        w.push(")");
    }
}

impl ToSql for CaseExpr {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("CASE");
        if let Some(operand) = &self.operand {
            w.push(" ");
            w.node(operand.as_ref());
        }
        for (when, then) in &self.branches {
            w.push(" WHEN ");
            w.node(when);
            w.push(" THEN ");
            w.node(then);
        }
        if let Some(else_result) = &self.else_result {
            w.push(" ELSE ");
            w.node(else_result.as_ref());
        }
        w.push(" END");
    }
}

impl ToSql for Expr {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::Identifier(ident) => w.node(ident),
            Self::Property { owner, name } => {
                write_operand(w, owner, PREC_PRIMARY);
                w.push(".");
                w.node(name);
            }
            Self::Literal(lit) => w.node(lit),
            Self::Variable(var) => w.push(&var.value),
            Self::Placeholder(p) => w.push(p),
            Self::AllColumns(None) => w.push("*"),
            Self::AllColumns(Some(qualifier)) => {
                w.node(qualifier);
                w.push(".*");
            }
            Self::BinaryOp(b) => w.node(b),
            Self::Unary { op, expr } => match op {
                UnaryOperator::Not => {
                    w.push("NOT ");
                    write_operand(w, expr, 4);
                }
                UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitNot => {
                    w.push(match op {
                        UnaryOperator::Minus => "-",
                        UnaryOperator::Plus => "+",
                        _ => "~",
                    });
                    write_operand(w, expr, PREC_UNARY);
                }
            },
            Self::Nested(inner) => {
                w.push("(");
                w.node(inner.as_ref());
                w.push(")");
            }
            Self::InList(list) => w.node(list),
            Self::InSubquery {
                expr,
                query,
                negated,
            } => {
                write_operand(w, expr, PREC_PREDICATE + 1);
                write_not(w, *negated, "IN");
                w.push("(");
                w.node(query.as_ref());
                w.push(")");
            }
            Self::Between {
                expr,
                negated,
                low,
                high,
            } => {
                write_operand(w, expr, PREC_PREDICATE + 1);
                write_not(w, *negated, "BETWEEN");
                write_operand(w, low, PREC_PREDICATE + 1);
                w.push(" AND ");
                write_operand(w, high, PREC_PREDICATE + 1);
            }
            Self::IsNull { expr, negated } => {
                write_operand(w, expr, PREC_PREDICATE + 1);
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::Like {
                expr,
                negated,
                pattern,
            } => {
                write_operand(w, expr, PREC_PREDICATE + 1);
                write_not(w, *negated, "LIKE");
                write_operand(w, pattern, PREC_PREDICATE + 1);
            }
            Self::MethodInvoke(call) => w.node(call),
            Self::Exists { query, negated } => {
                w.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                w.node(query.as_ref());
                w.push(")");
            }
            Self::Subquery(query) => {
                w.push("(");
                w.node(query.as_ref());
                w.push(")");
            }
            Self::Case(case) => w.node(case),
            Self::Cast { expr, data_type } => {
                w.push("CAST(");
                w.node(expr.as_ref());
                w.push(" AS ");
                w.push(data_type);
                w.push(")");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Table sources and queries
// ---------------------------------------------------------------------------

fn write_alias(w: &mut SqlWriter<'_>, alias: Option<&Ident>) {
    if let Some(alias) = alias {
        w.push(" ");
        w.node(alias);
    }
}

impl ToSql for ExprTableSource {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.node(&self.name);
        write_alias(w, self.alias.as_ref());
    }
}

impl ToSql for OracleTableReference {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.node(&self.table.name);
        if let Some(partition) = &self.partition {
            w.push(" PARTITION (");
            w.node(partition);
            w.push(")");
        }
        if let Some(sample) = &self.sample {
            w.push(" SAMPLE (");
            w.push(sample);
            w.push(")");
        }
        write_alias(w, self.table.alias.as_ref());
    }
}

impl ToSql for TableSource {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::Named(t) => w.node(t),
            Self::OracleReference(r) => w.node(r),
            Self::Subquery { query, alias } => {
                w.push("(");
                w.node(query.as_ref());
                w.push(")");
                write_alias(w, alias.as_ref());
            }
            Self::Function { call, alias } => {
                w.node(call);
                write_alias(w, alias.as_ref());
            }
            Self::Join(join) => {
                w.node(&join.left);
                w.push(match join.kind {
                    JoinKind::Comma => ", ",
                    JoinKind::Inner => " JOIN ",
                    JoinKind::Left => " LEFT JOIN ",
                    JoinKind::Right => " RIGHT JOIN ",
                    JoinKind::Full => " FULL JOIN ",
                    JoinKind::Cross => " CROSS JOIN ",
                });
                if matches!(join.right, TableSource::Join(_)) {
                    w.push("(");
                    w.node(&join.right);
                    w.push(")");
                } else {
                    w.node(&join.right);
                }
                if let Some(on) = &join.on {
                    w.push(" ON ");
                    w.node(on);
                } else if !join.using.is_empty() {
                    w.push(" USING (");
                    w.list(&join.using, ", ");
                    w.push(")");
                }
            }
        }
    }
}

impl ToSql for GroupBy {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        if !self.items.is_empty() {
            w.push("GROUP BY ");
            w.list(&self.items, ", ");
        }
        if let Some(having) = &self.having {
            if !self.items.is_empty() {
                w.push(" ");
            }
            w.push("HAVING ");
            w.node(having);
        }
    }
}

impl ToSql for SelectBlock {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.node(&item.expr);
            if let Some(alias) = &item.alias {
                w.push(" AS ");
                w.node(alias);
            }
        }
        match &self.into {
            Some(SelectInto::Outfile(path)) => {
                w.push(" INTO OUTFILE ");
                w.node(&Literal::String(path.clone()));
            }
            Some(SelectInto::Dumpfile(path)) => {
                w.push(" INTO DUMPFILE ");
                w.node(&Literal::String(path.clone()));
            }
            Some(SelectInto::Variables(targets)) => {
                w.push(" INTO ");
                w.list(targets, ", ");
            }
            None => {}
        }
        if let Some(from) = &self.from {
            w.push(" FROM ");
            w.node(from);
        }
        if let Some(selection) = &self.selection {
            w.push(" WHERE ");
            w.node(selection);
        }
        if let Some(group_by) = &self.group_by {
            w.push(" ");
            w.node(group_by);
        }
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.node(&item.expr);
                match item.desc {
                    Some(true) => w.push(" DESC"),
                    Some(false) => w.push(" ASC"),
                    None => {}
                }
            }
        }
        if let Some(limit) = &self.limit {
            w.push(" LIMIT ");
            w.node(&limit.count);
            if let Some(offset) = &limit.offset {
                w.push(" OFFSET ");
                w.node(offset);
            }
        }
    }
}

impl ToSql for Query {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::Select(block) => w.node(block.as_ref()),
            Self::Union(u) => {
                w.node(&u.left);
                w.push(" ");
                w.push(u.op.as_sql());
                w.push(" ");
                if matches!(u.right, Query::Union(_)) {
                    w.push("(");
                    w.node(&u.right);
                    w.push(")");
                } else {
                    w.node(&u.right);
                }
            }
            Self::Nested(inner) => {
                w.push("(");
                w.node(inner.as_ref());
                w.push(")");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

impl ToSql for Assignment {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.node(&self.column);
        w.push(" = ");
        w.node(&self.value);
    }
}

fn write_paren_idents(w: &mut SqlWriter<'_>, idents: &[Ident]) {
    if !idents.is_empty() {
        w.push(" (");
        w.list(idents, ", ");
        w.push(")");
    }
}

fn write_where(w: &mut SqlWriter<'_>, selection: Option<&Expr>) {
    if let Some(selection) = selection {
        w.push(" WHERE ");
        w.node(selection);
    }
}

impl ToSql for InsertStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("INSERT INTO ");
        w.node(&self.table);
        write_paren_idents(w, &self.columns);
        match &self.source {
            InsertSource::Values(rows) => {
                w.push(" VALUES ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push("(");
                    w.list(row, ", ");
                    w.push(")");
                }
            }
            InsertSource::Query(query) => {
                w.push(" ");
                w.node(query.as_ref());
            }
        }
    }
}

impl ToSql for InsertIntoClause {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("INTO ");
        w.node(&self.table);
        write_paren_idents(w, &self.columns);
        if !self.values.is_empty() {
            w.push(" VALUES (");
            w.list(&self.values, ", ");
            w.push(")");
        }
    }
}

impl ToSql for MultiInsertStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push(match self.kind {
            MultiInsertKind::All => "INSERT ALL",
            MultiInsertKind::First => "INSERT FIRST",
        });
        let mut previous: Option<(&Option<Expr>, bool)> = None;
        for clause in &self.clauses {
            let arm = (&clause.condition, clause.is_else);
            if previous != Some(arm) || (clause.condition.is_none() && !clause.is_else) {
                if clause.is_else {
                    w.push(" ELSE");
                } else if let Some(condition) = &clause.condition {
                    w.push(" WHEN ");
                    w.node(condition);
                    w.push(" THEN");
                }
            }
            previous = Some(arm);
            w.push(" ");
            w.node(clause);
        }
        w.push(" ");
        w.node(&self.source);
    }
}

impl ToSql for UpdateStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("UPDATE ");
        w.node(&self.table);
        w.push(" SET ");
        w.list(&self.assignments, ", ");
        if let Some(from) = &self.from {
            w.push(" FROM ");
            w.node(from);
        }
        write_where(w, self.selection.as_ref());
    }
}

impl ToSql for DeleteStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("DELETE FROM ");
        w.node(&self.table);
        if let Some(using) = &self.using {
            w.push(" USING ");
            w.node(using);
        }
        write_where(w, self.selection.as_ref());
    }
}

impl ToSql for CallStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("CALL ");
        w.node(&self.procedure);
        w.push("(");
        w.list(&self.args, ", ");
        w.push(")");
    }
}

impl ToSql for TruncateStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("TRUNCATE TABLE ");
        w.list(&self.tables, ", ");
    }
}

impl ToSql for MergeClause {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::MatchedUpdate {
                assignments,
                selection,
            } => {
                w.push("WHEN MATCHED THEN UPDATE SET ");
                w.list(assignments, ", ");
                write_where(w, selection.as_ref());
            }
            Self::MatchedDelete { selection } => {
                w.push("WHEN MATCHED THEN DELETE");
                write_where(w, selection.as_ref());
            }
            Self::NotMatchedInsert {
                columns,
                values,
                selection,
            } => {
                w.push("WHEN NOT MATCHED THEN INSERT");
                write_paren_idents(w, columns);
                w.push(" VALUES (");
                w.list(values, ", ");
                w.push(")");
                write_where(w, selection.as_ref());
            }
        }
    }
}

impl ToSql for MergeStatement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("MERGE INTO ");
        w.node(&self.target);
        w.push(" USING ");
        w.node(&self.source);
        w.push(" ON ");
        w.node(&self.on);
        for clause in &self.clauses {
            w.push(" ");
            w.node(clause);
        }
    }
}

impl ToSql for Statement {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Self::Select(s) => w.node(&s.query),
            Self::Insert(s) => w.node(s),
            Self::MultiInsert(s) => w.node(s),
            Self::Update(s) => w.node(s),
            Self::Delete(s) => w.node(s),
            Self::Call(s) => w.node(s),
            Self::Truncate(s) => w.node(s),
            Self::Merge(s) => w.node(s),
            Self::Other(s) => w.push(&s.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, OracleDialect, PostgresDialect};
    use crate::parser::parse_sql;
    use crate::types::Dialect;

    fn roundtrip(sql: &str, dialect: Dialect) -> String {
        let stmts = parse_sql(sql, dialect, 0).unwrap();
        match dialect {
            Dialect::MySql => to_sql(&stmts[0], &MySqlDialect),
            Dialect::Oracle => to_sql(&stmts[0], &OracleDialect),
            Dialect::Postgres => to_sql(&stmts[0], &PostgresDialect),
        }
    }

    #[test]
    fn test_keywords_uppercase_and_clause_order() {
        assert_eq!(
            roundtrip(
                "select a, b x from t where a = 1 group by a having count(*) > 1 order by a desc limit 5",
                Dialect::MySql
            ),
            "SELECT a, b AS x FROM t WHERE a = 1 GROUP BY a HAVING count(*) > 1 ORDER BY a DESC LIMIT 5"
        );
    }

    #[test]
    fn test_quoted_identifiers_use_dialect_quote() {
        assert_eq!(
            roundtrip("SELECT `Name` FROM `Orders`", Dialect::MySql),
            "SELECT `Name` FROM `Orders`"
        );
        assert_eq!(
            roundtrip("SELECT \"Name\" FROM \"Orders\"", Dialect::Oracle),
            "SELECT \"Name\" FROM \"Orders\""
        );
    }

    #[test]
    fn test_parentheses_preserved() {
        assert_eq!(
            roundtrip("SELECT 1 FROM t WHERE (a = 1 OR b = 2) AND c = 3", Dialect::MySql),
            "SELECT 1 FROM t WHERE (a = 1 OR b = 2) AND c = 3"
        );
    }

    #[test]
    fn test_synthesized_tree_gets_parentheses() {
        let or = Expr::binary(
            Expr::Identifier(Ident::new("a")),
            BinaryOperator::Or,
            Expr::Identifier(Ident::new("b")),
        );
        let and = Expr::binary(or, BinaryOperator::And, Expr::Identifier(Ident::new("c")));
        assert_eq!(to_sql(&and, &MySqlDialect), "(a OR b) AND c");
    }

    #[test]
    fn test_mysql_bang_keeps_grouping() {
        assert_eq!(
            roundtrip("SELECT 1 FROM t WHERE !a = 1", Dialect::MySql),
            "SELECT 1 FROM t WHERE (NOT a) = 1"
        );
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(
            roundtrip("SELECT 'it''s'", Dialect::Postgres),
            "SELECT 'it''s'"
        );
        assert_eq!(roundtrip(r"SELECT 'a\\b'", Dialect::MySql), r"SELECT 'a\\b'");
    }

    #[test]
    fn test_union_and_oracle_reference() {
        assert_eq!(
            roundtrip(
                "SELECT a FROM t PARTITION (p1) x UNION ALL SELECT b FROM dual",
                Dialect::Oracle
            ),
            "SELECT a FROM t PARTITION (p1) x UNION ALL SELECT b FROM dual"
        );
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            roundtrip("update orders set status='x' where id=1", Dialect::MySql),
            "UPDATE orders SET status = 'x' WHERE id = 1"
        );
        assert_eq!(
            roundtrip("truncate orders", Dialect::MySql),
            "TRUNCATE TABLE orders"
        );
        assert_eq!(
            roundtrip(
                "INSERT ALL INTO a VALUES (1) INTO b VALUES (2) SELECT * FROM dual",
                Dialect::Oracle
            ),
            "INSERT ALL INTO a VALUES (1) INTO b VALUES (2) SELECT * FROM dual"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let sql = "SELECT * FROM a JOIN b ON a.id = b.id WHERE a.x IN (1, 2) AND b.y LIKE '%z'";
        assert_eq!(roundtrip(sql, Dialect::MySql), roundtrip(sql, Dialect::MySql));
        assert_eq!(roundtrip(sql, Dialect::MySql), sql);
    }
}
