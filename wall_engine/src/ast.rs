//! Closed AST model consumed by the wall visitor.
//!
//! The tree is produced by [`crate::parser`] and only ever borrowed by the
//! traversal. Every variant has exactly one handler in
//! [`crate::visitor::WallVisitor`]; adding a variant is a compile error until
//! the visitor and renderer learn about it.
//!
//! Dialect extensions live beside their base shapes:
//! [`TableSource::OracleReference`] decorates a plain [`ExprTableSource`], and
//! [`Statement::MultiInsert`] carries Oracle `INSERT ALL|FIRST` clauses.

use crate::types::Span;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// A single identifier as written, with its quote style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Unquoted text (escaped quotes collapsed).
    pub value: String,
    /// Opening quote character, if the identifier was quoted.
    pub quote: Option<char>,
    /// Position of the first character.
    pub span: Span,
}

impl Ident {
    /// Unquoted identifier with no position.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: None,
            span: Span::default(),
        }
    }

    /// Quoted identifier with no position.
    pub fn quoted(value: impl Into<String>, quote: char) -> Self {
        Self {
            value: value.into(),
            quote: Some(quote),
            span: Span::default(),
        }
    }

    /// Attach a source position.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Possibly qualified object name: `schema.table`, `pkg.proc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName(pub Vec<Ident>);

impl ObjectName {
    /// Terminal part (the relation or function name).
    #[must_use]
    pub fn last(&self) -> Option<&Ident> {
        self.0.last()
    }

    /// Everything but the terminal part.
    #[must_use]
    pub fn qualifiers(&self) -> &[Ident] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Position of the first part.
    #[must_use]
    pub fn span(&self) -> Span {
        self.0.first().map(|i| i.span).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Numeric literal as written (`1`, `2.5e3`, `0x41`).
    Number(String),
    /// String literal, unescaped.
    String(String),
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// `NULL`.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Xor,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOperator {
    /// `AND`, `OR`, `XOR`.
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor)
    }

    /// `=`, `<>`, `<`, `<=`, `>`, `>=`.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// `&`, `|`, `^`.
    #[must_use]
    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::BitAnd | Self::BitOr | Self::BitXor)
    }

    /// Canonical SQL spelling.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOperator,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InListExpr {
    pub expr: Box<Expr>,
    pub list: Vec<Expr>,
    pub negated: bool,
}

/// Function or procedure invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvoke {
    /// Possibly qualified callee (`sleep`, `dbms_lock.sleep`).
    pub name: ObjectName,
    pub args: Vec<Expr>,
    pub distinct: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub branches: Vec<(Expr, Expr)>,
    pub else_result: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare or quoted column / variant name.
    Identifier(Ident),
    /// `owner.name`; `a.b.c` nests as `Property(Property(a, b), c)`.
    Property { owner: Box<Expr>, name: Ident },
    Literal(Literal),
    /// `@user` or `@@system` variable; `value` keeps the sigil.
    Variable(Ident),
    /// Bind placeholder as written.
    Placeholder(String),
    /// `*` or `qualifier.*`.
    AllColumns(Option<ObjectName>),
    BinaryOp(BinaryExpr),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    /// Parenthesized expression.
    Nested(Box<Expr>),
    InList(InListExpr),
    InSubquery {
        expr: Box<Expr>,
        query: Box<Query>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        negated: bool,
        pattern: Box<Expr>,
    },
    MethodInvoke(MethodInvoke),
    Exists {
        query: Box<Query>,
        negated: bool,
    },
    Subquery(Box<Query>),
    Case(CaseExpr),
    /// `CAST(expr AS type)` and PostgreSQL `expr::type`.
    Cast {
        expr: Box<Expr>,
        data_type: String,
    },
}

impl Expr {
    /// Shorthand for building a binary node.
    #[must_use]
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp(BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// Best known source position of the expression.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        let span = match self {
            Self::Identifier(ident) | Self::Variable(ident) => ident.span,
            Self::Property { owner, .. } => return owner.span(),
            Self::MethodInvoke(call) => call.span,
            Self::BinaryOp(b) => return b.left.span().or_else(|| b.right.span()),
            Self::Unary { expr, .. }
            | Self::Nested(expr)
            | Self::InSubquery { expr, .. }
            | Self::Between { expr, .. }
            | Self::IsNull { expr, .. }
            | Self::Like { expr, .. }
            | Self::Cast { expr, .. } => return expr.span(),
            Self::InList(list) => return list.expr.span(),
            Self::AllColumns(Some(name)) => name.span(),
            Self::Subquery(query) | Self::Exists { query, .. } => query.span(),
            Self::Literal(_) | Self::Placeholder(_) | Self::AllColumns(None) | Self::Case(_) => {
                return None
            }
        };
        (span != Span::default()).then_some(span)
    }
}

// ---------------------------------------------------------------------------
// Table sources
// ---------------------------------------------------------------------------

/// Table source whose expression is a plain (possibly qualified) name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprTableSource {
    pub name: ObjectName,
    pub alias: Option<Ident>,
}

/// Oracle table reference: a named table with `PARTITION` / `SAMPLE` decorations.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleTableReference {
    pub table: ExprTableSource,
    pub partition: Option<Ident>,
    /// Sample percentage as written.
    pub sample: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Comma-separated FROM list.
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSource {
    pub left: TableSource,
    pub kind: JoinKind,
    pub right: TableSource,
    pub on: Option<Expr>,
    pub using: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Named(ExprTableSource),
    OracleReference(OracleTableReference),
    Subquery {
        query: Box<Query>,
        alias: Option<Ident>,
    },
    /// Table-valued function call (`generate_series(1, 10)`).
    Function {
        call: MethodInvoke,
        alias: Option<Ident>,
    },
    Join(Box<JoinSource>),
}

impl TableSource {
    /// The named table this source reads directly, if any.
    #[must_use]
    pub fn as_named(&self) -> Option<&ExprTableSource> {
        match self {
            Self::Named(t) => Some(t),
            Self::OracleReference(r) => Some(&r.table),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<Ident>,
}

/// `SELECT ... INTO` target.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectInto {
    Outfile(String),
    Dumpfile(String),
    Variables(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub items: Vec<Expr>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    /// `Some(true)` for DESC, `Some(false)` for an explicit ASC.
    pub desc: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub count: Expr,
    pub offset: Option<Expr>,
}

/// One `SELECT ... FROM ... WHERE ...` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBlock {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub into: Option<SelectInto>,
    pub from: Option<TableSource>,
    pub selection: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Limit>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
    Minus,
}

impl SetOperator {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
            Self::Minus => "MINUS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionQuery {
    pub left: Query,
    pub op: SetOperator,
    pub right: Query,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select(Box<SelectBlock>),
    Union(Box<UnionQuery>),
    /// Parenthesized query.
    Nested(Box<Query>),
}

impl Query {
    /// Position of the first select block.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Select(block) => block.span,
            Self::Union(u) => u.left.span(),
            Self::Nested(q) => q.span(),
        }
    }

    /// First select block reached through unions and parentheses.
    #[must_use]
    pub fn first_block(&self) -> &SelectBlock {
        match self {
            Self::Select(block) => block,
            Self::Union(u) => u.left.first_block(),
            Self::Nested(q) => q.first_block(),
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ObjectName,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub query: Query,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: ExprTableSource,
    pub columns: Vec<Ident>,
    pub source: InsertSource,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiInsertKind {
    All,
    First,
}

/// One `[WHEN cond THEN | ELSE] INTO t (cols) VALUES (...)` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertIntoClause {
    pub condition: Option<Expr>,
    pub is_else: bool,
    pub table: ExprTableSource,
    pub columns: Vec<Ident>,
    pub values: Vec<Expr>,
}

/// Oracle `INSERT ALL|FIRST ... SELECT ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiInsertStatement {
    pub kind: MultiInsertKind,
    pub clauses: Vec<InsertIntoClause>,
    pub source: Query,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: TableSource,
    pub assignments: Vec<Assignment>,
    /// PostgreSQL `UPDATE ... FROM`.
    pub from: Option<TableSource>,
    pub selection: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: TableSource,
    /// PostgreSQL `DELETE ... USING`.
    pub using: Option<TableSource>,
    pub selection: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStatement {
    pub procedure: ObjectName,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateStatement {
    pub tables: Vec<ObjectName>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeClause {
    MatchedUpdate {
        assignments: Vec<Assignment>,
        selection: Option<Expr>,
    },
    MatchedDelete {
        selection: Option<Expr>,
    },
    NotMatchedInsert {
        columns: Vec<Ident>,
        values: Vec<Expr>,
        selection: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeStatement {
    pub target: TableSource,
    pub source: TableSource,
    pub on: Expr,
    pub clauses: Vec<MergeClause>,
    pub span: Span,
}

/// Statement the engine does not model structurally (DDL, DCL, session).
#[derive(Debug, Clone, PartialEq)]
pub struct OtherStatement {
    pub kind: StatementKind,
    /// Source text of the statement, trimmed.
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    MultiInsert(MultiInsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Call(CallStatement),
    Truncate(TruncateStatement),
    Merge(MergeStatement),
    Other(OtherStatement),
}

impl Statement {
    #[must_use]
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::MultiInsert(_) => StatementKind::MultiInsert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::Call(_) => StatementKind::Call,
            Self::Truncate(_) => StatementKind::Truncate,
            Self::Merge(_) => StatementKind::Merge,
            Self::Other(other) => other.kind,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Select(s) => s.span,
            Self::Insert(s) => s.span,
            Self::MultiInsert(s) => s.span,
            Self::Update(s) => s.span,
            Self::Delete(s) => s.span,
            Self::Call(s) => s.span,
            Self::Truncate(s) => s.span,
            Self::Merge(s) => s.span,
            Self::Other(s) => s.span,
        }
    }
}

/// Concrete statement kind, used by the statement-kind gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    MultiInsert,
    Update,
    Delete,
    Merge,
    Call,
    Truncate,
    Create,
    Drop,
    Alter,
    Grant,
    Revoke,
    Set,
    Use,
    Show,
    Other,
}

impl StatementKind {
    /// Classify an opaque statement by its leading keyword.
    #[must_use]
    pub fn from_leading_word(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "DROP" => Self::Drop,
            "ALTER" | "RENAME" => Self::Alter,
            "GRANT" => Self::Grant,
            "REVOKE" => Self::Revoke,
            "SET" => Self::Set,
            "USE" => Self::Use,
            "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" => Self::Show,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::MultiInsert => "INSERT ALL",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
            Self::Call => "CALL",
            Self::Truncate => "TRUNCATE",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::Set => "SET",
            Self::Use => "USE",
            Self::Show => "SHOW",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_parts() {
        let name = ObjectName(vec![Ident::new("sales"), Ident::new("orders")]);
        assert_eq!(name.last().map(|i| i.value.as_str()), Some("orders"));
        assert_eq!(name.qualifiers().len(), 1);
        assert!(ObjectName(vec![]).qualifiers().is_empty());
    }

    #[test]
    fn test_statement_kind_from_leading_word() {
        assert_eq!(StatementKind::from_leading_word("drop"), StatementKind::Drop);
        assert_eq!(StatementKind::from_leading_word("GRANT"), StatementKind::Grant);
        assert_eq!(StatementKind::from_leading_word("vacuum"), StatementKind::Other);
    }

    #[test]
    fn test_expr_span_follows_left_operand() {
        let left = Expr::Identifier(Ident::new("a").at(Span::new(2, 7)));
        let expr = Expr::binary(
            left,
            BinaryOperator::Eq,
            Expr::Literal(Literal::Number("1".into())),
        );
        assert_eq!(expr.span(), Some(Span::new(2, 7)));
        assert_eq!(Expr::Literal(Literal::Null).span(), None);
    }

    #[test]
    fn test_operator_classes() {
        assert!(BinaryOperator::Xor.is_logical());
        assert!(BinaryOperator::GtEq.is_comparison());
        assert!(BinaryOperator::BitOr.is_bitwise());
        assert!(!BinaryOperator::Concat.is_bitwise());
    }
}
