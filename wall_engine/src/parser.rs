//! Recursive-descent parser from SQL text to the [`crate::ast`] model.
//!
//! Covers the statement shapes the wall rules reason about: SELECT (with
//! unions, joins, subqueries, GROUP BY / HAVING, INTO OUTFILE), INSERT,
//! Oracle multi-table INSERT, UPDATE, DELETE, CALL, TRUNCATE and MERGE.
//! Anything else is kept as an opaque [`OtherStatement`] classified by its
//! leading keyword so the statement-kind gate can still judge it.
//!
//! Nesting is bounded: every nested expression or query consumes one level
//! of the depth budget, and exceeding it fails with [`ParseError::TooDeep`]
//! before any traversal runs.

use crate::ast::{
    Assignment, BinaryOperator, CallStatement, CaseExpr, DeleteStatement, Expr, ExprTableSource,
    GroupBy, Ident, InListExpr, InsertIntoClause, InsertSource, InsertStatement, JoinKind,
    JoinSource, Limit, Literal, MergeClause, MergeStatement, MethodInvoke, MultiInsertKind,
    MultiInsertStatement, ObjectName, OracleTableReference, OrderByItem, OtherStatement, Query,
    SelectBlock, SelectInto, SelectItem, SelectStatement, SetOperator, Statement, StatementKind,
    TableSource, TruncateStatement, UnaryOperator, UnionQuery, UpdateStatement,
};
use crate::sql_lexer::{meaningful_tokens, tokenize, Token, TokenKind};
use crate::types::{Dialect, Span};

/// Errors produced while parsing a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A token that does not fit the grammar at this point.
    #[error("unexpected '{found}' at line {line}, column {column}: expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },

    /// Input ended inside a construct.
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    /// Syntax the engine does not model.
    #[error("unsupported construct '{construct}' at line {line}, column {column}")]
    Unsupported {
        construct: String,
        line: u32,
        column: u32,
    },

    /// Nesting exceeds the configured depth limit.
    #[error("nesting deeper than {limit} levels at line {line}, column {column}")]
    TooDeep { limit: usize, line: u32, column: u32 },
}

/// Parse a submission into statements.
///
/// `max_depth` bounds expression and query nesting (0 = unlimited).
///
/// # Errors
///
/// Returns a [`ParseError`] when the text does not parse or nests too deeply.
pub fn parse_sql(sql: &str, dialect: Dialect, max_depth: usize) -> Result<Vec<Statement>, ParseError> {
    Parser::new(sql, dialect, max_depth).parse_statements()
}

/// Words that end a table factor instead of aliasing it.
const NON_ALIAS_WORDS: &[&str] = &["FETCH", "NATURAL", "PARTITION", "RETURNING", "SAMPLE"];

/// Second words of multi-word type names (`DOUBLE PRECISION`, `INT UNSIGNED`).
const TYPE_CONTINUATIONS: &[&str] = &["INTEGER", "PRECISION", "SIGNED", "UNSIGNED", "VARYING"];

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    dialect: Dialect,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, dialect: Dialect, max_depth: usize) -> Self {
        Self {
            source,
            tokens: meaningful_tokens(tokenize(source, dialect)),
            pos: 0,
            dialect,
            depth: 0,
            max_depth,
        }
    }

    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    fn peek_word_nth(&self, n: usize, word: &str) -> bool {
        self.peek_nth(n).is_some_and(|t| t.is_word(word))
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Token<'a>, ParseError> {
        if self.peek_word(word) {
            self.advance().ok_or_else(|| self.unexpected(word))
        } else {
            Err(self.unexpected(word))
        }
    }

    fn peek_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn eat_kind(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, ParseError> {
        if self.peek_kind(kind) {
            self.advance().ok_or_else(|| self.unexpected(what))
        } else {
            Err(self.unexpected(what))
        }
    }

    fn peek_op(&self, op: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Operator && t.text == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{op}'")))
        }
    }

    fn current_span(&self) -> Span {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| Span::new(t.line, t.column))
            .unwrap_or_default()
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::UnexpectedToken {
                expected: expected.to_owned(),
                found: t.text.to_owned(),
                line: t.line,
                column: t.column,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_owned(),
            },
        }
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        let span = self.current_span();
        ParseError::Unsupported {
            construct: construct.to_owned(),
            line: span.line,
            column: span.column,
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.descend()?;
        let out = f(self);
        self.depth -= 1;
        out
    }

    /// Take one level of the depth budget.
    ///
    /// Left-associative chains (`a OR b OR c`, joins, set operations,
    /// qualified names, `::` casts) are parsed in a loop but build a tree one
    /// level deeper per operator, so every fold takes a level as well. Each
    /// chain loop restores the depth it started from when the chain ends.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.max_depth > 0 && self.depth > self.max_depth {
            let span = self.current_span();
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
                line: span.line,
                column: span.column,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_statements(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.eat_kind(TokenKind::Semicolon) {}
            if self.peek().is_none() {
                break;
            }
            statements.push(self.parse_statement()?);
            if self.peek().is_some() && !self.peek_kind(TokenKind::Semicolon) {
                return Err(self.unexpected("';' or end of input"));
            }
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        let Some(first) = self.peek().copied() else {
            return Err(self.unexpected("statement"));
        };

        if first.is_word("SELECT") || first.kind == TokenKind::LeftParen {
            let query = self.parse_query()?;
            return Ok(Statement::Select(SelectStatement { query, span }));
        }
        if first.is_word("WITH") {
            return Err(self.unsupported("WITH"));
        }
        if first.is_word("INSERT") {
            self.advance();
            if self.peek_word("ALL") || self.peek_word("FIRST") {
                return self.parse_multi_insert(span).map(Statement::MultiInsert);
            }
            return self.parse_insert(span).map(Statement::Insert);
        }
        if first.is_word("UPDATE") {
            self.advance();
            return self.parse_update(span).map(Statement::Update);
        }
        if first.is_word("DELETE") {
            self.advance();
            return self.parse_delete(span).map(Statement::Delete);
        }
        if first.is_word("CALL") {
            self.advance();
            return self.parse_call(span).map(Statement::Call);
        }
        if first.is_word("TRUNCATE") {
            self.advance();
            return self.parse_truncate(span).map(Statement::Truncate);
        }
        if first.is_word("MERGE") {
            self.advance();
            return self.parse_merge(span).map(Statement::Merge);
        }
        Ok(Statement::Other(self.parse_other(span)))
    }

    fn parse_other(&mut self, span: Span) -> OtherStatement {
        let start = self.peek().map_or(self.source.len(), |t| t.offset);
        let kind = self
            .peek()
            .map_or(StatementKind::Other, |t| StatementKind::from_leading_word(t.text));
        let mut end = start;
        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Semicolon {
                break;
            }
            end = tok.offset + tok.text.len();
            self.pos += 1;
        }
        OtherStatement {
            kind,
            text: self.source[start..end].trim().to_owned(),
            span,
        }
    }

    fn parse_insert(&mut self, span: Span) -> Result<InsertStatement, ParseError> {
        self.eat_word("IGNORE");
        self.expect_word("INTO")?;
        let table = self.parse_named_table()?;
        let columns = if self.peek_kind(TokenKind::LeftParen)
            && !self.peek_word_nth(1, "SELECT")
            && !self.peek_kind_nth(1, TokenKind::LeftParen)
        {
            self.parse_paren_idents()?
        } else {
            Vec::new()
        };

        let source = if self.eat_word("VALUES") {
            let mut rows = vec![self.parse_paren_exprs()?];
            while self.eat_kind(TokenKind::Comma) {
                rows.push(self.parse_paren_exprs()?);
            }
            InsertSource::Values(rows)
        } else if self.peek_word("SELECT") || self.peek_kind(TokenKind::LeftParen) {
            InsertSource::Query(Box::new(self.parse_query()?))
        } else if self.peek_word("SET") {
            return Err(self.unsupported("INSERT ... SET"));
        } else {
            return Err(self.unexpected("VALUES or SELECT"));
        };

        if self.peek_word("ON") {
            return Err(self.unsupported("ON DUPLICATE KEY UPDATE"));
        }

        Ok(InsertStatement {
            table,
            columns,
            source,
            span,
        })
    }

    fn parse_multi_insert(&mut self, span: Span) -> Result<MultiInsertStatement, ParseError> {
        let kind = if self.eat_word("ALL") {
            MultiInsertKind::All
        } else {
            self.expect_word("FIRST")?;
            MultiInsertKind::First
        };

        let mut clauses = Vec::new();
        loop {
            if self.eat_word("WHEN") {
                let condition = self.parse_expr()?;
                self.expect_word("THEN")?;
                self.parse_into_clauses(Some(&condition), false, &mut clauses)?;
            } else if self.eat_word("ELSE") {
                self.parse_into_clauses(None, true, &mut clauses)?;
            } else if self.peek_word("INTO") {
                self.parse_into_clauses(None, false, &mut clauses)?;
            } else {
                break;
            }
        }
        if clauses.is_empty() {
            return Err(self.unexpected("INTO or WHEN"));
        }

        let source = self.parse_query()?;
        Ok(MultiInsertStatement {
            kind,
            clauses,
            source,
            span,
        })
    }

    /// One or more consecutive `INTO t [(cols)] [VALUES (...)]` arms.
    fn parse_into_clauses(
        &mut self,
        condition: Option<&Expr>,
        is_else: bool,
        out: &mut Vec<InsertIntoClause>,
    ) -> Result<(), ParseError> {
        self.expect_word("INTO")?;
        loop {
            let table = self.parse_named_table()?;
            let columns = if self.peek_kind(TokenKind::LeftParen) {
                self.parse_paren_idents()?
            } else {
                Vec::new()
            };
            let values = if self.eat_word("VALUES") {
                self.parse_paren_exprs()?
            } else {
                Vec::new()
            };
            out.push(InsertIntoClause {
                condition: condition.cloned(),
                is_else,
                table,
                columns,
                values,
            });
            if !self.eat_word("INTO") {
                return Ok(());
            }
        }
    }

    fn parse_update(&mut self, span: Span) -> Result<UpdateStatement, ParseError> {
        let table = self.parse_table_source()?;
        self.expect_word("SET")?;
        let assignments = self.parse_assignments()?;
        let from = if self.eat_word("FROM") {
            Some(self.parse_table_source()?)
        } else {
            None
        };
        let selection = self.parse_where()?;
        Ok(UpdateStatement {
            table,
            assignments,
            from,
            selection,
            span,
        })
    }

    fn parse_delete(&mut self, span: Span) -> Result<DeleteStatement, ParseError> {
        self.eat_word("FROM");
        let table = self.parse_table_source()?;
        let using = if self.eat_word("USING") {
            Some(self.parse_table_source()?)
        } else {
            None
        };
        let selection = self.parse_where()?;
        Ok(DeleteStatement {
            table,
            using,
            selection,
            span,
        })
    }

    fn parse_call(&mut self, span: Span) -> Result<CallStatement, ParseError> {
        let procedure = self.parse_object_name()?;
        let args = if self.peek_kind(TokenKind::LeftParen) {
            self.parse_paren_exprs_allow_empty()?
        } else {
            Vec::new()
        };
        Ok(CallStatement {
            procedure,
            args,
            span,
        })
    }

    fn parse_truncate(&mut self, span: Span) -> Result<TruncateStatement, ParseError> {
        self.eat_word("TABLE");
        let mut tables = vec![self.parse_object_name()?];
        while self.eat_kind(TokenKind::Comma) {
            tables.push(self.parse_object_name()?);
        }
        Ok(TruncateStatement { tables, span })
    }

    fn parse_merge(&mut self, span: Span) -> Result<MergeStatement, ParseError> {
        self.expect_word("INTO")?;
        let target = self.parse_table_factor()?;
        self.expect_word("USING")?;
        let source = self.parse_table_factor()?;
        self.expect_word("ON")?;
        let on = self.parse_expr()?;

        let mut clauses = Vec::new();
        while self.eat_word("WHEN") {
            let not_matched = self.eat_word("NOT");
            self.expect_word("MATCHED")?;
            let guard = if self.eat_word("AND") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect_word("THEN")?;

            if not_matched {
                self.expect_word("INSERT")?;
                let columns = if self.peek_kind(TokenKind::LeftParen) {
                    self.parse_paren_idents()?
                } else {
                    Vec::new()
                };
                self.expect_word("VALUES")?;
                let values = self.parse_paren_exprs()?;
                let selection = merge_guard(guard, self.parse_where()?);
                clauses.push(MergeClause::NotMatchedInsert {
                    columns,
                    values,
                    selection,
                });
            } else if self.eat_word("UPDATE") {
                self.expect_word("SET")?;
                let assignments = self.parse_assignments()?;
                let selection = merge_guard(guard, self.parse_where()?);
                clauses.push(MergeClause::MatchedUpdate {
                    assignments,
                    selection,
                });
                if self.eat_word("DELETE") {
                    let selection = self.parse_where()?;
                    clauses.push(MergeClause::MatchedDelete { selection });
                }
            } else {
                self.expect_word("DELETE")?;
                let selection = merge_guard(guard, self.parse_where()?);
                clauses.push(MergeClause::MatchedDelete { selection });
            }
        }
        if clauses.is_empty() {
            return Err(self.unexpected("WHEN"));
        }

        Ok(MergeStatement {
            target,
            source,
            on,
            clauses,
            span,
        })
    }

    fn parse_assignments(&mut self) -> Result<Vec<Assignment>, ParseError> {
        let mut out = Vec::new();
        loop {
            let column = self.parse_object_name()?;
            self.expect_op("=")?;
            let value = self.parse_expr()?;
            out.push(Assignment { column, value });
            if !self.eat_kind(TokenKind::Comma) {
                return Ok(out);
            }
        }
    }

    fn parse_where(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.eat_word("WHERE") {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.nested(Self::parse_set_expr)
    }

    fn parse_set_expr(&mut self) -> Result<Query, ParseError> {
        let base = self.depth;
        let mut left = self.parse_query_primary()?;
        while let Some(op) = self.parse_set_operator() {
            self.descend()?;
            let right = self.parse_query_primary()?;
            left = Query::Union(Box::new(UnionQuery { left, op, right }));
        }
        self.depth = base;
        // A trailing select block already consumed its own ORDER BY / LIMIT.
        if self.peek_word("ORDER") || self.peek_word("LIMIT") {
            return Err(self.unsupported("ORDER BY / LIMIT on a parenthesized query"));
        }
        Ok(left)
    }

    fn parse_set_operator(&mut self) -> Option<SetOperator> {
        if self.eat_word("UNION") {
            if self.eat_word("ALL") {
                return Some(SetOperator::UnionAll);
            }
            self.eat_word("DISTINCT");
            return Some(SetOperator::Union);
        }
        if self.eat_word("INTERSECT") {
            return Some(SetOperator::Intersect);
        }
        if self.eat_word("EXCEPT") {
            return Some(SetOperator::Except);
        }
        if self.eat_word("MINUS") {
            return Some(SetOperator::Minus);
        }
        None
    }

    fn parse_query_primary(&mut self) -> Result<Query, ParseError> {
        if self.eat_kind(TokenKind::LeftParen) {
            let inner = self.parse_query()?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            return Ok(Query::Nested(Box::new(inner)));
        }
        if self.peek_word("WITH") {
            return Err(self.unsupported("WITH"));
        }
        let select = self.expect_word("SELECT")?;
        let span = Span::new(select.line, select.column);
        self.parse_select_block(span)
            .map(|block| Query::Select(Box::new(block)))
    }

    fn parse_select_block(&mut self, span: Span) -> Result<SelectBlock, ParseError> {
        let distinct = if self.eat_word("DISTINCT") {
            true
        } else {
            self.eat_word("ALL");
            false
        };

        let mut items = vec![self.parse_select_item()?];
        while self.eat_kind(TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }

        let mut into = self.parse_select_into()?;

        let from = if self.eat_word("FROM") {
            Some(self.parse_table_source()?)
        } else {
            None
        };
        let selection = self.parse_where()?;

        let mut group_by = None;
        if self.eat_word("GROUP") {
            self.expect_word("BY")?;
            let mut group_items = vec![self.parse_expr()?];
            while self.eat_kind(TokenKind::Comma) {
                group_items.push(self.parse_expr()?);
            }
            group_by = Some(GroupBy {
                items: group_items,
                having: None,
            });
        }
        if self.eat_word("HAVING") {
            let having = self.parse_expr()?;
            group_by
                .get_or_insert_with(|| GroupBy {
                    items: Vec::new(),
                    having: None,
                })
                .having = Some(having);
        }

        let mut order_by = Vec::new();
        if self.eat_word("ORDER") {
            self.expect_word("BY")?;
            loop {
                let expr = self.parse_expr()?;
                let desc = if self.eat_word("DESC") {
                    Some(true)
                } else if self.eat_word("ASC") {
                    Some(false)
                } else {
                    None
                };
                order_by.push(OrderByItem { expr, desc });
                if !self.eat_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let limit = self.parse_limit()?;

        if into.is_none() {
            into = self.parse_select_into()?;
        }

        Ok(SelectBlock {
            distinct,
            items,
            into,
            from,
            selection,
            group_by,
            order_by,
            limit,
            span,
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem, ParseError> {
        let expr = self.parse_expr()?;
        let alias = if matches!(expr, Expr::AllColumns(_)) {
            None
        } else {
            self.parse_optional_alias()?
        };
        Ok(SelectItem { expr, alias })
    }

    fn parse_select_into(&mut self) -> Result<Option<SelectInto>, ParseError> {
        if !self.eat_word("INTO") {
            return Ok(None);
        }
        if self.eat_word("OUTFILE") {
            return self.parse_string().map(|s| Some(SelectInto::Outfile(s)));
        }
        if self.eat_word("DUMPFILE") {
            return self.parse_string().map(|s| Some(SelectInto::Dumpfile(s)));
        }
        let mut targets = vec![self.parse_expr()?];
        while self.eat_kind(TokenKind::Comma) {
            targets.push(self.parse_expr()?);
        }
        Ok(Some(SelectInto::Variables(targets)))
    }

    fn parse_limit(&mut self) -> Result<Option<Limit>, ParseError> {
        if self.eat_word("LIMIT") {
            let first = self.parse_expr()?;
            if self.eat_kind(TokenKind::Comma) {
                let count = self.parse_expr()?;
                return Ok(Some(Limit {
                    count,
                    offset: Some(first),
                }));
            }
            let offset = if self.eat_word("OFFSET") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            return Ok(Some(Limit {
                count: first,
                offset,
            }));
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Table sources
    // -----------------------------------------------------------------------

    fn parse_table_source(&mut self) -> Result<TableSource, ParseError> {
        let base = self.depth;
        let mut left = self.parse_table_factor()?;
        loop {
            let kind = if self.eat_kind(TokenKind::Comma) {
                JoinKind::Comma
            } else if self.eat_word("CROSS") {
                self.expect_word("JOIN")?;
                JoinKind::Cross
            } else if self.eat_word("INNER") || self.peek_word("JOIN") {
                self.expect_word("JOIN")?;
                JoinKind::Inner
            } else if self.eat_word("LEFT") {
                self.eat_word("OUTER");
                self.expect_word("JOIN")?;
                JoinKind::Left
            } else if self.eat_word("RIGHT") {
                self.eat_word("OUTER");
                self.expect_word("JOIN")?;
                JoinKind::Right
            } else if self.eat_word("FULL") {
                self.eat_word("OUTER");
                self.expect_word("JOIN")?;
                JoinKind::Full
            } else {
                self.depth = base;
                return Ok(left);
            };

            self.descend()?;
            let right = self.parse_table_factor()?;
            let mut on = None;
            let mut using = Vec::new();
            if !matches!(kind, JoinKind::Comma | JoinKind::Cross) {
                if self.eat_word("ON") {
                    on = Some(self.parse_expr()?);
                } else if self.eat_word("USING") {
                    using = self.parse_paren_idents()?;
                }
            }
            left = TableSource::Join(Box::new(JoinSource {
                left,
                kind,
                right,
                on,
                using,
            }));
        }
    }

    fn parse_table_factor(&mut self) -> Result<TableSource, ParseError> {
        if self.peek_kind(TokenKind::LeftParen) {
            let is_query = self.peek_word_nth(1, "SELECT")
                || self.peek_word_nth(1, "WITH")
                || self.peek_kind_nth(1, TokenKind::LeftParen);
            if is_query {
                let query = self.parse_query_primary()?;
                let query = match query {
                    Query::Nested(inner) => inner,
                    other => Box::new(other),
                };
                let alias = self.parse_optional_alias()?;
                return Ok(TableSource::Subquery { query, alias });
            }
            self.advance();
            let inner = self.nested(Self::parse_table_source)?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            return Ok(inner);
        }

        let name = self.parse_object_name()?;
        if self.peek_kind(TokenKind::LeftParen) {
            let span = name.span();
            let args = self.parse_paren_exprs_allow_empty()?;
            let alias = self.parse_optional_alias()?;
            return Ok(TableSource::Function {
                call: MethodInvoke {
                    name,
                    args,
                    distinct: false,
                    span,
                },
                alias,
            });
        }

        if self.dialect != Dialect::Oracle {
            let alias = self.parse_optional_alias()?;
            return Ok(TableSource::Named(ExprTableSource { name, alias }));
        }

        let partition = if self.eat_word("PARTITION") {
            self.expect_kind(TokenKind::LeftParen, "'('")?;
            let p = self.parse_ident()?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            Some(p)
        } else {
            None
        };
        let sample = if self.eat_word("SAMPLE") {
            self.expect_kind(TokenKind::LeftParen, "'('")?;
            let pct = self.expect_kind(TokenKind::NumberLiteral, "sample percentage")?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            Some(pct.text.to_owned())
        } else {
            None
        };
        let alias = self.parse_optional_alias()?;
        Ok(TableSource::OracleReference(OracleTableReference {
            table: ExprTableSource { name, alias },
            partition,
            sample,
        }))
    }

    /// Plain `name [alias]`, used for INSERT targets.
    fn parse_named_table(&mut self) -> Result<ExprTableSource, ParseError> {
        let name = self.parse_object_name()?;
        let alias = self.parse_optional_alias()?;
        Ok(ExprTableSource { name, alias })
    }

    fn parse_optional_alias(&mut self) -> Result<Option<Ident>, ParseError> {
        if self.eat_word("AS") {
            return self.parse_ident().map(Some);
        }
        let Some(tok) = self.peek() else {
            return Ok(None);
        };
        let aliasable = match tok.kind {
            TokenKind::QuotedIdent => true,
            TokenKind::Identifier => !NON_ALIAS_WORDS
                .iter()
                .any(|w| tok.text.eq_ignore_ascii_case(w)),
            _ => false,
        };
        if aliasable {
            self.parse_ident().map(Some)
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    fn peek_kind_nth(&self, n: usize, kind: TokenKind) -> bool {
        self.peek_nth(n).is_some_and(|t| t.kind == kind)
    }

    fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek().copied() {
            Some(tok) if matches!(tok.kind, TokenKind::Identifier | TokenKind::QuotedIdent) => {
                self.pos += 1;
                Ok(ident_from_token(&tok))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Identifier after a dot, where reserved words are also names.
    fn parse_member_ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek().copied() {
            Some(tok)
                if matches!(
                    tok.kind,
                    TokenKind::Identifier | TokenKind::QuotedIdent | TokenKind::Keyword
                ) =>
            {
                self.pos += 1;
                Ok(ident_from_token(&tok))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn parse_object_name(&mut self) -> Result<ObjectName, ParseError> {
        let mut parts = vec![self.parse_ident()?];
        while self.eat_kind(TokenKind::Dot) {
            parts.push(self.parse_member_ident()?);
        }
        Ok(ObjectName(parts))
    }

    fn parse_paren_idents(&mut self) -> Result<Vec<Ident>, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        let mut out = vec![self.parse_ident()?];
        while self.eat_kind(TokenKind::Comma) {
            out.push(self.parse_ident()?);
        }
        self.expect_kind(TokenKind::RightParen, "')'")?;
        Ok(out)
    }

    fn parse_paren_exprs(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        let out = self.parse_expr_list()?;
        self.expect_kind(TokenKind::RightParen, "')'")?;
        Ok(out)
    }

    fn parse_paren_exprs_allow_empty(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        if self.eat_kind(TokenKind::RightParen) {
            return Ok(Vec::new());
        }
        let out = self.parse_expr_list()?;
        self.expect_kind(TokenKind::RightParen, "')'")?;
        Ok(out)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut out = vec![self.parse_expr()?];
        while self.eat_kind(TokenKind::Comma) {
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let tok = self.expect_kind(TokenKind::StringLiteral, "string literal")?;
        Ok(unescape_string(tok.text, self.dialect == Dialect::MySql))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_or)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_xor()?;
        while self.eat_word("OR") || (self.dialect == Dialect::MySql && self.eat_op("||")) {
            self.descend()?;
            let right = self.parse_xor()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.eat_word("XOR") {
            self.descend()?;
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOperator::Xor, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_not()?;
        while self.eat_word("AND") || (self.dialect == Dialect::MySql && self.eat_op("&&")) {
            self.descend()?;
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek_word("NOT") && !self.peek_word_nth(1, "EXISTS") {
            self.advance();
            let expr = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_bit_or()?;
        loop {
            if let Some(op) = self.parse_comparison_op() {
                self.descend()?;
                let right = self.parse_bit_or()?;
                left = Expr::binary(left, op, right);
                continue;
            }
            if self.eat_word("IS") {
                self.descend()?;
                let negated = self.eat_word("NOT");
                if self.eat_word("NULL") {
                    left = Expr::IsNull {
                        expr: Box::new(left),
                        negated,
                    };
                    continue;
                }
                return Err(self.unexpected("NULL"));
            }

            let negated = self.peek_word("NOT")
                && (self.peek_word_nth(1, "IN")
                    || self.peek_word_nth(1, "BETWEEN")
                    || self.peek_word_nth(1, "LIKE"));
            if negated {
                self.advance();
            }
            if self.eat_word("IN") {
                self.descend()?;
                left = self.parse_in(left, negated)?;
            } else if self.eat_word("BETWEEN") {
                self.descend()?;
                let low = self.parse_bit_or()?;
                self.expect_word("AND")?;
                let high = self.parse_bit_or()?;
                left = Expr::Between {
                    expr: Box::new(left),
                    negated,
                    low: Box::new(low),
                    high: Box::new(high),
                };
            } else if self.eat_word("LIKE") {
                self.descend()?;
                let pattern = self.parse_bit_or()?;
                if self.peek_word("ESCAPE") {
                    return Err(self.unsupported("LIKE ... ESCAPE"));
                }
                left = Expr::Like {
                    expr: Box::new(left),
                    negated,
                    pattern: Box::new(pattern),
                };
            } else {
                self.depth = base;
                return Ok(left);
            }
        }
    }

    fn parse_comparison_op(&mut self) -> Option<BinaryOperator> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Operator {
            return None;
        }
        let op = match tok.text {
            "=" => BinaryOperator::Eq,
            "<>" | "!=" => BinaryOperator::NotEq,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::LtEq,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::GtEq,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_in(&mut self, expr: Expr, negated: bool) -> Result<Expr, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        if self.peek_word("SELECT") {
            let query = self.parse_query()?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            return Ok(Expr::InSubquery {
                expr: Box::new(expr),
                query: Box::new(query),
                negated,
            });
        }
        let list = self.parse_expr_list()?;
        self.expect_kind(TokenKind::RightParen, "')'")?;
        Ok(Expr::InList(InListExpr {
            expr: Box::new(expr),
            list,
            negated,
        }))
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_bit_and()?;
        while self.eat_op("|") {
            self.descend()?;
            let right = self.parse_bit_and()?;
            left = Expr::binary(left, BinaryOperator::BitOr, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_additive()?;
        while self.eat_op("&") {
            self.descend()?;
            let right = self.parse_additive()?;
            left = Expr::binary(left, BinaryOperator::BitAnd, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOperator::Plus
            } else if self.eat_op("-") {
                BinaryOperator::Minus
            } else if self.dialect != Dialect::MySql && self.eat_op("||") {
                BinaryOperator::Concat
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_bit_xor()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOperator::Multiply
            } else if self.eat_op("/") {
                BinaryOperator::Divide
            } else if self.eat_op("%") {
                BinaryOperator::Modulo
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.descend()?;
            let right = self.parse_bit_xor()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        while self.eat_op("^") {
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::binary(left, BinaryOperator::BitXor, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = if self.eat_op("-") {
            UnaryOperator::Minus
        } else if self.eat_op("+") {
            UnaryOperator::Plus
        } else if self.eat_op("~") {
            UnaryOperator::BitNot
        } else if self.dialect == Dialect::MySql && self.eat_op("!") {
            UnaryOperator::Not
        } else {
            return self.parse_postfix();
        };
        let expr = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        while self.eat_op("::") {
            self.descend()?;
            let data_type = self.parse_data_type()?;
            expr = Expr::Cast {
                expr: Box::new(expr),
                data_type,
            };
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_data_type(&mut self) -> Result<String, ParseError> {
        let first = match self.peek().copied() {
            Some(t) if matches!(t.kind, TokenKind::Identifier | TokenKind::Keyword) => {
                self.pos += 1;
                t
            }
            _ => return Err(self.unexpected("type name")),
        };
        let mut data_type = first.text.to_ascii_uppercase();
        while let Some(t) = self.peek().copied() {
            let continues = t.kind == TokenKind::Identifier
                && TYPE_CONTINUATIONS
                    .iter()
                    .any(|w| t.text.eq_ignore_ascii_case(w));
            if !continues {
                break;
            }
            self.pos += 1;
            data_type.push(' ');
            data_type.push_str(&t.text.to_ascii_uppercase());
        }
        if self.eat_kind(TokenKind::LeftParen) {
            let mut args = Vec::new();
            loop {
                let n = self.expect_kind(TokenKind::NumberLiteral, "type length")?;
                args.push(n.text);
                if !self.eat_kind(TokenKind::Comma) {
                    break;
                }
            }
            self.expect_kind(TokenKind::RightParen, "')'")?;
            data_type.push('(');
            data_type.push_str(&args.join(", "));
            data_type.push(')');
        }
        Ok(data_type)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.peek().copied() else {
            return Err(self.unexpected("expression"));
        };
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::NumberLiteral => {
                self.pos += 1;
                Ok(Expr::Literal(Literal::Number(tok.text.to_owned())))
            }
            TokenKind::StringLiteral => {
                self.pos += 1;
                Ok(Expr::Literal(Literal::String(unescape_string(
                    tok.text,
                    self.dialect == Dialect::MySql,
                ))))
            }
            TokenKind::Variable => {
                self.pos += 1;
                Ok(Expr::Variable(Ident::new(tok.text).at(span)))
            }
            TokenKind::Placeholder => {
                self.pos += 1;
                Ok(Expr::Placeholder(tok.text.to_owned()))
            }
            TokenKind::Operator if tok.text == "*" => {
                self.pos += 1;
                Ok(Expr::AllColumns(None))
            }
            TokenKind::LeftParen => {
                if self.peek_word_nth(1, "SELECT") {
                    let query = self.parse_query_primary()?;
                    let query = match query {
                        Query::Nested(inner) => inner,
                        other => Box::new(other),
                    };
                    return Ok(Expr::Subquery(query));
                }
                self.pos += 1;
                let inner = self.parse_expr()?;
                if self.peek_kind(TokenKind::Comma) {
                    return Err(self.unsupported("row constructor"));
                }
                self.expect_kind(TokenKind::RightParen, "')'")?;
                Ok(Expr::Nested(Box::new(inner)))
            }
            TokenKind::Keyword => self.parse_keyword_primary(tok, span),
            TokenKind::Identifier | TokenKind::QuotedIdent => self.parse_name_expr(span),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_keyword_primary(&mut self, tok: Token<'a>, span: Span) -> Result<Expr, ParseError> {
        let word = tok.text.to_ascii_uppercase();
        match word.as_str() {
            "NULL" => {
                self.pos += 1;
                Ok(Expr::Literal(Literal::Null))
            }
            "TRUE" | "FALSE" => {
                self.pos += 1;
                Ok(Expr::Literal(Literal::Boolean(word == "TRUE")))
            }
            "EXISTS" => {
                self.pos += 1;
                self.parse_exists(false)
            }
            "NOT" if self.peek_word_nth(1, "EXISTS") => {
                self.pos += 2;
                self.parse_exists(true)
            }
            "CASE" => {
                self.pos += 1;
                self.parse_case()
            }
            "CAST" => {
                self.pos += 1;
                self.expect_kind(TokenKind::LeftParen, "'('")?;
                let expr = self.parse_expr()?;
                self.expect_word("AS")?;
                let data_type = self.parse_data_type()?;
                self.expect_kind(TokenKind::RightParen, "')'")?;
                Ok(Expr::Cast {
                    expr: Box::new(expr),
                    data_type,
                })
            }
            "LEFT" | "RIGHT" | "INSERT" if self.peek_kind_nth(1, TokenKind::LeftParen) =>
            {
                self.pos += 1;
                let name = ObjectName(vec![Ident::new(tok.text).at(span)]);
                self.parse_call_args(name, span)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_exists(&mut self, negated: bool) -> Result<Expr, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        let query = self.parse_query()?;
        self.expect_kind(TokenKind::RightParen, "')'")?;
        Ok(Expr::Exists {
            query: Box::new(query),
            negated,
        })
    }

    fn parse_case(&mut self) -> Result<Expr, ParseError> {
        let operand = if self.peek_word("WHEN") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let mut branches = Vec::new();
        while self.eat_word("WHEN") {
            let when = self.parse_expr()?;
            self.expect_word("THEN")?;
            let then = self.parse_expr()?;
            branches.push((when, then));
        }
        if branches.is_empty() {
            return Err(self.unexpected("WHEN"));
        }
        let else_result = if self.eat_word("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_word("END")?;
        Ok(Expr::Case(CaseExpr {
            operand,
            branches,
            else_result,
        }))
    }

    /// Column reference, qualified name, `t.*` or function call.
    fn parse_name_expr(&mut self, span: Span) -> Result<Expr, ParseError> {
        let mut parts = vec![self.parse_ident()?];
        while self.eat_kind(TokenKind::Dot) {
            if self.eat_op("*") {
                return Ok(Expr::AllColumns(Some(ObjectName(parts))));
            }
            parts.push(self.parse_member_ident()?);
        }

        if self.peek_kind(TokenKind::LeftParen) {
            return self.parse_call_args(ObjectName(parts), span);
        }

        let mut iter = parts.into_iter();
        let mut expr = match iter.next() {
            Some(first) => Expr::Identifier(first),
            None => return Err(self.unexpected("identifier")),
        };
        let base = self.depth;
        for name in iter {
            self.descend()?;
            expr = Expr::Property {
                owner: Box::new(expr),
                name,
            };
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_call_args(&mut self, name: ObjectName, span: Span) -> Result<Expr, ParseError> {
        self.expect_kind(TokenKind::LeftParen, "'('")?;
        let mut distinct = false;
        let args = if self.eat_kind(TokenKind::RightParen) {
            Vec::new()
        } else {
            distinct = self.eat_word("DISTINCT");
            let args = self.parse_expr_list()?;
            self.expect_kind(TokenKind::RightParen, "')'")?;
            args
        };
        if self.peek_word("OVER") {
            return Err(self.unsupported("window function"));
        }
        Ok(Expr::MethodInvoke(MethodInvoke {
            name,
            args,
            distinct,
            span,
        }))
    }
}

/// Combine a MERGE `AND` guard with a trailing `WHERE`.
fn merge_guard(guard: Option<Expr>, selection: Option<Expr>) -> Option<Expr> {
    match (guard, selection) {
        (Some(g), Some(w)) => Some(Expr::binary(g, BinaryOperator::And, w)),
        (g, w) => g.or(w),
    }
}

fn ident_from_token(tok: &Token<'_>) -> Ident {
    let span = Span::new(tok.line, tok.column);
    if tok.kind != TokenKind::QuotedIdent {
        return Ident::new(tok.text).at(span);
    }
    let quote = tok.text.chars().next().unwrap_or('"');
    let inner = tok.text.strip_prefix(quote).unwrap_or(tok.text);
    let inner = inner.strip_suffix(quote).unwrap_or(inner);
    let doubled: String = [quote, quote].iter().collect();
    Ident::quoted(inner.replace(&doubled, &quote.to_string()), quote).at(span)
}

/// Decode a `'...'` literal. `backslash` enables MySQL escape sequences.
fn unescape_string(text: &str, backslash: bool) -> String {
    let inner = text.strip_prefix('\'').unwrap_or(text);
    let inner = if inner.ends_with('\'') && !inner.is_empty() {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' if backslash => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('%') => out.push_str("\\%"),
                Some('_') => out.push_str("\\_"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(sql: &str) -> Vec<Statement> {
        parse_sql(sql, Dialect::MySql, 256).unwrap()
    }

    fn parse_one(sql: &str, dialect: Dialect) -> Statement {
        let mut stmts = parse_sql(sql, dialect, 256).unwrap();
        assert_eq!(stmts.len(), 1, "expected one statement in {sql}");
        stmts.remove(0)
    }

    fn select_block(stmt: &Statement) -> &SelectBlock {
        match stmt {
            Statement::Select(s) => match &s.query {
                Query::Select(block) => block,
                other => panic!("expected a plain select, got {other:?}"),
            },
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_select_with_where() {
        let stmt = parse_one("SELECT id, name FROM orders WHERE id = 1", Dialect::MySql);
        let block = select_block(&stmt);
        assert_eq!(block.items.len(), 2);
        assert!(matches!(
            block.from,
            Some(TableSource::Named(ExprTableSource { ref name, .. })) if name.0[0].value == "orders"
        ));
        assert!(matches!(
            block.selection,
            Some(Expr::BinaryOp(ref b)) if b.op == BinaryOperator::Eq
        ));
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        let stmt = parse_one("SELECT 1 FROM t WHERE a = 1 AND b = 2 OR 1 = 1", Dialect::MySql);
        let Some(Expr::BinaryOp(root)) = &select_block(&stmt).selection else {
            panic!("expected binary root");
        };
        assert_eq!(root.op, BinaryOperator::Or);
        assert!(matches!(*root.left, Expr::BinaryOp(ref b) if b.op == BinaryOperator::And));
    }

    #[test]
    fn test_mysql_double_pipe_is_or() {
        let stmt = parse_one("SELECT 1 FROM t WHERE a = 1 || 1 = 1", Dialect::MySql);
        assert!(matches!(
            select_block(&stmt).selection,
            Some(Expr::BinaryOp(ref b)) if b.op == BinaryOperator::Or
        ));
        let stmt = parse_one("SELECT a || b FROM t", Dialect::Postgres);
        assert!(matches!(
            select_block(&stmt).items[0].expr,
            Expr::BinaryOp(ref b) if b.op == BinaryOperator::Concat
        ));
    }

    #[test]
    fn test_union_is_left_nested() {
        let stmt = parse_one(
            "SELECT a FROM t UNION SELECT b FROM u UNION ALL SELECT c FROM v",
            Dialect::MySql,
        );
        let Statement::Select(SelectStatement { query: Query::Union(outer), .. }) = stmt else {
            panic!("expected union");
        };
        assert_eq!(outer.op, SetOperator::UnionAll);
        assert!(matches!(outer.left, Query::Union(_)));
    }

    #[test]
    fn test_group_by_having() {
        let stmt = parse_one(
            "SELECT dept, sum(x) FROM emp GROUP BY dept HAVING 1=1 OR sum(x) > 0",
            Dialect::MySql,
        );
        let group_by = select_block(&stmt).group_by.as_ref().unwrap();
        assert_eq!(group_by.items.len(), 1);
        assert!(group_by.having.is_some());
    }

    #[test]
    fn test_select_into_outfile() {
        let stmt = parse_one("SELECT * FROM users INTO OUTFILE '/tmp/x'", Dialect::MySql);
        assert_eq!(
            select_block(&stmt).into,
            Some(SelectInto::Outfile("/tmp/x".to_owned()))
        );
    }

    #[test]
    fn test_joins_and_subqueries() {
        let stmt = parse_one(
            indoc! {"
                SELECT o.id
                FROM orders o
                LEFT JOIN (SELECT id FROM users) u ON u.id = o.user_id
                WHERE o.id IN (SELECT id FROM paid)
            "},
            Dialect::MySql,
        );
        let block = select_block(&stmt);
        let Some(TableSource::Join(join)) = &block.from else {
            panic!("expected join");
        };
        assert_eq!(join.kind, JoinKind::Left);
        assert!(matches!(join.right, TableSource::Subquery { .. }));
        assert!(join.on.is_some());
        assert!(matches!(block.selection, Some(Expr::InSubquery { .. })));
    }

    #[test]
    fn test_function_calls_and_properties() {
        let stmt = parse_one(
            "SELECT dbms_lock.sleep(5), count(*), t.col FROM t",
            Dialect::Oracle,
        );
        let block = select_block(&stmt);
        assert!(matches!(
            &block.items[0].expr,
            Expr::MethodInvoke(m) if m.name.0.len() == 2
        ));
        assert!(matches!(
            &block.items[1].expr,
            Expr::MethodInvoke(m) if matches!(m.args[..], [Expr::AllColumns(None)])
        ));
        assert!(matches!(&block.items[2].expr, Expr::Property { .. }));
    }

    #[test]
    fn test_oracle_table_reference() {
        let stmt = parse_one(
            "SELECT * FROM sales PARTITION (p1) SAMPLE (10) s",
            Dialect::Oracle,
        );
        let Some(TableSource::OracleReference(r)) = &select_block(&stmt).from else {
            panic!("expected oracle reference");
        };
        assert_eq!(r.partition.as_ref().map(|p| p.value.as_str()), Some("p1"));
        assert_eq!(r.sample.as_deref(), Some("10"));
        assert_eq!(r.table.alias.as_ref().map(|a| a.value.as_str()), Some("s"));
    }

    #[test]
    fn test_quoted_identifiers_keep_quote_style() {
        let stmt = parse_one("SELECT \"Name\" FROM \"Orders\"", Dialect::Postgres);
        let block = select_block(&stmt);
        assert!(matches!(
            &block.items[0].expr,
            Expr::Identifier(Ident { value, quote: Some('"'), .. }) if value == "Name"
        ));
    }

    #[test]
    fn test_insert_values_and_select() {
        let stmt = parse_one("INSERT INTO orders (id, status) VALUES (1, 'x'), (2, 'y')", Dialect::MySql);
        let Statement::Insert(insert) = stmt else {
            panic!("expected insert");
        };
        assert_eq!(insert.columns.len(), 2);
        assert!(matches!(insert.source, InsertSource::Values(ref rows) if rows.len() == 2));

        let stmt = parse_one("INSERT INTO archive SELECT * FROM orders", Dialect::MySql);
        assert!(matches!(
            stmt,
            Statement::Insert(InsertStatement { source: InsertSource::Query(_), .. })
        ));
    }

    #[test]
    fn test_oracle_multi_insert() {
        let stmt = parse_one(
            indoc! {"
                INSERT FIRST
                  WHEN amount > 100 THEN INTO big_orders VALUES (id, amount)
                  ELSE INTO small_orders VALUES (id, amount)
                SELECT id, amount FROM orders
            "},
            Dialect::Oracle,
        );
        let Statement::MultiInsert(multi) = stmt else {
            panic!("expected multi insert");
        };
        assert_eq!(multi.kind, MultiInsertKind::First);
        assert_eq!(multi.clauses.len(), 2);
        assert!(multi.clauses[0].condition.is_some());
        assert!(multi.clauses[1].is_else);
    }

    #[test]
    fn test_update_delete_truncate_call() {
        let stmts = parse(indoc! {"
            UPDATE orders SET status = 'x', total = total + 1 WHERE id = 3;
            DELETE FROM orders;
            TRUNCATE TABLE orders, items;
            CALL refresh_stats(1)
        "});
        assert_eq!(stmts.len(), 4);
        assert!(matches!(&stmts[0], Statement::Update(u) if u.assignments.len() == 2));
        assert!(matches!(&stmts[1], Statement::Delete(d) if d.selection.is_none()));
        assert!(matches!(&stmts[2], Statement::Truncate(t) if t.tables.len() == 2));
        assert!(matches!(&stmts[3], Statement::Call(c) if c.args.len() == 1));
    }

    #[test]
    fn test_merge() {
        let stmt = parse_one(
            indoc! {"
                MERGE INTO target t USING source s ON (t.id = s.id)
                WHEN MATCHED THEN UPDATE SET t.v = s.v
                WHEN NOT MATCHED THEN INSERT (id, v) VALUES (s.id, s.v)
            "},
            Dialect::Oracle,
        );
        let Statement::Merge(merge) = stmt else {
            panic!("expected merge");
        };
        assert_eq!(merge.clauses.len(), 2);
        assert!(matches!(merge.on, Expr::Nested(_)));
    }

    #[test]
    fn test_other_statements_are_classified() {
        let stmts = parse("DROP TABLE orders; GRANT ALL ON x TO y");
        assert!(matches!(
            &stmts[0],
            Statement::Other(OtherStatement { kind: StatementKind::Drop, text, .. }) if text == "DROP TABLE orders"
        ));
        assert_eq!(stmts[1].kind(), StatementKind::Grant);
    }

    #[test]
    fn test_statement_spans() {
        let stmts = parse("SELECT 1;\n  DELETE FROM t WHERE a = 1");
        assert_eq!(stmts[0].span(), Span::new(1, 1));
        assert_eq!(stmts[1].span(), Span::new(2, 3));
    }

    #[test]
    fn test_variables_and_placeholders() {
        let stmt = parse_one("SELECT @@version, @x FROM t WHERE id = ?", Dialect::MySql);
        let block = select_block(&stmt);
        assert!(matches!(&block.items[0].expr, Expr::Variable(v) if v.value == "@@version"));
        assert!(matches!(
            &block.selection,
            Some(Expr::BinaryOp(b)) if matches!(*b.right, Expr::Placeholder(_))
        ));
    }

    #[test]
    fn test_string_unescape() {
        assert_eq!(unescape_string("'it''s'", false), "it's");
        assert_eq!(unescape_string(r"'a\'b'", true), "a'b");
        assert_eq!(unescape_string(r"'a\nb'", true), "a\nb");
        assert_eq!(unescape_string(r"'a\nb'", false), r"a\nb");
    }

    #[test]
    fn test_with_is_unsupported() {
        let err = parse_sql("WITH x AS (SELECT 1) SELECT * FROM x", Dialect::Postgres, 0).unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { ref construct, .. } if construct == "WITH"));
    }

    #[test]
    fn test_depth_limit() {
        let sql = format!("SELECT {}1{}", "(".repeat(40), ")".repeat(40));
        let err = parse_sql(&sql, Dialect::MySql, 16).unwrap_err();
        assert!(matches!(err, ParseError::TooDeep { limit: 16, .. }));
        assert!(parse_sql(&sql, Dialect::MySql, 0).is_ok());
    }

    #[test]
    fn test_flat_chains_count_toward_depth() {
        let ors = vec!["a = 1"; 40].join(" OR ");
        let err = parse_sql(&format!("SELECT 1 FROM t WHERE {ors}"), Dialect::MySql, 16).unwrap_err();
        assert!(matches!(err, ParseError::TooDeep { limit: 16, .. }));

        let sum = vec!["1"; 40].join(" + ");
        assert!(parse_sql(&format!("SELECT {sum}"), Dialect::MySql, 16).is_err());

        let unions = vec!["SELECT 1"; 40].join(" UNION ");
        assert!(parse_sql(&unions, Dialect::MySql, 16).is_err());

        let joins = vec!["t"; 40].join(", ");
        assert!(parse_sql(&format!("SELECT 1 FROM {joins}"), Dialect::MySql, 16).is_err());
    }

    #[test]
    fn test_sibling_chains_do_not_accumulate_depth() {
        let ors = vec!["a = 1"; 6].join(" OR ");
        let sql = format!("SELECT {ors}, {ors}, {ors} FROM t WHERE {ors}");
        assert!(parse_sql(&sql, Dialect::MySql, 16).is_ok());
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parse_sql("SELECT FROM", Dialect::MySql, 0).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { line: 1, column: 8, .. }));
        let err = parse_sql("SELECT a FROM", Dialect::MySql, 0).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(parse_sql("SELECT 1 FROM t t2 t3", Dialect::MySql, 0).is_err());
    }
}
