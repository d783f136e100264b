//! SQL tokenizer feeding the statement parser.
//!
//! Produces a stream of [`Token`]s from SQL source text. The lexer uses
//! zero-copy `&str` slices into the source, tracks 1-based line/column
//! positions, and handles:
//!
//! - Reserved keywords (case-insensitive matching)
//! - Identifiers, including `$` and Unicode letters
//! - Quoted identifiers: `` `backtick` `` and `"double-quoted"`
//! - String literals with `''` escapes (and `\'` escapes for MySQL)
//! - Number literals: integer, decimal, scientific and `0x` hex
//! - User and system variables: `@name`, `@@version`, `@@global.tmpdir`
//! - Bind placeholders: `?`, `:name`, `$1`
//! - Operators, including `||`, `&&`, `|`, `&`, `^` and `::`
//! - Line comments (`-- ...`, and `# ...` for MySQL) and nested block comments

use crate::types::Dialect;

/// A token kind produced by the SQL lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Reserved word: SELECT, FROM, WHERE, UNION, etc.
    Keyword,
    /// Unquoted identifier (also non-reserved words such as `OUTFILE`).
    Identifier,
    /// Quoted identifier: backtick-quoted or double-quoted.
    QuotedIdent,
    /// Single-quoted string literal.
    StringLiteral,
    /// Numeric literal.
    NumberLiteral,
    /// `@user` or `@@system` variable reference.
    Variable,
    /// Bind placeholder: `?`, `:name`, `$1`.
    Placeholder,
    /// Operator such as `=`, `<>`, `||`, `&`.
    Operator,
    /// Left parenthesis `(`.
    LeftParen,
    /// Right parenthesis `)`.
    RightParen,
    /// Comma `,`.
    Comma,
    /// Semicolon `;`.
    Semicolon,
    /// Dot `.`.
    Dot,
    /// Line comment.
    LineComment,
    /// Block comment `/* ... */` (supports nesting).
    BlockComment,
    /// Spaces and tabs.
    Whitespace,
    /// `\n`, `\r\n` or `\r`.
    Newline,
    /// Unrecognized character.
    Unknown,
}

/// A single token with its kind, text slice, and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The kind of token.
    pub kind: TokenKind,
    /// Zero-copy slice into the original source text.
    pub text: &'a str,
    /// Byte offset in the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl Token<'_> {
    /// Whether this is a word token (keyword or bare identifier) spelled `word`.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier)
            && self.text.eq_ignore_ascii_case(word)
    }
}

/// Reserved words. Sorted, uppercase; looked up with binary search.
///
/// Contextual words (`OUTFILE`, `MATCHED`, `FIRST`, ...) are left as
/// identifiers so they stay usable as column names.
const SQL_KEYWORDS: &[&str] = &[
    "ALL",
    "AND",
    "AS",
    "ASC",
    "BETWEEN",
    "BY",
    "CALL",
    "CASE",
    "CAST",
    "CROSS",
    "DELETE",
    "DESC",
    "DISTINCT",
    "ELSE",
    "END",
    "EXCEPT",
    "EXISTS",
    "FALSE",
    "FOR",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "IN",
    "INNER",
    "INSERT",
    "INTERSECT",
    "INTO",
    "IS",
    "JOIN",
    "LEFT",
    "LIKE",
    "LIMIT",
    "MERGE",
    "MINUS",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "RIGHT",
    "SELECT",
    "SET",
    "TABLE",
    "THEN",
    "TRUE",
    "TRUNCATE",
    "UNION",
    "UPDATE",
    "USING",
    "VALUES",
    "WHEN",
    "WHERE",
    "WITH",
    "XOR",
];

/// Check whether a word is reserved (case-insensitive).
fn is_keyword(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    SQL_KEYWORDS.binary_search(&upper.as_str()).is_ok()
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Character cursor that keeps line and column in step with the byte offset.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Advance one character. `\r\n` counts as a single newline.
    fn bump(&mut self) {
        let Some(c) = self.peek_char() else {
            return;
        };
        self.pos += c.len_utf8();
        match c {
            '\n' => {
                self.line += 1;
                self.col = 1;
            }
            '\r' => {
                if self.peek(0) == Some(b'\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.col = 1;
            }
            _ => self.col += 1,
        }
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }

    /// Consume `/* ... */`, honoring nesting. Unterminated comments run to EOF.
    fn block_comment(&mut self) {
        self.bump_n(2);
        let mut depth: u32 = 1;
        while depth > 0 {
            match (self.peek(0), self.peek(1)) {
                (None, _) => break,
                (Some(b'/'), Some(b'*')) => {
                    depth += 1;
                    self.bump_n(2);
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.bump_n(2);
                }
                _ => self.bump(),
            }
        }
    }

    /// Consume a `'...'` literal. `''` is always an escape; `\x` only when
    /// `backslash` is set.
    fn string_literal(&mut self, backslash: bool) {
        self.bump();
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' if backslash => self.bump_n(2),
                b'\'' => {
                    self.bump();
                    if self.peek(0) == Some(b'\'') {
                        self.bump();
                        continue;
                    }
                    return;
                }
                _ => self.bump(),
            }
        }
    }

    /// Consume a quoted identifier; a doubled closing quote is an escape.
    fn quoted(&mut self, quote: u8) {
        self.bump();
        while let Some(b) = self.peek(0) {
            self.bump();
            if b == quote {
                if self.peek(0) == Some(quote) {
                    self.bump();
                    continue;
                }
                return;
            }
        }
    }

    fn number(&mut self) {
        if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x' | b'X')) {
            self.bump_n(2);
            self.bump_while(|c| c.is_ascii_hexdigit());
            return;
        }
        self.bump_while(|c| c.is_ascii_digit());
        if self.peek(0) == Some(b'.') && self.peek(1).is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let digit_at = if matches!(self.peek(1), Some(b'+' | b'-')) {
                2
            } else {
                1
            };
            if self.peek(digit_at).is_some_and(|b| b.is_ascii_digit()) {
                self.bump_n(digit_at);
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
    }

    /// Consume `@name`, `@@name`, `@@scope.name` or `@'quoted'`.
    fn variable(&mut self) {
        self.bump();
        if self.peek(0) == Some(b'@') {
            self.bump();
        }
        match self.peek(0) {
            Some(q @ (b'\'' | b'"' | b'`')) => self.quoted(q),
            _ => self.bump_while(|c| is_ident_continue(c) || c == '.'),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Tokenize a SQL source string into a vector of [`Token`]s.
///
/// The dialect only affects MySQL-specific lexing: backslash escapes in
/// string literals and `#` line comments.
#[must_use]
pub fn tokenize(source: &str, dialect: Dialect) -> Vec<Token<'_>> {
    let mysql = dialect == Dialect::MySql;
    let mut cur = Cursor::new(source);
    let mut tokens = Vec::new();

    while let Some(ch) = cur.peek(0) {
        let (start, line, column) = (cur.pos, cur.line, cur.col);
        let next = cur.peek(1);

        let kind = match ch {
            b'\n' | b'\r' => {
                cur.bump();
                TokenKind::Newline
            }
            b' ' | b'\t' => {
                cur.bump_while(|c| c == ' ' || c == '\t');
                TokenKind::Whitespace
            }
            b'-' if next == Some(b'-') => {
                cur.bump_while(|c| c != '\n' && c != '\r');
                TokenKind::LineComment
            }
            b'#' if mysql => {
                cur.bump_while(|c| c != '\n' && c != '\r');
                TokenKind::LineComment
            }
            b'/' if next == Some(b'*') => {
                cur.block_comment();
                TokenKind::BlockComment
            }
            b'\'' => {
                cur.string_literal(mysql);
                TokenKind::StringLiteral
            }
            b'`' | b'"' => {
                cur.quoted(ch);
                TokenKind::QuotedIdent
            }
            b'0'..=b'9' => {
                cur.number();
                TokenKind::NumberLiteral
            }
            b'@' => {
                cur.variable();
                TokenKind::Variable
            }
            b'?' => {
                cur.bump();
                TokenKind::Placeholder
            }
            b':' if next == Some(b':') => {
                cur.bump_n(2);
                TokenKind::Operator
            }
            b':' if next.is_some_and(|b| b.is_ascii_alphabetic() || b == b'_') => {
                cur.bump();
                cur.bump_while(is_ident_continue);
                TokenKind::Placeholder
            }
            b'$' if next.is_some_and(|b| b.is_ascii_digit()) => {
                cur.bump();
                cur.bump_while(|c| c.is_ascii_digit());
                TokenKind::Placeholder
            }
            b'(' => {
                cur.bump();
                TokenKind::LeftParen
            }
            b')' => {
                cur.bump();
                TokenKind::RightParen
            }
            b',' => {
                cur.bump();
                TokenKind::Comma
            }
            b';' => {
                cur.bump();
                TokenKind::Semicolon
            }
            b'.' => {
                cur.bump();
                TokenKind::Dot
            }
            b'<' => {
                cur.bump();
                if matches!(cur.peek(0), Some(b'>' | b'=')) {
                    cur.bump();
                }
                TokenKind::Operator
            }
            b'>' | b'!' => {
                cur.bump();
                if cur.peek(0) == Some(b'=') {
                    cur.bump();
                }
                TokenKind::Operator
            }
            b'|' | b'&' => {
                cur.bump();
                if cur.peek(0) == Some(ch) {
                    cur.bump();
                }
                TokenKind::Operator
            }
            b'=' | b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'~' => {
                cur.bump();
                TokenKind::Operator
            }
            _ if cur.peek_char().is_some_and(is_ident_start) => {
                cur.bump_while(is_ident_continue);
                if is_keyword(&source[start..cur.pos]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            }
            _ => {
                cur.bump();
                TokenKind::Unknown
            }
        };

        tokens.push(Token {
            kind,
            text: &source[start..cur.pos],
            offset: start,
            line,
            column,
        });
    }

    tokens
}

/// Drop whitespace, newlines and comments from a token stream.
#[must_use]
pub fn meaningful_tokens(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    tokens
        .into_iter()
        .filter(|t| {
            !matches!(
                t.kind,
                TokenKind::Whitespace
                    | TokenKind::Newline
                    | TokenKind::LineComment
                    | TokenKind::BlockComment
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: collect token kinds from source.
    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, Dialect::MySql)
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    /// Helper: collect (kind, text) pairs, ignoring whitespace/newlines/comments.
    fn significant(source: &str, dialect: Dialect) -> Vec<(TokenKind, &str)> {
        meaningful_tokens(tokenize(source, dialect))
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn mysql(source: &str) -> Vec<(TokenKind, &str)> {
        significant(source, Dialect::MySql)
    }

    #[test]
    fn test_keyword_table_is_sorted() {
        let mut sorted = SQL_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SQL_KEYWORDS);
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            mysql("SELECT 1"),
            vec![
                (TokenKind::Keyword, "SELECT"),
                (TokenKind::NumberLiteral, "1"),
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = mysql("select FROM where");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|(k, _)| *k == TokenKind::Keyword));
    }

    #[test]
    fn test_contextual_words_are_identifiers() {
        let tokens = mysql("outfile matched first");
        assert!(tokens.iter().all(|(k, _)| *k == TokenKind::Identifier));
    }

    #[test]
    fn test_identifiers() {
        let tokens = mysql("table_name _private $dollar v$session");
        assert_eq!(tokens[0], (TokenKind::Identifier, "table_name"));
        assert_eq!(tokens[1], (TokenKind::Identifier, "_private"));
        assert_eq!(tokens[2], (TokenKind::Identifier, "$dollar"));
        assert_eq!(tokens[3], (TokenKind::Identifier, "v$session"));
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(
            mysql("`my table`"),
            vec![(TokenKind::QuotedIdent, "`my table`")]
        );
        assert_eq!(
            mysql("\"say \"\"hi\"\"\""),
            vec![(TokenKind::QuotedIdent, "\"say \"\"hi\"\"\"")]
        );
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(
            mysql("'it''s fine'"),
            vec![(TokenKind::StringLiteral, "'it''s fine'")]
        );
        assert_eq!(
            mysql(r"'a\' OR 1=1'"),
            vec![(TokenKind::StringLiteral, r"'a\' OR 1=1'")]
        );
    }

    #[test]
    fn test_backslash_is_literal_outside_mysql() {
        let tokens = significant(r"'a\' OR 1", Dialect::Postgres);
        assert_eq!(tokens[0], (TokenKind::StringLiteral, r"'a\'"));
        assert_eq!(tokens[1], (TokenKind::Keyword, "OR"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(mysql("42"), vec![(TokenKind::NumberLiteral, "42")]);
        assert_eq!(mysql("3.14"), vec![(TokenKind::NumberLiteral, "3.14")]);
        assert_eq!(mysql("2.5E-3"), vec![(TokenKind::NumberLiteral, "2.5E-3")]);
        assert_eq!(
            mysql("0x61646d696e"),
            vec![(TokenKind::NumberLiteral, "0x61646d696e")]
        );
    }

    #[test]
    fn test_variables() {
        let tokens = mysql("@x @@version @@global.tmpdir");
        assert_eq!(tokens[0], (TokenKind::Variable, "@x"));
        assert_eq!(tokens[1], (TokenKind::Variable, "@@version"));
        assert_eq!(tokens[2], (TokenKind::Variable, "@@global.tmpdir"));
    }

    #[test]
    fn test_placeholders() {
        let tokens = significant("? :name $1 a::int", Dialect::Postgres);
        assert_eq!(tokens[0], (TokenKind::Placeholder, "?"));
        assert_eq!(tokens[1], (TokenKind::Placeholder, ":name"));
        assert_eq!(tokens[2], (TokenKind::Placeholder, "$1"));
        assert_eq!(tokens[4], (TokenKind::Operator, "::"));
    }

    #[test]
    fn test_operators() {
        let ops = mysql("= <> != >= <= + - * / % || && | & ^");
        let expected: Vec<&str> = vec![
            "=", "<>", "!=", ">=", "<=", "+", "-", "*", "/", "%", "||", "&&", "|", "&", "^",
        ];
        assert_eq!(ops.len(), expected.len());
        for ((kind, text), want) in ops.iter().zip(expected) {
            assert_eq!(*kind, TokenKind::Operator);
            assert_eq!(*text, want);
        }
    }

    #[test]
    fn test_punctuation() {
        let tokens = mysql("( ) , ; .");
        assert_eq!(tokens[0].0, TokenKind::LeftParen);
        assert_eq!(tokens[1].0, TokenKind::RightParen);
        assert_eq!(tokens[2].0, TokenKind::Comma);
        assert_eq!(tokens[3].0, TokenKind::Semicolon);
        assert_eq!(tokens[4].0, TokenKind::Dot);
    }

    #[test]
    fn test_line_comments() {
        let all = tokenize("-- note\nSELECT 1 # trailing", Dialect::MySql);
        let comments: Vec<_> = all
            .iter()
            .filter(|t| t.kind == TokenKind::LineComment)
            .collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "-- note");
        assert_eq!(comments[1].text, "# trailing");
    }

    #[test]
    fn test_block_comment_nested() {
        let all = tokenize("/* outer /* inner */ still */ SELECT", Dialect::MySql);
        assert_eq!(all[0].kind, TokenKind::BlockComment);
        assert_eq!(all[0].text, "/* outer /* inner */ still */");
    }

    #[test]
    fn test_comment_split_keyword() {
        assert_eq!(
            mysql("UN/**/ION"),
            vec![
                (TokenKind::Identifier, "UN"),
                (TokenKind::Identifier, "ION"),
            ]
        );
    }

    #[test]
    fn test_whitespace_and_newlines() {
        assert_eq!(
            kinds("  \n\t "),
            vec![
                TokenKind::Whitespace,
                TokenKind::Newline,
                TokenKind::Whitespace,
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let all = tokenize("SELECT\n  1\r\n  FROM t", Dialect::MySql);
        let select = all.iter().find(|t| t.text == "SELECT").unwrap();
        assert_eq!((select.line, select.column), (1, 1));
        let one = all.iter().find(|t| t.text == "1").unwrap();
        assert_eq!((one.line, one.column), (2, 3));
        let from = all.iter().find(|t| t.text == "FROM").unwrap();
        assert_eq!(from.line, 3);
    }

    #[test]
    fn test_unicode_identifier() {
        let tokens = mysql("SELECT über_column FROM tëst");
        assert_eq!(tokens[1], (TokenKind::Identifier, "über_column"));
        assert_eq!(tokens[3], (TokenKind::Identifier, "tëst"));
    }

    #[test]
    fn test_string_inside_does_not_leak() {
        let tokens = mysql("SELECT 'DROP TABLE'");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].0, TokenKind::StringLiteral);
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        let tokens = mysql("SELECT 'open");
        assert_eq!(tokens[1], (TokenKind::StringLiteral, "'open"));
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("", Dialect::Oracle).is_empty());
    }

    #[test]
    fn test_is_word() {
        let tokens = tokenize("outfile", Dialect::MySql);
        assert!(tokens[0].is_word("OUTFILE"));
        assert!(!tokens[0].is_word("DUMPFILE"));
    }
}
