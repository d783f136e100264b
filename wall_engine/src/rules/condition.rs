//! Predicate rules: tautology / contradiction detection and operator checks.
//!
//! Condition roots are WHERE clauses, HAVING clauses, JOIN ... ON,
//! MERGE ... ON and the WHEN arms of a multi-table insert. Each root is
//! judged once:
//!
//! 1. The whole root is constant-folded. A root that folds to true is an
//!    [`ViolationKind::AlwaysTrueCondition`]; one that folds to false or
//!    NULL is an [`ViolationKind::AlwaysFalseCondition`].
//! 2. Otherwise the boolean skeleton of the root (AND / OR / XOR / NOT and
//!    parentheses) is searched for an OR node that folds to true. That is the
//!    `... AND (x = 5 OR 1 = 1)` shape, reported once against the root.
//!
//! Folding is three-valued. Values the folder cannot prove constant stay
//! unknown (`None`) and never produce a finding.

use std::cmp::Ordering;

use crate::ast::{BinaryExpr, BinaryOperator, Expr, GroupBy, InListExpr, Literal, UnaryOperator};
use crate::config::PolicyConfig;
use crate::names;
use crate::rules::WallContext;
use crate::types::ViolationKind;

/// A constant produced by folding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Exact integer, kept apart from floats so large literals compare exactly.
    Int(i128),
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// Three-valued truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn from_bool(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::True => Value::Bool(true),
            Self::False => Value::Bool(false),
            Self::Unknown => Value::Null,
        }
    }
}

impl Value {
    /// Numeric view of the value; strings coerce only when they parse.
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Null => None,
        }
    }

    /// Exact integer view; floats never coerce.
    fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i128::from(*b)),
            Self::Text(s) => s.trim().parse::<i128>().ok(),
            Self::Number(_) | Self::Null => None,
        }
    }

    /// Truth of the value in a boolean position. A bare number is true when
    /// non-zero.
    fn truth(&self) -> Option<Truth> {
        match self {
            Self::Bool(b) => Some(Truth::from_bool(*b)),
            Self::Null => Some(Truth::Unknown),
            Self::Int(n) => Some(Truth::from_bool(*n != 0)),
            Self::Number(_) | Self::Text(_) => self.as_number().map(|n| Truth::from_bool(n != 0.0)),
        }
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

/// Parse a numeric literal as written, including `0x` hex.
fn parse_number(text: &str) -> Option<Value> {
    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return i128::from_str_radix(hex, 16).ok().map(Value::Int);
    }
    if let Ok(n) = lower.parse::<i128>() {
        return Some(Value::Int(n));
    }
    lower.parse::<f64>().ok().map(Value::Number)
}

fn fold_literal(lit: &Literal) -> Option<Value> {
    match lit {
        Literal::Number(n) => parse_number(n),
        Literal::String(s) => Some(Value::Text(s.clone())),
        Literal::Boolean(b) => Some(Value::Bool(*b)),
        Literal::Null => Some(Value::Null),
    }
}

/// Fold an expression to a constant, if it is one.
#[must_use]
pub fn fold(expr: &Expr, config: &PolicyConfig) -> Option<Value> {
    match expr {
        Expr::Literal(lit) => fold_literal(lit),
        Expr::Nested(inner) => fold(inner, config),
        Expr::Cast { expr, .. } => fold(expr, config),
        Expr::BinaryOp(b) => fold_binary(b, config),
        Expr::Unary { op, expr } => {
            let value = fold(expr, config)?;
            match op {
                UnaryOperator::Not => Some(not(value.truth()?).into_value()),
                UnaryOperator::Minus => match value {
                    Value::Null => Some(Value::Null),
                    Value::Int(n) => Some(
                        n.checked_neg()
                            .map_or(Value::Number(-(n as f64)), Value::Int),
                    ),
                    v => v.as_number().map(|n| Value::Number(-n)),
                },
                UnaryOperator::Plus => match value {
                    Value::Null => Some(Value::Null),
                    Value::Int(n) => Some(Value::Int(n)),
                    v => v.as_number().map(Value::Number),
                },
                UnaryOperator::BitNot => None,
            }
        }
        Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let value = fold(expr, config)?;
            let low = fold(low, config)?;
            let high = fold(high, config)?;
            let ge = compare(&value, &low)?.map(|o| o != Ordering::Less);
            let le = compare(&value, &high)?.map(|o| o != Ordering::Greater);
            let truth = match (ge, le) {
                (Some(a), Some(b)) => Truth::from_bool(a && b),
                (Some(false), None) | (None, Some(false)) => Truth::False,
                _ => Truth::Unknown,
            };
            Some(negate_if(truth, *negated).into_value())
        }
        Expr::InList(list) => fold_in_list(list, config),
        Expr::IsNull { expr, negated } => {
            let value = fold(expr, config)?;
            Some(Value::Bool((value == Value::Null) != *negated))
        }
        Expr::Like {
            expr,
            negated,
            pattern,
        } => fold_like(expr, *negated, pattern, config),
        _ => None,
    }
}

fn not(t: Truth) -> Truth {
    match t {
        Truth::True => Truth::False,
        Truth::False => Truth::True,
        Truth::Unknown => Truth::Unknown,
    }
}

fn negate_if(t: Truth, negated: bool) -> Truth {
    if negated {
        not(t)
    } else {
        t
    }
}

/// Compare two constants. `Some(None)` means the comparison involves NULL.
fn compare(a: &Value, b: &Value) -> Option<Option<Ordering>> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Some(None),
        (Value::Text(x), Value::Text(y)) => Some(Some(x.cmp(y))),
        _ => {
            if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
                return Some(Some(x.cmp(&y)));
            }
            let x = a.as_number()?;
            let y = b.as_number()?;
            x.partial_cmp(&y).map(Some)
        }
    }
}

fn fold_binary(b: &BinaryExpr, config: &PolicyConfig) -> Option<Value> {
    let op = b.op;
    if op.is_logical() {
        let left = fold(&b.left, config).and_then(|v| v.truth());
        let right = fold(&b.right, config).and_then(|v| v.truth());
        return fold_logical(op, left, right).map(Truth::into_value);
    }

    if op.is_comparison() {
        if let (Some(left), Some(right)) = (fold(&b.left, config), fold(&b.right, config)) {
            let truth = match compare(&left, &right)? {
                Some(ordering) => Truth::from_bool(match op {
                    BinaryOperator::Eq => ordering == Ordering::Equal,
                    BinaryOperator::NotEq => ordering != Ordering::Equal,
                    BinaryOperator::Lt => ordering == Ordering::Less,
                    BinaryOperator::LtEq => ordering != Ordering::Greater,
                    BinaryOperator::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }),
                None => Truth::Unknown,
            };
            return Some(truth.into_value());
        }
        if same_column(&b.left, &b.right) {
            let reflexive = matches!(
                op,
                BinaryOperator::Eq | BinaryOperator::LtEq | BinaryOperator::GtEq
            );
            return Some(Value::Bool(reflexive));
        }
        return None;
    }

    if op.is_bitwise() {
        return None;
    }

    let left = fold(&b.left, config)?;
    let right = fold(&b.right, config)?;
    if left == Value::Null || right == Value::Null {
        return Some(Value::Null);
    }
    if op == BinaryOperator::Concat {
        return match (left, right) {
            (Value::Text(x), Value::Text(y)) => Some(Value::Text(x + &y)),
            _ => None,
        };
    }
    let x = left.as_number()?;
    let y = right.as_number()?;
    if matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) && y == 0.0 {
        return Some(Value::Null);
    }
    if let (Some(i), Some(j)) = (left.as_int(), right.as_int()) {
        let exact = match op {
            BinaryOperator::Plus => i.checked_add(j),
            BinaryOperator::Minus => i.checked_sub(j),
            BinaryOperator::Multiply => i.checked_mul(j),
            BinaryOperator::Modulo => i.checked_rem(j),
            _ => None,
        };
        if let Some(n) = exact {
            return Some(Value::Int(n));
        }
    }
    let n = match op {
        BinaryOperator::Plus => x + y,
        BinaryOperator::Minus => x - y,
        BinaryOperator::Multiply => x * y,
        BinaryOperator::Divide => x / y,
        BinaryOperator::Modulo => x % y,
        _ => return None,
    };
    Some(Value::Number(n))
}

fn fold_logical(op: BinaryOperator, left: Option<Truth>, right: Option<Truth>) -> Option<Truth> {
    match op {
        BinaryOperator::And => match (left, right) {
            (Some(Truth::False), _) | (_, Some(Truth::False)) => Some(Truth::False),
            (Some(Truth::True), Some(Truth::True)) => Some(Truth::True),
            (Some(_), Some(_)) => Some(Truth::Unknown),
            _ => None,
        },
        BinaryOperator::Or => match (left, right) {
            (Some(Truth::True), _) | (_, Some(Truth::True)) => Some(Truth::True),
            (Some(Truth::False), Some(Truth::False)) => Some(Truth::False),
            (Some(_), Some(_)) => Some(Truth::Unknown),
            _ => None,
        },
        _ => match (left?, right?) {
            (Truth::Unknown, _) | (_, Truth::Unknown) => Some(Truth::Unknown),
            (a, b) => Some(Truth::from_bool(a != b)),
        },
    }
}

fn fold_in_list(list: &InListExpr, config: &PolicyConfig) -> Option<Value> {
    let value = fold(&list.expr, config)?;
    let mut saw_null = false;
    for item in &list.list {
        match compare(&value, &fold(item, config)?)? {
            Some(Ordering::Equal) => return Some(Value::Bool(!list.negated)),
            Some(_) => {}
            None => saw_null = true,
        }
    }
    let truth = if saw_null {
        Truth::Unknown
    } else {
        Truth::False
    };
    Some(negate_if(truth, list.negated).into_value())
}

fn fold_like(expr: &Expr, negated: bool, pattern: &Expr, config: &PolicyConfig) -> Option<Value> {
    let Value::Text(pattern) = fold(pattern, config)? else {
        return None;
    };
    match fold(expr, config) {
        Some(Value::Null) => Some(Value::Null),
        Some(value) => {
            let text = match value {
                Value::Text(s) => s,
                Value::Int(n) => n.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => u8::from(b).to_string(),
                Value::Null => return None,
            };
            Some(Value::Bool(like_matches(&text, &pattern) != negated))
        }
        None if !config.condition_like_true_allow
            && !pattern.is_empty()
            && pattern.chars().all(|c| c == '%') =>
        {
            Some(Value::Bool(!negated))
        }
        None => None,
    }
}

/// SQL `LIKE` matching with `%` and `_` wildcards, case-sensitive.
fn like_matches(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    // dp[j]: pattern prefix of length j matches the text prefix seen so far
    let mut dp = vec![false; p.len() + 1];
    dp[0] = true;
    for j in 1..=p.len() {
        dp[j] = dp[j - 1] && p[j - 1] == '%';
    }
    for &tc in &t {
        let mut next = vec![false; p.len() + 1];
        for j in 1..=p.len() {
            next[j] = match p[j - 1] {
                '%' => next[j - 1] || dp[j],
                '_' => dp[j - 1],
                pc => dp[j - 1] && pc == tc,
            };
        }
        dp = next;
    }
    dp[p.len()]
}

/// Whether two operands reference the same column (`x = x`, `t.a = T.A`).
fn same_column(a: &Expr, b: &Expr) -> bool {
    match (strip_nested(a), strip_nested(b)) {
        (Expr::Identifier(x), Expr::Identifier(y)) => {
            names::normalize_name(&x.value) == names::normalize_name(&y.value)
        }
        (Expr::Property { owner: o1, name: n1 }, Expr::Property { owner: o2, name: n2 }) => {
            names::normalize_name(&n1.value) == names::normalize_name(&n2.value)
                && same_column(o1, o2)
        }
        _ => false,
    }
}

fn strip_nested(expr: &Expr) -> &Expr {
    match expr {
        Expr::Nested(inner) => strip_nested(inner),
        other => other,
    }
}

/// Result of one pass over a condition's boolean skeleton.
#[derive(Debug, Clone, Copy)]
struct Scan {
    /// Folded truth of the node, `None` when not constant.
    truth: Option<Truth>,
    /// An OR node that folds to true sits under this node in a position where
    /// it widens the match: reached through AND / OR only.
    true_or: bool,
}

/// Fold the boolean skeleton bottom-up in a single pass.
///
/// Each node is folded once from its children's results. Below NOT or XOR
/// a true OR no longer widens the outer condition, so the flag is dropped
/// there.
fn scan(expr: &Expr, config: &PolicyConfig) -> Scan {
    match expr {
        Expr::Nested(inner) => scan(inner, config),
        Expr::Unary {
            op: UnaryOperator::Not,
            expr,
        } => Scan {
            truth: scan(expr, config).truth.map(not),
            true_or: false,
        },
        Expr::BinaryOp(b) if b.op.is_logical() => {
            let left = scan(&b.left, config);
            let right = scan(&b.right, config);
            let truth = fold_logical(b.op, left.truth, right.truth);
            let true_or = match b.op {
                BinaryOperator::Or => {
                    truth == Some(Truth::True) || left.true_or || right.true_or
                }
                BinaryOperator::And => left.true_or || right.true_or,
                _ => false,
            };
            Scan { truth, true_or }
        }
        _ => Scan {
            truth: fold(expr, config).and_then(|v| v.truth()),
            true_or: false,
        },
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Judge one condition root. `clause` names the clause for the message.
pub fn check_condition<C: WallContext>(cx: &mut C, expr: &Expr, clause: &str) {
    let config = cx.config();
    let scanned = scan(expr, config);
    let finding = match scanned.truth {
        Some(Truth::True) => Some((
            ViolationKind::AlwaysTrueCondition,
            format!("{clause} condition is always true"),
        )),
        Some(Truth::False | Truth::Unknown) if !config.condition_always_false_allow => Some((
            ViolationKind::AlwaysFalseCondition,
            format!("{clause} condition is always false"),
        )),
        Some(_) => None,
        None if scanned.true_or => Some((
            ViolationKind::AlwaysTrueCondition,
            format!("{clause} condition contains an always-true OR branch"),
        )),
        None => None,
    };

    if let Some((kind, message)) = finding {
        let sql = cx.render(expr);
        cx.report(kind, message, sql, expr.span());
    }
}

/// HAVING is judged exactly like WHERE.
pub fn check_having<C: WallContext>(cx: &mut C, group_by: &GroupBy) {
    if let Some(having) = &group_by.having {
        check_condition(cx, having, "HAVING");
    }
}

/// Operator checks for a binary node that sits inside a condition root.
pub fn check_binary_op<C: WallContext>(cx: &mut C, b: &BinaryExpr) {
    let config = cx.config();
    let message = match b.op {
        BinaryOperator::Xor if !config.condition_op_xor_allow => "XOR operator in condition",
        op if op.is_bitwise() && !config.condition_op_bitwise_allow => {
            "bitwise operator in condition"
        }
        _ => return,
    };
    let sql = cx.render(b);
    cx.report(ViolationKind::StructuralAnomaly, message, sql, b.left.span());
}

/// IN-list shape: oversized constant enumerations and subqueries mixed with
/// constants.
pub fn check_in_list<C: WallContext>(cx: &mut C, list: &InListExpr) {
    let limit = cx.config().max_in_list_items;
    let message = if limit > 0 && list.list.len() > limit {
        format!("IN list has {} items (limit {limit})", list.list.len())
    } else {
        let has_subquery = list
            .list
            .iter()
            .any(|e| matches!(strip_nested(e), Expr::Subquery(_)));
        let has_constant = list
            .list
            .iter()
            .any(|e| matches!(strip_nested(e), Expr::Literal(_)));
        if !(has_subquery && has_constant) {
            return;
        }
        "IN list mixes a subquery with constant members".to_owned()
    };
    let sql = cx.render(list);
    cx.report(ViolationKind::StructuralAnomaly, message, sql, list.expr.span());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql;
    use crate::ast::{Query, Statement};
    use crate::types::Dialect;

    fn where_of(sql: &str) -> Expr {
        let stmts = parse_sql(sql, Dialect::MySql, 0).unwrap();
        let Statement::Select(select) = &stmts[0] else {
            panic!("not a select")
        };
        let Query::Select(block) = &select.query else {
            panic!("not a block")
        };
        block.selection.clone().unwrap()
    }

    fn fold_where(sql: &str) -> Option<Value> {
        fold(&where_of(sql), &PolicyConfig::default())
    }

    #[test]
    fn test_fold_constant_comparisons() {
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 1 = 1"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 'a' = 'b'"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE '2' > 1"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 2 - 1 = 1"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 0x10 = 16"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_fold_null_is_unknown() {
        assert_eq!(fold_where("SELECT 1 FROM t WHERE NULL = NULL"), Some(Value::Null));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE NULL IS NULL"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 1 / 0 = 1"), Some(Value::Null));
    }

    #[test]
    fn test_fold_three_valued_logic() {
        assert_eq!(fold_where("SELECT 1 FROM t WHERE a = 5 OR 1 = 1"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE a = 5 AND 1 = 2"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE a = 5 AND 1 = 1"), None);
        assert_eq!(fold_where("SELECT 1 FROM t WHERE NOT (1 = 1)"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 1 XOR 0"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_fold_same_column() {
        assert_eq!(fold_where("SELECT 1 FROM t WHERE id = ID"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE t.id >= T.id"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE id <> id"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE id = other"), None);
    }

    #[test]
    fn test_fold_predicates() {
        assert_eq!(
            fold_where("SELECT 1 FROM t WHERE 5 BETWEEN 1 AND 10"),
            Some(Value::Bool(true))
        );
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 3 IN (1, 2)"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 3 NOT IN (1, 3)"), Some(Value::Bool(false)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE name LIKE '%'"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 'abc' LIKE 'a_c'"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE name LIKE 'a%'"), None);
    }

    #[test]
    fn test_like_true_allow_disables_folding() {
        let config = PolicyConfig {
            condition_like_true_allow: true,
            ..PolicyConfig::default()
        };
        assert_eq!(fold(&where_of("SELECT 1 FROM t WHERE name LIKE '%'"), &config), None);
    }

    #[test]
    fn test_bare_number_truthiness() {
        let value = fold_where("SELECT 1 FROM t WHERE 1").unwrap();
        assert_eq!(value.truth(), Some(Truth::True));
        let value = fold_where("SELECT 1 FROM t WHERE 0").unwrap();
        assert_eq!(value.truth(), Some(Truth::False));
    }

    #[test]
    fn test_bitwise_not_folded() {
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 1 | 1"), None);
    }

    #[test]
    fn test_true_disjunction_search() {
        let config = PolicyConfig::default();
        let expr = where_of("SELECT 1 FROM t WHERE a = 5 AND (b = 1 OR (c = 2 OR 2 > 1))");
        assert_eq!(fold(&expr, &config), None);
        let scanned = scan(&expr, &config);
        assert_eq!(scanned.truth, None);
        assert!(scanned.true_or);
        let expr = where_of("SELECT 1 FROM t WHERE a = 5 AND 1 = 1");
        assert!(!scan(&expr, &config).true_or);
    }

    #[test]
    fn test_negated_or_xor_tautology_does_not_widen() {
        let config = PolicyConfig::default();
        let expr = where_of("SELECT 1 FROM t WHERE a = 1 OR NOT (b = 2 OR 1 = 1)");
        let scanned = scan(&expr, &config);
        assert_eq!(scanned.truth, None);
        assert!(!scanned.true_or);

        let expr = where_of("SELECT 1 FROM t WHERE a = 1 AND (b = 2 XOR (c = 3 OR 1 = 1))");
        assert!(!scan(&expr, &config).true_or);
    }

    #[test]
    fn test_scan_agrees_with_fold() {
        let config = PolicyConfig::default();
        for sql in [
            "SELECT 1 FROM t WHERE a = 5 OR 1 = 1",
            "SELECT 1 FROM t WHERE a = 5 AND 1 = 2",
            "SELECT 1 FROM t WHERE NOT (1 = 1)",
            "SELECT 1 FROM t WHERE 1 XOR 0",
            "SELECT 1 FROM t WHERE a = 5 AND 1 = 1",
            "SELECT 1 FROM t WHERE NULL OR 1 = 2",
        ] {
            let expr = where_of(sql);
            assert_eq!(
                scan(&expr, &config).truth,
                fold(&expr, &config).and_then(|v| v.truth()),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_long_or_chain_with_true_branch() {
        let ors = (0..2000)
            .map(|i| format!("a = {i}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("SELECT 1 FROM t WHERE b = 1 AND ({ors} OR 1 = 1)");
        let expr = where_of(&sql);
        let scanned = scan(&expr, &PolicyConfig::default());
        assert_eq!(scanned.truth, None);
        assert!(scanned.true_or);
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        assert_eq!(
            fold_where("SELECT 1 FROM t WHERE 9007199254740993 = 9007199254740992"),
            Some(Value::Bool(false))
        );
        assert_eq!(
            fold_where("SELECT 1 FROM t WHERE 9007199254740992 + 1 = 9007199254740993"),
            Some(Value::Bool(true))
        );
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 7 % 0 = 1"), Some(Value::Null));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE 1.5 > 1"), Some(Value::Bool(true)));
        assert_eq!(fold_where("SELECT 1 FROM t WHERE -3 < '-2'"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_like_matcher() {
        assert!(like_matches("hello", "h%o"));
        assert!(like_matches("", "%"));
        assert!(!like_matches("hello", "h_o"));
        assert!(like_matches("hello", "_ell_"));
    }
}
