//! Dialect hooks injected into the generic wall visitor.
//!
//! A hook set answers the few questions whose answers differ per dialect:
//! how names canonicalize, which tables are always readable, and how
//! identifiers are quoted when a node is rendered back to SQL.

use crate::ast::{Ident, ObjectName};
use crate::names;
use crate::types::Dialect;

/// Per-dialect capability consumed by [`crate::visitor::WallVisitor`] and
/// [`crate::render`].
pub trait DialectHooks: Send + Sync {
    /// Which dialect these hooks implement.
    fn dialect(&self) -> Dialect;

    /// Canonical form of a single identifier.
    fn normalize_ident(&self, ident: &Ident) -> String {
        names::normalize_name(&ident.value)
    }

    /// Schema that qualifies unqualified names by default, if any.
    ///
    /// A name qualified with exactly this schema canonicalizes the same as
    /// the bare name.
    fn default_schema(&self) -> Option<&'static str> {
        None
    }

    /// Canonical dotted form of a possibly qualified name.
    fn normalize_object_name(&self, name: &ObjectName) -> String {
        let mut parts: Vec<String> = name.0.iter().map(|i| self.normalize_ident(i)).collect();
        if parts.len() == 2 && self.default_schema() == Some(parts[0].as_str()) {
            parts.remove(0);
        }
        parts.join(".")
    }

    /// Quote character used when rendering a quoted identifier.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Whether backslash escapes are active inside string literals.
    fn backslash_escapes(&self) -> bool {
        false
    }

    /// Tables every policy may read, given a canonical name.
    fn is_reserved_table(&self, _normalized: &str) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// Oracle: `dual` and the `v$` / `v_$` dynamic performance views are always
/// permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl DialectHooks for OracleDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn is_reserved_table(&self, normalized: &str) -> bool {
        let relation = names::relation_part(normalized);
        relation == "dual" || relation.starts_with("v$") || relation.starts_with("v_$")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl DialectHooks for MySqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn backslash_escapes(&self) -> bool {
        true
    }

    fn is_reserved_table(&self, normalized: &str) -> bool {
        normalized == "dual"
    }
}

/// PostgreSQL: `public.t` and `t` name the same table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl DialectHooks for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn default_schema(&self) -> Option<&'static str> {
        Some("public")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(parts: &[&str]) -> ObjectName {
        ObjectName(parts.iter().map(|p| Ident::new(*p)).collect())
    }

    #[test]
    fn test_quoted_and_bare_names_normalize_equal() {
        let quoted = ObjectName(vec![Ident::quoted("Orders", '"')]);
        assert_eq!(
            OracleDialect.normalize_object_name(&quoted),
            OracleDialect.normalize_object_name(&name(&["ORDERS"]))
        );
    }

    #[test]
    fn test_postgres_strips_public_schema() {
        assert_eq!(
            PostgresDialect.normalize_object_name(&name(&["Public", "Orders"])),
            "orders"
        );
        assert_eq!(
            PostgresDialect.normalize_object_name(&name(&["sales", "orders"])),
            "sales.orders"
        );
    }

    #[test]
    fn test_reserved_tables() {
        assert!(OracleDialect.is_reserved_table("dual"));
        assert!(OracleDialect.is_reserved_table("v$session"));
        assert!(OracleDialect.is_reserved_table("sys.v_$sql"));
        assert!(!OracleDialect.is_reserved_table("orders"));
        assert!(MySqlDialect.is_reserved_table("dual"));
        assert!(!PostgresDialect.is_reserved_table("dual"));
    }

    #[test]
    fn test_quote_chars() {
        assert_eq!(MySqlDialect.quote_char(), '`');
        assert_eq!(OracleDialect.quote_char(), '"');
        assert_eq!(PostgresDialect.quote_char(), '"');
    }
}
