//! Rule evaluation engine.
//!
//! Every rule is a free function generic over [`WallContext`]: it reads the
//! node it is given, may record findings through the context, and never
//! mutates the tree. One rule implementation serves every dialect; the
//! dialect only shows up through the context's name normalization and SQL
//! rendering.
//!
//! Rules are grouped by construct family:
//!
//! - [`condition`]: WHERE / HAVING / ON predicate folding and operator checks
//! - [`objects`]: identifiers, properties, table sources and functions
//! - [`statement`]: statement-kind gates, select / union shape, DML targets

pub mod condition;
pub mod objects;
pub mod statement;

use crate::ast::{Ident, ObjectName};
use crate::config::PolicyConfig;
use crate::dialect::DialectHooks;
use crate::render::{self, ToSql};
use crate::session::TraversalSession;
use crate::types::{Span, ViolationKind};

/// What a rule can see and do while the visitor walks a tree.
///
/// Implemented by [`crate::visitor::WallVisitor`]; rules call back into it
/// for dialect-aware questions such as whether a table is permitted.
pub trait WallContext {
    fn hooks(&self) -> &dyn DialectHooks;

    fn session(&self) -> &TraversalSession;

    fn session_mut(&mut self) -> &mut TraversalSession;

    fn config(&self) -> &PolicyConfig {
        self.session().config()
    }

    /// Render a node as dialect SQL for a violation record.
    fn render<N: ToSql + ?Sized>(&self, node: &N) -> String {
        render::to_sql(node, self.hooks())
    }

    /// Canonical dotted name under this dialect.
    fn normalize(&self, name: &ObjectName) -> String {
        self.hooks().normalize_object_name(name)
    }

    fn normalize_ident(&self, ident: &Ident) -> String {
        self.hooks().normalize_ident(ident)
    }

    /// Whether the policy lets the walk read `name`.
    ///
    /// Reserved dialect tables are always readable. Without table checking
    /// every table is permitted.
    fn is_permit_table(&self, name: &ObjectName) -> bool {
        if !self.config().table_check_enabled {
            return true;
        }
        let normalized = self.normalize(name);
        self.hooks().is_reserved_table(&normalized)
            || self.session().tables().is_permitted(&normalized)
    }

    fn report(
        &mut self,
        kind: ViolationKind,
        message: impl Into<String>,
        sql: String,
        span: Option<Span>,
    ) {
        self.session_mut().report(kind, message, sql, span);
    }
}
