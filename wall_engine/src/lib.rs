//! SQL Wall Engine: policy evaluation for a SQL firewall.
//!
//! Parses SQL in the MySQL, Oracle or PostgreSQL dialect, walks the tree with
//! a dialect-aware visitor, and reports every policy finding in one pass:
//! tautologies, unauthorized tables and functions, disallowed statement
//! kinds, unbounded mutations and suspicious structure.
//!
//! ```
//! use sqlwall_engine::{Dialect, Firewall, PolicyConfig, ViolationKind};
//!
//! let firewall = Firewall::new(PolicyConfig::default(), Dialect::MySql);
//! let result = firewall.check("SELECT * FROM orders WHERE id = 7 OR 1 = 1").unwrap();
//! assert_eq!(result.kinds(), vec![ViolationKind::AlwaysTrueCondition]);
//! ```
//!
//! With the `python` feature the crate also builds the `sqlwall_engine`
//! Python module:
//! ```python
//! from sqlwall_engine import Firewall, PolicyConfig, check_sql
//! ```

// PyO3-generated code triggers this lint on PyResult return types, suppress globally.
#![allow(clippy::useless_conversion)]

pub mod ast;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod names;
pub mod parser;
#[cfg(feature = "python")]
pub mod pyo3_bindings;
pub mod render;
pub mod reporter;
pub mod rules;
pub mod session;
pub mod sql_lexer;
pub mod types;
pub mod visitor;

pub use config::PolicyConfig;
pub use engine::{check_sql, Firewall, WallError};
pub use types::{Dialect, Severity, Violation, ViolationKind, WallResult};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The Python module exposed by this crate.
///
/// Importable as: `from sqlwall_engine import Firewall`
#[cfg(feature = "python")]
#[pymodule]
fn sqlwall_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Initialize Rust logging → Python logging bridge
    pyo3_log::init();

    pyo3_bindings::register_module(m)?;

    Ok(())
}
