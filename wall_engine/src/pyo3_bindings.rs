//! PyO3 bindings exposing the firewall to Python.
//!
//! The Python module is importable as:
//! ```python
//! from sqlwall_engine import Firewall, PolicyConfig, WallResult, check_sql
//! ```
//!
//! All public types (Firewall, PolicyConfig, WallResult, Violation,
//! ViolationKind, Severity, Dialect) are registered as PyO3 classes.

use pyo3::prelude::*;

use crate::config::PolicyConfig;
use crate::engine::{Firewall, WallError};
use crate::types::{Dialect, Severity, Violation, ViolationKind, WallResult};

fn to_py_err(err: WallError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(err.to_string())
}

/// Python-facing Firewall wrapper.
///
/// Usage from Python:
/// ```python
/// from sqlwall_engine import Firewall, PolicyConfig, Dialect
/// policy = PolicyConfig.load("policy.toml")
/// firewall = Firewall(policy, Dialect.Oracle)
/// result = firewall.check("SELECT * FROM orders WHERE 1 = 1")
/// ```
#[pyclass(name = "Firewall")]
pub struct PyFirewall {
    inner: Firewall,
}

#[pymethods]
impl PyFirewall {
    #[new]
    #[pyo3(signature = (config, dialect = Dialect::MySql))]
    fn new(config: PolicyConfig, dialect: Dialect) -> Self {
        Self {
            inner: Firewall::new(config, dialect),
        }
    }

    /// Judge one SQL submission.
    ///
    /// Raises `ValueError` if the SQL does not parse or breaches a limit.
    fn check(&self, py: Python<'_>, sql: &str) -> PyResult<WallResult> {
        py.allow_threads(|| self.inner.check(sql)).map_err(to_py_err)
    }

    /// Judge many submissions in parallel. Failed submissions raise.
    fn check_batch(&self, py: Python<'_>, submissions: Vec<String>) -> PyResult<Vec<WallResult>> {
        py.allow_threads(|| self.inner.check_batch(&submissions))
            .into_iter()
            .map(|r| r.map_err(to_py_err))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "Firewall(dialect={}, fingerprint={})",
            self.inner.dialect(),
            &self.inner.config().fingerprint()[..12]
        )
    }
}

/// One-shot check under the default policy.
///
/// Equivalent to `Firewall(PolicyConfig(), dialect).check(sql)`.
#[pyfunction]
#[pyo3(name = "check_sql", signature = (sql, dialect = Dialect::MySql))]
pub fn py_check_sql(py: Python<'_>, sql: &str, dialect: Dialect) -> PyResult<WallResult> {
    py.allow_threads(|| crate::engine::check_sql(sql, dialect))
        .map_err(to_py_err)
}

/// Register all PyO3 classes and functions into the Python module.
///
/// This is called from `lib.rs` to populate the module.
pub fn register_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyFirewall>()?;
    m.add_class::<PolicyConfig>()?;
    m.add_class::<WallResult>()?;
    m.add_class::<Violation>()?;
    m.add_class::<ViolationKind>()?;
    m.add_class::<Severity>()?;
    m.add_class::<Dialect>()?;
    m.add_function(wrap_pyfunction!(py_check_sql, m)?)?;
    Ok(())
}
