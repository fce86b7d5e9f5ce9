//! # qchain — deferred SQL query builder
//!
//! > **Chain clauses now. Get SQL when you ask for it.**
//!
//! Every fluent call returns a new immutable handle that remembers the call
//! and links back to where it came from. Nothing is rendered until
//! [`Query::build`], which walks the chain, merges same-kind calls and emits
//! the clauses in a fixed order, so call order never changes the output.
//!
//! ## Quick Example
//!
//! ```
//! use qchain::prelude::*;
//!
//! let sql = query("Person")
//!     .filter([("name", Value::from("Bill")), ("age", Value::from(18))])
//!     .select(["id"])
//!     .build()?;
//! assert_eq!(sql, "SELECT id FROM Person WHERE name='Bill' AND age='18';");
//! # Ok::<(), qchain::QchainError>(())
//! ```
//!
//! ## Clause order
//!
//! | Call       | Clause     | Merge rule                  |
//! |------------|------------|-----------------------------|
//! | `select`   | `SELECT`   | columns appended            |
//! | `query`    | `FROM`     | exactly one per chain       |
//! | `filter`   | `WHERE`    | last value per column wins  |
//! | `order_by` | `ORDER BY` | columns appended            |
//!
//! Values are interpolated as single-quoted literals and are **not**
//! escaped. Sanitize input before passing it to `filter`.

pub mod ast;
pub mod config;
pub mod error;
pub mod parser;
pub mod transpiler;

pub use ast::{ClauseKind, Query, QueryNode, Value};
pub use error::{QchainError, QueryResult};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::parser::parse;
    pub use crate::query;
    pub use crate::transpiler::{EmptySelectPolicy, Groups, RenderOptions, ToSql};
}

/// Start a new chain bound to `table`.
pub fn query(table: impl Into<String>) -> Query {
    Query::new(table)
}

/// Parse a textual chain into a query handle.
///
/// # Example
///
/// ```
/// use qchain::parse;
///
/// let q = parse("Person.select(id).filter(name='Bill')").unwrap();
/// assert_eq!(q.build().unwrap(), "SELECT id FROM Person WHERE name='Bill';");
/// ```
pub fn parse(input: &str) -> QueryResult<Query> {
    parser::parse(input)
}
