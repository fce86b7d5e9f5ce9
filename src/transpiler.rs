//! SQL transpiler for query chains.
//!
//! Rendering walks the chain once, buckets the nodes by [`ClauseKind`],
//! then emits the buckets in [`ClauseKind::CANONICAL`] order. The order
//! in which the caller chained the calls never affects clause order; it
//! only decides how same-kind contributions are merged.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ast::*;
use crate::error::{QchainError, QueryResult};

/// Trait for converting query chains to SQL.
pub trait ToSql {
    /// Render this chain to a SQL string.
    fn to_sql(&self) -> QueryResult<String>;
}

impl ToSql for Query {
    fn to_sql(&self) -> QueryResult<String> {
        self.build()
    }
}

/// What to do when no columns were selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySelectPolicy {
    /// Render `SELECT *`.
    #[default]
    Star,
    /// Fail with [`QchainError::EmptySelect`].
    Reject,
}

/// Rendering knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub empty_select: EmptySelectPolicy,
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self {
            empty_select: EmptySelectPolicy::Reject,
        }
    }
}

/// Nodes of one chain bucketed by clause kind, each bucket in call order.
#[derive(Debug)]
pub struct Groups<'a> {
    buckets: [Vec<&'a QueryNode>; 4],
    table: &'a str,
}

impl<'a> Groups<'a> {
    /// Traverse `query` and bucket its nodes, checking the chain shape:
    /// the root must be the one and only table binding.
    pub fn collect(query: &'a Query) -> QueryResult<Self> {
        let calls = query.calls();
        debug!(nodes = calls.len(), "traversed query chain");

        let root = calls
            .first()
            .ok_or_else(|| QchainError::malformed("empty chain"))?;
        if root.kind() != ClauseKind::Table {
            return Err(QchainError::malformed(format!(
                "chain root is a {} node, expected a table binding",
                root.kind()
            )));
        }

        let mut buckets: [Vec<&'a QueryNode>; 4] = Default::default();
        for node in calls {
            buckets[node.kind().rank()].push(node);
        }

        let table: &'a str = match buckets[ClauseKind::Table.rank()].as_slice() {
            [node] => match QueryNode::positional(*node) {
                [name] => name.as_str(),
                args => {
                    return Err(QchainError::malformed(format!(
                        "table binding takes exactly one name, got {}",
                        args.len()
                    )));
                }
            },
            nodes => {
                return Err(QchainError::malformed(format!(
                    "found {} table bindings, expected exactly one",
                    nodes.len()
                )));
            }
        };

        debug!(
            table,
            select = buckets[ClauseKind::Select.rank()].len(),
            filter = buckets[ClauseKind::Filter.rank()].len(),
            order_by = buckets[ClauseKind::OrderBy.rank()].len(),
            "grouped query chain"
        );

        Ok(Self { buckets, table })
    }

    /// Nodes of `kind`, in call order.
    pub fn get(&self, kind: ClauseKind) -> &[&'a QueryNode] {
        &self.buckets[kind.rank()]
    }

    pub fn table(&self) -> &'a str {
        self.table
    }

    /// Buckets in canonical clause order, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (ClauseKind, &[&'a QueryNode])> + '_ {
        ClauseKind::CANONICAL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

impl Query {
    /// Render with the default options (`SELECT *` when nothing was selected).
    ///
    /// # Example
    ///
    /// ```
    /// use qchain::Query;
    ///
    /// let sql = Query::new("Person")
    ///     .order_by(["name"])
    ///     .where_eq("name", "Bill")
    ///     .select(["id", "age"])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(sql, "SELECT id, age FROM Person WHERE name='Bill' ORDER BY name;");
    /// ```
    pub fn build(&self) -> QueryResult<String> {
        self.build_with(&RenderOptions::default())
    }

    /// Render with explicit options.
    pub fn build_with(&self, options: &RenderOptions) -> QueryResult<String> {
        let groups = Groups::collect(self)?;

        let mut fragments: Vec<String> = Vec::with_capacity(ClauseKind::CANONICAL.len());
        for (kind, nodes) in groups.iter() {
            if let Some(fragment) = render_clause(kind, nodes, &groups, options)? {
                trace!(clause = %kind, fragment = %fragment, "rendered clause");
                fragments.push(fragment);
            }
        }

        Ok(format!("{};", fragments.join(" ")))
    }
}

/// Render one bucket. `None` means the clause is omitted.
fn render_clause(
    kind: ClauseKind,
    nodes: &[&QueryNode],
    groups: &Groups<'_>,
    options: &RenderOptions,
) -> QueryResult<Option<String>> {
    match kind {
        ClauseKind::Table => Ok(Some(format!("FROM {}", groups.table()))),
        ClauseKind::Select => {
            let columns = accumulate(nodes);
            if !columns.is_empty() {
                return Ok(Some(format!("SELECT {}", columns.join(", "))));
            }
            match options.empty_select {
                EmptySelectPolicy::Star => Ok(Some("SELECT *".to_string())),
                EmptySelectPolicy::Reject => Err(QchainError::EmptySelect {
                    table: groups.table().to_string(),
                }),
            }
        }
        ClauseKind::Filter => {
            let conditions = merge_conditions(nodes);
            if conditions.is_empty() {
                return Ok(None);
            }
            let conditions: Vec<String> = conditions
                .iter()
                .map(|(column, value)| format!("{}='{}'", column, value))
                .collect();
            Ok(Some(format!("WHERE {}", conditions.join(" AND "))))
        }
        ClauseKind::OrderBy => {
            let columns = accumulate(nodes);
            if columns.is_empty() {
                return Ok(None);
            }
            Ok(Some(format!("ORDER BY {}", columns.join(", "))))
        }
    }
}

/// Concatenate positional args across nodes, duplicates kept.
fn accumulate<'a>(nodes: &[&'a QueryNode]) -> Vec<&'a str> {
    nodes
        .iter()
        .flat_map(|node| node.positional().iter().map(String::as_str))
        .collect()
}

/// Overlay named args in call order: first-seen key order, last value wins.
fn merge_conditions<'a>(nodes: &[&'a QueryNode]) -> Vec<(&'a str, &'a Value)> {
    let mut merged: Vec<(&'a str, &'a Value)> = Vec::new();
    for node in nodes {
        for (column, value) in node.named() {
            match merged.iter_mut().find(|(c, _)| *c == column.as_str()) {
                Some(slot) => slot.1 = value,
                None => merged.push((column.as_str(), value)),
            }
        }
    }
    merged
}
