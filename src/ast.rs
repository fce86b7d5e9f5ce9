//! Query chain AST.
//!
//! Every fluent call allocates one immutable [`QueryNode`] that points back
//! at the node it was derived from. A [`Query`] is a handle to the newest
//! node; cloning it shares the chain, and extending it never touches the
//! nodes that already exist.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The clause a node contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Table,
    Select,
    Filter,
    OrderBy,
}

impl ClauseKind {
    /// Fixed clause emission order, independent of call order.
    pub const CANONICAL: [ClauseKind; 4] = [
        ClauseKind::Select,
        ClauseKind::Table,
        ClauseKind::Filter,
        ClauseKind::OrderBy,
    ];

    /// Position of this kind in [`ClauseKind::CANONICAL`].
    pub fn rank(self) -> usize {
        match self {
            ClauseKind::Select => 0,
            ClauseKind::Table => 1,
            ClauseKind::Filter => 2,
            ClauseKind::OrderBy => 3,
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseKind::Table => write!(f, "table"),
            ClauseKind::Select => write!(f, "select"),
            ClauseKind::Filter => write!(f, "filter"),
            ClauseKind::OrderBy => write!(f, "order_by"),
        }
    }
}

/// A literal filter value.
///
/// Values are interpolated verbatim and always single-quoted in the
/// rendered SQL, whatever the variant. Nothing is escaped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One clause contribution, linked to the node it was built from.
#[derive(Debug, Serialize)]
pub struct QueryNode {
    kind: ClauseKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    positional: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    named: Vec<(String, Value)>,
    #[serde(skip)]
    previous: Option<Query>,
}

impl QueryNode {
    /// Low-level constructor.
    ///
    /// Unlike the fluent methods on [`Query`] this accepts any shape,
    /// including chains that [`Query::build`] will reject as malformed.
    /// Duplicate keys in `named` collapse onto the first occurrence,
    /// keeping the last value.
    pub fn new(
        kind: ClauseKind,
        positional: Vec<String>,
        named: Vec<(String, Value)>,
        previous: Option<Query>,
    ) -> Self {
        let mut unique: Vec<(String, Value)> = Vec::with_capacity(named.len());
        for (key, value) in named {
            match unique.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => unique.push((key, value)),
            }
        }

        Self {
            kind,
            positional,
            named: unique,
            previous,
        }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    /// Positional arguments (table name, column names).
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Keyword arguments (filter conditions), in insertion order.
    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    pub fn previous(&self) -> Option<&Query> {
        self.previous.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.previous.is_none()
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        if self.kind == ClauseKind::Filter {
            let conds: Vec<String> = self
                .named
                .iter()
                .map(|(k, v)| format!("{}='{}'", k, v))
                .collect();
            write!(f, "{}", conds.join(", "))?;
        } else {
            write!(f, "{}", self.positional.join(", "))?;
        }
        write!(f, ")")
    }
}

// Unlink iteratively so dropping a very long chain does not recurse once
// per node.
impl Drop for QueryNode {
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(query) = next {
            match Arc::try_unwrap(query.node) {
                Ok(mut node) => next = node.previous.take(),
                Err(_) => break,
            }
        }
    }
}

/// Handle to the terminal node of a query chain.
///
/// Cheap to clone. Fluent methods take `&self` and return a new handle,
/// so any prefix of a chain can be branched freely.
///
/// # Example
///
/// ```
/// use qchain::Query;
///
/// let people = Query::new("Person").select(["id"]);
/// let bills = people.where_eq("name", "Bill");
/// let sorted = people.order_by(["age"]);
///
/// assert_eq!(bills.build().unwrap(), "SELECT id FROM Person WHERE name='Bill';");
/// assert_eq!(sorted.build().unwrap(), "SELECT id FROM Person ORDER BY age;");
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    node: Arc<QueryNode>,
}

impl Query {
    /// Bind a table, starting a new chain.
    pub fn new(table: impl Into<String>) -> Self {
        Self::from_node(QueryNode::new(
            ClauseKind::Table,
            vec![table.into()],
            vec![],
            None,
        ))
    }

    /// Wrap a hand-built node as a handle.
    pub fn from_node(node: QueryNode) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// The terminal node.
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    fn derive(&self, kind: ClauseKind, positional: Vec<String>, named: Vec<(String, Value)>) -> Self {
        Self::from_node(QueryNode::new(kind, positional, named, Some(self.clone())))
    }

    /// Add columns to the SELECT list. Repeated calls accumulate.
    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.derive(ClauseKind::Select, columns, vec![])
    }

    /// Add `column='value'` conditions. Repeated calls are merged, with
    /// later values replacing earlier ones for the same column.
    pub fn filter<I, K, V>(&self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let conditions = conditions
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.derive(ClauseKind::Filter, vec![], conditions)
    }

    /// Single-condition shorthand for [`Query::filter`].
    pub fn where_eq(&self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter([(column.into(), value.into())])
    }

    /// Add columns to the ORDER BY list. Repeated calls accumulate.
    pub fn order_by<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.derive(ClauseKind::OrderBy, columns, vec![])
    }

    /// Walk the chain from this handle back to the root.
    pub fn nodes(&self) -> Chain<'_> {
        Chain {
            next: Some(&self.node),
        }
    }

    /// Nodes in the order the calls were made (root first).
    pub fn calls(&self) -> Vec<&QueryNode> {
        let mut calls: Vec<&QueryNode> = self.nodes().collect();
        calls.reverse();
        calls
    }

    /// Number of nodes in the chain, root included.
    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    /// Table bound by the root node, if the root is a table binding.
    pub fn table(&self) -> Option<&str> {
        self.nodes()
            .last()
            .filter(|root| root.kind == ClauseKind::Table)
            .and_then(|root| root.positional.first())
            .map(String::as_str)
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Query) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

/// Iterator over a chain, terminal first. See [`Query::nodes`].
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a QueryNode>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a QueryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.previous.as_ref().map(|q| q.node());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_node() {
        let q = Query::new("Person");
        assert_eq!(q.node().kind(), ClauseKind::Table);
        assert_eq!(q.node().positional(), ["Person".to_string()]);
        assert!(q.node().is_root());
        assert_eq!(q.table(), Some("Person"));
    }

    #[test]
    fn test_fluent_calls_link_back() {
        let root = Query::new("T");
        let sel = root.select(["a", "b"]);
        let prev = sel.node().previous().unwrap();
        assert!(prev.ptr_eq(&root));
        assert_eq!(sel.node().kind(), ClauseKind::Select);
        assert_eq!(sel.node().positional(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_traversal_terminal_to_root() {
        let q = Query::new("T")
            .select(["a"])
            .where_eq("x", 1)
            .order_by(["a"]);
        let kinds: Vec<ClauseKind> = q.nodes().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ClauseKind::OrderBy,
                ClauseKind::Filter,
                ClauseKind::Select,
                ClauseKind::Table
            ]
        );
        assert_eq!(q.depth(), 4);
        assert_eq!(q.calls()[0].kind(), ClauseKind::Table);
    }

    #[test]
    fn test_extending_does_not_touch_parent() {
        let base = Query::new("T").select(["a"]);
        let _branch = base.select(["b"]);
        assert_eq!(base.depth(), 2);
        assert_eq!(base.node().positional(), ["a".to_string()]);
    }

    #[test]
    fn test_duplicate_keys_within_call() {
        let node = QueryNode::new(
            ClauseKind::Filter,
            vec![],
            vec![
                ("x".to_string(), Value::Int(1)),
                ("y".to_string(), Value::Int(2)),
                ("x".to_string(), Value::Int(3)),
            ],
            None,
        );
        assert_eq!(
            node.named(),
            [
                ("x".to_string(), Value::Int(3)),
                ("y".to_string(), Value::Int(2))
            ]
        );
    }

    #[test]
    fn test_table_missing_on_foreign_root() {
        let q = Query::from_node(QueryNode::new(
            ClauseKind::Select,
            vec!["a".to_string()],
            vec![],
            None,
        ));
        assert_eq!(q.table(), None);
    }

    #[test]
    fn test_node_display() {
        let q = Query::new("T").filter([("name", "Bill")]);
        assert_eq!(q.node().to_string(), "filter(name='Bill')");
        assert_eq!(q.calls()[0].to_string(), "table(T)");
    }

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(2.5f64), Value::Float(2.5));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_long_chain_drops() {
        let mut q = Query::new("T");
        for i in 0..100_000 {
            q = q.select([format!("c{}", i)]);
        }
        assert_eq!(q.depth(), 100_001);
        drop(q);
    }
}
