use pretty_assertions::assert_eq;
use qchain::prelude::*;

type Step = fn(&Query) -> Query;

fn permutations(steps: &[Step]) -> Vec<Vec<Step>> {
    if steps.len() <= 1 {
        return vec![steps.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..steps.len() {
        let mut rest = steps.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_call_order_does_not_change_output() {
    let steps: [Step; 3] = [
        |q| q.select(["id", "age"]),
        |q| q.where_eq("name", "Bill"),
        |q| q.order_by(["name"]),
    ];

    let orders = permutations(&steps);
    assert_eq!(orders.len(), 6);
    for order in orders {
        let q = order.iter().fold(query("Person"), |q, step| step(&q));
        assert_eq!(
            q.build().unwrap(),
            "SELECT id, age FROM Person WHERE name='Bill' ORDER BY name;"
        );
    }
}

#[test]
fn test_filter_before_select() {
    let a = query("T").filter([("x", 1)]).select(["a"]).build().unwrap();
    let b = query("T").select(["a"]).filter([("x", 1)]).build().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_select_accumulates() {
    let split = query("T").select(["a"]).select(["b"]).build().unwrap();
    let joined = query("T").select(["a", "b"]).build().unwrap();
    assert_eq!(split, "SELECT a, b FROM T;");
    assert_eq!(joined, "SELECT a, b FROM T;");
}

#[test]
fn test_select_keeps_duplicates() {
    let sql = query("T").select(["a"]).select(["a", "b"]).build().unwrap();
    assert_eq!(sql, "SELECT a, a, b FROM T;");
}

#[test]
fn test_order_by_accumulates() {
    let sql = query("T")
        .order_by(["a"])
        .select(["*"])
        .order_by(["b", "c"])
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM T ORDER BY a, b, c;");
}

#[test]
fn test_filter_last_write_wins() {
    let sql = query("T")
        .select(["*"])
        .filter([("x", 1)])
        .filter([("x", 2)])
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM T WHERE x='2';");
}

#[test]
fn test_filter_overwrite_keeps_first_position() {
    let sql = query("T")
        .select(["*"])
        .filter([("x", 1), ("y", 2)])
        .filter([("z", 3), ("x", 4)])
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM T WHERE x='4' AND y='2' AND z='3';");
}

#[test]
fn test_multi_key_filter_literal_quoting() {
    let sql = query("Person")
        .select(["id"])
        .filter([("name", Value::from("Bill")), ("age", Value::from(18))])
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT id FROM Person WHERE name='Bill' AND age='18';");
}

#[test]
fn test_values_are_not_escaped() {
    let sql = query("T")
        .select(["*"])
        .where_eq("name", "O'Brien")
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM T WHERE name='O'Brien';");
}

#[test]
fn test_branches_are_independent() {
    let h = query("T").select(["a"]);
    let more = h.select(["b"]);
    let filtered = h.filter([("x", 1)]);

    assert_eq!(more.build().unwrap(), "SELECT a, b FROM T;");
    assert_eq!(filtered.build().unwrap(), "SELECT a FROM T WHERE x='1';");
    assert_eq!(h.build().unwrap(), "SELECT a FROM T;");
}

#[test]
fn test_build_is_idempotent() {
    let q = query("T").select(["a"]).where_eq("x", 1).order_by(["a"]);
    let first = q.build().unwrap();
    let second = q.build().unwrap();
    assert_eq!(first, second);
    assert_eq!(q.depth(), 4);
}

#[test]
fn test_handles_shared_across_threads() {
    let base = query("T").select(["a"]);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let base = base.clone();
            std::thread::spawn(move || base.order_by([format!("c{}", i)]).build().unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!("SELECT a FROM T ORDER BY c{};", i)
        );
    }
}

#[test]
fn test_no_select_policies() {
    let q = query("T").where_eq("x", 1);
    assert_eq!(q.build().unwrap(), "SELECT * FROM T WHERE x='1';");

    let err = q.build_with(&RenderOptions::strict()).unwrap_err();
    assert_eq!(err.to_string(), "No columns selected for table 'T'");
}

#[test]
fn test_malformed_chain_from_low_level_nodes() {
    let orphan = Query::from_node(QueryNode::new(
        ClauseKind::Filter,
        vec![],
        vec![("x".to_string(), Value::Int(1))],
        None,
    ));
    let err = orphan.build().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Malformed chain: chain root is a filter node, expected a table binding"
    );
}
