//! Property-based tests for view maintenance and the table registry.
//!
//! Random operation sequences are applied to a table while a filtered, sorted
//! view is live; after every step the view must equal a fresh evaluation of
//! the filter and sort over the table.

use proptest::prelude::*;
use rdb_core::schema::Schema;
use rdb_core::{DataType, Error, Value};
use rdb_database::{Database, SortOrder, View};
use rdb_storage::Table;
use std::collections::HashSet;

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, i32),
    Update(u8, i32),
    Rename(u8),
    Delete(u8),
}

/// Strategy for generating operations over a small id space so that updates
/// and deletes regularly hit existing rows.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..12, -50i32..50).prop_map(|(id, score)| Op::Insert(id, score)),
        (0u8..12, -50i32..50).prop_map(|(id, score)| Op::Update(id, score)),
        (0u8..12).prop_map(Op::Rename),
        (0u8..12).prop_map(Op::Delete),
    ]
}

fn create_scores() -> (Database, Table) {
    let db = Database::new();
    let schema = Schema::builder()
        .add_column("label", DataType::String)
        .unwrap()
        .add_column("score", DataType::Int32)
        .unwrap()
        .build();
    let table = db.create_table("Scores", schema).unwrap();
    (db, table)
}

fn apply(table: &Table, op: &Op) {
    match op {
        Op::Insert(id, score) => {
            let _ = table.insert(
                format!("r{}", id),
                [("label", Value::from("x")), ("score", Value::Int32(*score))],
            );
        }
        Op::Update(id, score) => {
            if let Some(row) = table.get(&format!("r{}", id)) {
                row.set("score", *score).unwrap();
            }
        }
        Op::Rename(id) => {
            if let Some(row) = table.get(&format!("r{}", id)) {
                row.set("label", format!("y{}", id)).unwrap();
            }
        }
        Op::Delete(id) => {
            let _ = table.delete(&format!("r{}", id));
        }
    }
}

fn score(value: Option<Value>) -> i32 {
    match value {
        Some(Value::Int32(v)) => v,
        _ => i32::MIN,
    }
}

fn passes(score: i32) -> bool {
    score % 2 == 0
}

/// Checks membership and order of `view` against the current table contents.
fn check(table: &Table, view: &View, order: SortOrder) -> Result<(), TestCaseError> {
    let expected: HashSet<String> = table
        .rows()
        .iter()
        .filter(|row| passes(score(row.value("score"))))
        .map(|row| row.id().to_string())
        .collect();
    let actual: Vec<String> = view.to_vec().iter().map(|row| row.id().to_string()).collect();
    prop_assert_eq!(actual.len(), expected.len());
    prop_assert_eq!(actual.iter().cloned().collect::<HashSet<_>>(), expected);

    let scores: Vec<i32> = view.to_vec().iter().map(|row| score(row.value("score"))).collect();
    for pair in scores.windows(2) {
        match order {
            SortOrder::Asc => prop_assert!(pair[0] <= pair[1]),
            SortOrder::Desc => prop_assert!(pair[0] >= pair[1]),
        }
    }
    Ok(())
}

proptest! {
    /// Property: a filtered ascending view always matches the table.
    #[test]
    fn view_membership_and_ascending_order(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let (db, table) = create_scores();
        let view = db
            .view("Scores")
            .unwrap()
            .filter(|row| passes(score(row.value("score"))))
            .sort_by("score", SortOrder::Asc)
            .build()
            .unwrap();

        for op in &ops {
            apply(&table, op);
            check(&table, &view, SortOrder::Asc)?;
        }
    }

    /// Property: a view built over existing rows matches the table, descending.
    #[test]
    fn view_built_late_descending(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let (db, table) = create_scores();
        let (head, tail) = ops.split_at(ops.len() / 2);
        for op in head {
            apply(&table, op);
        }

        let view = db
            .view("Scores")
            .unwrap()
            .select_all(["label", "score"])
            .filter(|row| passes(score(row.value("score"))))
            .sort_by("score", SortOrder::Desc)
            .build()
            .unwrap();
        check(&table, &view, SortOrder::Desc)?;

        for op in tail {
            apply(&table, op);
            check(&table, &view, SortOrder::Desc)?;
        }
    }

    /// Property: an unfiltered view holds every row exactly once.
    #[test]
    fn unfiltered_view_holds_every_row(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let (db, table) = create_scores();
        let view = db.view("Scores").unwrap().build().unwrap();
        for op in &ops {
            apply(&table, op);
            let ids: HashSet<String> = view.to_vec().iter().map(|row| row.id().to_string()).collect();
            prop_assert_eq!(ids.len(), view.len());
            prop_assert_eq!(view.len(), table.len());
        }
    }

    /// Property: creating a table under a taken name fails and leaves the
    /// registry unchanged.
    #[test]
    fn table_names_stay_unique(names in prop::collection::vec("[A-D]", 1..20)) {
        let db = Database::new();
        let mut registered: Vec<String> = Vec::new();
        for name in &names {
            let schema = Schema::builder().add_column("v", DataType::Int32).unwrap().build();
            match db.create_table(name, schema) {
                Ok(_) => {
                    prop_assert!(!registered.contains(name));
                    registered.push(name.clone());
                }
                Err(error) => {
                    prop_assert!(matches!(error, Error::TableExists { .. }), "expected TableExists, got {:?}", error);
                    prop_assert!(registered.contains(name));
                }
            }
            prop_assert_eq!(db.table_names(), registered.clone());
        }
    }

    /// Property: every reference requested before creation resolves to the
    /// created table.
    #[test]
    fn early_references_resolve(count in 0usize..20) {
        let db = Database::new();
        let early: Vec<_> = (0..count).map(|_| db.table_reference("Late")).collect();
        let schema = Schema::builder().add_column("v", DataType::Int32).unwrap().build();
        let table = db.create_table("Late", schema).unwrap();
        for reference in &early {
            prop_assert!(reference.with(|slot| slot.table().is_some_and(|t| t.ptr_eq(&table))));
        }
        prop_assert_eq!(db.pending_references("Late"), 0);
    }
}
