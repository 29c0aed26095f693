use std::sync::Arc;

use graphcypher::executor::{CancellationFlag, DatabaseError, ExecutionError, Executor};
use graphcypher::response::QueryStatistics;
use graphcypher::response::cursor::offset_to_cursor;
use graphcypher::translator::{Operation, SelectedField, TranslateOptions, TranslationError};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use super::fixtures::{FakeDatabase, row, schema};

async fn run(database: &FakeDatabase, op: &Operation) -> Result<serde_json::Value, ExecutionError> {
    let executor = Executor::new(Arc::new(database.clone()));
    executor
        .run(&schema(), op, &TranslateOptions::default(), &CancellationFlag::new())
        .await
}

#[tokio::test]
async fn test_invalid_union_input_never_opens_a_transaction() {
    let database = FakeDatabase::new();
    let op = Operation::mutation("updateUsers").with_args(json!({
        "connect": {"pinned": {
            "Post": {"where": {"node": {"name": "A"}}},
            "Comment": {"where": {"node": {"text": "B"}}}
        }}
    }));

    let err = run(&database, &op).await.unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Translation(TranslationError::Validation { ref path, .. }) if path == "updateUsers.connect.pinned"
    ));
    assert_eq!(database.recorder.begun(), 0);
    assert!(database.recorder.statements().is_empty());
}

#[tokio::test]
async fn test_cardinality_guard_failure_rolls_back() {
    let database = FakeDatabase::new().reject_cardinality_guards();
    let op = Operation::mutation("updateUsers").with_args(json!({
        "where": {"name": "Ann"},
        "connect": {"favourite": {"where": {"node": {"name": "Other"}}, "overwrite": false}}
    }));

    let err = run(&database, &op).await.unwrap_err();
    match err {
        ExecutionError::CardinalityViolation { phase, field, message } => {
            assert_eq!(phase, "update");
            assert_eq!(field, "updateUsers");
            assert_eq!(message, "User.favourite is already connected to another node")
        }
        other => panic!("expected a cardinality violation, got {:?}", other),
    }
    assert_eq!(database.recorder.begun(), 1);
    assert_eq!(database.recorder.committed(), 0);
    assert_eq!(database.recorder.rolled_back(), 1);
}

#[tokio::test]
async fn test_create_commits_and_reports_counters() {
    let database = FakeDatabase::new().respond(
        vec![row("data", json!([{"name": "Ann"}]))],
        QueryStatistics {
            nodes_created: 1,
            properties_set: 1,
            ..QueryStatistics::default()
        },
    );
    let op = Operation::mutation("createUsers")
        .with_args(json!({"input": [{"name": "Ann"}]}))
        .with_selection(vec![
            SelectedField::new("users").with_selection(vec![SelectedField::new("name")]),
            SelectedField::new("info").with_selection(vec![
                SelectedField::new("nodesCreated"),
                SelectedField::new("relationshipsCreated"),
            ]),
        ]);

    let value = assert_ok!(run(&database, &op).await);
    assert_eq!(
        value,
        json!({
            "users": [{"name": "Ann"}],
            "info": {"nodesCreated": 1, "relationshipsCreated": 0}
        })
    );
    assert_eq!(database.recorder.committed(), 1);
    assert_eq!(database.recorder.rolled_back(), 0);

    let statements = database.recorder.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].text.starts_with("CALL {\n    CREATE (this0:User)"));
    assert_eq!(statements[0].params["param0"], json!("Ann"));
}

#[tokio::test]
async fn test_delete_reports_only_counters() {
    let database = FakeDatabase::new().respond(
        vec![],
        QueryStatistics {
            nodes_deleted: 3,
            relationships_deleted: 4,
            ..QueryStatistics::default()
        },
    );
    let op = Operation::mutation("deleteUsers")
        .with_args(json!({"where": {"name": "Ann"}}))
        .with_selection(vec![
            SelectedField::new("nodesDeleted"),
            SelectedField::new("relationshipsDeleted").aliased("edges"),
        ]);

    let value = assert_ok!(run(&database, &op).await);
    assert_eq!(value, json!({"nodesDeleted": 3, "edges": 4}));
    assert_eq!(database.recorder.committed(), 1);
}

#[tokio::test]
async fn test_database_failure_keeps_phase_and_rolls_back() {
    let database = FakeDatabase::new().fail(DatabaseError::TransactionConflict("deadlock detected".to_string()));
    let op = Operation::mutation("updateUsers")
        .with_args(json!({"where": {"name": "Ann"}, "update": {"name": "Bea"}}));

    let err = run(&database, &op).await.unwrap_err();
    match err {
        ExecutionError::Database { phase, field, source } => {
            assert_eq!(phase, "update");
            assert_eq!(field, "updateUsers");
            assert_eq!(source, DatabaseError::TransactionConflict("deadlock detected".to_string()));
        }
        other => panic!("expected a database error, got {:?}", other),
    }
    assert_eq!(database.recorder.rolled_back(), 1);
    assert_eq!(database.recorder.committed(), 0);
}

#[tokio::test]
async fn test_cancelled_operation_does_not_start() {
    let database = FakeDatabase::new();
    let executor = Executor::new(Arc::new(database.clone()));
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let err = assert_err!(
        executor
            .run(&schema(), &Operation::query("users"), &TranslateOptions::default(), &cancel)
            .await
    );
    assert!(matches!(err, ExecutionError::Cancelled));
    assert_eq!(database.recorder.begun(), 0);
}

#[tokio::test]
async fn test_connection_page_gets_cursors() {
    let database = FakeDatabase::new().respond(
        vec![row(
            "this",
            json!({"edges": [{"node": {"name": "B"}}, {"node": {"name": "C"}}], "totalCount": 5}),
        )],
        QueryStatistics::default(),
    );
    let op = Operation::query("postsConnection")
        .with_args(json!({"first": 2, "after": offset_to_cursor(0)}))
        .with_selection(vec![
            SelectedField::new("totalCount"),
            SelectedField::new("edges").with_selection(vec![
                SelectedField::new("cursor"),
                SelectedField::new("node").with_selection(vec![SelectedField::new("name")]),
            ]),
            SelectedField::new("pageInfo").with_selection(vec![
                SelectedField::new("hasNextPage"),
                SelectedField::new("hasPreviousPage"),
                SelectedField::new("endCursor"),
            ]),
        ]);

    let value = run(&database, &op).await.unwrap();
    assert_eq!(
        value,
        json!({
            "totalCount": 5,
            "edges": [
                {"cursor": offset_to_cursor(1), "node": {"name": "B"}},
                {"cursor": offset_to_cursor(2), "node": {"name": "C"}}
            ],
            "pageInfo": {
                "hasNextPage": true,
                "hasPreviousPage": true,
                "endCursor": offset_to_cursor(2)
            }
        })
    );
}
