//! Database collaborator boundary.
//!
//! An operation runs inside exactly one transaction: statements execute in
//! order, the transaction commits only after the last one succeeds, and every
//! failure path (including cancellation) rolls back. Nothing is retried.

pub mod errors;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::cypher::Statement;
use crate::response::{QueryStatistics, Row, map_response};
use crate::schema_builder::{CompiledSchema, RootKind};
use crate::translator::{self, Operation, TranslateOptions, TranslatedOperation};

pub use errors::{DatabaseError, ExecutionError};

/// Rows and counters for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub stats: QueryStatistics,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphTransaction: Send {
    async fn run(&mut self, statement: &Statement) -> Result<QueryResult, DatabaseError>;
    async fn commit(&mut self) -> Result<(), DatabaseError>;
    async fn rollback(&mut self) -> Result<(), DatabaseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, DatabaseError>;
}

/// Shared abort signal, checked before every statement.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn phase_name(kind: RootKind) -> &'static str {
    match kind {
        RootKind::Read => "read",
        RootKind::Aggregate => "aggregate",
        RootKind::Connection => "connection",
        RootKind::Create => "create",
        RootKind::Update => "update",
        RootKind::Delete => "delete",
    }
}

pub struct Executor {
    database: Arc<dyn GraphDatabase>,
}

impl Executor {
    pub fn new(database: Arc<dyn GraphDatabase>) -> Self {
        Executor { database }
    }

    /// Translate and execute `operation`, returning the value of its root field.
    pub async fn run(
        &self,
        schema: &CompiledSchema,
        operation: &Operation,
        options: &TranslateOptions,
        cancel: &CancellationFlag,
    ) -> Result<Value, ExecutionError> {
        let translated = translator::translate_with_options(schema, operation, options)?;
        self.execute(&translated, cancel).await
    }

    pub async fn execute(
        &self,
        translated: &TranslatedOperation,
        cancel: &CancellationFlag,
    ) -> Result<Value, ExecutionError> {
        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        let phase = phase_name(translated.response.kind);
        let field = translated.root_field.as_str();
        let mut tx = self
            .database
            .begin()
            .await
            .map_err(|e| ExecutionError::database_with_context(phase, field, e))?;

        match run_statements(tx.as_mut(), translated, cancel).await {
            Ok(result) => {
                if cancel.is_cancelled() {
                    rollback(tx.as_mut(), field).await;
                    return Err(ExecutionError::Cancelled);
                }
                tx.commit()
                    .await
                    .map_err(|e| ExecutionError::database_with_context("commit", field, e))?;
                log::debug!(
                    "Committed `{}`: {} rows, {:?}",
                    field,
                    result.rows.len(),
                    result.stats
                );
                Ok(map_response(&translated.response, &result.rows, &result.stats)?)
            }
            Err(err) => {
                rollback(tx.as_mut(), field).await;
                Err(err)
            }
        }
    }
}

async fn run_statements(
    tx: &mut dyn GraphTransaction,
    translated: &TranslatedOperation,
    cancel: &CancellationFlag,
) -> Result<QueryResult, ExecutionError> {
    let phase = phase_name(translated.response.kind);
    let field = translated.root_field.as_str();
    let mut combined = QueryResult::default();
    for statement in &translated.statements {
        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        let result = tx
            .run(statement)
            .await
            .map_err(|e| ExecutionError::database_with_context(phase, field, e))?;
        combined.stats.merge(&result.stats);
        combined.rows = result.rows;
    }
    Ok(combined)
}

async fn rollback(tx: &mut dyn GraphTransaction, field: &str) {
    if let Err(e) = tx.rollback().await {
        log::warn!("Rollback of `{}` failed: {}", field, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::SelectedField;
    use serde_json::json;

    const TYPE_DEFS: &str = r#"
        type User {
            name: String!
            favourite: Post @relationship(type: "FAVOURITE", direction: OUT)
        }
        type Post {
            title: String!
        }
    "#;

    fn schema() -> CompiledSchema {
        CompiledSchema::from_sdl(TYPE_DEFS).unwrap()
    }

    fn database(tx: MockGraphTransaction) -> Executor {
        let mut database = MockGraphDatabase::new();
        database
            .expect_begin()
            .times(1)
            .return_once(move || Ok(Box::new(tx) as Box<dyn GraphTransaction>));
        Executor::new(Arc::new(database))
    }

    #[tokio::test]
    async fn test_read_commits_and_maps_rows() {
        let mut tx = MockGraphTransaction::new();
        tx.expect_run().times(1).returning(|_| {
            let mut row = Row::new();
            row.insert("this".to_string(), json!({"name": "Ann"}));
            Ok(QueryResult {
                rows: vec![row],
                stats: QueryStatistics::default(),
            })
        });
        tx.expect_commit().times(1).returning(|| Ok(()));
        tx.expect_rollback().never();

        let op = Operation::query("users").with_selection(vec![SelectedField::new("name")]);
        let value = database(tx)
            .run(&schema(), &op, &TranslateOptions::default(), &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(value, json!([{"name": "Ann"}]));
    }

    #[tokio::test]
    async fn test_cardinality_guard_failure_rolls_back() {
        let mut tx = MockGraphTransaction::new();
        tx.expect_run().times(1).returning(|_| {
            Err(DatabaseError::Query(
                "CARDINALITY_VIOLATION: User.favourite is already connected to another node".to_string(),
            ))
        });
        tx.expect_commit().never();
        tx.expect_rollback().times(1).returning(|| Ok(()));

        let op = Operation::mutation("updateUsers").with_args(json!({
            "connect": {"favourite": {"where": {"node": {"title": "A"}}, "overwrite": false}},
        }));
        let err = database(tx)
            .run(&schema(), &op, &TranslateOptions::default(), &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::CardinalityViolation { ref message, .. } if message.contains("User.favourite")));
    }

    #[tokio::test]
    async fn test_database_error_keeps_phase() {
        let mut tx = MockGraphTransaction::new();
        tx.expect_run()
            .returning(|_| Err(DatabaseError::TransactionConflict("deadlock".to_string())));
        tx.expect_commit().never();
        tx.expect_rollback().times(1).returning(|| Err(DatabaseError::Connectivity("gone".to_string())));

        let op = Operation::mutation("deleteUsers");
        let err = database(tx)
            .run(&schema(), &op, &TranslateOptions::default(), &CancellationFlag::new())
            .await
            .unwrap_err();
        match err {
            ExecutionError::Database { phase, field, source } => {
                assert_eq!(phase, "delete");
                assert_eq!(field, "deleteUsers");
                assert_eq!(source, DatabaseError::TransactionConflict("deadlock".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_statement_rolls_back() {
        let mut tx = MockGraphTransaction::new();
        tx.expect_run().never();
        tx.expect_commit().never();
        tx.expect_rollback().times(1).returning(|| Ok(()));

        // raised while the transaction is being opened
        let cancel = CancellationFlag::new();
        let flag = cancel.clone();
        let mut database = MockGraphDatabase::new();
        database.expect_begin().times(1).return_once(move || {
            flag.cancel();
            Ok(Box::new(tx) as Box<dyn GraphTransaction>)
        });
        let executor = Executor::new(Arc::new(database));

        let translated = translator::translate(&schema(), &Operation::query("users")).unwrap();
        let err = executor.execute(&translated, &cancel).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Cancelled));
    }

    #[tokio::test]
    async fn test_translation_errors_never_reach_the_database() {
        let mut database = MockGraphDatabase::new();
        database.expect_begin().never();
        let executor = Executor::new(Arc::new(database));
        let op = Operation::query("unknownRoot");
        let err = executor
            .run(&schema(), &op, &TranslateOptions::default(), &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Translation(_)));
    }
}
