//! Shared schema and a recording in-memory database for the integration suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphcypher::CompiledSchema;
use graphcypher::cypher::Statement;
use graphcypher::executor::{DatabaseError, GraphDatabase, GraphTransaction, QueryResult};
use graphcypher::response::{QueryStatistics, Row};
use serde_json::Value;

pub const SOCIAL: &str = r#"
    type User {
        name: String!
        favourite: Post @relationship(type: "FAVOURITE", direction: OUT)
        likedPosts: [Post!]! @relationship(type: "LIKES", direction: OUT, properties: "Likes")
        pinned: Pinnable @relationship(type: "PINNED", direction: OUT)
    }
    type Post {
        name: String!
        comments: [Comment!]! @relationship(type: "HAS_COMMENT", direction: OUT)
        likes: [User!]! @relationship(type: "LIKES", direction: IN, properties: "Likes")
    }
    type Comment {
        text: String!
    }
    union Pinnable = Post | Comment
    type Likes @relationshipProperties {
        likedAt: DateTime
    }

    interface Production {
        title: String!
        actors: [Actor!]! @declareRelationship
    }
    type Movie implements Production {
        title: String!
        runtime: Int
        actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN)
    }
    type Series implements Production {
        title: String!
        episodes: Int
        actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN)
    }
    type Actor {
        name: String!
        productions: [Production!]! @relationship(type: "ACTED_IN", direction: OUT)
    }
"#;

pub fn schema() -> CompiledSchema {
    CompiledSchema::from_sdl(SOCIAL).expect("fixture schema compiles")
}

pub fn row(column: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), value);
    row
}

/// What the fake answers for each statement, in order. Statements beyond the
/// scripted ones get an empty result.
#[derive(Default)]
struct Script {
    results: VecDeque<Result<QueryResult, DatabaseError>>,
    reject_cardinality_guards: bool,
}

/// Everything the executor did against the fake.
#[derive(Default)]
pub struct Recorder {
    pub statements: Mutex<Vec<Statement>>,
    pub begun: AtomicUsize,
    pub committed: AtomicUsize,
    pub rolled_back: AtomicUsize,
    script: Mutex<Script>,
}

impl Recorder {
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().expect("recorder lock").clone()
    }

    pub fn begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeDatabase {
    pub recorder: Arc<Recorder>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, rows: Vec<Row>, stats: QueryStatistics) -> Self {
        self.recorder
            .script
            .lock()
            .expect("script lock")
            .results
            .push_back(Ok(QueryResult { rows, stats }));
        self
    }

    pub fn fail(self, error: DatabaseError) -> Self {
        self.recorder
            .script
            .lock()
            .expect("script lock")
            .results
            .push_back(Err(error));
        self
    }

    /// Behave like a database whose `apoc.util.validate` guard fires.
    pub fn reject_cardinality_guards(self) -> Self {
        self.recorder.script.lock().expect("script lock").reject_cardinality_guards = true;
        self
    }
}

#[async_trait]
impl GraphDatabase for FakeDatabase {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, DatabaseError> {
        self.recorder.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTransaction {
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct FakeTransaction {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl GraphTransaction for FakeTransaction {
    async fn run(&mut self, statement: &Statement) -> Result<QueryResult, DatabaseError> {
        self.recorder
            .statements
            .lock()
            .expect("recorder lock")
            .push(statement.clone());
        let mut script = self.recorder.script.lock().expect("script lock");
        if script.reject_cardinality_guards && statement.text.contains("apoc.util.validate") {
            return Err(DatabaseError::Query(
                "Failed to invoke procedure `apoc.util.validate`: CARDINALITY_VIOLATION: User.favourite is already connected to another node"
                    .to_string(),
            ));
        }
        script.results.pop_front().unwrap_or_else(|| Ok(QueryResult::default()))
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.recorder.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.recorder.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
