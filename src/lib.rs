//! graphcypher - GraphQL-style API generation and Cypher translation for graph type models
//!
//! This crate turns annotated type definitions into:
//! - An immutable type model of node types, relationships, interfaces and unions
//! - A generated catalogue of query/mutation input and output shapes
//! - Parameterized Cypher statements implementing reads and nested mutations
//!
//! The database driver, transport and authentication are collaborators behind
//! the `executor` and `server` boundaries.

pub mod aggregation;
pub mod config;
pub mod cypher;
pub mod executor;
pub mod response;
pub mod schema_builder;
pub mod sdl_parser;
pub mod server;
pub mod translator;
pub mod type_model;

pub use schema_builder::CompiledSchema;
pub use translator::{translate, Operation, TranslatedOperation};
