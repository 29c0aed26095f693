//! Integration tests - translated operations run against a recording in-memory
//! database collaborator, plus the end-to-end mutation scenarios.

mod execution_tests;
mod fixtures;
mod mutation_tests;
