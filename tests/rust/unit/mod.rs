//! Unit tests - schema compilation and translation through the public API only.
//!
//! These tests need no database: they inspect the generated catalogue and the
//! emitted statements.

mod catalogue_tests;
mod translation_tests;
