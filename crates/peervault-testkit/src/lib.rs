//! # Peervault Testkit
//!
//! Shared testing utilities: fixtures with pre-built agents, groups and
//! nodes, plus proptest generators for property-based tests.

pub mod fixtures;
pub mod generators;

pub use fixtures::{individuals, NoteBook, TestFixture, ALICE_PASSPHRASE, BOB_PASSPHRASE};
