#![allow(dead_code)]

//! Test utilities for SPARQLite integration tests
//!
//! - TestFixture: a strategy over an in-memory store, plus helpers
//! - CountingTripleSource: wraps a store and tracks every iteration it hands out

pub mod counting_source;
pub mod test_fixture;
