//! Integration tests for the matching engine, registry and binary.

pub mod cli_test;
pub mod registry_test;
