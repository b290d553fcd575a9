//! Shared fixtures for the integration test suite.

pub mod grammars;
