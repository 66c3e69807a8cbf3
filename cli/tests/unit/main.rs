//! Unit tests for tether CLI
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod lifecycle_service;
mod mocks;
