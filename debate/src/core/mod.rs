//! Deterministic, pure logic for the debate orchestrator.
//!
//! Core modules must be free of I/O side effects. They operate on the
//! in-memory session and return deterministic outputs suitable for tests.

pub mod controller;
pub mod error;
pub mod invariants;
pub mod markers;
pub mod queue;
pub mod role_context;
pub mod router;
pub mod synthesis;
pub mod types;
