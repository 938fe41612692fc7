//! Round-based debate orchestrator.
//!
//! Four roles (critic, advocate, judge, scribe) take turns in a fixed order
//! over a topic, one round at a time, until the round limit is reached or the
//! judge issues an early ruling. Each closed round is written as a markdown
//! document and the debate ends with a synthesis.
//!
//! - **[`core`]**: Pure, deterministic protocol logic (controller, task queue,
//!   router, markers, synthesis). No I/O.
//! - **[`io`]**: Configuration, persistence, documents, prompts and agent
//!   process execution.
//!
//! Orchestration modules ([`turn`], [`run`], [`manual`]) combine both to
//! implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod manual;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
pub mod workspace;
