//! Stable exit codes for debate CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid invocation, protocol violation, missing or corrupt session, or any other error.
pub const INVALID: i32 = 1;
/// `debate next` found nothing to do: the debate is over and synthesized.
pub const COMPLETE: i32 = 2;
/// An agent turn missed its deadline and no attempts remain.
pub const TIMED_OUT: i32 = 3;
