//! Stack safety for the recursive passes.
//!
//! Parsing, resolution and evaluation recurse once per nested construct and
//! once per Lox call.  Each recursive entry point runs through
//! [`ensure_sufficient_stack`], which moves onto a fresh heap-allocated
//! segment when the current one runs low.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone is left.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
