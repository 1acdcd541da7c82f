// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binding functions to contexts.
//!
//! Threads start with an empty context, so values set by the spawning thread are
//! not visible in the spawned one. These helpers decide explicitly which context a
//! function sees.

use super::context_impl::Context;

/// Takes a snapshot of the current context, and returns a function that runs `f` in it.
///
/// Every call gets its own copy of the snapshot, so calls can't see each other's writes,
/// and later changes to the caller's context don't affect the returned function.
///
/// ```rust
/// use ctxvars::context::{ContextVar, bind_to_snapshot_context};
///
/// let user_id = ContextVar::new("user_id");
/// let _ = user_id.set(1);
///
/// let get_user = {
///     let user_id = user_id.clone();
///     bind_to_snapshot_context(move || user_id.get())
/// };
///
/// let _ = user_id.set(2);
/// assert_eq!(get_user(), Some(1));
///
/// // threads start empty, but the snapshot travels with the function
/// let handle = std::thread::spawn(get_user);
/// assert_eq!(handle.join().unwrap(), Some(1));
/// ```
pub fn bind_to_snapshot_context<F, R>(f: F) -> impl Fn() -> R
where
    F: Fn() -> R,
{
    let snapshot = Context::current();
    move || snapshot.copy().run(&f)
}

/// Returns a function that runs `f` in a new empty context on every call.
///
/// Inside, all variables take their default values, as if nothing was ever set.
pub fn bind_to_empty_context<F, R>(f: F) -> impl Fn() -> R
where
    F: Fn() -> R,
{
    move || Context::new().run(&f)
}

/// Returns a function that runs `f` in a copy of the caller's current context.
///
/// `f` sees everything the caller set, but its own writes are discarded when it returns.
///
/// ```rust
/// use ctxvars::context::{ContextVar, bind_to_sandbox_context};
///
/// let timezone = ContextVar::with_default("timezone", "UTC");
///
/// let modify = {
///     let timezone = timezone.clone();
///     bind_to_sandbox_context(move || {
///         let _ = timezone.set("Antarctica/Troll");
///         timezone.get()
///     })
/// };
///
/// assert_eq!(modify(), Some("Antarctica/Troll"));
/// assert_eq!(timezone.get(), Some("UTC"));
/// ```
pub fn bind_to_sandbox_context<F, R>(f: F) -> impl Fn() -> R
where
    F: Fn() -> R,
{
    move || Context::current().run(&f)
}
