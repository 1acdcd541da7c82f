// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core Context implementation.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context_var::{ContextVar, VarID};

pub(crate) static CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A value as stored inside a [`Context`].
pub(crate) type Stored = Arc<dyn Any + Send + Sync>;

type VarMap = HashMap<VarID, Stored>;

/// Unique identifier for a context.
///
/// Every context, including every [`copy`](Context::copy), gets a fresh ID.
/// Reset tokens remember the ID of the context that created them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextID(pub(crate) u64);

impl Display for ContextID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mapping from context variables to their values.
///
/// Every thread has a *current* context, which is what [`ContextVar::get`] and
/// [`ContextVar::set`] operate on. Threads start out with an empty context.
///
/// A `Context` you hold yourself is inert until you enter it with [`run`](Context::run).
/// While entered, it is the current context of the thread; changes made inside are
/// kept in the `Context` when `run` returns.
///
/// Contexts are copy-on-write. [`copy`](Context::copy) is O(1) and shares storage with
/// the original until one side writes.
///
/// # Examples
///
/// ```rust
/// use ctxvars::context::{Context, ContextVar};
///
/// let var = ContextVar::new("var");
/// let _ = var.set(1);
///
/// let mut ctx = Context::current();
/// ctx.run(|| {
///     assert_eq!(var.get(), Some(1));
///     let _ = var.set(2);
/// });
///
/// // changes made inside `run` stay in `ctx`
/// assert_eq!(var.get(), Some(1));
/// assert_eq!(ctx.get(&var), Some(2));
/// ```
pub struct Context {
    context_id: u64,
    vars: Arc<VarMap>,
}

thread_local! {
    static CONTEXT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Runs `f` on this thread's current context, creating an empty one on first use.
///
/// `f` must not call back into anything that reads the current context.
/// Values removed from the map should be returned from `f` so they are dropped
/// after the borrow ends.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut Context) -> R) -> R {
    CONTEXT.with(|cell| {
        let mut borrow = cell.borrow_mut();
        f(borrow.get_or_insert_with(Context::new))
    })
}

fn next_context_id() -> u64 {
    CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl Context {
    /// Creates a new empty context, where every variable takes its default value.
    pub fn new() -> Context {
        Context {
            context_id: next_context_id(),
            vars: Arc::new(HashMap::new()),
        }
    }

    /// Returns a copy of this thread's current context.
    ///
    /// The copy is independent: writes to it (inside [`run`](Context::run)) do not
    /// affect the current context, and vice versa.
    #[inline]
    pub fn current() -> Context {
        with_current(|c| c.copy())
    }

    /// Returns an independent copy of this context with a new [`ContextID`].
    #[inline]
    pub fn copy(&self) -> Context {
        Context {
            context_id: next_context_id(),
            vars: Arc::clone(&self.vars),
        }
    }

    #[inline]
    pub fn context_id(&self) -> ContextID {
        ContextID(self.context_id)
    }

    /// Returns the ID of this thread's current context.
    pub fn current_id() -> ContextID {
        with_current(|c| c.context_id())
    }

    /// Enters this context for the duration of `f`.
    ///
    /// The thread's current context is swapped out and restored afterwards,
    /// also when `f` panics. Writes made by `f` are kept in `self`.
    ///
    /// ```rust
    /// use ctxvars::context::{Context, ContextVar};
    ///
    /// let var = ContextVar::with_default("locale", "en".to_string());
    /// let mut empty = Context::new();
    /// let _ = var.set("nb".to_string());
    ///
    /// let seen = empty.run(|| var.get());
    /// assert_eq!(seen, Some("en".to_string()));
    /// ```
    pub fn run<R>(&mut self, f: impl FnOnce() -> R) -> R {
        struct Entered<'a>(&'a mut Context);
        impl Drop for Entered<'_> {
            fn drop(&mut self) {
                with_current(|current| std::mem::swap(current, self.0));
            }
        }

        with_current(|current| std::mem::swap(current, self));
        let _entered = Entered(self);
        f()
    }

    /// Returns the value `var` has in this context, ignoring its built-in default.
    pub fn get<T: Clone + 'static>(&self, var: &ContextVar<T>) -> Option<T> {
        self.lookup(var.id())
            .and_then(|stored| stored.downcast_ref::<T>())
            .cloned()
    }

    /// True when `var` has a value in this context.
    pub fn contains<T>(&self, var: &ContextVar<T>) -> bool {
        self.vars.contains_key(&var.id())
    }

    /// Number of variables that have a value in this context.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[inline]
    pub(crate) fn lookup(&self, id: VarID) -> Option<&Stored> {
        self.vars.get(&id)
    }

    #[inline]
    pub(crate) fn insert(&mut self, id: VarID, value: Stored) -> Option<Stored> {
        Arc::make_mut(&mut self.vars).insert(id, value)
    }

    #[inline]
    pub(crate) fn remove(&mut self, id: VarID) -> Option<Stored> {
        if !self.vars.contains_key(&id) {
            return None;
        }
        Arc::make_mut(&mut self.vars).remove(&id)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("context_id", &self.context_id)
            .field("len", &self.vars.len())
            .finish()
    }
}
