// SPDX-License-Identifier: MIT OR Apache-2.0

//! The raw context-local cell.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context_impl::{ContextID, Stored, with_current};
use crate::error::{Error, Result};

pub(crate) static VAR_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a context variable.
///
/// Values are keyed by this ID, not by name; two variables with the same name are
/// two different variables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarID(pub(crate) u64);

#[derive(Debug)]
struct VarInner<T> {
    var_id: u64,
    name: String,
    default: Option<T>,
}

/// A context-local cell.
///
/// Supports only `get`, `set` and `reset`: once a value is set in a context, it can be
/// replaced or rolled back with a [`Token`], but never removed. Higher-level semantics
/// (deletion, deferred defaults) live in [`ContextVarExt`](crate::ContextVarExt).
///
/// Cloning the handle shares the variable; both clones read and write the same value.
///
/// ```rust
/// use ctxvars::context::ContextVar;
///
/// let timezone = ContextVar::with_default("timezone", "UTC");
/// assert_eq!(timezone.get(), Some("UTC"));
///
/// let token = timezone.set("Europe/London");
/// assert_eq!(timezone.get(), Some("Europe/London"));
///
/// timezone.reset(token).unwrap();
/// assert_eq!(timezone.get(), Some("UTC"));
/// ```
pub struct ContextVar<T> {
    inner: Arc<VarInner<T>>,
}

impl<T> Clone for ContextVar<T> {
    fn clone(&self) -> Self {
        ContextVar {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ContextVar<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.var_id == other.inner.var_id
    }
}

impl<T> Eq for ContextVar<T> {}

impl<T> Hash for ContextVar<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.var_id.hash(state);
    }
}

impl<T> Debug for ContextVar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextVar")
            .field("name", &self.inner.name)
            .field("var_id", &self.inner.var_id)
            .finish()
    }
}

impl<T> ContextVar<T> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn id(&self) -> VarID {
        VarID(self.inner.var_id)
    }

    /// The built-in default, returned by [`get`](ContextVar::get) when the variable
    /// has no value in the current context.
    #[inline]
    pub fn default(&self) -> Option<&T> {
        self.inner.default.as_ref()
    }
}

impl<T: Clone + Send + Sync + 'static> ContextVar<T> {
    /// Creates a variable without a built-in default.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_optional_default(name.into(), None)
    }

    /// Creates a variable with a built-in default.
    pub fn with_default(name: impl Into<String>, default: T) -> Self {
        Self::with_optional_default(name.into(), Some(default))
    }

    pub(crate) fn with_optional_default(name: String, default: Option<T>) -> Self {
        ContextVar {
            inner: Arc::new(VarInner {
                var_id: VAR_ID.fetch_add(1, Ordering::Relaxed),
                name,
                default,
            }),
        }
    }

    /// The value stored in the current context, ignoring the built-in default.
    #[inline]
    pub fn stored(&self) -> Option<T> {
        let id = self.id();
        let stored = with_current(|c| c.lookup(id).cloned());
        stored.and_then(|s| s.downcast_ref::<T>().cloned())
    }

    /// The value in the current context, else the built-in default.
    #[inline]
    pub fn get(&self) -> Option<T> {
        self.stored().or_else(|| self.inner.default.clone())
    }

    /// The value in the current context, else `fallback`.
    ///
    /// `fallback` takes precedence over the built-in default.
    #[inline]
    pub fn get_or(&self, fallback: T) -> T {
        self.stored().unwrap_or(fallback)
    }

    /// Sets the value for the current context.
    ///
    /// The returned token restores the previous value via [`reset`](ContextVar::reset).
    #[inline]
    pub fn set(&self, value: T) -> Token<T> {
        let id = self.id();
        let new: Stored = Arc::new(value);
        let (context_id, old) = with_current(|c| (c.context_id(), c.insert(id, new)));
        Token {
            var_id: id,
            context_id,
            old,
            _marker: PhantomData,
        }
    }

    /// Restores the value this variable had before the `set` that created `token`.
    ///
    /// Fails when the token belongs to another variable, or was created in a context
    /// other than the current one.
    pub fn reset(&self, token: Token<T>) -> Result<()> {
        let Token {
            var_id,
            context_id,
            old,
            ..
        } = token;
        if var_id != self.id() {
            return Err(Error::TokenVarMismatch {
                name: self.name().to_string(),
            });
        }
        let replaced = with_current(|c| {
            if c.context_id() != context_id {
                return Err(old);
            }
            Ok(match old {
                Some(old) => c.insert(var_id, old),
                None => c.remove(var_id),
            })
        });
        match replaced {
            Ok(_replaced) => Ok(()),
            Err(_old) => Err(Error::TokenContextMismatch {
                name: self.name().to_string(),
            }),
        }
    }
}

/// Returned by [`ContextVar::set`]; restores the previous value when passed to
/// [`ContextVar::reset`].
///
/// A token is consumed by `reset`, so it can be used at most once.
#[must_use = "dropping a token means the previous value can no longer be restored"]
pub struct Token<T> {
    var_id: VarID,
    context_id: ContextID,
    old: Option<Stored>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Token<T> {
    #[inline]
    pub fn var_id(&self) -> VarID {
        self.var_id
    }

    /// The context this token was created in.
    #[inline]
    pub fn context_id(&self) -> ContextID {
        self.context_id
    }
}

impl<T: Clone + 'static> Token<T> {
    /// The value that was replaced by the `set`, or `None` if there was none.
    pub fn old_value(&self) -> Option<T> {
        self.old
            .as_ref()
            .and_then(|s| s.downcast_ref::<T>())
            .cloned()
    }
}

impl<T> Debug for Token<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("var_id", &self.var_id)
            .field("context_id", &self.context_id)
            .field("has_old_value", &self.old.is_some())
            .finish()
    }
}
