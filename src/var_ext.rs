// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ContextVarExt`]: a context variable with defaults and deletion.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{ContextVar, Token};
use crate::error::{Error, Result};
use crate::slot::Slot;

/// Produces a default value, at most once per context.
pub type DeferredDefault<T> = Arc<dyn Fn() -> T + Send + Sync>;

struct ExtInner<T> {
    var: ContextVar<Slot<T>>,
    default: Option<T>,
    deferred_default: Option<DeferredDefault<T>>,
}

/// A context variable with default values and deletion.
///
/// Wraps a raw [`ContextVar`] and adds:
///
/// - a static default, returned while no value is set;
/// - a *deferred* default: a function called on the first read in each context,
///   whose result is then kept in that context;
/// - [`delete`](ContextVarExt::delete), which makes reads fail even though a default exists;
/// - [`reset_to_default`](ContextVarExt::reset_to_default), which makes reads fall back to
///   the default again.
///
/// The raw variable stores [`Slot`]s; markers are never returned by [`get`](ContextVarExt::get).
///
/// Cloning the handle shares the variable.
///
/// # Examples
///
/// ```rust
/// use ctxvars::ContextVarExt;
///
/// let timezone = ContextVarExt::with_default("timezone", "UTC".to_string());
/// assert_eq!(timezone.get().unwrap(), "UTC");
/// assert!(!timezone.is_set());
///
/// let _ = timezone.set("Antarctica/Troll".to_string());
/// assert_eq!(timezone.get().unwrap(), "Antarctica/Troll");
///
/// timezone.delete();
/// assert!(timezone.get().unwrap_err().is_not_set());
/// assert_eq!(timezone.get_or("GMT".to_string()), "GMT");
///
/// timezone.reset_to_default();
/// assert_eq!(timezone.get().unwrap(), "UTC");
/// ```
///
/// Deferred defaults are computed once per context:
///
/// ```rust
/// use ctxvars::ContextVarExt;
/// use std::collections::HashMap;
///
/// let cache = ContextVarExt::with_deferred_default("cache", HashMap::<String, u32>::new);
/// let mut map = cache.get().unwrap();
/// map.insert("answer".to_string(), 42);
/// let _ = cache.set(map);
/// assert_eq!(cache.get().unwrap()["answer"], 42);
/// ```
pub struct ContextVarExt<T> {
    inner: Arc<ExtInner<T>>,
}

impl<T> Clone for ContextVarExt<T> {
    fn clone(&self) -> Self {
        ContextVarExt {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ContextVarExt<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for ContextVarExt<T> {}

impl<T> Hash for ContextVarExt<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl<T: Debug> Debug for ContextVarExt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextVarExt")
            .field("name", &self.name())
            .field("default", &self.inner.default)
            .field("deferred_default", &self.inner.deferred_default.is_some())
            .finish()
    }
}

/// Configures a [`ContextVarExt`] before creating it.
///
/// ```rust
/// use ctxvars::ContextVarExt;
///
/// let locale = ContextVarExt::builder("app.locale").default("en").build().unwrap();
/// assert_eq!(locale.get(), Ok("en"));
///
/// let both = ContextVarExt::builder("app.both")
///     .default("en")
///     .deferred_default(|| "nb")
///     .build();
/// assert!(both.is_err());
/// ```
#[must_use]
pub struct Builder<T> {
    name: String,
    default: Option<T>,
    deferred_default: Option<DeferredDefault<T>>,
}

impl<T: Clone + Send + Sync + 'static> Builder<T> {
    /// The value returned while the variable is not set.
    pub fn default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// A function producing the default value, called once per context on first read.
    pub fn deferred_default(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.deferred_default = Some(Arc::new(f));
        self
    }

    /// Creates the variable.
    ///
    /// Fails with [`Error::Construction`] if both a default and a deferred default were given.
    pub fn build(self) -> Result<ContextVarExt<T>> {
        if self.default.is_some() && self.deferred_default.is_some() {
            return Err(Error::Construction { name: self.name });
        }
        // A deferred default is also the raw variable's built-in default, as a marker,
        // so that contexts which never touched the variable resolve through it.
        let builtin = match (&self.default, &self.deferred_default) {
            (Some(value), _) => Some(Slot::Value(value.clone())),
            (None, Some(_)) => Some(Slot::ResetToDefault),
            (None, None) => None,
        };
        let var = ContextVar::with_optional_default(self.name, builtin);
        Ok(ContextVarExt::from_parts(var, self.default, self.deferred_default))
    }
}

impl<T: Clone + Send + Sync + 'static> ContextVarExt<T> {
    /// Starts configuring a new variable named `name`.
    pub fn builder(name: impl Into<String>) -> Builder<T> {
        Builder {
            name: name.into(),
            default: None,
            deferred_default: None,
        }
    }

    /// A variable without a default; reads fail until a value is set.
    pub fn new(name: impl Into<String>) -> Self {
        let var = ContextVar::with_optional_default(name.into(), None);
        Self::from_parts(var, None, None)
    }

    pub fn with_default(name: impl Into<String>, default: T) -> Self {
        let builtin = Some(Slot::Value(default.clone()));
        let var = ContextVar::with_optional_default(name.into(), builtin);
        Self::from_parts(var, Some(default), None)
    }

    pub fn with_deferred_default(
        name: impl Into<String>,
        f: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let var = ContextVar::with_optional_default(name.into(), Some(Slot::ResetToDefault));
        Self::from_parts(var, None, Some(Arc::new(f)))
    }

    /// Wraps an existing raw variable, e.g. one shared with other code.
    ///
    /// The static default is taken from the variable's built-in default. Fails with
    /// [`Error::Construction`] if that default is a value and `deferred_default` is given.
    pub fn from_var(
        var: ContextVar<Slot<T>>,
        deferred_default: Option<DeferredDefault<T>>,
    ) -> Result<Self> {
        let default = var.default().and_then(|slot| slot.as_value()).cloned();
        if default.is_some() && deferred_default.is_some() {
            return Err(Error::Construction {
                name: var.name().to_string(),
            });
        }
        Ok(Self::from_parts(var, default, deferred_default))
    }

    fn from_parts(
        var: ContextVar<Slot<T>>,
        default: Option<T>,
        deferred_default: Option<DeferredDefault<T>>,
    ) -> Self {
        let ext = ContextVarExt {
            inner: Arc::new(ExtInner {
                var,
                default,
                deferred_default,
            }),
        };
        if ext.inner.deferred_default.is_some() && !ext.is_set() {
            ext.reset_to_default();
        }
        logwise::debuginternal_sync!("Created context variable {name}", name = ext.name());
        ext
    }

    /// Returns the value for the current context.
    ///
    /// In order:
    /// - a value that was set;
    /// - the static default;
    /// - the deferred default, computed and stored for this context on first read.
    ///
    /// Fails with [`Error::VariableNotSet`] when none applies, or when the value was deleted.
    #[inline]
    pub fn get(&self) -> Result<T> {
        let inner = &*self.inner;
        match inner.var.get() {
            Some(Slot::Value(value)) => Ok(value),
            None => match &inner.default {
                Some(default) => Ok(default.clone()),
                None => Err(self.not_set()),
            },
            Some(Slot::ResetToDefault) => {
                if let Some(default) = &inner.default {
                    return Ok(default.clone());
                }
                if let Some(deferred_default) = &inner.deferred_default {
                    let value = deferred_default();
                    drop(inner.var.set(Slot::Value(value.clone())));
                    return Ok(value);
                }
                Err(self.not_set())
            }
            Some(Slot::Deleted) => Err(self.not_set()),
        }
    }

    /// Like [`get`](ContextVarExt::get), but returns `fallback` instead of failing.
    ///
    /// `fallback` takes precedence over both the static and the deferred default, so
    /// this never computes a deferred default. Only a value set in the current context
    /// wins over it.
    #[inline]
    pub fn get_or(&self, fallback: T) -> T {
        match self.inner.var.stored() {
            Some(Slot::Value(value)) => value,
            _ => fallback,
        }
    }

    fn not_set(&self) -> Error {
        Error::VariableNotSet {
            name: self.name().to_string(),
        }
    }

    /// Returns the raw value, markers included, without resolving defaults.
    ///
    /// This is the raw variable's `get`: the value stored in the current context,
    /// else its built-in default. Never computes a deferred default.
    #[inline]
    pub fn get_raw(&self) -> Option<Slot<T>> {
        self.inner.var.get()
    }

    /// Returns the raw value stored in the current context, else `fallback`.
    #[inline]
    pub fn get_raw_or(&self, fallback: Slot<T>) -> Slot<T> {
        self.inner.var.get_or(fallback)
    }

    /// True when a value is set in the current context.
    ///
    /// Defaults don't count: a variable that only resolves to its default, or was
    /// deleted, is not set.
    #[inline]
    pub fn is_set(&self) -> bool {
        matches!(self.inner.var.stored(), Some(Slot::Value(_)))
    }

    /// Sets the value for the current context.
    #[inline]
    pub fn set(&self, value: T) -> Token<Slot<T>> {
        self.inner.var.set(Slot::Value(value))
    }

    /// Stores a raw slot, markers included.
    ///
    /// Used to restore saved state; prefer [`delete`](ContextVarExt::delete) and
    /// [`reset_to_default`](ContextVarExt::reset_to_default) otherwise.
    #[inline]
    pub fn set_raw(&self, slot: Slot<T>) -> Token<Slot<T>> {
        self.inner.var.set(slot)
    }

    /// Sets `value` unless a value is already set, and returns the value now in effect.
    ///
    /// ```rust
    /// use ctxvars::ContextVarExt;
    ///
    /// let locale = ContextVarExt::with_default("locale", "en");
    /// // the default doesn't count as set
    /// assert_eq!(locale.set_if_not_set("en_US"), "en_US");
    /// assert_eq!(locale.set_if_not_set("en_GB"), "en_US");
    ///
    /// locale.delete();
    /// assert_eq!(locale.set_if_not_set("en_GB"), "en_GB");
    /// ```
    pub fn set_if_not_set(&self, value: T) -> T {
        match self.inner.var.stored() {
            Some(Slot::Value(existing)) => existing,
            _ => {
                drop(self.set(value.clone()));
                value
            }
        }
    }

    /// Restores the raw value from before the `set` that created `token`.
    ///
    /// This may restore a marker: resetting past a `delete` brings back the deletion,
    /// not the value before it.
    #[inline]
    pub fn reset(&self, token: Token<Slot<T>>) -> Result<()> {
        self.inner.var.reset(token)
    }

    /// Makes the variable resolve to its default again in the current context.
    ///
    /// A deferred default is computed anew on the next read.
    #[inline]
    pub fn reset_to_default(&self) {
        drop(self.inner.var.set(Slot::ResetToDefault));
    }

    /// Deletes the value in the current context.
    ///
    /// Unlike [`reset_to_default`](ContextVarExt::reset_to_default), defaults no
    /// longer apply: reads fail unless a fallback is given.
    #[inline]
    pub fn delete(&self) {
        drop(self.inner.var.set(Slot::Deleted));
    }
}

impl<T> ContextVarExt<T> {
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.var.name()
    }

    /// The underlying raw variable.
    #[inline]
    pub fn context_var(&self) -> &ContextVar<Slot<T>> {
        &self.inner.var
    }

    #[inline]
    pub fn default(&self) -> Option<&T> {
        self.inner.default.as_ref()
    }

    #[inline]
    pub fn has_deferred_default(&self) -> bool {
        self.inner.deferred_default.is_some()
    }
}
