// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named collections of context variables.
//!
//! A [`Registry`] maps names to [`ContextVarExt`]s, all of one value type. Variables
//! are either declared up front, with their defaults, or created on first write.
//!
//! ```rust
//! use ctxvars::{DefaultValue, Registry};
//!
//! let current = Registry::new("current");
//! current.declare("timezone", DefaultValue::Value("UTC".to_string())).unwrap();
//!
//! assert_eq!(current.get("timezone").unwrap(), "UTC");
//! current.set("locale", "nb".to_string()).unwrap();
//! assert_eq!(current.keys(), ["timezone", "locale"]);
//! ```
//!
//! The table of variables is shared by every context and thread. Values are not:
//! each context sees its own, exactly as with a standalone [`ContextVarExt`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::scoped::TemporaryAssignment;
use crate::snapshot::{self, Snapshot};
use crate::spinlock::Spinlock;
use crate::var_ext::{ContextVarExt, DeferredDefault};

/// The default of a declared variable.
pub enum DefaultValue<T> {
    /// Reads fail until a value is set.
    None,
    Value(T),
    /// Computed on first read, once per context.
    Deferred(DeferredDefault<T>),
}

impl<T: Debug> Debug for DefaultValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultValue::None => f.write_str("None"),
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Options for a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Whether [`Registry::set`] creates variables that were not declared.
    ///
    /// When off, writing an undeclared name fails with [`Error::UndeclaredVariable`].
    /// Defaults to `true`.
    pub auto_create: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig { auto_create: true }
    }
}

struct Table<T> {
    // in declaration order
    vars: Vec<(String, ContextVarExt<T>)>,
    index: HashMap<String, usize>,
}

impl<T> Table<T> {
    fn lookup(&self, name: &str) -> Option<&ContextVarExt<T>> {
        self.index.get(name).map(|&i| &self.vars[i].1)
    }

    fn insert(&mut self, name: &str, var: ContextVarExt<T>) {
        self.index.insert(name.to_string(), self.vars.len());
        self.vars.push((name.to_string(), var));
    }
}

struct RegistryInner<T> {
    namespace: String,
    config: RegistryConfig,
    table: Spinlock<Table<T>>,
}

/// A named collection of context variables.
///
/// Cloning the handle shares the collection.
///
/// Each variable is named `"<namespace>.<name>"`. Listing operations
/// ([`keys`](Registry::keys), [`items`](Registry::items), ...) only include variables
/// that have a value in the current context, in the order they were declared.
pub struct Registry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Registry {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let declared = self.inner.table.with(|t| t.vars.len());
        f.debug_struct("Registry")
            .field("namespace", &self.inner.namespace)
            .field("config", &self.inner.config)
            .field("declared", &declared)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Registry<T> {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_config(namespace, RegistryConfig::default())
    }

    pub fn with_config(namespace: impl Into<String>, config: RegistryConfig) -> Self {
        Registry {
            inner: Arc::new(RegistryInner {
                namespace: namespace.into(),
                config,
                table: Spinlock::new(Table {
                    vars: Vec::new(),
                    index: HashMap::new(),
                }),
            }),
        }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    #[inline]
    pub fn config(&self) -> RegistryConfig {
        self.inner.config
    }

    fn full_name(&self, name: &str) -> String {
        format!("{}.{}", self.inner.namespace, name)
    }

    fn undeclared(&self, name: &str) -> Error {
        Error::UndeclaredVariable {
            registry: self.inner.namespace.clone(),
            name: name.to_string(),
        }
    }

    /// Declares a variable with the given default.
    ///
    /// Fails with [`Error::AlreadyDeclared`] if `name` exists, whether it was declared
    /// or created by a write.
    pub fn declare(&self, name: &str, default: DefaultValue<T>) -> Result<ContextVarExt<T>> {
        self.inner.table.with_mut(|table| {
            if table.lookup(name).is_some() {
                return Err(Error::AlreadyDeclared {
                    registry: self.inner.namespace.clone(),
                    name: name.to_string(),
                });
            }
            let full_name = self.full_name(name);
            let var = match default {
                DefaultValue::None => ContextVarExt::new(full_name),
                DefaultValue::Value(v) => ContextVarExt::with_default(full_name, v),
                DefaultValue::Deferred(f) => {
                    ContextVarExt::with_deferred_default(full_name, move || f())
                }
            };
            table.insert(name, var.clone());
            Ok(var)
        })
    }

    /// The variable named `name`, if it exists.
    pub fn var(&self, name: &str) -> Option<ContextVarExt<T>> {
        self.inner.table.with(|table| table.lookup(name).cloned())
    }

    /// Names of all variables, set or not, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .table
            .with(|table| table.vars.iter().map(|(n, _)| n.clone()).collect())
    }

    fn vars(&self) -> Vec<(String, ContextVarExt<T>)> {
        self.inner.table.with(|table| table.vars.clone())
    }

    /// Looks up `name`, creating it without a default when allowed.
    ///
    /// Concurrent callers racing on the same new name all get the same variable.
    pub fn var_or_create(&self, name: &str) -> Result<ContextVarExt<T>> {
        if let Some(var) = self.var(name) {
            return Ok(var);
        }
        if !self.inner.config.auto_create {
            return Err(self.undeclared(name));
        }
        Ok(self.inner.table.with_mut(|table| {
            if let Some(var) = table.lookup(name) {
                return var.clone();
            }
            let var = ContextVarExt::new(self.full_name(name));
            table.insert(name, var.clone());
            logwise::debuginternal_sync!(
                "Registry {registry} created {name} on first write",
                registry = self.inner.namespace.as_str(),
                name = name
            );
            var
        }))
    }

    /// The value of `name` in the current context.
    ///
    /// Fails with [`Error::UndeclaredVariable`] for unknown names and with
    /// [`Error::VariableNotSet`] when the variable has no value.
    pub fn get(&self, name: &str) -> Result<T> {
        self.var(name).ok_or_else(|| self.undeclared(name))?.get()
    }

    /// The value of `name`, else `fallback`.
    pub fn get_or(&self, name: &str, fallback: T) -> T {
        match self.var(name) {
            Some(var) => var.get_or(fallback),
            None => fallback,
        }
    }

    pub fn set(&self, name: &str, value: T) -> Result<()> {
        drop(self.var_or_create(name)?.set(value));
        Ok(())
    }

    /// Sets `name` unless it is already set, returning the value now in effect.
    pub fn set_if_not_set(&self, name: &str, value: T) -> Result<T> {
        Ok(self.var_or_create(name)?.set_if_not_set(value))
    }

    /// Sets several variables. Stops at the first name that can't be written.
    pub fn update<S: AsRef<str>>(&self, values: impl IntoIterator<Item = (S, T)>) -> Result<()> {
        for (name, value) in values {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Deletes `name` in the current context.
    ///
    /// Fails with [`Error::VariableNotSet`] when there is no value to delete.
    pub fn delete(&self, name: &str) -> Result<()> {
        let var = match self.var(name) {
            Some(var) => var,
            None if self.inner.config.auto_create => {
                return Err(Error::VariableNotSet {
                    name: self.full_name(name),
                });
            }
            None => return Err(self.undeclared(name)),
        };
        var.get()?;
        var.delete();
        Ok(())
    }

    /// Deletes `name`, returning the value it had.
    pub fn pop(&self, name: &str) -> Result<T> {
        let var = self.var(name).ok_or_else(|| self.undeclared(name))?;
        let value = var.get()?;
        var.delete();
        Ok(value)
    }

    /// True when `name` has a value in the current context.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Names and values of the variables that have a value, in declaration order.
    ///
    /// Reads every variable, so deferred defaults get computed.
    pub fn items(&self) -> Vec<(String, T)> {
        self.vars()
            .into_iter()
            .filter_map(|(name, var)| var.get().ok().map(|value| (name, value)))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items().into_iter().map(|(name, _)| name).collect()
    }

    pub fn values(&self) -> Vec<T> {
        self.items().into_iter().map(|(_, value)| value).collect()
    }

    /// Number of variables that have a value.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes every variable that has a value.
    pub fn clear(&self) {
        for (_, var) in self.vars() {
            if var.get().is_ok() {
                var.delete();
            }
        }
    }

    /// Runs `f` with the given variables temporarily set.
    ///
    /// Names are resolved like [`set`](Registry::set). If one can't be written, the
    /// variables set so far are rolled back and `f` does not run.
    ///
    /// ```rust
    /// use ctxvars::Registry;
    ///
    /// let current = Registry::new("current");
    /// current.set("user", "alice").unwrap();
    ///
    /// let seen = current.with_values([("user", "bob")], || current.get("user")).unwrap();
    /// assert_eq!(seen, Ok("bob"));
    /// assert_eq!(current.get("user"), Ok("alice"));
    /// ```
    pub fn with_values<S, R>(
        &self,
        assignments: impl IntoIterator<Item = (S, T)>,
        f: impl FnOnce() -> R,
    ) -> Result<R>
    where
        S: AsRef<str>,
    {
        let mut guard = TemporaryAssignment::new();
        for (name, value) in assignments {
            let var = self.var_or_create(name.as_ref())?;
            guard.assign(&var, value);
        }
        let result = f();
        drop(guard);
        Ok(result)
    }

    /// Raw values of every variable, keyed by full name.
    pub fn snapshot(&self) -> Snapshot<T> {
        let vars = self.vars();
        snapshot::snapshot(vars.iter().map(|(_, var)| var))
    }

    /// Writes back a [`snapshot`](Registry::snapshot).
    ///
    /// Variables created after the snapshot was taken end up deleted.
    pub fn restore(&self, saved: &Snapshot<T>) {
        let vars = self.vars();
        snapshot::restore(vars.iter().map(|(_, var)| var), saved);
    }
}
