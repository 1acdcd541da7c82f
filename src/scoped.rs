// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary assignment of context variables.
//!
//! [`with_values`] sets a group of variables, runs a closure, and rolls every
//! variable back afterwards. Rollback happens however the closure exits: by
//! returning, by returning an `Err`, or by panicking.
//!
//! The rollback is driven by [`TemporaryAssignment`], a guard you can also use
//! directly, e.g. to assign variables of different types:
//!
//! ```rust
//! use ctxvars::{ContextVarExt, TemporaryAssignment};
//!
//! let timezone = ContextVarExt::with_default("timezone", "UTC");
//! let retries = ContextVarExt::with_default("retries", 3u8);
//!
//! {
//!     let mut assignment = TemporaryAssignment::new();
//!     assignment.assign(&timezone, "Europe/London");
//!     assignment.assign(&retries, 0);
//!     assert_eq!(timezone.get(), Ok("Europe/London"));
//!     assert_eq!(retries.get(), Ok(0));
//! }
//!
//! assert_eq!(timezone.get(), Ok("UTC"));
//! assert_eq!(retries.get(), Ok(3));
//! ```

use std::fmt::Debug;

use crate::error::Result;
use crate::var_ext::ContextVarExt;

type Rollback = Box<dyn FnOnce() -> Result<()>>;

/// Rolls back a group of assignments when dropped.
///
/// Each [`assign`](TemporaryAssignment::assign) sets a variable and remembers its
/// reset token. On drop, the tokens are used in reverse order, so assigning the
/// same variable twice still ends with its original value.
///
/// The guard must be dropped in the context it was created in. Rolling back from
/// another context fails; such failures are logged and skipped.
#[must_use = "the assignment is rolled back as soon as the guard is dropped"]
pub struct TemporaryAssignment {
    rollbacks: Vec<(String, Rollback)>,
}

impl TemporaryAssignment {
    pub fn new() -> Self {
        TemporaryAssignment {
            rollbacks: Vec::new(),
        }
    }

    /// Sets `var` to `value` until this guard is dropped.
    pub fn assign<T>(&mut self, var: &ContextVarExt<T>, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let token = var.set(value);
        let var = var.clone();
        self.rollbacks
            .push((var.name().to_string(), Box::new(move || var.reset(token))));
        self
    }

    /// Number of assignments to roll back.
    pub fn len(&self) -> usize {
        self.rollbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rollbacks.is_empty()
    }

    /// Rolls back now, returning the first failure.
    ///
    /// Every assignment is rolled back even when an earlier one fails.
    pub fn finish(mut self) -> Result<()> {
        let mut first_error = None;
        while let Some((_name, rollback)) = self.rollbacks.pop() {
            if let Err(e) = rollback() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for TemporaryAssignment {
    fn default() -> Self {
        TemporaryAssignment::new()
    }
}

impl Debug for TemporaryAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rollbacks.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("TemporaryAssignment")
            .field("vars", &names)
            .finish()
    }
}

impl Drop for TemporaryAssignment {
    fn drop(&mut self) {
        while let Some((name, rollback)) = self.rollbacks.pop() {
            if let Err(e) = rollback() {
                logwise::warn_sync!(
                    "Could not roll back temporary assignment of {name}: {error}",
                    name = name,
                    error = e.to_string()
                );
            }
        }
    }
}

/// Runs `f` with the given variables temporarily set.
///
/// All variables are rolled back after `f` returns or panics. Whatever `f` returns,
/// including an `Err`, is passed through unchanged.
///
/// ```rust
/// use ctxvars::{ContextVarExt, with_values};
///
/// let timezone = ContextVarExt::with_default("timezone", "UTC");
/// let locale = ContextVarExt::new("locale");
///
/// let result: Result<(), &str> = with_values(
///     [(&timezone, "Asia/Tokyo"), (&locale, "ja_JP")],
///     || {
///         assert_eq!(timezone.get(), Ok("Asia/Tokyo"));
///         assert_eq!(locale.get(), Ok("ja_JP"));
///         Err("request failed")
///     },
/// );
///
/// assert_eq!(result, Err("request failed"));
/// assert_eq!(timezone.get(), Ok("UTC"));
/// assert!(locale.get().is_err());
/// ```
pub fn with_values<'a, T, R>(
    assignments: impl IntoIterator<Item = (&'a ContextVarExt<T>, T)>,
    f: impl FnOnce() -> R,
) -> R
where
    T: Clone + Send + Sync + 'static,
{
    let mut guard = TemporaryAssignment::new();
    for (var, value) in assignments {
        guard.assign(var, value);
    }
    let result = f();
    drop(guard);
    result
}
