// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saving and restoring the raw state of a group of variables.
//!
//! A [`Snapshot`] maps variable names to raw [`Slot`]s, markers included, so a
//! deleted variable comes back deleted and a variable reset to its default comes
//! back that way too.

use std::collections::HashMap;

use crate::slot::Slot;
use crate::var_ext::ContextVarExt;

/// Raw values by variable name.
pub type Snapshot<T> = HashMap<String, Slot<T>>;

/// Captures the raw values of `vars` in the current context.
///
/// Variables without a raw value (nothing stored and no built-in default) are left out.
/// Deferred defaults are never computed.
pub fn snapshot<'a, T>(vars: impl IntoIterator<Item = &'a ContextVarExt<T>>) -> Snapshot<T>
where
    T: Clone + Send + Sync + 'static,
{
    vars.into_iter()
        .filter_map(|var| var.get_raw().map(|slot| (var.name().to_string(), slot)))
        .collect()
}

/// Writes the raw values in `snapshot` back to `vars`.
///
/// A variable missing from the snapshot is deleted, so reads fail just like they
/// did when the snapshot was taken.
///
/// ```rust
/// use ctxvars::{ContextVarExt, restore, snapshot};
///
/// let timezone = ContextVarExt::with_default("timezone", "UTC");
/// let locale = ContextVarExt::new("locale");
/// timezone.delete();
///
/// let saved = snapshot([&timezone, &locale]);
/// let _ = timezone.set("GMT");
/// let _ = locale.set("nb");
///
/// restore([&timezone, &locale], &saved);
/// assert!(timezone.get().is_err());
/// assert!(locale.get().is_err());
/// ```
pub fn restore<'a, T>(vars: impl IntoIterator<Item = &'a ContextVarExt<T>>, snapshot: &Snapshot<T>)
where
    T: Clone + Send + Sync + 'static,
{
    for var in vars {
        let slot = snapshot.get(var.name()).cloned().unwrap_or(Slot::Deleted);
        drop(var.set_raw(slot));
        logwise::debuginternal_sync!("Restored context variable {name}", name = var.name());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{restore, snapshot};
    use crate::ContextVarExt;
    use crate::slot::Slot;

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::*;

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    fn test_round_trip_keeps_markers() {
        let set = ContextVarExt::new("test_round_trip_set");
        let deleted = ContextVarExt::with_default("test_round_trip_deleted", 0);
        let reset = ContextVarExt::with_default("test_round_trip_reset", 0);
        let _ = set.set(1);
        deleted.delete();
        reset.reset_to_default();
        let vars = [&set, &deleted, &reset];
        let before: Vec<_> = vars.iter().map(|v| v.get_raw()).collect();

        let saved = snapshot(vars);
        assert_eq!(saved.len(), 3);
        assert_eq!(saved["test_round_trip_deleted"], Slot::Deleted);

        let _ = set.set(2);
        let _ = deleted.set(2);
        deleted.reset_to_default();
        let _ = reset.set(2);

        restore(vars, &saved);
        let after: Vec<_> = vars.iter().map(|v| v.get_raw()).collect();
        assert_eq!(before, after);
        assert_eq!(reset.get(), Ok(0));
        assert!(!reset.is_set());
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    fn test_absent_variables_are_omitted_and_deleted_on_restore() {
        let absent = ContextVarExt::<u8>::new("test_absent_variable");
        let saved = snapshot([&absent]);
        assert!(saved.is_empty());

        let _ = absent.set(1);
        restore([&absent], &saved);
        assert_eq!(absent.get_raw(), Some(Slot::Deleted));
        assert!(absent.get().unwrap_err().is_not_set());
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    fn test_snapshot_does_not_compute_deferred_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let var = ContextVarExt::with_deferred_default("test_snapshot_deferred", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            5
        });
        let saved = snapshot([&var]);
        assert_eq!(saved["test_snapshot_deferred"], Slot::ResetToDefault);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _ = var.set(1);
        restore([&var], &saved);
        assert_eq!(var.get(), Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
