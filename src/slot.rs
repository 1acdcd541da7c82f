// SPDX-License-Identifier: MIT OR Apache-2.0

//! The raw value stored for a [`ContextVarExt`](crate::ContextVarExt).
//!
//! The underlying [`ContextVar`](crate::context::ContextVar) only knows how to store a value.
//! It cannot forget one. Deletion and "reset to default" are expressed by storing a marker
//! in place of the value, and every read goes through the resolution in
//! [`ContextVarExt::get`](crate::ContextVarExt::get), which never hands a marker to the caller.
//!
//! You will only see markers when working with raw values, through
//! [`ContextVarExt::get_raw`](crate::ContextVarExt::get_raw) or a [`Snapshot`](crate::Snapshot).

use std::fmt::{Debug, Display};

/// A raw value as stored in the underlying context variable.
///
/// Markers are enum variants, so a user value can never be mistaken for one,
/// even a `String` that happens to read `"DELETED"`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Slot<T> {
    /// A value set by the user (or materialized from a deferred default).
    Value(T),
    /// Left by [`ContextVarExt::delete`](crate::ContextVarExt::delete).
    ///
    /// Reads fail unless a fallback is supplied; defaults do not apply.
    Deleted,
    /// Left by [`ContextVarExt::reset_to_default`](crate::ContextVarExt::reset_to_default).
    ///
    /// Reads resolve through the default chain, recomputing a deferred default.
    ResetToDefault,
}

impl<T> Slot<T> {
    /// True for [`Slot::Deleted`] and [`Slot::ResetToDefault`].
    #[inline]
    pub fn is_marker(&self) -> bool {
        !matches!(self, Slot::Value(_))
    }

    #[inline]
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn into_value(self) -> Option<T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Slot::Value(value)
    }
}

impl<T: Debug> Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Slot::Deleted => f.write_str("DELETED"),
            Slot::ResetToDefault => f.write_str("RESET_TO_DEFAULT"),
        }
    }
}

impl<T: Display> Display for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Value(v) => write!(f, "{}", v),
            Slot::Deleted => f.write_str("DELETED"),
            Slot::ResetToDefault => f.write_str("RESET_TO_DEFAULT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Slot;

    #[test]
    fn markers_are_not_values() {
        assert!(Slot::<String>::Deleted.is_marker());
        assert!(Slot::<String>::ResetToDefault.is_marker());
        assert!(!Slot::Value("DELETED".to_string()).is_marker());
        assert_ne!(Slot::Value("DELETED".to_string()), Slot::Deleted);
        assert_eq!(format!("{}", Slot::Value("DELETED")), format!("{}", Slot::<&str>::Deleted));
    }

    #[test]
    fn into_value() {
        assert_eq!(Slot::from(3).into_value(), Some(3));
        assert_eq!(Slot::<i32>::ResetToDefault.into_value(), None);
        assert_eq!(Slot::Value(3).as_value(), Some(&3));
    }
}
