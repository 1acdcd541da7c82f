// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for context variables and registries.

use thiserror::Error;

/// Errors returned by context variables, reset tokens and registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The variable has no value in the current context, and neither a fallback
    /// nor a default applies.
    ///
    /// Recover by passing a fallback ([`ContextVarExt::get_or`](crate::ContextVarExt::get_or))
    /// or by setting a value first.
    #[error("context variable is not set: '{name}'")]
    VariableNotSet { name: String },

    /// A variable was configured with both a default value and a deferred default.
    #[error("context variable '{name}' cannot have both a default and a deferred default")]
    Construction { name: String },

    /// The reset token was created by a different variable.
    #[error("token was created by a different context variable than '{name}'")]
    TokenVarMismatch { name: String },

    /// The reset token was created in a different context.
    #[error("token for '{name}' was created in a different context")]
    TokenContextMismatch { name: String },

    /// The registry does not create variables on first write, and `name` was never declared.
    #[error("can't set undeclared variable '{registry}.{name}'")]
    UndeclaredVariable { registry: String, name: String },

    /// `name` is already declared in the registry.
    #[error("variable '{registry}.{name}' is already declared")]
    AlreadyDeclared { registry: String, name: String },
}

impl Error {
    /// Returns true for lookup-kind errors, that is, "this variable has no value".
    pub fn is_not_set(&self) -> bool {
        matches!(self, Error::VariableNotSet { .. })
    }
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
