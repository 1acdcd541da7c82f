// SPDX-License-Identifier: MIT OR Apache-2.0

//! The context-local storage primitive.
//!
//! This module provides the raw building blocks the rest of the crate is built on:
//! a per-thread *current context*, and cells whose values live in it.
//!
//! # Overview
//!
//! - [`ContextVar`]: a context-local cell with `get`/`set`/`reset`, keyed by identity
//! - [`Context`]: a copy-on-write mapping from variables to values, entered with [`Context::run`]
//! - [`Token`]: returned by [`ContextVar::set`], rolls the value back in [`ContextVar::reset`]
//! - [`ApplyContext`]: a [`Future`] wrapper that gives a task its own context
//!
//! # Thread-Local Context Management
//!
//! Each thread has its own current context, which starts out empty. A value set on one
//! thread is never visible on another:
//!
//! ```rust
//! use ctxvars::context::ContextVar;
//!
//! let locale = ContextVar::with_default("locale", "en");
//! let _ = locale.set("nb");
//!
//! let other = locale.clone();
//! let seen = std::thread::spawn(move || other.get()).join().unwrap();
//! assert_eq!(seen, Some("en"));
//! assert_eq!(locale.get(), Some("nb"));
//! ```
//!
//! To carry values over, capture a context and enter it, or use one of the
//! [`bind_to_snapshot_context`]-style helpers.
//!
//! # Async Context Preservation
//!
//! The [`ApplyContext`] wrapper enters its context around every poll, so tasks that
//! share a thread keep separate values:
//!
//! ```rust
//! use ctxvars::context::{ApplyContext, Context};
//! # async fn async_operation() {}
//!
//! # async fn example() {
//! let future = ApplyContext::new(Context::new(), async_operation());
//! future.await;
//! # }
//! ```
//!
//! [`Future`]: std::future::Future

mod apply_context;
mod bind;
mod context_impl;
mod context_var;


// Re-export public types
pub use apply_context::ApplyContext;
pub use bind::{bind_to_empty_context, bind_to_sandbox_context, bind_to_snapshot_context};
pub use context_impl::{Context, ContextID};
pub use context_var::{ContextVar, Token, VarID};
