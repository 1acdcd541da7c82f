//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# ctxvars

ctxvars provides context-local variables with defaults, deletion and scoped assignment.

# Development status

ctxvars is experimental and the API may change.

# The problem

A context-local variable holds a different value in each *context*: each thread, each
async task, each request handler. The basic primitive, [`context::ContextVar`], can
`get`, `set` and roll a `set` back with a token. That's it. In practice you also want:

* a default that is computed lazily, once per context (a cache, a connection, a buffer);
* to *delete* a value, so that reads fail even though a default exists;
* to go back to the default, recomputing it;
* to set a few variables for the duration of a block, and have them restored however the
  block exits.

[`ContextVarExt`] adds these on top of the primitive, without needing the primitive to
support deletion: deletion is a marker value, see [`Slot`].

# Example

```rust
use ctxvars::ContextVarExt;

let timezone = ContextVarExt::with_default("timezone", "UTC");
assert_eq!(timezone.get(), Ok("UTC"));

let _ = timezone.set("Europe/London");
assert!(timezone.is_set());

timezone.delete();
assert!(timezone.get().is_err());
assert_eq!(timezone.get_or("GMT"), "GMT");

timezone.reset_to_default();
assert_eq!(timezone.get(), Ok("UTC"));
```

# Contexts

Every thread has a current [`context::Context`]. Values set on one thread are invisible on
another, and a thread starts out with an empty context. To run code in a particular
context, enter it with [`Context::run`](context::Context::run), or wrap a future in
[`context::ApplyContext`] to give an async task its own.

# Registries

A [`Registry`] is a named collection of variables, declared up front or created on
first write, with mapping-style access (`get`, `set`, `delete`, `items`, ...).

# Logging

ctxvars logs through [logwise](https://docs.rs/logwise). Variable creation and restores are
logged at `debuginternal`, which is compiled in with the `logwise_internal` feature.
Values are never logged, only variable names.
*/

mod error;
mod registry;
mod scoped;
mod slot;
mod snapshot;
mod spinlock;
mod var_ext;
pub mod context;

logwise::declare_logging_domain!();

pub use error::{Error, Result};
pub use registry::{DefaultValue, Registry, RegistryConfig};
pub use scoped::{TemporaryAssignment, with_values};
pub use slot::Slot;
pub use snapshot::{Snapshot, restore, snapshot};
pub use var_ext::{Builder, ContextVarExt, DeferredDefault};
