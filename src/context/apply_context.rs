// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async context preservation.

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use super::context_impl::Context;

/// A [`Future`] wrapper that runs every poll of the inner future inside its own [`Context`].
///
/// The current context is thread-local, but async executors poll futures on whatever
/// thread is available, interleaving many tasks on one thread. `ApplyContext` gives a
/// future its own context: the context is entered around every `poll`, and whatever
/// the future writes is kept for the next poll. Two wrapped futures never see each
/// other's values, even when polled alternately on the same thread.
///
/// # Examples
///
/// ```rust
/// use ctxvars::context::{ApplyContext, ContextVar};
///
/// # async fn example() {
/// let request_id = ContextVar::new("request_id");
/// let _ = request_id.set(7u64);
///
/// // a task that starts from a copy of the current context
/// let inherited = ApplyContext::snapshot(async { request_id.get() });
/// // a task that starts from an empty context
/// let fresh = ApplyContext::empty(async { request_id.get() });
///
/// assert_eq!(inherited.await, Some(7));
/// assert_eq!(fresh.await, None);
/// # }
/// ```
///
/// # Implementation Details
///
/// `ApplyContext` implements [`Future`] by:
/// 1. Entering its context (the thread's current context is set aside)
/// 2. Polling the inner future
/// 3. Leaving its context, keeping any changes the future made
pub struct ApplyContext<F>(Context, F);

impl<F> ApplyContext<F> {
    /// Wraps `f` so that it runs in `context`.
    pub fn new(context: Context, f: F) -> Self {
        Self(context, f)
    }

    /// Wraps `f` so that it runs in a copy of the current context.
    ///
    /// This is how a spawned task normally inherits its parent's values.
    pub fn snapshot(f: F) -> Self {
        Self(Context::current(), f)
    }

    /// Wraps `f` so that it runs in a new empty context, where every variable
    /// takes its default value.
    pub fn empty(f: F) -> Self {
        Self(Context::new(), f)
    }

    /// The context the inner future runs in.
    pub fn context(&self) -> &Context {
        &self.0
    }
}

impl<F> Future for ApplyContext<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        // SAFETY: the future is never moved out of `d.1`; the context is not pinned.
        let (context, fut) = unsafe {
            let d = self.get_unchecked_mut();
            (&mut d.0, Pin::new_unchecked(&mut d.1))
        };
        context.run(|| fut.poll(cx))
    }
}
