//! # Handlers
//!
//! A `Handler` is a reference-counted callback. Its identity is the identity
//! of the shared allocation, so clones of one `Handler` are "the same
//! handler" for registration and removal, while two handlers built from
//! identical closures are not.
//!
//! Every invocation goes through [`Handler::invoke`], which converts both
//! returned errors and panics into a [`HandlerError`] so a broken subscriber
//! can never unwind through the bus.

use futures::future::{BoxFuture, FutureExt};
use herald_types::{HandlerError, Message};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

type SyncCallback = dyn Fn(&Message) -> HandlerResult + Send + Sync;
type AsyncCallback = dyn Fn(Message) -> BoxFuture<'static, HandlerResult> + Send + Sync;

enum Callback {
    Sync(Box<SyncCallback>),
    Async(Box<AsyncCallback>),
}

/// A subscriber callback with reference identity.
#[derive(Clone)]
pub struct Handler {
    callback: Arc<Callback>,
}

/// Outcome of starting a handler.
pub(crate) enum Invocation {
    /// The handler ran to completion.
    Done(HandlerResult),
    /// The handler returned a computation still to be driven.
    Pending(BoxFuture<'static, HandlerResult>),
}

impl Invocation {
    /// Turn the invocation into a future regardless of flavour.
    pub(crate) fn into_future(self) -> BoxFuture<'static, HandlerResult> {
        match self {
            Self::Done(result) => futures::future::ready(result).boxed(),
            Self::Pending(fut) => fut,
        }
    }
}

impl Handler {
    /// Create a synchronous handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(Callback::Sync(Box::new(f))),
        }
    }

    /// Create an asynchronous handler.
    ///
    /// `publish` spawns the returned future on the current Tokio runtime;
    /// `publish_async` awaits it.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            callback: Arc::new(Callback::Async(Box::new(move |msg| f(msg).boxed()))),
        }
    }

    /// Whether this handler returns a future.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(*self.callback, Callback::Async(_))
    }

    /// Reference identity.
    #[must_use]
    pub fn same(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    /// Start the handler, catching panics raised while it runs.
    pub(crate) fn invoke(&self, message: &Message) -> Invocation {
        match &*self.callback {
            Callback::Sync(f) => {
                let result = catch_unwind(AssertUnwindSafe(|| f(message)))
                    .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic))));
                Invocation::Done(result)
            }
            Callback::Async(f) => {
                let started = catch_unwind(AssertUnwindSafe(|| f(message.clone())));
                match started {
                    Ok(fut) => Invocation::Pending(
                        AssertUnwindSafe(fut)
                            .catch_unwind()
                            .map(|outcome| {
                                outcome.unwrap_or_else(|panic| {
                                    Err(HandlerError::Panicked(panic_message(panic)))
                                })
                            })
                            .boxed(),
                    ),
                    Err(panic) => {
                        Invocation::Done(Err(HandlerError::Panicked(panic_message(panic))))
                    }
                }
            }
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &Arc::as_ptr(&self.callback))
            .field("async", &self.is_async())
            .finish()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
