//! value/deferred.rs
//! Deferred values: a graph position whose content arrives later.
//!
//! A `Deferred` is a cloneable handle over one shared settlement future. Every
//! clone observes the same outcome, and identity is the handle allocation, so
//! the encoder can tell "the same deferred twice" apart from two deferreds
//! that happen to settle to equal values.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::constants::DROPPED_RESOLVER_MESSAGE;
use crate::value::types::Value;

/// Outcome of a deferred value: `Ok` resolves, `Err` rejects with a reason.
pub type Settlement = Result<Value, Value>;

/// Future returned when awaiting a [`Deferred`].
pub type SettledFuture = Shared<BoxFuture<'static, Settlement>>;

#[derive(Clone)]
pub struct Deferred {
    inner: Arc<DeferredInner>,
}

struct DeferredInner {
    settled: SettledFuture,
}

impl Deferred {
    /// Wrap any future that eventually settles.
    pub fn new<F>(settlement: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        Self {
            inner: Arc::new(DeferredInner {
                settled: settlement.boxed().shared(),
            }),
        }
    }

    pub fn resolved(value: Value) -> Self {
        Self::new(future::ready(Ok(value)))
    }

    pub fn rejected(reason: Value) -> Self {
        Self::new(future::ready(Err(reason)))
    }

    /// An unsettled deferred plus the handle that settles it.
    ///
    /// Dropping the [`Resolver`] without settling rejects the deferred.
    pub fn pending() -> (Self, Resolver) {
        let (tx, rx) = oneshot::channel::<Settlement>();
        let deferred = Self::new(rx.map(|received| match received {
            Ok(settlement) => settlement,
            Err(oneshot::Canceled) => Err(Value::error(DROPPED_RESOLVER_MESSAGE)),
        }));
        (deferred, Resolver { tx })
    }

    /// A future for the settlement. Any number may be outstanding.
    pub fn settled(&self) -> SettledFuture {
        self.inner.settled.clone()
    }

    /// The settlement, if it has already been observed by some poller.
    pub fn peek(&self) -> Option<Settlement> {
        self.inner.settled.peek().cloned()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl IntoFuture for Deferred {
    type Output = Settlement;
    type IntoFuture = SettledFuture;

    fn into_future(self) -> Self::IntoFuture {
        self.settled()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(_)) => write!(f, "Deferred(<resolved> @{:#x})", self.addr()),
            Some(Err(_)) => write!(f, "Deferred(<rejected> @{:#x})", self.addr()),
            None => write!(f, "Deferred(<pending> @{:#x})", self.addr()),
        }
    }
}

/// Settles the deferred created alongside it by [`Deferred::pending`].
pub struct Resolver {
    tx: oneshot::Sender<Settlement>,
}

impl Resolver {
    /// Returns false when every handle to the deferred is already gone.
    pub fn resolve(self, value: Value) -> bool {
        self.settle(Ok(value))
    }

    pub fn reject(self, reason: Value) -> bool {
        self.settle(Err(reason))
    }

    pub fn settle(self, settlement: Settlement) -> bool {
        self.tx.send(settlement).is_ok()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("canceled", &self.tx.is_canceled())
            .finish()
    }
}
