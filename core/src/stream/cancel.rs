//! stream/cancel.rs
//! Cancellation of an in-progress encode.
//!
//! Every deferred the encoder awaits is raced against the token. Once the
//! token fires, each race that has not finished rejects with the token's
//! reason, which the encoder turns into rejection frames as usual.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{self, BoxFuture, Either, FutureExt};
use futures_intrusive::sync::ManualResetEvent;

use crate::constants::CANCELLED_MESSAGE;
use crate::value::{Deferred, Settlement, Value};

/// Error name carried by the default cancellation reason.
pub const ABORT_ERROR_NAME: &str = "AbortError";

#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    event: ManualResetEvent,
    reason: Mutex<Option<Value>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                event: ManualResetEvent::new(false),
                reason: Mutex::new(None),
            }),
        }
    }

    pub fn cancel(&self) {
        self.cancel_with(Value::named_error(ABORT_ERROR_NAME, CANCELLED_MESSAGE));
    }

    /// Cancel with a specific reason. Only the first reason sticks.
    pub fn cancel_with(&self, reason: Value) {
        {
            let mut slot = self.inner.reason.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.inner.event.set();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.event.is_set()
    }

    pub fn reason(&self) -> Option<Value> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Completes once the token has been cancelled.
    pub async fn cancelled(&self) {
        self.inner.event.wait().await
    }

    fn reason_or_default(&self) -> Value {
        self.reason()
            .unwrap_or_else(|| Value::named_error(ABORT_ERROR_NAME, CANCELLED_MESSAGE))
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Await `deferred`, or the first of `tokens` to fire, whichever comes first.
pub(crate) fn race(
    id: u64,
    deferred: Deferred,
    tokens: Vec<CancellationToken>,
) -> BoxFuture<'static, (u64, Settlement)> {
    async move {
        if let Some(token) = tokens.iter().find(|t| t.is_cancelled()) {
            return (id, Err(token.reason_or_default()));
        }
        if tokens.is_empty() {
            return (id, deferred.await);
        }

        let settled = deferred.settled();
        let cancelled = future::select_all(tokens.into_iter().map(|token| {
            async move {
                token.cancelled().await;
                token
            }
            .boxed()
        }));
        let settlement = match future::select(settled, cancelled).await {
            Either::Left((settlement, _)) => settlement,
            Either::Right(((token, _, _), _)) => {
                tracing::debug!(deferred_id = id, "deferred value cancelled");
                Err(token.reason_or_default())
            }
        };
        (id, settlement)
    }
    .boxed()
}
