// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result routing for one native call.
//
// A responder is the only path back from the host. One-shot responders settle
// on their first success or failure; later deliveries are logged and dropped.
// Persistent responders forward every success to their listener and swallow
// the keep-alive acknowledgement.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use moca_core::CallId;

/// What the native side reported for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeOutcome {
    Success(Value),
    Failure(String),
    /// Keep-alive acknowledgement of a persistent registration.
    NoResult,
}

/// Status codes used by FFI deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DeliveryStatus {
    Ok = 0,
    Error = 1,
    NoResult = 2,
}

impl TryFrom<i32> for DeliveryStatus {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, i32> {
        match code {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            2 => Ok(Self::NoResult),
            other => Err(other),
        }
    }
}

pub(crate) type OnceHandler = Box<dyn FnOnce(NativeOutcome) + Send>;
pub(crate) type PersistentHandler = Arc<dyn Fn(NativeOutcome) + Send + Sync>;

enum Handler {
    Once(Option<OnceHandler>),
    Persistent(PersistentHandler),
}

struct Shared {
    call_id: CallId,
    action: String,
    handler: Mutex<Handler>,
}

/// Cloneable handle that delivers a native outcome to the caller.
#[derive(Clone)]
pub struct Responder {
    shared: Arc<Shared>,
}

impl Responder {
    pub(crate) fn once(call_id: CallId, action: &str, handler: OnceHandler) -> Self {
        Self::with_handler(call_id, action, Handler::Once(Some(handler)))
    }

    pub(crate) fn persistent(call_id: CallId, action: &str, handler: PersistentHandler) -> Self {
        Self::with_handler(call_id, action, Handler::Persistent(handler))
    }

    fn with_handler(call_id: CallId, action: &str, handler: Handler) -> Self {
        Self {
            shared: Arc::new(Shared {
                call_id,
                action: action.to_string(),
                handler: Mutex::new(handler),
            }),
        }
    }

    pub fn call_id(&self) -> CallId {
        self.shared.call_id
    }

    pub fn action(&self) -> &str {
        &self.shared.action
    }

    pub fn keeps_callback(&self) -> bool {
        matches!(*self.lock(), Handler::Persistent(_))
    }

    /// True once a one-shot responder has delivered. Persistent responders
    /// never settle.
    pub fn is_settled(&self) -> bool {
        matches!(*self.lock(), Handler::Once(None))
    }

    /// Deliver an outcome. Returns `false` when the delivery was ignored.
    ///
    /// The handler runs after the internal lock is released, so it may
    /// resolve other responders or issue new native calls.
    pub fn resolve(&self, outcome: NativeOutcome) -> bool {
        let call_id = self.shared.call_id;
        let action = self.shared.action.as_str();

        let mut guard = self.lock();
        match &mut *guard {
            Handler::Once(slot) => {
                if outcome == NativeOutcome::NoResult {
                    debug!(action, %call_id, "keep-alive on one-shot call ignored");
                    return false;
                }
                let Some(handler) = slot.take() else {
                    warn!(action, %call_id, "late delivery on settled call ignored");
                    return false;
                };
                drop(guard);
                handler(outcome);
                true
            }
            Handler::Persistent(handler) => {
                if outcome == NativeOutcome::NoResult {
                    debug!(action, %call_id, "subscription acknowledged");
                    return true;
                }
                let handler = Arc::clone(handler);
                drop(guard);
                handler(outcome);
                true
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Handler> {
        self.shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("call_id", &self.shared.call_id)
            .field("action", &self.shared.action)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (hits.clone(), hits)
    }

    #[test]
    fn one_shot_settles_once() {
        let (hits, seen) = counter();
        let responder = Responder::once(
            CallId(1),
            "version",
            Box::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(responder.resolve(NativeOutcome::Success(json!("2.0"))));
        assert!(!responder.resolve(NativeOutcome::Success(json!("2.1"))));
        assert!(!responder.resolve(NativeOutcome::Failure("late".into())));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(responder.is_settled());
    }

    #[test]
    fn keep_alive_does_not_settle_one_shot() {
        let (hits, seen) = counter();
        let responder = Responder::once(
            CallId(2),
            "appKey",
            Box::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(!responder.resolve(NativeOutcome::NoResult));
        assert!(!responder.is_settled());
        assert!(responder.resolve(NativeOutcome::Success(json!("k"))));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn persistent_forwards_every_success_but_not_acks() {
        let (hits, seen) = counter();
        let responder = Responder::persistent(
            CallId(3),
            "enterBeacon",
            Arc::new(move |outcome| {
                assert!(matches!(outcome, NativeOutcome::Success(_)));
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        responder.resolve(NativeOutcome::NoResult);
        for _ in 0..3 {
            responder.resolve(NativeOutcome::Success(json!({})));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert!(responder.keeps_callback());
        assert!(!responder.is_settled());
    }

    #[test]
    fn handler_may_resolve_its_own_responder() {
        let slot: Arc<Mutex<Option<Responder>>> = Arc::new(Mutex::new(None));
        let inner = slot.clone();
        let responder = Responder::once(
            CallId(4),
            "version",
            Box::new(move |_| {
                let me = inner.lock().unwrap().clone().unwrap();
                assert!(!me.resolve(NativeOutcome::Success(Value::Null)));
            }),
        );
        *slot.lock().unwrap() = Some(responder.clone());
        assert!(responder.resolve(NativeOutcome::Success(Value::Null)));
    }

    #[test]
    fn status_codes_parse() {
        assert_eq!(DeliveryStatus::try_from(0), Ok(DeliveryStatus::Ok));
        assert_eq!(DeliveryStatus::try_from(2), Ok(DeliveryStatus::NoResult));
        assert_eq!(DeliveryStatus::try_from(7), Err(7));
    }
}
