// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parking lot for responders whose results return through FFI.
//
// Platform dispatchers hand the call id to native code and park the responder
// here. Native code later reports `(call_id, status, payload)` through
// `moca_bridge_deliver` (C) or the JNI export in the Android module.

use std::collections::HashMap;
use std::ffi::{CStr, c_char};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use moca_core::{CallId, MocaError, Result};

use crate::responder::{DeliveryStatus, NativeOutcome, Responder};

#[derive(Debug, Default)]
pub struct ResponderRegistry {
    parked: Mutex<HashMap<CallId, Responder>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by the platform dispatchers.
    pub fn global() -> &'static ResponderRegistry {
        static GLOBAL: OnceLock<ResponderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ResponderRegistry::new)
    }

    pub fn park(&self, responder: Responder) {
        let id = responder.call_id();
        if self.lock().insert(id, responder).is_some() {
            warn!(call_id = %id, "call id parked twice, previous responder replaced");
        }
    }

    /// Remove a parked responder without delivering to it.
    pub fn forget(&self, id: CallId) -> Option<Responder> {
        self.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Route one delivery. One-shot responders are released on their first
    /// terminal status. Persistent ones stay parked until an error ends the
    /// subscription or the bridge releases them.
    pub fn deliver(&self, id: CallId, status: i32, payload: Option<&str>) -> Result<()> {
        let status = DeliveryStatus::try_from(status)
            .map_err(|code| MocaError::Bridge(format!("unknown delivery status {code} for {id}")))?;

        let responder = {
            let mut parked = self.lock();
            let keep = match parked.get(&id) {
                Some(r) => match status {
                    DeliveryStatus::NoResult => true,
                    DeliveryStatus::Ok => r.keeps_callback(),
                    DeliveryStatus::Error => false,
                },
                None => return Err(MocaError::Bridge(format!("no pending call {id}"))),
            };
            if keep {
                parked.get(&id).cloned()
            } else {
                parked.remove(&id)
            }
        };
        let Some(responder) = responder else {
            return Err(MocaError::Bridge(format!("no pending call {id}")));
        };

        debug!(call_id = %id, action = responder.action(), ?status, "native delivery");
        let outcome = match status {
            DeliveryStatus::Ok => NativeOutcome::Success(parse_payload(payload)),
            DeliveryStatus::Error => NativeOutcome::Failure(failure_message(payload)),
            DeliveryStatus::NoResult => NativeOutcome::NoResult,
        };
        responder.resolve(outcome);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CallId, Responder>> {
        self.parked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Payloads are JSON; anything that does not parse is passed on as a string.
fn parse_payload(payload: Option<&str>) -> Value {
    match payload.map(str::trim) {
        None | Some("") => Value::Null,
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

fn failure_message(payload: Option<&str>) -> String {
    match parse_payload(payload) {
        Value::String(message) => message,
        Value::Null => "unknown native error".to_string(),
        other => other.to_string(),
    }
}

/// Deliver a native result to the global registry.
///
/// Returns 0 on success and -1 if the call id is unknown or the status code
/// is invalid.
///
/// # Safety
/// `payload` must be null or a valid null-terminated UTF-8 string that stays
/// alive for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn moca_bridge_deliver(call_id: u64, status: i32, payload: *const c_char) -> i32 {
    let payload = if payload.is_null() {
        None
    } else {
        match unsafe { CStr::from_ptr(payload) }.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                warn!(call_id, "delivery payload is not valid UTF-8");
                return -1;
            }
        }
    };
    match ResponderRegistry::global().deliver(CallId(call_id), status, payload) {
        Ok(()) => 0,
        Err(e) => {
            warn!(call_id, "delivery rejected: {e}");
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NativeBridge;
    use crate::traits::{NativeCall, NativeDispatcher};
    use serde_json::json;
    use std::ffi::CString;
    use std::sync::Arc;

    fn capture_once(id: u64) -> (Responder, Arc<Mutex<Vec<NativeOutcome>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let responder = Responder::once(
            CallId(id),
            "version",
            Box::new(move |o| sink.lock().unwrap().push(o)),
        );
        (responder, seen)
    }

    #[test]
    fn one_shot_is_released_after_delivery() {
        let registry = ResponderRegistry::new();
        let (responder, seen) = capture_once(1);
        registry.park(responder);
        registry.deliver(CallId(1), 0, Some("\"2.3.1\"")).unwrap();
        assert!(registry.is_empty());
        assert_eq!(seen.lock().unwrap()[0], NativeOutcome::Success(json!("2.3.1")));
        assert!(registry.deliver(CallId(1), 0, Some("1")).is_err());
    }

    #[test]
    fn keep_alive_does_not_release_one_shot() {
        let registry = ResponderRegistry::new();
        let (responder, seen) = capture_once(2);
        registry.park(responder);
        registry.deliver(CallId(2), 2, None).unwrap();
        assert_eq!(registry.len(), 1);
        registry.deliver(CallId(2), 1, Some("MOCA not initialized")).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            seen.lock().unwrap()[0],
            NativeOutcome::Failure("MOCA not initialized".into())
        );
    }

    #[test]
    fn persistent_stays_parked() {
        let registry = ResponderRegistry::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        registry.park(Responder::persistent(
            CallId(3),
            "enterZone",
            Arc::new(move |_| *sink.lock().unwrap() += 1),
        ));
        registry.deliver(CallId(3), 2, None).unwrap();
        registry.deliver(CallId(3), 0, Some(r#"{"detail":{"id":"z"}}"#)).unwrap();
        registry.deliver(CallId(3), 0, Some(r#"{"detail":{"id":"z"}}"#)).unwrap();
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn error_ends_a_persistent_subscription() {
        let registry = ResponderRegistry::new();
        registry.park(Responder::persistent(CallId(5), "enterZone", Arc::new(|_| {})));
        registry.deliver(CallId(5), 1, Some("MOCA not initialized")).unwrap();
        assert!(registry.is_empty());
    }

    /// Parks every responder in a shared registry, like the device
    /// dispatchers do with the global one.
    struct Parking(Arc<ResponderRegistry>);

    impl NativeDispatcher for Parking {
        fn platform_name(&self) -> &str {
            "Parking"
        }

        fn exec(&self, call: NativeCall) {
            self.0.park(call.responder);
        }

        fn release(&self, id: CallId) {
            self.0.forget(id);
        }
    }

    #[tokio::test]
    async fn two_bridges_do_not_collide_in_one_registry() {
        let registry = Arc::new(ResponderRegistry::new());
        let a = NativeBridge::new(Arc::new(Parking(registry.clone())));
        let b = NativeBridge::new(Arc::new(Parking(registry.clone())));

        let version = a.request("version", ());
        let key = b.request("appKey", ());
        assert_ne!(version.call_id(), key.call_id());
        assert_eq!(registry.len(), 2);

        registry.deliver(key.call_id(), 0, Some("\"KEY\"")).unwrap();
        registry.deliver(version.call_id(), 0, Some("\"2.0\"")).unwrap();
        assert_eq!(version.await.unwrap(), json!("2.0"));
        assert_eq!(key.await.unwrap(), json!("KEY"));
        assert!(registry.is_empty());
    }

    #[test]
    fn released_subscriptions_leave_the_registry() {
        let registry = Arc::new(ResponderRegistry::new());
        let bridge = NativeBridge::new(Arc::new(Parking(registry.clone())));
        let mut previous = None;
        for flag in [true, false, true, false] {
            let id = bridge.subscribe("openUrl", flag, |_| {});
            if let Some(old) = previous.replace(id) {
                bridge.release(old);
                assert!(registry.deliver(old, 0, Some("{}")).is_err());
            }
            assert_eq!(registry.len(), 1);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let registry = ResponderRegistry::new();
        let (responder, _) = capture_once(4);
        registry.park(responder);
        assert!(registry.deliver(CallId(4), 9, None).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn non_json_payload_is_passed_as_string() {
        assert_eq!(parse_payload(Some("plain text")), json!("plain text"));
        assert_eq!(parse_payload(Some("")), Value::Null);
        assert_eq!(failure_message(None), "unknown native error");
    }

    #[test]
    fn c_entry_point_routes_to_the_global_registry() {
        let (responder, seen) = capture_once(9_000_001);
        ResponderRegistry::global().park(responder);
        let payload = CString::new("{\"ok\":true}").unwrap();
        let rc = unsafe { moca_bridge_deliver(9_000_001, 0, payload.as_ptr()) };
        assert_eq!(rc, 0);
        assert_eq!(seen.lock().unwrap()[0], NativeOutcome::Success(json!({ "ok": true })));
        assert_eq!(unsafe { moca_bridge_deliver(9_000_001, 0, std::ptr::null()) }, -1);
    }
}
