// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native call marshaller.
//
// Every public entry point builds a fresh `ActionDescriptor`, allocates a call
// id and submits exactly one `NativeCall` to the dispatcher. Results come back
// through a `Responder`; failures always reach `log_failure` first.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error};

use moca_core::{ActionDescriptor, BridgeConfig, CallId, MocaError, NativeArgs, PLUGIN_NAME, Result};

use crate::responder::{NativeOutcome, Responder};
use crate::traits::{NativeCall, NativeDispatcher};

/// Success callback for fire-and-forget calls.
pub type Callback = Box<dyn FnOnce(Value) + Send>;

/// The fixed failure handler: log and continue.
pub fn log_failure(action: &str, call_id: CallId, message: &str) {
    error!(action, %call_id, "MOCA: callback error: {message}");
}

/// Cloneable handle that marshals calls to the native plugin.
#[derive(Clone)]
pub struct NativeBridge {
    inner: Arc<Inner>,
}

struct Inner {
    dispatcher: Arc<dyn NativeDispatcher>,
    plugin: String,
}

impl NativeBridge {
    pub fn new(dispatcher: Arc<dyn NativeDispatcher>) -> Self {
        Self::with_plugin_name(dispatcher, PLUGIN_NAME)
    }

    pub fn with_plugin_name(dispatcher: Arc<dyn NativeDispatcher>, plugin: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                plugin: plugin.into(),
            }),
        }
    }

    pub fn from_config(dispatcher: Arc<dyn NativeDispatcher>, config: &BridgeConfig) -> Self {
        Self::with_plugin_name(dispatcher, config.plugin_name.clone())
    }

    pub fn plugin_name(&self) -> &str {
        &self.inner.plugin
    }

    pub fn platform_name(&self) -> &str {
        self.inner.dispatcher.platform_name()
    }

    /// Fire-and-forget call. `callback` receives the success value; failures
    /// are only logged.
    pub fn call_native(
        &self,
        callback: Option<Callback>,
        action: &str,
        args: impl Into<NativeArgs>,
    ) -> CallId {
        let name = action.to_string();
        self.submit(action, args.into(), move |call_id| {
            Responder::once(
                call_id,
                action,
                Box::new(move |outcome| match outcome {
                    NativeOutcome::Success(value) => {
                        if let Some(callback) = callback {
                            callback(value);
                        }
                    }
                    NativeOutcome::Failure(message) => log_failure(&name, call_id, &message),
                    NativeOutcome::NoResult => {}
                }),
            )
        })
    }

    /// Submit a call now and return a future for its result.
    ///
    /// The call is dispatched before this returns, so dropping the
    /// `PendingCall` only discards the eventual result. There is no timeout.
    pub fn request(&self, action: &str, args: impl Into<NativeArgs>) -> PendingCall {
        let (tx, rx) = oneshot::channel();
        let name = action.to_string();
        let call_id = self.submit(action, args.into(), move |call_id| {
            Responder::once(
                call_id,
                action,
                Box::new(move |outcome| {
                    let result = match outcome {
                        NativeOutcome::Success(value) => Ok(value),
                        NativeOutcome::Failure(message) => {
                            log_failure(&name, call_id, &message);
                            Err(MocaError::Native(message))
                        }
                        NativeOutcome::NoResult => return,
                    };
                    if tx.send(result).is_err() {
                        debug!(action = %name, %call_id, "result discarded, caller went away");
                    }
                }),
            )
        });
        PendingCall {
            call_id,
            action: action.to_string(),
            rx,
        }
    }

    /// Register a persistent native callback. `listener` sees every success
    /// payload; failures are logged.
    pub fn subscribe<F>(&self, action: &str, args: impl Into<NativeArgs>, listener: F) -> CallId
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.subscribe_outcomes(action, args, move |outcome| {
            if let NativeOutcome::Success(value) = outcome {
                listener(value);
            }
        })
    }

    /// Like [`NativeBridge::subscribe`], but `handler` also sees failures
    /// (after they are logged), so the caller can drop a registration the
    /// native side refused.
    pub fn subscribe_outcomes<F>(&self, action: &str, args: impl Into<NativeArgs>, handler: F) -> CallId
    where
        F: Fn(NativeOutcome) + Send + Sync + 'static,
    {
        let name = action.to_string();
        self.submit_with(action, args.into(), true, move |call_id| {
            Responder::persistent(
                call_id,
                action,
                Arc::new(move |outcome| match outcome {
                    NativeOutcome::NoResult => {}
                    NativeOutcome::Failure(message) => {
                        log_failure(&name, call_id, &message);
                        handler(NativeOutcome::Failure(message));
                    }
                    success => handler(success),
                }),
            )
        })
    }

    /// Stop routing results of a persistent call. The host may still hold
    /// its end; anything it sends for `id` afterwards is rejected.
    pub fn release(&self, id: CallId) {
        debug!(call_id = %id, "releasing native call");
        self.inner.dispatcher.release(id);
    }

    fn submit<R>(&self, action: &str, args: NativeArgs, responder: R) -> CallId
    where
        R: FnOnce(CallId) -> Responder,
    {
        self.submit_with(action, args, false, responder)
    }

    fn submit_with<R>(&self, action: &str, args: NativeArgs, keep_callback: bool, responder: R) -> CallId
    where
        R: FnOnce(CallId) -> Responder,
    {
        let id = CallId::next();
        let descriptor = ActionDescriptor::new(self.inner.plugin.as_str(), action, args);
        debug!(
            action,
            call_id = %id,
            args = descriptor.args.len(),
            keep_callback,
            "dispatching native call"
        );
        self.inner.dispatcher.exec(NativeCall {
            id,
            descriptor,
            keep_callback,
            responder: responder(id),
        });
        id
    }
}

impl std::fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBridge")
            .field("plugin", &self.inner.plugin)
            .field("platform", &self.platform_name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Futures
// ---------------------------------------------------------------------------

/// Result of a submitted native call.
///
/// Resolves to the raw success value, `MocaError::Native` on failure, or
/// `MocaError::CallDropped` if the host released the responder unanswered.
#[must_use = "the call is already dispatched; await to observe the result"]
#[derive(Debug)]
pub struct PendingCall {
    call_id: CallId,
    action: String,
    rx: oneshot::Receiver<Result<Value>>,
}

impl PendingCall {
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Decode the success value with `decode` once it arrives.
    pub fn map<T, F>(self, decode: F) -> TypedCall<T>
    where
        F: FnOnce(&str, Value) -> Result<T> + Send + 'static,
    {
        TypedCall {
            pending: self,
            decode: Some(Box::new(decode)),
        }
    }

    /// Discard the success value.
    pub fn ignore(self) -> TypedCall<()> {
        self.map(|_, _| Ok(()))
    }
}

impl Future for PendingCall {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(MocaError::CallDropped {
                action: self.action.clone(),
            }),
        })
    }
}

type Decoder<T> = Box<dyn FnOnce(&str, Value) -> Result<T> + Send>;

/// A `PendingCall` whose success value is decoded into `T`.
#[must_use = "the call is already dispatched; await to observe the result"]
pub struct TypedCall<T> {
    pending: PendingCall,
    decode: Option<Decoder<T>>,
}

impl<T> TypedCall<T> {
    pub fn call_id(&self) -> CallId {
        self.pending.call_id
    }
}

impl<T> Future for TypedCall<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let value = match Pin::new(&mut this.pending).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result?,
        };
        match this.decode.take() {
            Some(decode) => Poll::Ready(decode(&this.pending.action, value)),
            None => Poll::Ready(Err(MocaError::Bridge(format!(
                "`{}` polled after completion",
                this.pending.action
            )))),
        }
    }
}

impl<T> std::fmt::Debug for TypedCall<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCall").field("pending", &self.pending).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use crate::recording::RecordingDispatcher;
    use serde_json::json;
    use std::sync::Mutex;

    fn bridge() -> (Arc<RecordingDispatcher>, NativeBridge) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let bridge = NativeBridge::new(dispatcher.clone());
        (dispatcher, bridge)
    }

    #[test]
    fn call_native_submits_exactly_once_with_plugin_name() {
        let (recorder, bridge) = bridge();
        bridge.call_native(None, "version", ());
        let calls = recorder.descriptors();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].plugin, "MOCAPlugin");
        assert_eq!(calls[0].action, "version");
        assert!(calls[0].args.is_empty());
    }

    #[test]
    fn argument_forms_reach_the_dispatcher_unchanged() {
        let (recorder, bridge) = bridge();
        bridge.call_native(None, "setLogLevel", 4);
        bridge.call_native(None, "instance_add_tag", ("buyer", None::<&str>));
        let calls = recorder.descriptors();
        assert_eq!(calls[0].args.as_slice(), &[json!(4)]);
        assert_eq!(calls[1].args.as_slice(), &[json!("buyer"), Value::Null]);
    }

    #[test]
    fn success_reaches_the_callback_with_the_native_value() {
        let (recorder, bridge) = bridge();
        let got = Arc::new(Mutex::new(None));
        let sink = got.clone();
        let id = bridge.call_native(
            Some(Box::new(move |v| *sink.lock().unwrap() = Some(v))),
            "appKey",
            (),
        );
        recorder.respond(id, NativeOutcome::Success(json!("KEY")));
        assert_eq!(*got.lock().unwrap(), Some(json!("KEY")));
    }

    #[test]
    fn failure_never_reaches_the_success_callback() {
        let (recorder, bridge) = bridge();
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let id = bridge.call_native(
            Some(Box::new(move |_| *flag.lock().unwrap() = true)),
            "version",
            (),
        );
        recorder.respond(id, NativeOutcome::Failure("MOCA not initialized".into()));
        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn call_ids_increase() {
        let (_, bridge) = bridge();
        let a = bridge.call_native(None, "version", ());
        let b = bridge.call_native(None, "version", ());
        assert!(b > a);
    }

    #[tokio::test]
    async fn request_resolves_with_success_value() {
        let (recorder, bridge) = bridge();
        let pending = bridge.request("version", ());
        recorder.respond(pending.call_id(), NativeOutcome::Success(json!("2.4.0")));
        assert_eq!(pending.await.unwrap(), json!("2.4.0"));
    }

    #[tokio::test]
    async fn request_surfaces_failures_as_errors() {
        let (recorder, bridge) = bridge();
        let pending = bridge.request("version", ());
        recorder.respond(pending.call_id(), NativeOutcome::Failure("boom".into()));
        let err = pending.await.unwrap_err();
        assert!(matches!(err, MocaError::Native(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn dropped_responder_yields_call_dropped() {
        let (recorder, bridge) = bridge();
        let pending = bridge.request("performFetch", ());
        recorder.clear();
        let err = pending.await.unwrap_err();
        assert!(matches!(err, MocaError::CallDropped { ref action } if action == "performFetch"));
    }

    #[tokio::test]
    async fn typed_call_decodes() {
        let (recorder, bridge) = bridge();
        let call = bridge.request("initialized", ()).map(decode::boolean);
        recorder.respond(call.call_id(), NativeOutcome::Success(json!(1)));
        assert!(call.await.unwrap());
    }

    #[test]
    fn dropping_the_future_still_dispatches() {
        let (recorder, bridge) = bridge();
        let pending = bridge.request("performFetch", ());
        let id = pending.call_id();
        drop(pending);
        assert_eq!(recorder.len(), 1);
        // The late result is discarded without panicking.
        assert!(recorder.respond(id, NativeOutcome::Success(json!(1))));
    }

    #[test]
    fn subscribe_forwards_every_delivery() {
        let (recorder, bridge) = bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = bridge.subscribe("enterBeacon", (), move |v| sink.lock().unwrap().push(v));
        assert!(recorder.last().unwrap().keep_callback);
        recorder.respond(id, NativeOutcome::NoResult);
        recorder.respond(id, NativeOutcome::Success(json!({ "detail": 1 })));
        recorder.respond(id, NativeOutcome::Success(json!({ "detail": 2 })));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn callbacks_may_reenter_the_bridge() {
        let (recorder, bridge) = bridge();
        let again = bridge.clone();
        let id = bridge.call_native(
            Some(Box::new(move |_| {
                again.call_native(None, "current_user", ());
            })),
            "is_user_logged_in",
            (),
        );
        recorder.respond(id, NativeOutcome::Success(json!(1)));
        let actions: Vec<_> = recorder.descriptors().into_iter().map(|d| d.action).collect();
        assert_eq!(actions, ["is_user_logged_in", "current_user"]);
    }
}
