// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android dispatcher via JNI.
//
// Outbound calls go to the static Java method
// `com.innoquant.moca.bridge.MOCABridge.exec(long callId, String action,
// String argsJson, boolean keepCallback)`, which forwards to the MOCA plugin.
// The Java side reports each result through the native method
// `MOCABridge.nativeDeliver(long callId, int status, String payloadJson)`,
// exported below. Status codes: 0 = OK, 1 = ERROR, 2 = NO_RESULT.

#![cfg(target_os = "android")]

use jni::objects::{JClass, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};

use moca_core::{CallId, MocaError, Result};

use crate::registry::ResponderRegistry;
use crate::responder::NativeOutcome;
use crate::traits::{NativeCall, NativeDispatcher};

/// Java class hosting the bridge entry points.
const BRIDGE_CLASS: &str = "com/innoquant/moca/bridge/MOCABridge";

/// JNI signature of `MOCABridge.exec`.
const EXEC_SIGNATURE: &str = "(JLjava/lang/String;Ljava/lang/String;Z)V";

/// Obtain the process `JavaVM` from the NDK context.
fn java_vm() -> Result<JavaVM> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code and
    // stays valid for the lifetime of the process.
    unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| MocaError::Bridge(format!("failed to obtain JavaVM: {e}")))
}

fn jni_err(context: &str, e: jni::errors::Error) -> MocaError {
    MocaError::Bridge(format!("{context}: {e}"))
}

/// Android implementation of the native dispatcher.
///
/// Zero state of its own: pending responders live in the global registry
/// until Java delivers their result.
pub struct AndroidDispatcher {
    registry: &'static ResponderRegistry,
}

impl AndroidDispatcher {
    /// Create the dispatcher. No JNI work happens until the first call.
    pub fn new() -> Self {
        Self {
            registry: ResponderRegistry::global(),
        }
    }

    fn submit(&self, call: &NativeCall) -> Result<()> {
        let vm = java_vm()?;
        let mut env = vm
            .attach_current_thread_permanently()
            .map_err(|e| jni_err("attach_current_thread", e))?;

        let j_action: JString = env
            .new_string(&call.descriptor.action)
            .map_err(|e| jni_err("new_string(action)", e))?;
        let j_args: JString = env
            .new_string(call.descriptor.args_json())
            .map_err(|e| jni_err("new_string(args)", e))?;

        let result = env.call_static_method(
            BRIDGE_CLASS,
            "exec",
            EXEC_SIGNATURE,
            &[
                JValue::Long(call.id.0 as jlong),
                JValue::Object(&j_action),
                JValue::Object(&j_args),
                JValue::Bool(u8::from(call.keep_callback)),
            ],
        );

        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
            return Err(MocaError::Bridge(format!(
                "MOCABridge.exec threw for `{}`",
                call.descriptor.action
            )));
        }
        result.map(|_| ()).map_err(|e| jni_err("MOCABridge.exec", e))
    }
}

impl Default for AndroidDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeDispatcher for AndroidDispatcher {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn exec(&self, call: NativeCall) {
        self.registry.park(call.responder.clone());
        if let Err(e) = self.submit(&call) {
            tracing::error!(action = %call.descriptor.action, call_id = %call.id, "JNI dispatch failed: {e}");
            self.registry.forget(call.id);
            call.responder.resolve(NativeOutcome::Failure(e.to_string()));
        }
    }

    fn release(&self, id: CallId) {
        self.registry.forget(id);
    }
}

/// `MOCABridge.nativeDeliver`: route a plugin result back to its responder.
///
/// Returns 0 when delivered, -1 otherwise.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_innoquant_moca_bridge_MOCABridge_nativeDeliver<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    call_id: jlong,
    status: jint,
    payload: JString<'local>,
) -> jint {
    let payload: Option<String> = if payload.is_null() {
        None
    } else {
        match env.get_string(&payload) {
            Ok(s) => Some(s.into()),
            Err(e) => {
                tracing::warn!(call_id, "unreadable delivery payload: {e}");
                return -1;
            }
        }
    };
    match ResponderRegistry::global().deliver(CallId(call_id as u64), status, payload.as_deref()) {
        Ok(()) => 0,
        Err(e) => {
            tracing::warn!(call_id, "delivery rejected: {e}");
            -1
        }
    }
}
