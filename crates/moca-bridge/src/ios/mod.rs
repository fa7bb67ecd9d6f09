// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS dispatcher via objc2.
//
// Calls are sent to the Objective-C class `MOCABridge`:
//
//     + (void)execWithCallId:(uint64_t)callId
//                     action:(NSString *)action
//                  arguments:(NSString *)argsJson
//               keepCallback:(BOOL)keepCallback;
//
// The class forwards to the MOCA plugin and reports each result through the
// C function `moca_bridge_deliver(callId, status, payloadJson)` exported from
// the registry module.

#![cfg(target_os = "ios")]

use objc2::msg_send;
use objc2::runtime::{AnyClass, Bool};
use objc2_foundation::NSString;

use moca_core::{CallId, MocaError, Result};

use crate::registry::ResponderRegistry;
use crate::responder::NativeOutcome;
use crate::traits::{NativeCall, NativeDispatcher};

fn bridge_class() -> Result<&'static AnyClass> {
    AnyClass::get(c"MOCABridge")
        .ok_or_else(|| MocaError::Bridge("Objective-C class MOCABridge is not linked".into()))
}

/// iOS implementation of the native dispatcher.
pub struct IosDispatcher {
    registry: &'static ResponderRegistry,
}

impl IosDispatcher {
    pub fn new() -> Self {
        Self {
            registry: ResponderRegistry::global(),
        }
    }

    fn submit(&self, call: &NativeCall) -> Result<()> {
        let class = bridge_class()?;
        let action = NSString::from_str(&call.descriptor.action);
        let arguments = NSString::from_str(&call.descriptor.args_json());

        // SAFETY: `MOCABridge` declares this class method with exactly these
        // argument types; the strings outlive the message send.
        unsafe {
            let _: () = msg_send![
                class,
                execWithCallId: call.id.0,
                action: &*action,
                arguments: &*arguments,
                keepCallback: Bool::new(call.keep_callback)
            ];
        }
        Ok(())
    }
}

impl Default for IosDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeDispatcher for IosDispatcher {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    fn exec(&self, call: NativeCall) {
        self.registry.park(call.responder.clone());
        if let Err(e) = self.submit(&call) {
            tracing::error!(action = %call.descriptor.action, call_id = %call.id, "dispatch failed: {e}");
            self.registry.forget(call.id);
            call.responder.resolve(NativeOutcome::Failure(e.to_string()));
        }
    }

    fn release(&self, id: CallId) {
        self.registry.forget(id);
    }
}
