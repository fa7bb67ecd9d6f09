// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub dispatcher for desktop/CI builds where the native plugin is absent.
//
// Every call fails with `PlatformUnavailable` through the normal failure
// path, so callers see the same logging as on a device.

use moca_core::MocaError;

use crate::responder::NativeOutcome;
use crate::traits::{NativeCall, NativeDispatcher};

/// Dispatcher returned on non-mobile platforms.
pub struct StubDispatcher;

impl NativeDispatcher for StubDispatcher {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn exec(&self, call: NativeCall) {
        tracing::warn!(
            action = %call.descriptor.action,
            call_id = %call.id,
            "native call on stub dispatcher"
        );
        call.responder
            .resolve(NativeOutcome::Failure(MocaError::PlatformUnavailable.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NativeBridge;
    use std::sync::Arc;

    #[tokio::test]
    async fn every_call_fails_as_unavailable() {
        let bridge = NativeBridge::new(Arc::new(StubDispatcher));
        let err = bridge.request("version", ()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "native call failed: feature not available on this platform"
        );
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
    }
}
