// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host boundary: the one trait every platform implements.

use moca_core::{ActionDescriptor, CallId};

use crate::responder::Responder;

/// A marshalled native invocation handed to the host.
#[derive(Debug)]
pub struct NativeCall {
    pub id: CallId,
    pub descriptor: ActionDescriptor,
    /// The native side may deliver more than once (persistent subscription).
    pub keep_callback: bool,
    pub responder: Responder,
}

/// Executes native plugin actions.
///
/// `exec` must not block waiting for the result: the outcome is delivered
/// later, on any thread, through `call.responder`. Implementations that fail
/// to even submit the call resolve the responder with a failure instead of
/// returning an error.
pub trait NativeDispatcher: Send + Sync {
    /// Human-readable platform name (e.g. "iOS", "Android").
    fn platform_name(&self) -> &str;

    fn exec(&self, call: NativeCall);

    /// Drop whatever the dispatcher keeps for call `id`. Dispatchers that
    /// hold nothing beyond the responder need not override this.
    fn release(&self, id: CallId) {
        let _ = id;
    }
}
