// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatcher that records every call and lets the caller answer by hand.
// Used by tests across the workspace.

use std::sync::{Mutex, PoisonError};

use moca_core::{ActionDescriptor, CallId};

use crate::responder::{NativeOutcome, Responder};
use crate::traits::{NativeCall, NativeDispatcher};

type AutoReply = Box<dyn Fn(&ActionDescriptor) -> Option<NativeOutcome> + Send + Sync>;

/// One captured call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub id: CallId,
    pub descriptor: ActionDescriptor,
    pub keep_callback: bool,
    pub responder: Responder,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<RecordedCall>>,
    released: Mutex<Vec<CallId>>,
    auto_reply: Option<AutoReply>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching calls immediately, still recording them.
    pub fn with_auto_reply<F>(reply: F) -> Self
    where
        F: Fn(&ActionDescriptor) -> Option<NativeOutcome> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            auto_reply: Some(Box::new(reply)),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub fn descriptors(&self) -> Vec<ActionDescriptor> {
        self.lock().iter().map(|c| c.descriptor.clone()).collect()
    }

    pub fn actions(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.descriptor.action.clone()).collect()
    }

    pub fn last(&self) -> Option<RecordedCall> {
        self.lock().last().cloned()
    }

    /// Most recent call for `action`.
    pub fn find(&self, action: &str) -> Option<RecordedCall> {
        self.lock().iter().rev().find(|c| c.descriptor.action == action).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Resolve the responder of call `id`. Returns whether it accepted the
    /// outcome.
    pub fn respond(&self, id: CallId, outcome: NativeOutcome) -> bool {
        let responder = self
            .lock()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.responder.clone());
        responder.is_some_and(|r| r.resolve(outcome))
    }

    /// Ids the bridge has released, oldest first.
    pub fn released(&self) -> Vec<CallId> {
        self.released.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drop every recorded call and its responder.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeDispatcher for RecordingDispatcher {
    fn platform_name(&self) -> &str {
        "Recording"
    }

    fn exec(&self, call: NativeCall) {
        let reply = self.auto_reply.as_ref().and_then(|f| f(&call.descriptor));
        let responder = call.responder.clone();
        self.lock().push(RecordedCall {
            id: call.id,
            descriptor: call.descriptor,
            keep_callback: call.keep_callback,
            responder: call.responder,
        });
        if let Some(outcome) = reply {
            responder.resolve(outcome);
        }
    }

    fn release(&self, id: CallId) {
        self.released.lock().unwrap_or_else(PoisonError::into_inner).push(id);
    }
}
