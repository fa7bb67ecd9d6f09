// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MOCA native bridge: marshals plugin actions to the host platform and routes
// their results back as callbacks or futures.

pub mod bridge;
pub mod decode;
pub mod recording;
pub mod registry;
pub mod responder;
pub mod simulator;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;

use std::sync::Arc;

pub use bridge::{Callback, NativeBridge, PendingCall, TypedCall, log_failure};
pub use registry::ResponderRegistry;
pub use responder::{DeliveryStatus, NativeOutcome, Responder};
pub use traits::{NativeCall, NativeDispatcher};

/// The dispatcher for the target operating system.
///
/// Desktop and CI builds get a stub whose calls all fail with
/// `PlatformUnavailable`.
pub fn platform_dispatcher() -> Arc<dyn NativeDispatcher> {
    #[cfg(target_os = "ios")]
    {
        Arc::new(ios::IosDispatcher::new())
    }
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidDispatcher::new())
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Arc::new(stub::StubDispatcher)
    }
}
