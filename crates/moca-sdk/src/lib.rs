// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed MOCA client: the API surface, event subscriptions, and the instance
// and user proxies.

pub mod actions;
pub mod client;
pub mod events;
pub mod instance;
pub mod user;

pub use client::Moca;
pub use events::{DomEventTransport, EventBus, EventSink, EventTransport, Listener, NativeCallbackTransport, SubscriptionId};
pub use instance::{Instance, InstanceProxy};
pub use user::{User, UserLookup, UserProxy};
