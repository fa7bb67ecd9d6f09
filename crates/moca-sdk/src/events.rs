// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event subscription registry.
//
// One local bus keeps the listeners for every event kind and fans each
// occurrence out to them in registration order. How occurrences reach the bus
// is up to the transport: the native-callback transport opens one persistent
// plugin subscription per kind, the DOM transport waits for the host to push
// named events.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, warn};

use moca_bridge::{NativeBridge, NativeOutcome};
use moca_core::{BridgeConfig, CallId, ContentAction, EventDelivery, Event, EventKind, NativeArgs};

/// Application callback for one event kind.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by every registration; pass it to `EventBus::unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Moves native occurrences onto the bus.
pub trait EventTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called after every local registration of `kind`. `flag` is the
    /// suppression flag for content actions and `None` for other kinds.
    fn attach(&self, kind: EventKind, flag: Option<bool>, sink: EventSink);
}

/// Write end of the bus handed to transports. Holds the bus weakly, so a
/// dropped bus silently ends delivery.
#[derive(Clone)]
pub struct EventSink {
    bus: Weak<BusShared>,
}

impl EventSink {
    /// Fan `payload` out to the listeners of `kind`. Returns how many ran.
    pub fn deliver(&self, kind: EventKind, payload: Value) -> usize {
        match self.bus.upgrade() {
            Some(bus) => bus.deliver(kind, payload),
            None => {
                debug!(event = %kind, "delivery after bus dropped");
                0
            }
        }
    }
}

type Subscribers = BTreeMap<EventKind, Vec<(SubscriptionId, Listener)>>;

struct BusShared {
    listeners: Mutex<Subscribers>,
    next_id: AtomicU64,
    default_suppress: bool,
}

impl BusShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, kind: EventKind, payload: Value) -> usize {
        let event = Event::from_delivery(kind, payload);
        let listeners: Vec<Listener> = self
            .lock()
            .get(&kind)
            .map(|subs| subs.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        if listeners.is_empty() {
            debug!(event = %kind, "no listeners registered");
        }
        // Lock released: listeners may register, unsubscribe or call native.
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }
}

/// Registry of event listeners.
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<BusShared>,
    transport: Arc<dyn EventTransport>,
}

impl EventBus {
    pub fn new(transport: Arc<dyn EventTransport>, default_suppress: bool) -> Self {
        Self {
            shared: Arc::new(BusShared {
                listeners: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                default_suppress,
            }),
            transport,
        }
    }

    /// Bus fed by persistent native callbacks through `bridge`.
    pub fn native(bridge: NativeBridge, default_suppress: bool) -> Self {
        Self::new(Arc::new(NativeCallbackTransport::new(bridge)), default_suppress)
    }

    /// Bus fed by the host through [`EventBus::dispatch_dom`].
    pub fn dom(default_suppress: bool) -> Self {
        Self::new(Arc::new(DomEventTransport), default_suppress)
    }

    pub fn from_config(bridge: NativeBridge, config: &BridgeConfig) -> Self {
        match config.event_delivery {
            EventDelivery::NativeCallback => Self::native(bridge, config.suppress_default_ui),
            EventDelivery::Dom => Self::dom(config.suppress_default_ui),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Register `listener` for `kind`. Content actions use the bus's default
    /// suppression flag.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let flag = kind.content_action().map(|_| self.shared.default_suppress);
        self.register(kind, flag, Arc::new(listener))
    }

    /// Register for a content action. `suppress` asks the native SDK to skip
    /// its own UI for this action.
    pub fn on_content_action<F>(&self, action: ContentAction, suppress: bool, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(action.kind(), Some(suppress), Arc::new(listener))
    }

    /// Remove one listener. Native registrations stay open; with no local
    /// listener left, further occurrences are dropped.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.lock();
        for subs in listeners.values_mut() {
            if let Some(pos) = subs.iter().position(|(sid, _)| *sid == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver an occurrence directly to the listeners of `kind`.
    pub fn deliver(&self, kind: EventKind, payload: Value) -> usize {
        self.shared.deliver(kind, payload)
    }

    /// Host entry point for DOM-style events (`moca.enterbeacon`, …).
    /// Returns `false` for names outside the catalog.
    pub fn dispatch_dom(&self, name: &str, detail: Value) -> bool {
        match EventKind::from_dom_name(name) {
            Some(kind) => {
                self.shared.deliver(kind, detail);
                true
            }
            None => {
                warn!(event = name, "unknown DOM event ignored");
                false
            }
        }
    }

    fn register(&self, kind: EventKind, flag: Option<bool>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.lock().entry(kind).or_default().push((id, listener));
        debug!(event = %kind, ?flag, transport = self.transport.name(), "listener registered");
        self.transport.attach(
            kind,
            flag,
            EventSink {
                bus: Arc::downgrade(&self.shared),
            },
        );
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("transport", &self.transport.name())
            .field("default_suppress", &self.shared.default_suppress)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Registration stays local; the host calls `EventBus::dispatch_dom`.
pub struct DomEventTransport;

impl EventTransport for DomEventTransport {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn attach(&self, kind: EventKind, _flag: Option<bool>, _sink: EventSink) {
        debug!(event = kind.dom_name(), "awaiting host-dispatched events");
    }
}

struct ActiveSubscription {
    flag: Option<bool>,
    generation: u64,
    call_id: Option<CallId>,
}

/// One persistent plugin callback per event kind.
///
/// A kind is subscribed natively on its first registration and again only
/// when the suppression flag changes. Each native subscription carries a
/// generation; deliveries from a superseded one are dropped, so the bus does
/// not depend on the plugin replacing old callbacks.
pub struct NativeCallbackTransport {
    bridge: NativeBridge,
    active: Arc<Mutex<HashMap<EventKind, ActiveSubscription>>>,
    generations: AtomicU64,
}

impl NativeCallbackTransport {
    pub fn new(bridge: NativeBridge) -> Self {
        Self {
            bridge,
            active: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(1),
        }
    }

    /// Call id of the live native subscription for `kind`.
    pub fn active_call(&self, kind: EventKind) -> Option<CallId> {
        lock_active(&self.active).get(&kind).and_then(|a| a.call_id)
    }
}

fn lock_active(
    active: &Mutex<HashMap<EventKind, ActiveSubscription>>,
) -> std::sync::MutexGuard<'_, HashMap<EventKind, ActiveSubscription>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventTransport for NativeCallbackTransport {
    fn name(&self) -> &'static str {
        "native-callback"
    }

    fn attach(&self, kind: EventKind, flag: Option<bool>, sink: EventSink) {
        let (generation, superseded) = {
            let mut active = lock_active(&self.active);
            let superseded = match active.get(&kind) {
                Some(current) if current.flag == flag => return,
                Some(current) => current.call_id,
                None => None,
            };
            let generation = self.generations.fetch_add(1, Ordering::Relaxed);
            // Recorded before subscribing so an immediate delivery passes
            // the generation check.
            active.insert(
                kind,
                ActiveSubscription {
                    flag,
                    generation,
                    call_id: None,
                },
            );
            (generation, superseded)
        };

        let args = match flag {
            Some(suppress) => NativeArgs::from(suppress),
            None => NativeArgs::none(),
        };
        let active = Arc::clone(&self.active);
        let call_id = self.bridge.subscribe_outcomes(kind.native_name(), args, move |outcome| {
            let mut entries = lock_active(&active);
            let live = entries.get(&kind).is_some_and(|a| a.generation == generation);
            match outcome {
                NativeOutcome::Success(payload) if live => {
                    drop(entries);
                    sink.deliver(kind, payload);
                }
                NativeOutcome::Failure(_) if live => {
                    // Refused registrations are forgotten so the next
                    // listener for this kind subscribes again.
                    entries.remove(&kind);
                    debug!(event = %kind, generation, "native subscription refused");
                }
                _ => debug!(event = %kind, generation, "outcome from superseded subscription dropped"),
            }
        });

        if let Some(entry) = lock_active(&self.active).get_mut(&kind) {
            if entry.generation == generation {
                entry.call_id = Some(call_id);
            }
        }
        if let Some(old) = superseded {
            self.bridge.release(old);
        }
    }
}
