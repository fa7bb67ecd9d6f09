// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The MOCA client: one value per application, built at startup and cloned
// wherever it is needed.
//
// Every method submits its native call immediately and returns a future for
// the typed result. Dropping the future without awaiting it turns the call
// into fire-and-forget; failures are logged either way.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use moca_bridge::{NativeBridge, NativeDispatcher, TypedCall, decode};
use moca_core::{BridgeConfig, ContentAction, Event, EventKind, FetchStatus, LogLevel, MocaError, PlaceSummary, Result};

use crate::actions;
use crate::events::{EventBus, SubscriptionId};
use crate::instance::InstanceProxy;
use crate::user::{self, UserLookup};

/// Handle to the native MOCA SDK.
#[derive(Debug, Clone)]
pub struct Moca {
    bridge: NativeBridge,
    events: EventBus,
    instance: InstanceProxy,
    config: Arc<BridgeConfig>,
}

macro_rules! event_listener {
    ($($(#[$doc:meta])* $name:ident => $kind:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&self, listener: F) -> SubscriptionId
            where
                F: Fn(&Event) + Send + Sync + 'static,
            {
                self.events.on(EventKind::$kind, listener)
            }
        )*
    };
}

macro_rules! content_listener {
    ($($name:ident => $action:ident;)*) => {
        $(
            pub fn $name<F>(&self, suppress: bool, listener: F) -> SubscriptionId
            where
                F: Fn(&Event) + Send + Sync + 'static,
            {
                self.events.on_content_action(ContentAction::$action, suppress, listener)
            }
        )*
    };
}

impl Moca {
    /// Build the client and request the instance snapshot.
    #[instrument(skip_all, fields(platform = dispatcher.platform_name(), plugin = %config.plugin_name))]
    pub fn connect(dispatcher: Arc<dyn NativeDispatcher>, config: BridgeConfig) -> Self {
        let bridge = NativeBridge::from_config(dispatcher, &config);
        let events = EventBus::from_config(bridge.clone(), &config);
        let instance = InstanceProxy::new(bridge.clone());
        instance.refresh();
        info!(transport = events.transport_name(), "MOCA client ready");
        Self {
            bridge,
            events,
            instance,
            config: Arc::new(config),
        }
    }

    /// Raw bridge, for actions without a typed wrapper.
    pub fn bridge(&self) -> &NativeBridge {
        &self.bridge
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn instance(&self) -> &InstanceProxy {
        &self.instance
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // -- SDK -------------------------------------------------------------------

    pub fn version(&self) -> TypedCall<String> {
        self.bridge.request(actions::VERSION, ()).map(decode::string)
    }

    pub fn app_key(&self) -> TypedCall<String> {
        self.bridge.request(actions::APP_KEY, ()).map(decode::string)
    }

    pub fn app_secret(&self) -> TypedCall<String> {
        self.bridge.request(actions::APP_SECRET, ()).map(decode::string)
    }

    pub fn initialized(&self) -> TypedCall<bool> {
        self.bridge.request(actions::INITIALIZED, ()).map(decode::boolean)
    }

    pub fn log_level(&self) -> TypedCall<LogLevel> {
        self.bridge.request(actions::LOG_LEVEL, ()).map(|action, value| {
            let code = decode::integer(action, value)?;
            LogLevel::try_from(code).map_err(|e| MocaError::unexpected(action, e.to_string()))
        })
    }

    /// Sent as the numeric level code.
    pub fn set_log_level(&self, level: LogLevel) -> TypedCall<()> {
        self.bridge.request(actions::SET_LOG_LEVEL, level).ignore()
    }

    pub fn proximity_enabled(&self) -> TypedCall<bool> {
        self.bridge.request(actions::PROXIMITY_ENABLED, ()).map(decode::boolean)
    }

    pub fn set_proximity_enabled(&self, enabled: bool) -> TypedCall<()> {
        self.bridge.request(actions::SET_PROXIMITY_ENABLED, enabled).ignore()
    }

    pub fn set_geo_tracking_enabled(&self, enabled: bool) -> TypedCall<()> {
        self.bridge.request(actions::SET_GEO_TRACKING_ENABLED, enabled).ignore()
    }

    /// Ask the SDK to fetch fresh data now. A `null` answer means nothing new.
    pub fn perform_fetch(&self) -> TypedCall<FetchStatus> {
        self.bridge.request(actions::PERFORM_FETCH, ()).map(|action, value| {
            if value.is_null() {
                return Ok(FetchStatus::NoData);
            }
            let code = decode::integer(action, value)?;
            FetchStatus::try_from(code).map_err(|e| MocaError::unexpected(action, e.to_string()))
        })
    }

    pub fn places_inside(&self) -> TypedCall<Vec<PlaceSummary>> {
        self.bridge.request(actions::PLACES_INSIDE, ()).map(decode::json_or_default)
    }

    /// Instance-level custom property through the top-level action.
    pub fn custom_property(&self, key: &str) -> TypedCall<Value> {
        let key_owned = key.to_string();
        self.bridge
            .request(actions::CUSTOM_PROPERTY, key)
            .map(move |_, value| Ok(decode::keyed(&key_owned, value)))
    }

    #[deprecated(note = "use `instance().set_custom_property`")]
    pub fn set_custom_property(&self, key: &str, value: impl Into<Value>) -> TypedCall<()> {
        warn!("MOCA: set_custom_property is deprecated, use instance().set_custom_property");
        self.instance.set_custom_property(key, value)
    }

    #[deprecated(note = "use `instance().custom_property`")]
    pub fn instance_custom_property(&self, key: &str) -> TypedCall<Value> {
        warn!("MOCA: instance_custom_property is deprecated, use instance().custom_property");
        self.instance.custom_property(key)
    }

    // -- User session ----------------------------------------------------------

    pub fn login(&self, user_id: &str) -> TypedCall<()> {
        self.instance.login(user_id)
    }

    pub fn logout(&self) -> TypedCall<()> {
        self.instance.logout()
    }

    pub fn user_logged_in(&self) -> TypedCall<bool> {
        self.instance.user_logged_in()
    }

    /// The logged-in user, or `NotLoggedIn` with its diagnostic.
    pub async fn current_user(&self) -> Result<UserLookup> {
        user::lookup(&self.bridge).await
    }

    /// Callback form of [`Moca::current_user`].
    pub fn current_user_with<F>(&self, callback: F)
    where
        F: FnOnce(UserLookup) + Send + 'static,
    {
        user::lookup_with(&self.bridge, callback);
    }

    // -- Events ----------------------------------------------------------------

    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn on_content_action<F>(&self, action: ContentAction, suppress: bool, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on_content_action(action, suppress, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    event_listener! {
        add_enter_beacon_listener => EnterBeacon;
        add_exit_beacon_listener => ExitBeacon;
        add_beacon_proximity_change_listener => BeaconProximityChange;
        add_enter_place_listener => EnterPlace;
        add_exit_place_listener => ExitPlace;
        add_enter_zone_listener => EnterZone;
        add_exit_zone_listener => ExitZone;
        /// Fires once beacon and place data has been loaded.
        add_data_ready_listener => DataReady;
        add_custom_action_listener => CustomAction;
    }

    content_listener! {
        add_display_alert_listener => DisplayAlert;
        add_open_url_listener => OpenUrl;
        add_show_embedded_html_listener => ShowEmbeddedHtml;
        add_play_video_listener => PlayVideo;
        add_show_image_listener => ShowImage;
        add_add_passbook_listener => AddPassbook;
        add_add_tag_listener => AddTag;
        add_play_sound_listener => PlaySound;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use moca_bridge::NativeOutcome;
    use moca_bridge::recording::RecordingDispatcher;
    use moca_bridge::simulator::{SIMULATED_SDK_VERSION, SimulatedSdk};
    use moca_core::EventDelivery;
    use serde_json::json;

    fn config() -> BridgeConfig {
        BridgeConfig {
            app_key: Some("KEY".into()),
            app_secret: Some("SECRET".into()),
            ..Default::default()
        }
    }

    fn recorded() -> (Arc<RecordingDispatcher>, Moca) {
        let recorder = Arc::new(RecordingDispatcher::new());
        (recorder.clone(), Moca::connect(recorder, config()))
    }

    fn simulated() -> (Arc<SimulatedSdk>, Moca) {
        let sdk = Arc::new(SimulatedSdk::started(&config()).unwrap());
        (sdk.clone(), Moca::connect(sdk, config()))
    }

    #[test]
    fn connect_requests_the_instance_once() {
        let (recorder, moca) = recorded();
        assert_eq!(recorder.actions(), vec!["current_instance"]);
        assert!(recorder.last().unwrap().descriptor.args.is_empty());
        assert!(!moca.instance().is_loaded());
    }

    #[test]
    fn connect_fills_instance_from_the_simulator() {
        let (sdk, moca) = simulated();
        assert_eq!(moca.instance().id(), Some(sdk.instance_id()));
    }

    #[test]
    fn argument_lists_follow_the_call_shape() {
        let (recorder, moca) = recorded();
        let _ = moca.version();
        let _ = moca.login("alice");
        let _ = moca.instance().add_tag("buyer", Some("+2"));
        let calls = recorder.descriptors();
        assert!(calls[1].args.is_empty());
        assert_eq!(calls[2].args.as_slice(), &[json!("alice")]);
        assert_eq!(calls[3].args.as_slice(), &[json!("buyer"), json!("+2")]);
    }

    #[test]
    fn bare_add_tag_is_forwarded_without_arguments() {
        let (recorder, moca) = recorded();
        let _ = moca.bridge().request(actions::INSTANCE_ADD_TAG, ());
        let call = recorder.last().unwrap();
        assert_eq!(call.descriptor.action, "instance_add_tag");
        assert!(call.descriptor.args.is_empty());
    }

    #[test]
    fn display_alert_registration_forwards_only_the_flag() {
        let (recorder, moca) = recorded();
        moca.add_display_alert_listener(true, |_| {});
        let call = recorder.last().unwrap();
        assert_eq!(call.descriptor.action, "displayAlert");
        assert_eq!(call.descriptor.args.as_slice(), &[json!(true)]);
        assert!(call.keep_callback);
    }

    #[test]
    fn plain_listeners_register_without_arguments() {
        let (recorder, moca) = recorded();
        moca.add_enter_beacon_listener(|_| {});
        let call = recorder.last().unwrap();
        assert_eq!(call.descriptor.action, "enterBeacon");
        assert!(call.descriptor.args.is_empty());
    }

    #[tokio::test]
    async fn two_version_calls_resolve_independently() {
        let (recorder, moca) = recorded();
        let first = moca.version();
        let second = moca.version();
        assert_ne!(first.call_id(), second.call_id());

        assert!(recorder.respond(second.call_id(), NativeOutcome::Success(json!("2.0"))));
        assert!(recorder.respond(first.call_id(), NativeOutcome::Success(json!("1.0"))));
        assert!(!recorder.respond(first.call_id(), NativeOutcome::Success(json!("late"))));

        assert_eq!(first.await.unwrap(), "1.0");
        assert_eq!(second.await.unwrap(), "2.0");
    }

    #[tokio::test]
    async fn typed_getters_against_the_simulator() {
        let (_, moca) = simulated();
        assert_eq!(moca.version().await.unwrap(), SIMULATED_SDK_VERSION);
        assert_eq!(moca.app_key().await.unwrap(), "KEY");
        assert!(moca.initialized().await.unwrap());
        assert!(moca.proximity_enabled().await.unwrap());

        moca.set_log_level(LogLevel::Warning).await.unwrap();
        assert_eq!(moca.log_level().await.unwrap(), LogLevel::Warning);
        assert_eq!(moca.perform_fetch().await.unwrap(), FetchStatus::NewData);
        assert!(moca.places_inside().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_fetch_result_means_no_data() {
        let recorder = Arc::new(RecordingDispatcher::with_auto_reply(|d| {
            (d.action == "performFetch").then_some(NativeOutcome::Success(Value::Null))
        }));
        let moca = Moca::connect(recorder, config());
        assert_eq!(moca.perform_fetch().await.unwrap(), FetchStatus::NoData);
    }

    #[tokio::test]
    async fn native_failure_surfaces_as_error() {
        let (_, moca) = simulated();
        let err = moca.bridge().request("bogus", ()).await.unwrap_err();
        assert!(matches!(err, MocaError::Native(ref m) if m == "Invalid action: bogus"));
        // The bridge keeps working after a failure.
        assert!(moca.initialized().await.unwrap());
    }

    #[tokio::test]
    async fn current_user_follows_login_state() {
        let (_, moca) = simulated();
        let (user, reason) = moca.current_user().await.unwrap().into_parts();
        assert!(user.is_none());
        assert_eq!(reason, Some("No user is logged in"));

        moca.login("alice").await.unwrap();
        assert!(moca.user_logged_in().await.unwrap());
        let (user, reason) = moca.current_user().await.unwrap().into_parts();
        let user = user.unwrap();
        assert_eq!(user.id(), "alice");
        assert_eq!(reason, None);

        user.set_custom_property("plan", "gold").await.unwrap();
        assert_eq!(user.custom_property("plan").await.unwrap(), json!("gold"));
        user.save().await.unwrap();

        moca.logout().await.unwrap();
        assert!(!moca.current_user().await.unwrap().is_logged_in());
    }

    #[tokio::test]
    async fn instance_tags_against_the_simulator() {
        let (_, moca) = simulated();
        let instance = moca.instance();
        instance.add_tag_default("buyer").await.unwrap();
        instance.add_tag("buyer", Some("+4")).await.unwrap();
        assert_eq!(instance.tag_value("buyer").await.unwrap(), 5);
        assert!(instance.contains_tag("buyer").await.unwrap());

        let err = instance.add_tag("buyer", Some("five")).await.unwrap_err();
        assert!(matches!(err, MocaError::Native(_)));

        instance.remove_tag("buyer").await.unwrap();
        assert!(instance.all_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn deprecated_property_aliases_hit_instance_actions() {
        let (_, moca) = simulated();
        moca.set_custom_property("color", "red").await.unwrap();
        assert_eq!(moca.instance_custom_property("color").await.unwrap(), json!("red"));
        assert_eq!(moca.custom_property("color").await.unwrap(), json!("red"));
    }

    #[test]
    fn enter_zone_fans_out_to_both_listeners() {
        let (sdk, moca) = simulated();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            moca.add_enter_zone_listener(move |event| seen.lock().unwrap().push((tag, event.detail.clone())));
        }
        let zone = json!({ "id": "z1", "name": "Lobby" });
        sdk.fire_event(EventKind::EnterZone, zone.clone());

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![("first", zone.clone()), ("second", zone)]);
    }

    #[test]
    fn content_flag_reaches_the_simulator() {
        let (sdk, moca) = simulated();
        moca.add_open_url_listener(true, |_| {});
        moca.add_play_sound_listener(false, |_| {});
        assert!(sdk.fire_event(EventKind::OpenUrl, json!("https://example.org")));
        assert!(!sdk.fire_event(EventKind::PlaySound, json!("ding.wav")));
    }

    #[test]
    fn dom_delivery_skips_native_registration() {
        let recorder = Arc::new(RecordingDispatcher::new());
        let moca = Moca::connect(
            recorder.clone(),
            BridgeConfig {
                event_delivery: EventDelivery::Dom,
                ..config()
            },
        );
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        moca.add_exit_place_listener(move |_| *counter.lock().unwrap() += 1);
        assert_eq!(recorder.actions(), vec!["current_instance"]);
        assert!(moca.events().dispatch_dom("moca.exitplace", json!({ "id": "p" })));
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let (sdk, moca) = simulated();
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        let id = moca.add_custom_action_listener(move |_| *counter.lock().unwrap() += 1);
        sdk.fire_event(EventKind::CustomAction, json!("promo"));
        assert!(moca.unsubscribe(id));
        sdk.fire_event(EventKind::CustomAction, json!("promo"));
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
