// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Catalog of native-originated events and the payload records they carry.
//
// Every event has two names: the callback action used when registering a
// persistent native callback (`enterZone`) and the DOM-style name used by
// hosts that dispatch document events (`moca.enterzone`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MocaError, Result};
use crate::types::Proximity;

/// Prefix shared by all DOM-style event names.
pub const DOM_EVENT_PREFIX: &str = "moca.";

/// Every occurrence the native SDK can push to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    EnterBeacon,
    ExitBeacon,
    BeaconProximityChange,
    EnterPlace,
    ExitPlace,
    EnterZone,
    ExitZone,
    DataReady,
    CustomAction,
    DisplayAlert,
    OpenUrl,
    ShowEmbeddedHtml,
    PlayVideo,
    ShowImage,
    AddPassbook,
    AddTag,
    PlaySound,
}

impl EventKind {
    pub const ALL: [EventKind; 17] = [
        Self::EnterBeacon,
        Self::ExitBeacon,
        Self::BeaconProximityChange,
        Self::EnterPlace,
        Self::ExitPlace,
        Self::EnterZone,
        Self::ExitZone,
        Self::DataReady,
        Self::CustomAction,
        Self::DisplayAlert,
        Self::OpenUrl,
        Self::ShowEmbeddedHtml,
        Self::PlayVideo,
        Self::ShowImage,
        Self::AddPassbook,
        Self::AddTag,
        Self::PlaySound,
    ];

    /// Callback action name understood by the native plugin.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::EnterBeacon => "enterBeacon",
            Self::ExitBeacon => "exitBeacon",
            Self::BeaconProximityChange => "beaconProximityChange",
            Self::EnterPlace => "enterPlace",
            Self::ExitPlace => "exitPlace",
            Self::EnterZone => "enterZone",
            Self::ExitZone => "exitZone",
            Self::DataReady => "didLoadedBeaconsData",
            Self::CustomAction => "customAction",
            Self::DisplayAlert => "displayAlert",
            Self::OpenUrl => "openUrl",
            Self::ShowEmbeddedHtml => "showEmbeddedHtml",
            Self::PlayVideo => "playVideo",
            Self::ShowImage => "showImage",
            Self::AddPassbook => "addPassbook",
            Self::AddTag => "addTag",
            Self::PlaySound => "playSound",
        }
    }

    /// DOM-style event name (`moca.<lowercase>`).
    pub fn dom_name(self) -> &'static str {
        match self {
            Self::EnterBeacon => "moca.enterbeacon",
            Self::ExitBeacon => "moca.exitbeacon",
            Self::BeaconProximityChange => "moca.beaconproximitychange",
            Self::EnterPlace => "moca.enterplace",
            Self::ExitPlace => "moca.exitplace",
            Self::EnterZone => "moca.enterzone",
            Self::ExitZone => "moca.exitzone",
            Self::DataReady => "moca.dataready",
            Self::CustomAction => "moca.customaction",
            Self::DisplayAlert => "moca.displayalert",
            Self::OpenUrl => "moca.openurl",
            Self::ShowEmbeddedHtml => "moca.showembeddedhtml",
            Self::PlayVideo => "moca.playvideo",
            Self::ShowImage => "moca.showimage",
            Self::AddPassbook => "moca.addpassbook",
            Self::AddTag => "moca.addtag",
            Self::PlaySound => "moca.playsound",
        }
    }

    pub fn from_native_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.native_name() == name)
    }

    pub fn from_dom_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.dom_name() == name)
    }

    /// Content actions let the application take over the SDK's default UI.
    pub fn content_action(self) -> Option<ContentAction> {
        ContentAction::ALL.into_iter().find(|a| a.kind() == self)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.native_name())
    }
}

/// The "content action" family. Registration for these carries a flag that
/// tells the native layer whether to skip its own default UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentAction {
    DisplayAlert,
    OpenUrl,
    ShowEmbeddedHtml,
    PlayVideo,
    ShowImage,
    AddPassbook,
    AddTag,
    PlaySound,
}

impl ContentAction {
    pub const ALL: [ContentAction; 8] = [
        Self::DisplayAlert,
        Self::OpenUrl,
        Self::ShowEmbeddedHtml,
        Self::PlayVideo,
        Self::ShowImage,
        Self::AddPassbook,
        Self::AddTag,
        Self::PlaySound,
    ];

    pub fn kind(self) -> EventKind {
        match self {
            Self::DisplayAlert => EventKind::DisplayAlert,
            Self::OpenUrl => EventKind::OpenUrl,
            Self::ShowEmbeddedHtml => EventKind::ShowEmbeddedHtml,
            Self::PlayVideo => EventKind::PlayVideo,
            Self::ShowImage => EventKind::ShowImage,
            Self::AddPassbook => EventKind::AddPassbook,
            Self::AddTag => EventKind::AddTag,
            Self::PlaySound => EventKind::PlaySound,
        }
    }
}

/// One delivered occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub detail: Value,
}

impl Event {
    /// Build an event, unwrapping the `{ "detail": … }` envelope native
    /// callbacks deliver.
    pub fn from_delivery(kind: EventKind, payload: Value) -> Self {
        let detail = match payload {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("detail") => {
                map.remove("detail").unwrap_or(Value::Null)
            }
            other => other,
        };
        Self { kind, detail }
    }

    /// Decode the detail into one of the payload records.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.detail.clone()).map_err(|e| {
            MocaError::unexpected(self.kind.native_name(), format!("event payload: {e}"))
        })
    }

    /// Content string of a content action, stored under the action's own name.
    pub fn content(&self) -> Option<&str> {
        self.detail.get(self.kind.native_name())?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Payload records
// ---------------------------------------------------------------------------

/// Enter/exit beacon payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconEvent {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub proximity: Option<Proximity>,
}

/// Beacon proximity transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityChangeEvent {
    #[serde(default)]
    pub identifier: Option<String>,
    /// Some SDK builds nest the full beacon instead of a bare identifier.
    #[serde(default)]
    pub beacon: Option<BeaconEvent>,
    pub prev_proximity: Proximity,
    pub cur_proximity: Proximity,
}

impl ProximityChangeEvent {
    pub fn beacon_id(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .or_else(|| self.beacon.as_ref().map(|b| b.identifier.as_str()))
    }
}

/// Enter/exit place payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceEvent {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Enter/exit zone payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEvent {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub floor_number: Option<i64>,
    #[serde(default)]
    pub short_id: Option<String>,
}

/// One entry of the beacon registry delivered with data-ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconDescriptor {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Beacon registry loaded or refreshed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataReadyEvent {
    pub beacons: Vec<BeaconDescriptor>,
}

impl DataReadyEvent {
    /// Accepts `{ "beacons": [...] }`, `{ "didLoadedBeaconsData": [...] }`
    /// or a bare array.
    pub fn from_event(event: &Event) -> Result<Self> {
        let list = match &event.detail {
            Value::Array(_) => event.detail.clone(),
            Value::Object(map) => map
                .get("beacons")
                .or_else(|| map.get(EventKind::DataReady.native_name()))
                .cloned()
                .unwrap_or(Value::Array(Vec::new())),
            Value::Null => Value::Array(Vec::new()),
            other => {
                return Err(MocaError::unexpected(
                    EventKind::DataReady.native_name(),
                    format!("expected beacon list, got {other}"),
                ));
            }
        };
        let beacons = serde_json::from_value(list).map_err(|e| {
            MocaError::unexpected(EventKind::DataReady.native_name(), e.to_string())
        })?;
        Ok(Self { beacons })
    }
}

/// Payload of the `addTag` content action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAction {
    pub tag_name: String,
    #[serde(default)]
    pub tag_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip_through_the_catalog() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_native_name(kind.native_name()), Some(kind));
            assert_eq!(EventKind::from_dom_name(kind.dom_name()), Some(kind));
            assert!(kind.dom_name().starts_with(DOM_EVENT_PREFIX));
        }
        assert_eq!(EventKind::from_native_name("nope"), None);
    }

    #[test]
    fn content_actions_are_the_eight_ui_events() {
        let content: Vec<_> = EventKind::ALL
            .into_iter()
            .filter(|k| k.content_action().is_some())
            .collect();
        assert_eq!(content.len(), 8);
        assert!(EventKind::CustomAction.content_action().is_none());
        assert!(EventKind::EnterZone.content_action().is_none());
    }

    #[test]
    fn detail_envelope_is_unwrapped() {
        let event = Event::from_delivery(
            EventKind::DisplayAlert,
            json!({ "detail": { "displayAlert": "Welcome!" } }),
        );
        assert_eq!(event.content(), Some("Welcome!"));
    }

    #[test]
    fn zone_payload_decodes_optional_fields() {
        let event = Event::from_delivery(
            EventKind::EnterZone,
            json!({ "id": "z1", "name": "Lobby", "placeId": "p9", "floorNumber": 2 }),
        );
        let zone: ZoneEvent = event.decode().unwrap();
        assert_eq!(zone.identifier, "z1");
        assert_eq!(zone.place_id.as_deref(), Some("p9"));
        assert_eq!(zone.floor_number, Some(2));
        assert_eq!(zone.short_id, None);
    }

    #[test]
    fn proximity_change_reads_nested_beacon() {
        let event = Event::from_delivery(
            EventKind::BeaconProximityChange,
            json!({ "beacon": { "id": "b1" }, "prevProximity": "Far", "curProximity": 1 }),
        );
        let change: ProximityChangeEvent = event.decode().unwrap();
        assert_eq!(change.beacon_id(), Some("b1"));
        assert_eq!(change.prev_proximity, Proximity::Far);
        assert_eq!(change.cur_proximity, Proximity::Immediate);
    }

    #[test]
    fn data_ready_accepts_each_list_shape() {
        let beacons = json!([{ "identifier": "b1", "name": "Door", "code": "D" }]);
        for detail in [
            beacons.clone(),
            json!({ "beacons": beacons.clone() }),
            json!({ "didLoadedBeaconsData": beacons.clone() }),
        ] {
            let event = Event::from_delivery(EventKind::DataReady, detail);
            let ready = DataReadyEvent::from_event(&event).unwrap();
            assert_eq!(ready.beacons.len(), 1);
            assert_eq!(ready.beacons[0].code.as_deref(), Some("D"));
        }
    }

    #[test]
    fn bad_payload_names_the_event() {
        let event = Event::from_delivery(EventKind::EnterPlace, json!({ "name": 3 }));
        let err = event.decode::<PlaceEvent>().unwrap_err();
        assert!(err.to_string().contains("enterPlace"));
    }
}
