// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local view of the device installation ("instance") and the calls that act
// on it.
//
// The cached `Instance` is filled once from `current_instance`. Tag and
// property calls go straight to the plugin and never update the cache.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use moca_bridge::{NativeBridge, TypedCall, decode};
use moca_core::{CallId, MocaError, Result};

use crate::actions;

/// Reserved snapshot key holding the instance identifier.
pub const INSTANCE_ID_KEY: &str = "instance_id";

/// Snapshot of the installation as reported by the plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Instance {
    pub id: Option<String>,
    pub device_token: Option<String>,
    pub session: Option<u64>,
    pub birth_day: Option<DateTime<Utc>>,
    pub push_enabled: Option<bool>,
    /// Snapshot keys with no dedicated field.
    pub extra: Map<String, Value>,
}

impl Instance {
    /// Build from a `current_instance` reply. Unknown keys land in `extra`.
    pub fn from_snapshot(snapshot: &Map<String, Value>) -> Self {
        let mut instance = Self::default();
        for (key, value) in snapshot {
            match key.as_str() {
                INSTANCE_ID_KEY | "id" | "identifier" => instance.id = text(value),
                "deviceToken" => instance.device_token = text(value),
                "session" => instance.session = value.as_u64(),
                "birthDay" => instance.birth_day = value.as_i64().and_then(DateTime::from_timestamp_millis),
                "pushEnabled" => instance.push_enabled = decode::boolean(key, value.clone()).ok(),
                _ => {
                    instance.extra.insert(key.clone(), value.clone());
                }
            }
        }
        instance
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Handle for instance-scoped calls plus the cached snapshot.
#[derive(Debug, Clone)]
pub struct InstanceProxy {
    bridge: NativeBridge,
    cached: Arc<RwLock<Option<Instance>>>,
}

impl InstanceProxy {
    pub fn new(bridge: NativeBridge) -> Self {
        Self {
            bridge,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch `current_instance` in the background and fill the cache.
    pub fn refresh(&self) -> CallId {
        let cached = Arc::clone(&self.cached);
        self.bridge.call_native(
            Some(Box::new(move |value| match store(&cached, value) {
                Ok(instance) => debug!(instance = ?instance.id, "instance snapshot loaded"),
                Err(e) => error!("instance unavailable: {e}"),
            })),
            actions::CURRENT_INSTANCE,
            (),
        )
    }

    /// Fetch `current_instance`, fill the cache and return the snapshot.
    pub async fn load(&self) -> Result<Instance> {
        let value = self.bridge.request(actions::CURRENT_INSTANCE, ()).await?;
        store(&self.cached, value)
    }

    /// Cached snapshot, if one has arrived.
    pub fn snapshot(&self) -> Option<Instance> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn id(&self) -> Option<String> {
        self.snapshot().and_then(|i| i.id)
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn identifier(&self) -> TypedCall<String> {
        self.bridge.request(actions::INSTANCE_IDENTIFIER, ()).map(decode::string)
    }

    pub fn session(&self) -> TypedCall<i64> {
        self.bridge.request(actions::INSTANCE_SESSION, ()).map(decode::integer)
    }

    pub fn device_token(&self) -> TypedCall<Option<String>> {
        self.bridge
            .request(actions::INSTANCE_DEVICE_TOKEN, ())
            .map(|action, value| match value {
                Value::Null => Ok(None),
                other => decode::string(action, other).map(Some),
            })
    }

    pub fn birth_day(&self) -> TypedCall<Option<DateTime<Utc>>> {
        self.bridge
            .request(actions::INSTANCE_BIRTH_DAY, ())
            .map(|action, value| match value {
                Value::Null => Ok(None),
                other => decode::integer(action, other).map(DateTime::from_timestamp_millis),
            })
    }

    pub fn push_enabled(&self) -> TypedCall<bool> {
        self.bridge.request(actions::INSTANCE_PUSH_ENABLED, ()).map(decode::boolean)
    }

    /// Add or change a tag. `value` uses the `+n` / `-n` / `=n` notation and
    /// is forwarded as `null` when absent, which the plugin reads as `+1`.
    ///
    /// The argument-less form has no typed wrapper. Send it with
    /// `Moca::bridge().request(actions::INSTANCE_ADD_TAG, ())`; it is passed
    /// through unchecked and the plugin decides what to do with it.
    pub fn add_tag(&self, name: &str, value: Option<&str>) -> TypedCall<()> {
        self.bridge.request(actions::INSTANCE_ADD_TAG, (name, value)).ignore()
    }

    /// `add_tag` with the default increment.
    pub fn add_tag_default(&self, name: &str) -> TypedCall<()> {
        self.add_tag(name, None)
    }

    pub fn remove_tag(&self, name: &str) -> TypedCall<()> {
        self.bridge.request(actions::INSTANCE_REMOVE_TAG, name).ignore()
    }

    pub fn contains_tag(&self, name: &str) -> TypedCall<bool> {
        self.bridge.request(actions::INSTANCE_CONTAINS_TAG, name).map(decode::boolean)
    }

    pub fn tag_value(&self, name: &str) -> TypedCall<i64> {
        self.bridge.request(actions::INSTANCE_GET_VALUE_FOR_TAG, name).map(decode::integer)
    }

    pub fn all_tags(&self) -> TypedCall<BTreeMap<String, f64>> {
        self.bridge
            .request(actions::INSTANCE_GET_ALL_TAGS, ())
            .map(decode::json_or_default)
    }

    pub fn set_custom_property(&self, key: &str, value: impl Into<Value>) -> TypedCall<()> {
        self.bridge
            .request(actions::INSTANCE_SET_CUSTOM_PROPERTY, (key, value.into()))
            .ignore()
    }

    /// Value of a custom property; `null` when unset.
    pub fn custom_property(&self, key: &str) -> TypedCall<Value> {
        let key_owned = key.to_string();
        self.bridge
            .request(actions::INSTANCE_CUSTOM_PROPERTY, key)
            .map(move |_, value| Ok(decode::keyed(&key_owned, value)))
    }

    pub fn login(&self, user_id: &str) -> TypedCall<()> {
        self.bridge.request(actions::INSTANCE_USER_LOGIN, user_id).ignore()
    }

    pub fn logout(&self) -> TypedCall<()> {
        self.bridge.request(actions::INSTANCE_USER_LOGOUT, ()).ignore()
    }

    pub fn user_logged_in(&self) -> TypedCall<bool> {
        self.bridge.request(actions::INSTANCE_USER_LOGGED_IN, ()).map(decode::boolean)
    }
}

fn store(cached: &RwLock<Option<Instance>>, value: Value) -> Result<Instance> {
    let Value::Object(map) = value else {
        return Err(MocaError::unexpected(
            actions::CURRENT_INSTANCE,
            format!("expected an object, got {value}"),
        ));
    };
    let instance = Instance::from_snapshot(&map);
    *cached.write().unwrap_or_else(PoisonError::into_inner) = Some(instance.clone());
    Ok(instance)
}
