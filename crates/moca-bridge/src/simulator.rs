// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process stand-in for the native MOCA plugin.
//
// Answers every plugin action the way the device plugin does (argument checks,
// error strings, `{key: value}` property replies, 0/1 booleans) and keeps one
// persistent responder per callback action so tests and the demo can fire
// events. No proximity logic is emulated.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use moca_core::{BridgeConfig, EventKind, FetchStatus, LogLevel, NativeArgs, PlaceSummary, Result};

use crate::responder::{NativeOutcome, Responder};
use crate::traits::{NativeCall, NativeDispatcher};

/// SDK version reported by the simulator.
pub const SIMULATED_SDK_VERSION: &str = "2.0.0-sim";

const NOT_INITIALIZED: &str = "MOCA not initialized";

/// Registered persistent callback for one event action.
struct Registration {
    responder: Responder,
    /// First registration argument, read as a boolean.
    flag: bool,
}

struct SimUser {
    id: String,
    properties: Map<String, Value>,
}

struct SdkState {
    initialized: bool,
    app_key: String,
    app_secret: String,
    log_level: LogLevel,
    proximity_enabled: bool,
    geo_tracking_enabled: bool,
    instance_id: String,
    device_token: Option<String>,
    session: u64,
    birth_day: DateTime<Utc>,
    push_enabled: bool,
    tags: BTreeMap<String, i64>,
    properties: Map<String, Value>,
    user: Option<SimUser>,
    places_inside: Vec<PlaceSummary>,
    callbacks: HashMap<String, Registration>,
}

impl SdkState {
    fn new() -> Self {
        Self {
            initialized: false,
            app_key: String::new(),
            app_secret: String::new(),
            log_level: LogLevel::Info,
            proximity_enabled: false,
            geo_tracking_enabled: false,
            instance_id: Uuid::new_v4().to_string(),
            device_token: None,
            session: 0,
            birth_day: Utc::now(),
            push_enabled: false,
            tags: BTreeMap::new(),
            properties: Map::new(),
            user: None,
            places_inside: Vec::new(),
            callbacks: HashMap::new(),
        }
    }
}

/// Simulated native plugin.
pub struct SimulatedSdk {
    state: Mutex<SdkState>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

type Reply = std::result::Result<Value, String>;

impl SimulatedSdk {
    /// A plugin whose SDK has not been started yet.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SdkState::new()),
        }
    }

    /// Start the simulated SDK, rejecting configs the device plugin would.
    pub fn initialize(&self, config: &BridgeConfig) -> Result<()> {
        config.validate()?;
        let mut state = self.lock();
        state.initialized = true;
        state.app_key = config.app_key.clone().unwrap_or_default();
        state.app_secret = config.app_secret.clone().unwrap_or_default();
        state.log_level = config.log_level;
        state.proximity_enabled = config.proximity_enabled;
        state.push_enabled = config.gcm_sender.as_deref().is_some_and(|s| !s.trim().is_empty());
        state.session += 1;
        info!(instance = %state.instance_id, "simulated MOCA SDK initialized");
        Ok(())
    }

    /// Convenience: a started simulator for `config`.
    pub fn started(config: &BridgeConfig) -> Result<Self> {
        let sdk = Self::new();
        sdk.initialize(config)?;
        Ok(sdk)
    }

    pub fn instance_id(&self) -> String {
        self.lock().instance_id.clone()
    }

    pub fn set_device_token(&self, token: impl Into<String>) {
        self.lock().device_token = Some(token.into());
    }

    pub fn set_places_inside(&self, places: Vec<PlaceSummary>) {
        self.lock().places_inside = places;
    }

    pub fn log_level(&self) -> LogLevel {
        self.lock().log_level
    }

    pub fn geo_tracking_enabled(&self) -> bool {
        self.lock().geo_tracking_enabled
    }

    /// Callback actions with a live registration.
    pub fn registered_callbacks(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().callbacks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Push an event to its registered callback.
    ///
    /// Strings and arrays are keyed by the event's native name, objects pass
    /// through, and the result is wrapped as `{ "detail": … }`. Returns the
    /// registration's flag, or `false` if nobody is listening.
    pub fn fire_event(&self, kind: EventKind, data: Value) -> bool {
        let name = kind.native_name();
        let registration = self
            .lock()
            .callbacks
            .get(name)
            .map(|r| (r.responder.clone(), r.flag));
        let Some((responder, flag)) = registration else {
            warn!(event = name, "No listeners for {name}");
            return false;
        };
        let detail = match data {
            data @ (Value::String(_) | Value::Array(_)) => json!({ name: data }),
            other => other,
        };
        debug!(event = name, "firing simulated event");
        responder.resolve(NativeOutcome::Success(json!({ "detail": detail })));
        flag
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SdkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_callback(&self, call: NativeCall) {
        let action = call.descriptor.action.clone();
        let flag = call.descriptor.args.as_slice().first().is_some_and(truthy);
        {
            let mut state = self.lock();
            if !state.initialized {
                drop(state);
                call.responder.resolve(NativeOutcome::Failure(NOT_INITIALIZED.into()));
                return;
            }
            if state
                .callbacks
                .insert(action.clone(), Registration { responder: call.responder.clone(), flag })
                .is_some()
            {
                debug!(action = %action, "callback registration replaced");
            }
        }
        call.responder.resolve(NativeOutcome::NoResult);
    }

    fn answer(&self, action: &str, args: &NativeArgs) -> Reply {
        let args = args.as_slice();
        let mut state = self.lock();

        // Version and initialization checks work before startup.
        match action {
            "version" => return Ok(json!(SIMULATED_SDK_VERSION)),
            "initialized" => return Ok(json!(u8::from(state.initialized))),
            _ => {}
        }
        if !state.initialized {
            return Err(NOT_INITIALIZED.into());
        }

        match action {
            "appKey" => Ok(json!(state.app_key)),
            "appSecret" => Ok(json!(state.app_secret)),
            "logLevel" => Ok(json!(state.log_level.code())),
            "setLogLevel" => {
                state.log_level = parse_log_level(args.first())
                    .map_err(|e| format!("setLogLevel failed. Error: {e}"))?;
                Ok(Value::Null)
            }
            "proximityEnabled" => Ok(json!(u8::from(state.proximity_enabled))),
            "setProximityEnabled" => {
                state.proximity_enabled = truthy(args.first().ok_or("Expected boolean argument")?);
                Ok(Value::Null)
            }
            "setGeoTrackingEnabled" => {
                state.geo_tracking_enabled = truthy(args.first().ok_or("Expected boolean argument")?);
                Ok(Value::Null)
            }
            "placesInside" => serde_json::to_value(&state.places_inside)
                .map_err(|_| "Cannot get places inside".to_string()),
            "performFetch" => Ok(json!(i64::from(FetchStatus::NewData))),

            "current_instance" => Ok(json!({
                "instance_id": state.instance_id,
                "deviceToken": state.device_token,
                "session": state.session,
                "birthDay": state.birth_day.timestamp_millis(),
                "pushEnabled": state.push_enabled,
            })),
            "instance_identifier" => Ok(json!(state.instance_id)),
            "instance_session" => Ok(json!(state.session)),
            "instance_deviceToken" => Ok(json!(state.device_token)),
            "instance_birthDay" => Ok(json!(state.birth_day.timestamp_millis())),
            "instance_pushEnabled" => Ok(json!(u8::from(state.push_enabled))),

            "instance_userLogin" => {
                let id = string_arg(args, 0).ok_or("Expected string argument")?;
                info!(user = %id, "user logged in");
                state.user = Some(SimUser {
                    id,
                    properties: Map::new(),
                });
                Ok(Value::Null)
            }
            "instance_userLoggedIn" | "is_user_logged_in" => Ok(json!(u8::from(state.user.is_some()))),
            "instance_userLogout" => {
                state.user = None;
                Ok(Value::Null)
            }
            "instance_setCustomProperty" => {
                let (key, value) = property_args(args)?;
                state.properties.insert(key, value);
                Ok(Value::Null)
            }
            "instance_customProperty" | "customProperty" => {
                let key = string_arg(args, 0).ok_or("Expected property key argument")?;
                let value = state.properties.get(&key).cloned().unwrap_or(Value::Null);
                Ok(json!({ key: value }))
            }

            "instance_add_tag" => {
                if args.len() != 2 {
                    return Err("add a tag failed. Error: Add Tag: Incorrect number of arguments, \
                                tag name and its value are required (e.g. addTag(\"buyer\", \"=1\"))"
                        .into());
                }
                let (name, op) = tag_args(args.first(), args.get(1))
                    .map_err(|e| format!("add a tag failed. Error: {e}"))?;
                let entry = state.tags.entry(name).or_insert(0);
                *entry = op.apply(*entry);
                Ok(Value::Null)
            }
            "instance_remove_tag" => {
                if args.len() != 1 {
                    return Err("instance_remove_tag failed. Error: Incorrect number of arguments. TagName needed".into());
                }
                let (name, _) = tag_args(args.first(), None)
                    .map_err(|e| format!("instance_remove_tag failed. Error: {e}"))?;
                state.tags.remove(&name);
                Ok(Value::Null)
            }
            "instance_contains_tag" => {
                let (name, _) = tag_args(args.first(), None)
                    .map_err(|e| format!("instance_contains_tag failed. Error: {e}"))?;
                Ok(json!(u8::from(state.tags.contains_key(&name))))
            }
            "instance_get_value_for_tag" => {
                let (name, _) = tag_args(args.first(), None)
                    .map_err(|e| format!("instance_get_value_for_tag failed. Error: {e}"))?;
                state
                    .tags
                    .get(&name)
                    .map(|v| json!(v))
                    .ok_or_else(|| format!("instance_get_value_for_tag failed. Error: unknown tag {name}"))
            }
            "instance_get_all_tags" => Ok(Value::Object(
                state.tags.iter().map(|(k, v)| (k.clone(), json!(v))).collect(),
            )),

            "current_user" => Ok(state.user.as_ref().map_or(Value::Null, |user| {
                let mut snapshot = user.properties.clone();
                snapshot.insert("user_id".into(), json!(user.id));
                Value::Object(snapshot)
            })),
            "user_save" => state
                .user
                .as_ref()
                .map(|_| Value::Null)
                .ok_or_else(|| "Something went wrong. Returned User from SDK is null".to_string()),
            "user_set_custom_property" => {
                let (key, value) = property_args(args)?;
                let user = state
                    .user
                    .as_mut()
                    .ok_or("Something went wrong. SDK returned a null User")?;
                user.properties.insert(key, value);
                Ok(Value::Null)
            }
            "user_custom_property" => {
                let key = string_arg(args, 0).ok_or("Expected property key argument")?;
                let user = state
                    .user
                    .as_ref()
                    .ok_or("Something went wrong. SDK returned a null User")?;
                let value = user.properties.get(&key).cloned().unwrap_or(Value::Null);
                Ok(json!({ key: value }))
            }

            other => Err(format!("Invalid action: {other}")),
        }
    }
}

impl NativeDispatcher for SimulatedSdk {
    fn platform_name(&self) -> &str {
        "Simulator"
    }

    fn exec(&self, call: NativeCall) {
        if EventKind::from_native_name(&call.descriptor.action).is_some() {
            self.register_callback(call);
            return;
        }
        let reply = self.answer(&call.descriptor.action, &call.descriptor.args);
        // The state lock is released here; the responder may call back in.
        match reply {
            Ok(value) => call.responder.resolve(NativeOutcome::Success(value)),
            Err(message) => {
                debug!(action = %call.descriptor.action, "simulated failure: {message}");
                call.responder.resolve(NativeOutcome::Failure(message))
            }
        };
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// `true`, `"true"` and non-zero numbers count as set.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn string_arg(args: &[Value], index: usize) -> Option<String> {
    match args.get(index)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn property_args(args: &[Value]) -> std::result::Result<(String, Value), String> {
    if args.len() < 2 {
        return Err("Expected key and value arguments".into());
    }
    let key = string_arg(args, 0).ok_or("Expected non null property key")?;
    Ok((key, args[1].clone()))
}

fn parse_log_level(arg: Option<&Value>) -> std::result::Result<LogLevel, String> {
    match arg {
        None | Some(Value::Null) => Ok(LogLevel::Info),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| format!("bad level {n}"))
            .and_then(|code| LogLevel::try_from(code).map_err(|e| e.to_string())),
        Some(Value::String(s)) if s.is_empty() => Ok(LogLevel::Info),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("No enum constant {other}")),
        },
        Some(other) => Err(format!("bad level {other}")),
    }
}

/// A tag mutation in the `+n` / `-n` / `=n` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagOp {
    Add(i64),
    Sub(i64),
    Set(i64),
}

impl TagOp {
    fn parse(raw: &str) -> Option<Self> {
        let (sign, digits) = raw.split_at_checked(1)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n: i64 = digits.parse().ok()?;
        match sign {
            "+" => Some(Self::Add(n)),
            "-" => Some(Self::Sub(n)),
            "=" => Some(Self::Set(n)),
            _ => None,
        }
    }

    fn apply(self, current: i64) -> i64 {
        match self {
            Self::Add(n) => current.saturating_add(n),
            Self::Sub(n) => current.saturating_sub(n),
            Self::Set(n) => n,
        }
    }
}

/// Validate a tag name and value. A missing or `"null"` value means `+1`.
fn tag_args(name: Option<&Value>, value: Option<&Value>) -> std::result::Result<(String, TagOp), String> {
    let name = match name {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err("Tag name is null or empty!".into()),
    };
    let op = match value {
        None | Some(Value::Null) => TagOp::Add(1),
        Some(Value::String(s)) if s == "null" => TagOp::Add(1),
        Some(Value::String(s)) => TagOp::parse(s).ok_or_else(|| {
            format!("Tag value not valid. Should be, for instance, '+1' '-2' '=3'. Found {s}")
        })?,
        Some(other) => {
            return Err(format!(
                "Tag value not valid. Should be, for instance, '+1' '-2' '=3'. Found {other}"
            ));
        }
    };
    Ok((name, op))
}
