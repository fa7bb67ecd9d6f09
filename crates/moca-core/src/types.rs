// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared by the bridge and the SDK surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin identifier sent with every native call.
pub const PLUGIN_NAME: &str = "MOCAPlugin";

/// A numeric code that did not match any variant of a wire enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i64,
}

impl std::fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} code {}", self.kind, self.code)
    }
}

impl std::error::Error for UnknownCode {}

/// SDK log verbosity. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warning = 2,
    #[default]
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Equivalent `tracing` filter for host-side logging.
    pub fn level_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warning => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

impl TryFrom<i64> for LogLevel {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::Off),
            1 => Ok(Self::Error),
            2 => Ok(Self::Warning),
            3 => Ok(Self::Info),
            4 => Ok(Self::Debug),
            5 => Ok(Self::Trace),
            _ => Err(UnknownCode { kind: "log level", code }),
        }
    }
}

impl From<LogLevel> for i64 {
    fn from(level: LogLevel) -> Self {
        level.code()
    }
}

/// Outcome of a background fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum FetchStatus {
    NoData = 0,
    NewData = 1,
}

impl TryFrom<i64> for FetchStatus {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::NoData),
            1 => Ok(Self::NewData),
            _ => Err(UnknownCode { kind: "fetch status", code }),
        }
    }
}

impl From<FetchStatus> for i64 {
    fn from(status: FetchStatus) -> Self {
        status as i64
    }
}

/// Beacon proximity bucket.
///
/// Always serialized as its numeric code. Deserialization also accepts the
/// label form (`"Near"`) that some SDK builds emit in proximity-change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawProximity", into = "i64")]
pub enum Proximity {
    Unknown = 0,
    Immediate = 1,
    Near = 2,
    Far = 3,
}

impl Proximity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "immediate" => Some(Self::Immediate),
            "near" => Some(Self::Near),
            "far" => Some(Self::Far),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Proximity {
    type Error = UnknownCode;

    fn try_from(code: i64) -> Result<Self, UnknownCode> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Immediate),
            2 => Ok(Self::Near),
            3 => Ok(Self::Far),
            _ => Err(UnknownCode { kind: "proximity", code }),
        }
    }
}

impl From<Proximity> for i64 {
    fn from(p: Proximity) -> Self {
        p as i64
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProximity {
    Code(i64),
    Label(String),
}

impl TryFrom<RawProximity> for Proximity {
    type Error = String;

    fn try_from(raw: RawProximity) -> Result<Self, String> {
        match raw {
            RawProximity::Code(code) => Proximity::try_from(code).map_err(|e| e.to_string()),
            RawProximity::Label(label) => {
                Proximity::from_label(&label).ok_or_else(|| format!("unknown proximity label {label:?}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Native call descriptors
// ---------------------------------------------------------------------------

/// Correlation id for one native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(pub u64);

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

impl CallId {
    /// A fresh id. Ids are unique across every bridge in the process, since
    /// the platform dispatchers park all responders in one registry.
    pub fn next() -> Self {
        Self(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered positional arguments for a native action.
///
/// Every argument form a caller can write (nothing, one value, several
/// values) converts into the same list shape before dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeArgs(pub Vec<Value>);

impl NativeArgs {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<()> for NativeArgs {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<Vec<Value>> for NativeArgs {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<&[Value]> for NativeArgs {
    fn from(values: &[Value]) -> Self {
        Self(values.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for NativeArgs {
    fn from(value: Option<T>) -> Self {
        Self(vec![value.map_or(Value::Null, Into::into)])
    }
}

macro_rules! single_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for NativeArgs {
                fn from(value: $ty) -> Self {
                    Self(vec![Value::from(value)])
                }
            }
        )*
    };
}

single_arg!(&str, String, bool, i32, i64, u32, u64, f64, Value);

impl From<LogLevel> for NativeArgs {
    fn from(level: LogLevel) -> Self {
        Self(vec![Value::from(level.code())])
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for NativeArgs {
    fn from((a, b): (A, B)) -> Self {
        Self(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for NativeArgs {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self(vec![a.into(), b.into(), c.into()])
    }
}

/// One native invocation: plugin, action, and its argument list.
///
/// Built fresh for each call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub plugin: String,
    pub action: String,
    pub args: NativeArgs,
}

impl ActionDescriptor {
    pub fn new(plugin: impl Into<String>, action: impl Into<String>, args: impl Into<NativeArgs>) -> Self {
        Self {
            plugin: plugin.into(),
            action: action.into(),
            args: args.into(),
        }
    }

    /// Argument list serialized as a JSON array, the form FFI dispatchers send.
    pub fn args_json(&self) -> String {
        Value::Array(self.args.0.clone()).to_string()
    }
}

/// Summary of a place the device is currently inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub geofence: Option<GeoFence>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Circular geofence centre reported with a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}
