// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logged-in user lookup and the user proxy.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use moca_bridge::{NativeBridge, TypedCall, decode};
use moca_core::Result;

use crate::actions;

/// Reserved snapshot key holding the user identifier.
pub const USER_ID_KEY: &str = "user_id";

/// Diagnostic returned when nobody is logged in.
pub const NOT_LOGGED_IN: &str = "No user is logged in";

/// A user as reported by `current_user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    /// Every other snapshot key.
    pub properties: Map<String, Value>,
}

impl User {
    pub fn from_snapshot(snapshot: &Map<String, Value>) -> Self {
        let mut user = Self::default();
        let mut found_id = false;
        for (key, value) in snapshot {
            match key.as_str() {
                USER_ID_KEY | "id" => {
                    found_id = true;
                    user.id = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                }
                _ => {
                    user.properties.insert(key.clone(), value.clone());
                }
            }
        }
        if !found_id {
            warn!("user snapshot has no {USER_ID_KEY}");
        }
        user
    }
}

/// A user plus the calls scoped to them.
#[derive(Debug, Clone)]
pub struct UserProxy {
    user: User,
    bridge: NativeBridge,
}

impl UserProxy {
    pub fn new(user: User, bridge: NativeBridge) -> Self {
        Self { user, bridge }
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn set_custom_property(&self, key: &str, value: impl Into<Value>) -> TypedCall<()> {
        self.bridge
            .request(actions::USER_SET_CUSTOM_PROPERTY, (key, value.into()))
            .ignore()
    }

    pub fn custom_property(&self, key: &str) -> TypedCall<Value> {
        let key_owned = key.to_string();
        self.bridge
            .request(actions::USER_CUSTOM_PROPERTY, key)
            .map(move |_, value| Ok(decode::keyed(&key_owned, value)))
    }

    /// Persist pending property changes on the native side.
    pub fn save(&self) -> TypedCall<()> {
        self.bridge.request(actions::USER_SAVE, ()).ignore()
    }

    pub fn logout(&self) -> TypedCall<()> {
        self.bridge.request(actions::INSTANCE_USER_LOGOUT, ()).ignore()
    }
}

/// Result of a current-user lookup. "Nobody logged in" is an answer, not an
/// error.
#[derive(Debug, Clone)]
pub enum UserLookup {
    LoggedIn(UserProxy),
    NotLoggedIn { reason: &'static str },
}

impl UserLookup {
    fn not_logged_in() -> Self {
        Self::NotLoggedIn { reason: NOT_LOGGED_IN }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }

    /// Either the user, or the diagnostic. Never both.
    pub fn into_parts(self) -> (Option<UserProxy>, Option<&'static str>) {
        match self {
            Self::LoggedIn(user) => (Some(user), None),
            Self::NotLoggedIn { reason } => (None, Some(reason)),
        }
    }
}

fn from_reply(bridge: &NativeBridge, value: Value) -> UserLookup {
    match value {
        Value::Object(map) => UserLookup::LoggedIn(UserProxy::new(User::from_snapshot(&map), bridge.clone())),
        other => {
            debug!(reply = %other, "current_user returned no snapshot");
            UserLookup::not_logged_in()
        }
    }
}

/// Ask whether a user is logged in, then fetch their snapshot.
pub async fn lookup(bridge: &NativeBridge) -> Result<UserLookup> {
    let logged_in = bridge
        .request(actions::IS_USER_LOGGED_IN, ())
        .map(decode::boolean)
        .await?;
    if !logged_in {
        return Ok(UserLookup::not_logged_in());
    }
    let snapshot = bridge.request(actions::CURRENT_USER, ()).await?;
    Ok(from_reply(bridge, snapshot))
}

/// Callback form of [`lookup`]. Failures at either step are logged and the
/// callback does not run.
pub fn lookup_with<F>(bridge: &NativeBridge, callback: F)
where
    F: FnOnce(UserLookup) + Send + 'static,
{
    let chained = bridge.clone();
    bridge.call_native(
        Some(Box::new(move |value| {
            match decode::boolean(actions::IS_USER_LOGGED_IN, value) {
                Ok(true) => {
                    let owner = chained.clone();
                    chained.call_native(
                        Some(Box::new(move |snapshot| callback(from_reply(&owner, snapshot)))),
                        actions::CURRENT_USER,
                        (),
                    );
                }
                Ok(false) => callback(UserLookup::not_logged_in()),
                Err(e) => warn!("user lookup failed: {e}"),
            }
        })),
        actions::IS_USER_LOGGED_IN,
        (),
    );
}
