// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native action names understood by the MOCA plugin.
//
// Event registration actions are not listed here; they come from
// `EventKind::native_name`.

// -- SDK --
pub const VERSION: &str = "version";
pub const APP_KEY: &str = "appKey";
pub const APP_SECRET: &str = "appSecret";
pub const INITIALIZED: &str = "initialized";
pub const LOG_LEVEL: &str = "logLevel";
pub const SET_LOG_LEVEL: &str = "setLogLevel";
pub const PROXIMITY_ENABLED: &str = "proximityEnabled";
pub const SET_PROXIMITY_ENABLED: &str = "setProximityEnabled";
pub const SET_GEO_TRACKING_ENABLED: &str = "setGeoTrackingEnabled";
pub const PLACES_INSIDE: &str = "placesInside";
pub const PERFORM_FETCH: &str = "performFetch";
pub const CUSTOM_PROPERTY: &str = "customProperty";

// -- Instance --
pub const CURRENT_INSTANCE: &str = "current_instance";
pub const INSTANCE_IDENTIFIER: &str = "instance_identifier";
pub const INSTANCE_SESSION: &str = "instance_session";
pub const INSTANCE_DEVICE_TOKEN: &str = "instance_deviceToken";
pub const INSTANCE_BIRTH_DAY: &str = "instance_birthDay";
pub const INSTANCE_PUSH_ENABLED: &str = "instance_pushEnabled";
pub const INSTANCE_USER_LOGIN: &str = "instance_userLogin";
pub const INSTANCE_USER_LOGGED_IN: &str = "instance_userLoggedIn";
pub const INSTANCE_USER_LOGOUT: &str = "instance_userLogout";
pub const INSTANCE_SET_CUSTOM_PROPERTY: &str = "instance_setCustomProperty";
pub const INSTANCE_CUSTOM_PROPERTY: &str = "instance_customProperty";
pub const INSTANCE_ADD_TAG: &str = "instance_add_tag";
pub const INSTANCE_REMOVE_TAG: &str = "instance_remove_tag";
pub const INSTANCE_CONTAINS_TAG: &str = "instance_contains_tag";
pub const INSTANCE_GET_VALUE_FOR_TAG: &str = "instance_get_value_for_tag";
pub const INSTANCE_GET_ALL_TAGS: &str = "instance_get_all_tags";

// -- User --
pub const CURRENT_USER: &str = "current_user";
pub const IS_USER_LOGGED_IN: &str = "is_user_logged_in";
pub const USER_SET_CUSTOM_PROPERTY: &str = "user_set_custom_property";
pub const USER_CUSTOM_PROPERTY: &str = "user_custom_property";
pub const USER_SAVE: &str = "user_save";
