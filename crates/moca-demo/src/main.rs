// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// moca-demo: drives the MOCA client against the simulated SDK.
//
// Usage: moca-demo [config.json]
//
// Without a config file a demo app key and secret are used. RUST_LOG
// overrides the configured log level.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use moca_bridge::simulator::SimulatedSdk;
use moca_core::events::{BeaconEvent, ZoneEvent};
use moca_core::{BridgeConfig, ContentAction, EventKind, Proximity, Result};
use moca_sdk::{Moca, UserLookup};

fn load_config() -> Result<BridgeConfig> {
    match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load(path),
        None => Ok(BridgeConfig {
            app_key: Some("demo-app-key".into()),
            app_secret: Some("demo-app-secret".into()),
            ..Default::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.level_filter().to_string())),
        )
        .init();

    info!(plugin = %config.plugin_name, "moca-demo starting");

    let sdk = Arc::new(SimulatedSdk::started(&config)?);
    sdk.set_device_token("demo-device-token");
    let moca = Moca::connect(sdk.clone(), config);

    register_listeners(&moca);

    let version = moca.version().await?;
    let level = moca.log_level().await?;
    let proximity = moca.proximity_enabled().await?;
    info!(%version, ?level, proximity, "SDK ready");
    let fetch = moca.perform_fetch().await?;
    info!(?fetch, "background fetch");

    if let Some(instance) = moca.instance().snapshot() {
        info!(id = ?instance.id, session = ?instance.session, birth_day = ?instance.birth_day, "instance");
    }

    let instance = moca.instance();
    instance.add_tag_default("visitor").await?;
    instance.add_tag("visitor", Some("+2")).await?;
    instance.set_custom_property("locale", "en-GB").await?;
    let tags = instance.all_tags().await?;
    info!(?tags, "tags");
    if let Err(e) = instance.add_tag("visitor", Some("lots")).await {
        warn!("rejected tag value: {e}");
    }

    show_user(&moca).await?;
    moca.login("demo-user").await?;
    show_user(&moca).await?;

    // Occurrences the device SDK would push.
    sdk.fire_event(
        EventKind::EnterBeacon,
        json!({ "identifier": "beacon-entrance", "name": "Entrance", "proximity": 2 }),
    );
    sdk.fire_event(EventKind::EnterZone, json!({ "id": "zone-lobby", "name": "Lobby" }));
    let suppressed = sdk.fire_event(EventKind::DisplayAlert, json!("Welcome back!"));
    info!(suppressed, "display alert delivered");

    moca.logout().await?;
    info!("moca-demo finished");
    Ok(())
}

fn register_listeners(moca: &Moca) {
    moca.add_enter_beacon_listener(|event| match event.decode::<BeaconEvent>() {
        Ok(beacon) => info!(
            beacon = %beacon.identifier,
            near = beacon.proximity.is_some_and(|p| p == Proximity::Near),
            "entered beacon"
        ),
        Err(e) => error!("bad beacon payload: {e}"),
    });

    moca.add_enter_zone_listener(|event| match event.decode::<ZoneEvent>() {
        Ok(zone) => info!(zone = %zone.identifier, name = ?zone.name, "entered zone"),
        Err(e) => error!("bad zone payload: {e}"),
    });

    // Handle alerts ourselves instead of the SDK's default dialog.
    moca.on_content_action(ContentAction::DisplayAlert, true, |event| {
        info!(message = event.content().unwrap_or_default(), "alert");
    });
}

async fn show_user(moca: &Moca) -> Result<()> {
    match moca.current_user().await? {
        UserLookup::LoggedIn(user) => info!(user = user.id(), "logged in"),
        UserLookup::NotLoggedIn { reason } => info!("{reason}"),
    }
    Ok(())
}
