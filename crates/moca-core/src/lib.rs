// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MOCA bridge: core types, event catalog, configuration and errors shared
// across all crates.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{BridgeConfig, EventDelivery};
pub use error::{MocaError, Result};
pub use events::{ContentAction, Event, EventKind};
pub use types::*;
