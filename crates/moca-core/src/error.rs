// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the MOCA bridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum MocaError {
    // -- Native call errors --
    /// The native side invoked the failure callback.
    #[error("native call failed: {0}")]
    Native(String),

    /// The native side answered, but not with the shape the caller expected.
    #[error("unexpected result from `{action}`: {detail}")]
    UnexpectedResult { action: String, detail: String },

    /// The responder was dropped before it delivered a terminal outcome.
    #[error("native call `{action}` was dropped without a result")]
    CallDropped { action: String },

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MocaError {
    /// Build an [`MocaError::UnexpectedResult`] for `action`.
    pub fn unexpected(action: &str, detail: impl Into<String>) -> Self {
        Self::UnexpectedResult {
            action: action.to_string(),
            detail: detail.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MocaError>;
