// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the event model.

use thiserror::Error;

/// Errors surfaced by the event model.
///
/// Enrichment never fails; only rendering a payload to a sink and parsing
/// wire names back into enums can.
#[derive(Debug, Error)]
pub enum EventError {
	#[error("I/O error while writing payload: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to encode payload: {0}")]
	Encode(serde_json::Error),

	#[error("invalid breadcrumb type: {0}")]
	InvalidBreadcrumbType(String),

	#[error("invalid severity: {0}")]
	InvalidSeverity(String),

	#[error("invalid severity reason: {0}")]
	InvalidSeverityReason(String),
}

impl From<serde_json::Error> for EventError {
	fn from(err: serde_json::Error) -> Self {
		if err.is_io() {
			Self::Io(err.into())
		} else {
			Self::Encode(err)
		}
	}
}

/// Result type for event model operations.
pub type Result<T> = std::result::Result<T, EventError>;
