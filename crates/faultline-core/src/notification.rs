// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery envelope wrapping one or more events.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Identifies the client library that produced a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifier {
	pub name: String,
	pub version: String,
	pub url: String,
}

impl Default for Notifier {
	fn default() -> Self {
		Self {
			name: "Faultline Rust Notifier".to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			url: env!("CARGO_PKG_REPOSITORY").to_string(),
		}
	}
}

/// `{"apiKey", "notifier", "events"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
	pub api_key: String,
	pub notifier: Notifier,
	pub events: Vec<Event>,
}

impl Notification {
	/// Wraps a single event, taking the api key from it.
	pub fn new(event: Event) -> Self {
		Self {
			api_key: event.api_key().to_string(),
			notifier: Notifier::default(),
			events: vec![event],
		}
	}

	pub fn with_notifier(mut self, notifier: Notifier) -> Self {
		self.notifier = notifier;
		self
	}
}
