// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the client.

use std::path::PathBuf;

use faultline_core::EventError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, FaultlineError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum FaultlineError {
	/// The client has been shut down.
	#[error("faultline client has been shut down")]
	ClientShutdown,

	/// No API key was configured.
	#[error("API key is required")]
	MissingApiKey,

	/// No delivery was configured.
	#[error("a delivery must be configured")]
	MissingDelivery,

	/// Configuration could not be loaded.
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	/// The payload could not be written.
	#[error("payload error: {0}")]
	Payload(#[from] EventError),

	/// The delivery rejected the payload.
	#[error("delivery failed: {0}")]
	Delivery(String),
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// I/O error reading a config file
	#[error("I/O error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// TOML parsing error
	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// Invalid value
	#[error("Invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },
}

impl ConfigError {
	/// Create an invalid value error
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}
