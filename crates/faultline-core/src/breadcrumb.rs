// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumb types for events (actions leading up to the incident).

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::EventError;
use crate::metadata::{MetadataValue, Section};
use crate::time::to_iso8601;

/// An immutable record of something that happened before the incident.
///
/// The capture timestamp is fixed at construction and the metadata map is
/// copied from the caller, so later changes to the caller's map are not seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
	message: String,
	breadcrumb_type: BreadcrumbType,
	timestamp: DateTime<Utc>,
	metadata: Section,
}

impl Breadcrumb {
	/// Creates a breadcrumb captured now.
	pub fn new(message: impl Into<String>, breadcrumb_type: BreadcrumbType, metadata: &Section) -> Self {
		Self::from_parts(message, breadcrumb_type, metadata, None)
	}

	/// Creates a breadcrumb with an explicit capture time, defaulting to now.
	pub fn from_parts(
		message: impl Into<String>,
		breadcrumb_type: BreadcrumbType,
		metadata: &Section,
		captured_at: Option<DateTime<Utc>>,
	) -> Self {
		Self {
			message: message.into(),
			breadcrumb_type,
			timestamp: captured_at.unwrap_or_else(Utc::now),
			metadata: metadata.clone(),
		}
	}

	/// A "manual" breadcrumb carrying the message in its metadata.
	pub fn manual(message: impl Into<String>) -> Self {
		let mut metadata = Section::new();
		metadata.insert("message".to_string(), MetadataValue::String(message.into()));
		Self::new("manual", BreadcrumbType::Manual, &metadata)
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn breadcrumb_type(&self) -> BreadcrumbType {
		self.breadcrumb_type
	}

	pub fn timestamp(&self) -> &DateTime<Utc> {
		&self.timestamp
	}

	pub fn metadata(&self) -> &Section {
		&self.metadata
	}
}

impl Serialize for Breadcrumb {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("Breadcrumb", 4)?;
		state.serialize_field("timestamp", &to_iso8601(&self.timestamp))?;
		state.serialize_field("name", &self.message)?;
		state.serialize_field("type", &self.breadcrumb_type)?;
		state.serialize_field("metaData", &self.metadata)?;
		state.end()
	}
}

/// Category of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbType {
	Manual,
	Navigation,
	Request,
	Process,
	Log,
	User,
	State,
	Error,
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Manual => write!(f, "manual"),
			Self::Navigation => write!(f, "navigation"),
			Self::Request => write!(f, "request"),
			Self::Process => write!(f, "process"),
			Self::Log => write!(f, "log"),
			Self::User => write!(f, "user"),
			Self::State => write!(f, "state"),
			Self::Error => write!(f, "error"),
		}
	}
}

impl FromStr for BreadcrumbType {
	type Err = EventError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"manual" => Ok(Self::Manual),
			"navigation" => Ok(Self::Navigation),
			"request" => Ok(Self::Request),
			"process" => Ok(Self::Process),
			"log" => Ok(Self::Log),
			"user" => Ok(Self::User),
			"state" => Ok(Self::State),
			"error" => Ok(Self::Error),
			_ => Err(EventError::InvalidBreadcrumbType(s.to_string())),
		}
	}
}
