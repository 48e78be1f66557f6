// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Severity and handled-state classification.
//!
//! An event is either handled or unhandled from the moment it is created and
//! never changes sides. Severity starts at the default for its
//! [`SeverityReason`] and can only move through
//! [`HandledState::override_severity`], which records that a user callback set
//! it while keeping the original reason recoverable.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::EventError;

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Error,
	Warning,
	Info,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => write!(f, "error"),
			Self::Warning => write!(f, "warning"),
			Self::Info => write!(f, "info"),
		}
	}
}

impl FromStr for Severity {
	type Err = EventError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"error" => Ok(Self::Error),
			"warning" => Ok(Self::Warning),
			"info" => Ok(Self::Info),
			_ => Err(EventError::InvalidSeverity(s.to_string())),
		}
	}
}

/// Why an event has its severity. Wire names are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeverityReason {
	UnhandledException,
	UnhandledPanic,
	HandledException,
	UserSpecifiedSeverity,
	UserCallbackSetSeverity,
	Log,
	StrictMode,
	Anr,
	PromiseRejection,
	Signal,
}

impl SeverityReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::UnhandledException => "unhandledException",
			Self::UnhandledPanic => "unhandledPanic",
			Self::HandledException => "handledException",
			Self::UserSpecifiedSeverity => "userSpecifiedSeverity",
			Self::UserCallbackSetSeverity => "userCallbackSetSeverity",
			Self::Log => "log",
			Self::StrictMode => "strictMode",
			Self::Anr => "anrError",
			Self::PromiseRejection => "unhandledPromiseRejection",
			Self::Signal => "signal",
		}
	}

	/// Severity implied by the reason, if it implies one.
	pub fn default_severity(&self) -> Option<Severity> {
		match self {
			Self::UnhandledException
			| Self::UnhandledPanic
			| Self::Anr
			| Self::PromiseRejection
			| Self::Signal => Some(Severity::Error),
			Self::HandledException | Self::StrictMode => Some(Severity::Warning),
			Self::UserSpecifiedSeverity | Self::UserCallbackSetSeverity | Self::Log => None,
		}
	}

	/// Whether events captured for this reason are unhandled.
	pub fn is_unhandled(&self) -> bool {
		matches!(
			self,
			Self::UnhandledException
				| Self::UnhandledPanic
				| Self::StrictMode
				| Self::Anr
				| Self::PromiseRejection
				| Self::Signal
		)
	}

	/// Name of the qualifier attribute this reason carries on the wire.
	pub fn attribute_key(&self) -> Option<&'static str> {
		match self {
			Self::Log => Some("level"),
			Self::StrictMode => Some("violationType"),
			Self::Signal => Some("signalType"),
			_ => None,
		}
	}
}

impl fmt::Display for SeverityReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SeverityReason {
	type Err = EventError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"unhandledException" => Ok(Self::UnhandledException),
			"unhandledPanic" => Ok(Self::UnhandledPanic),
			"handledException" => Ok(Self::HandledException),
			"userSpecifiedSeverity" => Ok(Self::UserSpecifiedSeverity),
			"userCallbackSetSeverity" => Ok(Self::UserCallbackSetSeverity),
			"log" => Ok(Self::Log),
			"strictMode" => Ok(Self::StrictMode),
			"anrError" => Ok(Self::Anr),
			"unhandledPromiseRejection" => Ok(Self::PromiseRejection),
			"signal" => Ok(Self::Signal),
			_ => Err(EventError::InvalidSeverityReason(s.to_string())),
		}
	}
}

impl Serialize for SeverityReason {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

/// Handled flag, severity and the reason for that severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledState {
	unhandled: bool,
	original_reason: SeverityReason,
	original_severity: Severity,
	current_severity: Severity,
	overridden: bool,
	attribute_value: Option<String>,
}

impl HandledState {
	/// Creates a state for `reason`.
	///
	/// `severity` is used when given; otherwise the reason's default applies,
	/// falling back to warning for reasons without one.
	pub fn new(reason: SeverityReason, severity: Option<Severity>, attribute_value: Option<String>) -> Self {
		let severity = severity
			.or_else(|| reason.default_severity())
			.unwrap_or(Severity::Warning);
		Self {
			unhandled: reason.is_unhandled(),
			original_reason: reason,
			original_severity: severity,
			current_severity: severity,
			overridden: false,
			attribute_value,
		}
	}

	/// An explicitly reported error.
	pub fn handled() -> Self {
		Self::new(SeverityReason::HandledException, None, None)
	}

	/// An uncaught error.
	pub fn unhandled() -> Self {
		Self::new(SeverityReason::UnhandledException, None, None)
	}

	/// Severity overridden by user. Keeps the unhandled flag, the original
	/// reason and any qualifier.
	pub fn override_severity(&mut self, severity: Severity) {
		self.current_severity = severity;
		self.overridden = true;
	}

	pub fn is_unhandled(&self) -> bool {
		self.unhandled
	}

	pub fn current_severity(&self) -> Severity {
		self.current_severity
	}

	pub fn original_severity(&self) -> Severity {
		self.original_severity
	}

	/// Reason for the current severity.
	pub fn severity_reason(&self) -> SeverityReason {
		if self.overridden {
			SeverityReason::UserCallbackSetSeverity
		} else {
			self.original_reason
		}
	}

	pub fn original_reason(&self) -> SeverityReason {
		self.original_reason
	}

	pub fn is_overridden(&self) -> bool {
		self.overridden
	}

	pub fn attribute_value(&self) -> Option<&str> {
		self.attribute_value.as_deref()
	}
}

/// Serializes as the `severityReason` object.
impl Serialize for HandledState {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let attribute = self
			.original_reason
			.attribute_key()
			.zip(self.attribute_value.as_deref());

		let mut map = serializer.serialize_map(Some(if attribute.is_some() { 2 } else { 1 }))?;
		map.serialize_entry("type", &self.severity_reason())?;
		if let Some((key, value)) = attribute {
			map.serialize_entry("attributes", &Attribute { key, value })?;
		}
		map.end()
	}
}

struct Attribute<'a> {
	key: &'a str,
	value: &'a str,
}

impl Serialize for Attribute<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(1))?;
		map.serialize_entry(self.key, self.value)?;
		map.end()
	}
}
