// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event aggregate.
//!
//! An [`Event`] is created when a reportable incident is identified, mutated
//! by enrichment callbacks on a single thread, then handed to the serializer.
//! Mutators never fail: unknown sections or keys are no-ops so that a buggy
//! callback cannot stop a report from going out.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::app::{App, Device};
use crate::breadcrumb::Breadcrumb;
use crate::exception::Exception;
use crate::filter;
use crate::metadata::{Metadata, MetadataValue, Section};
use crate::session::{Session, SessionLink};
use crate::severity::{HandledState, Severity};
use crate::thread::Thread;
use crate::user::User;

/// The slice of client configuration an event needs at construction.
#[derive(Debug, Clone, Default)]
pub struct EventConfig {
	pub api_key: String,
	/// Error classes whose events are suppressed. Exact, case-sensitive match.
	/// Shared by every event built from this config.
	pub ignore_classes: Arc<BTreeSet<String>>,
}

#[derive(Debug, Clone)]
pub struct Event {
	api_key: String,
	context: Option<String>,
	metadata: Metadata,
	handled_state: HandledState,
	unhandled: bool,
	exceptions: Vec<Exception>,
	user: User,
	app: Option<App>,
	device: Option<Device>,
	breadcrumbs: Vec<Breadcrumb>,
	grouping_hash: Option<String>,
	threads: Vec<Thread>,
	session: Option<SessionLink>,
	ignore_classes: Arc<BTreeSet<String>>,
}

impl Event {
	/// Creates an event from an already-built error chain.
	///
	/// `metadata` is deep-copied so the caller's store is never aliased. An
	/// empty chain is allowed; such an event is ignored by default.
	pub fn new(
		exceptions: Vec<Exception>,
		handled_state: HandledState,
		metadata: &Metadata,
		config: &EventConfig,
	) -> Self {
		Self {
			api_key: config.api_key.clone(),
			context: None,
			metadata: metadata.clone(),
			unhandled: handled_state.is_unhandled(),
			handled_state,
			exceptions,
			user: User::default(),
			app: None,
			device: None,
			breadcrumbs: Vec::new(),
			grouping_hash: None,
			threads: Vec::new(),
			session: None,
			ignore_classes: Arc::clone(&config.ignore_classes),
		}
	}

	/// Creates an event for `error`, building the chain from its sources.
	pub fn from_error<E>(
		error: &E,
		handled_state: HandledState,
		metadata: &Metadata,
		config: &EventConfig,
	) -> Self
	where
		E: std::error::Error + ?Sized,
	{
		Self::new(Exception::chain(error), handled_state, metadata, config)
	}

	pub fn is_unhandled(&self) -> bool {
		self.unhandled
	}

	pub fn severity(&self) -> Severity {
		self.handled_state.current_severity()
	}

	/// Overrides the severity; the reason becomes "set by user callback".
	pub fn set_severity(&mut self, severity: Severity) {
		self.handled_state.override_severity(severity);
	}

	pub fn handled_state(&self) -> &HandledState {
		&self.handled_state
	}

	pub fn api_key(&self) -> &str {
		&self.api_key
	}

	pub fn set_api_key(&mut self, api_key: impl Into<String>) {
		self.api_key = api_key.into();
	}

	pub fn context(&self) -> Option<&str> {
		self.context.as_deref()
	}

	pub fn set_context(&mut self, context: Option<String>) {
		self.context = context;
	}

	pub fn grouping_hash(&self) -> Option<&str> {
		self.grouping_hash.as_deref()
	}

	pub fn set_grouping_hash(&mut self, grouping_hash: Option<String>) {
		self.grouping_hash = grouping_hash;
	}

	pub fn user(&self) -> &User {
		&self.user
	}

	/// Replaces the whole identity triple.
	pub fn set_user(&mut self, id: Option<String>, email: Option<String>, name: Option<String>) {
		self.user = User::new(id, email, name);
	}

	pub fn add_metadata(
		&mut self,
		section: impl Into<String>,
		key: impl Into<String>,
		value: impl Into<MetadataValue>,
	) {
		self.metadata.add_metadata(section, key, value);
	}

	pub fn add_metadata_map<I, K, V>(&mut self, section: impl Into<String>, values: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<MetadataValue>,
	{
		self.metadata.add_metadata_map(section, values);
	}

	pub fn clear_metadata(&mut self, section: &str) {
		self.metadata.clear_metadata(section);
	}

	pub fn clear_metadata_key(&mut self, section: &str, key: &str) {
		self.metadata.clear_metadata_key(section, key);
	}

	pub fn get_metadata(&self, section: &str) -> Option<&Section> {
		self.metadata.get_metadata(section)
	}

	pub fn get_metadata_value(&self, section: &str, key: &str) -> Option<&MetadataValue> {
		self.metadata.get_metadata_value(section, key)
	}

	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	pub fn exceptions(&self) -> &[Exception] {
		&self.exceptions
	}

	pub fn exceptions_mut(&mut self) -> &mut Vec<Exception> {
		&mut self.exceptions
	}

	pub fn set_exceptions(&mut self, exceptions: Vec<Exception>) {
		self.exceptions = exceptions;
	}

	pub fn breadcrumbs(&self) -> &[Breadcrumb] {
		&self.breadcrumbs
	}

	/// Attaches the trail, oldest first. Order is kept as given.
	pub fn set_breadcrumbs(&mut self, breadcrumbs: Vec<Breadcrumb>) {
		self.breadcrumbs = breadcrumbs;
	}

	pub fn threads(&self) -> &[Thread] {
		&self.threads
	}

	pub fn set_threads(&mut self, threads: Vec<Thread>) {
		self.threads = threads;
	}

	pub fn app(&self) -> Option<&App> {
		self.app.as_ref()
	}

	pub fn set_app(&mut self, app: App) {
		self.app = Some(app);
	}

	pub fn device(&self) -> Option<&Device> {
		self.device.as_ref()
	}

	pub fn set_device(&mut self, device: Device) {
		self.device = Some(device);
	}

	pub fn session(&self) -> Option<&SessionLink> {
		self.session.as_ref()
	}

	pub fn attach_session(&mut self, session: &Arc<Session>) {
		self.session = Some(SessionLink::new(session));
	}

	/// Sets or clears the session link directly.
	pub fn set_session(&mut self, session: Option<SessionLink>) {
		self.session = session;
	}

	pub fn ignore_classes(&self) -> &BTreeSet<String> {
		&self.ignore_classes
	}

	/// See [`filter::should_ignore`].
	pub fn should_ignore(&self) -> bool {
		filter::should_ignore(self)
	}
}

/// Canonical wire form. Field order is part of the contract and `session` is
/// omitted entirely when no session is attached.
impl Serialize for Event {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let len = if self.session.is_some() { 13 } else { 12 };
		let mut state = serializer.serialize_struct("Event", len)?;
		state.serialize_field("context", &self.context)?;
		state.serialize_field("metaData", &self.metadata)?;
		state.serialize_field("severity", &self.handled_state.current_severity())?;
		state.serialize_field("severityReason", &self.handled_state)?;
		state.serialize_field("unhandled", &self.unhandled)?;
		state.serialize_field("exceptions", &self.exceptions)?;
		state.serialize_field("user", &self.user)?;
		state.serialize_field("app", &self.app)?;
		state.serialize_field("device", &self.device)?;
		state.serialize_field("breadcrumbs", &self.breadcrumbs)?;
		state.serialize_field("groupingHash", &self.grouping_hash)?;
		state.serialize_field("threads", &self.threads)?;
		match &self.session {
			Some(link) => state.serialize_field("session", &link.snapshot())?,
			None => state.skip_field("session")?,
		}
		state.end()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::breadcrumb::BreadcrumbType;
	use crate::payload::Streamable;
	use crate::severity::SeverityReason;
	use chrono::Utc;
	use proptest::prelude::*;

	fn config() -> EventConfig {
		EventConfig {
			api_key: "0123456789abcdef".to_string(),
			ignore_classes: Arc::default(),
		}
	}

	fn unhandled_event() -> Event {
		Event::new(
			vec![Exception::new("RuntimeError", "boom")],
			HandledState::unhandled(),
			&Metadata::new(),
			&config(),
		)
	}

	fn keys(value: &serde_json::Value) -> Vec<String> {
		value.as_object().unwrap().keys().cloned().collect()
	}

	#[test]
	fn events_share_the_ignore_set() {
		let config = EventConfig {
			ignore_classes: Arc::new(BTreeSet::from(["Timeout".to_string()])),
			..config()
		};
		let first = Event::new(Vec::new(), HandledState::handled(), &Metadata::new(), &config);
		let second = Event::new(Vec::new(), HandledState::handled(), &Metadata::new(), &config);

		assert!(std::ptr::eq(first.ignore_classes(), second.ignore_classes()));
		assert!(first.ignore_classes().contains("Timeout"));
	}

	#[test]
	fn end_to_end_unhandled_event() {
		let mut event = unhandled_event();
		event.set_breadcrumbs(vec![Breadcrumb::new(
			"Button tapped",
			BreadcrumbType::User,
			&Section::new(),
		)]);
		event.add_metadata("custom", "screen", "Login");

		let value = event.to_value().unwrap();

		assert_eq!(value["unhandled"], serde_json::json!(true));
		assert_eq!(value["severity"], serde_json::json!("error"));
		assert_eq!(value["breadcrumbs"].as_array().unwrap().len(), 1);
		assert_eq!(value["breadcrumbs"][0]["name"], serde_json::json!("Button tapped"));
		assert_eq!(value["metaData"]["custom"]["screen"], serde_json::json!("Login"));
	}

	#[test]
	fn field_order_is_fixed() {
		let bytes = unhandled_event().to_bytes().unwrap();
		let json = String::from_utf8(bytes).unwrap();

		let order = [
			"\"context\"",
			"\"metaData\"",
			"\"severity\"",
			"\"severityReason\"",
			"\"unhandled\"",
			"\"exceptions\"",
			"\"user\"",
			"\"app\"",
			"\"device\"",
			"\"breadcrumbs\"",
			"\"groupingHash\"",
			"\"threads\"",
		];
		let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
		assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
	}

	#[test]
	fn absent_optionals_are_null_and_session_is_omitted() {
		let value = unhandled_event().to_value().unwrap();
		assert!(value["context"].is_null());
		assert!(value["app"].is_null());
		assert!(value["device"].is_null());
		assert!(value["groupingHash"].is_null());
		assert!(value.as_object().unwrap().contains_key("groupingHash"));
		assert!(!value.as_object().unwrap().contains_key("session"));
		assert_eq!(keys(&value).len(), 12);
	}

	#[test]
	fn session_counters_are_serialized_and_detach_omits_key() {
		let session = Arc::new(Session::with_counts("sess-1", Utc::now(), 2, 1, false));
		let mut event = unhandled_event();
		event.attach_session(&session);

		let value = event.to_value().unwrap();
		assert_eq!(value["session"]["id"], serde_json::json!("sess-1"));
		assert_eq!(value["session"]["events"]["handled"], serde_json::json!(2));
		assert_eq!(value["session"]["events"]["unhandled"], serde_json::json!(1));

		event.set_session(None);
		let value = event.to_value().unwrap();
		assert!(!value.as_object().unwrap().contains_key("session"));
	}

	#[test]
	fn serialized_session_is_a_point_in_time_copy() {
		let session = Arc::new(Session::with_counts("sess-2", Utc::now(), 0, 0, false));
		let mut event = unhandled_event();
		event.attach_session(&session);

		let first = event.to_bytes().unwrap();
		session.increment_handled();
		let again = event.to_value().unwrap();

		let first: serde_json::Value = serde_json::from_slice(&first).unwrap();
		assert_eq!(first["session"]["events"]["handled"], serde_json::json!(0));
		assert_eq!(again["session"]["events"]["handled"], serde_json::json!(1));
	}

	#[test]
	fn metadata_keys_serialize_alphabetically() {
		let mut event = unhandled_event();
		event.add_metadata("custom", "zebra", 1);
		event.add_metadata("custom", "alpha", 2);

		let json = String::from_utf8(event.to_bytes().unwrap()).unwrap();
		let alpha = json.find("\"alpha\"").unwrap();
		let zebra = json.find("\"zebra\"").unwrap();
		assert!(alpha < zebra);
	}

	#[test]
	fn construction_does_not_alias_metadata() {
		let mut source = Metadata::new();
		source.add_metadata("app", "mode", "debug");

		let mut event = Event::new(Vec::new(), HandledState::handled(), &source, &config());
		source.add_metadata("app", "mode", "release");
		event.add_metadata("app", "extra", true);

		assert_eq!(event.get_metadata_value("app", "mode"), Some(&MetadataValue::from("debug")));
		assert!(source.get_metadata_value("app", "extra").is_none());
	}

	#[test]
	fn set_user_replaces_whole_triple() {
		let mut event = unhandled_event();
		event.set_user(Some("1".into()), Some("a@example.com".into()), Some("Ann".into()));
		event.set_user(Some("2".into()), None, None);

		assert_eq!(event.user().id(), Some("2"));
		assert_eq!(event.user().email(), None);
		assert_eq!(event.user().name(), None);
	}

	#[test]
	fn severity_override_updates_reason() {
		let mut event = unhandled_event();
		event.set_severity(Severity::Info);

		let value = event.to_value().unwrap();
		assert_eq!(value["severity"], serde_json::json!("info"));
		assert_eq!(value["severityReason"]["type"], serde_json::json!("userCallbackSetSeverity"));
		assert_eq!(value["unhandled"], serde_json::json!(true));
		assert_eq!(event.handled_state().original_reason(), SeverityReason::UnhandledException);
	}

	#[test]
	fn context_and_grouping_hash_overrides() {
		let mut event = unhandled_event();
		event.set_context(Some("CheckoutScreen".into()));
		event.set_grouping_hash(Some("checkout-failure".into()));

		let value = event.to_value().unwrap();
		assert_eq!(value["context"], serde_json::json!("CheckoutScreen"));
		assert_eq!(value["groupingHash"], serde_json::json!("checkout-failure"));
	}

	#[test]
	fn list_order_is_preserved() {
		let mut event = unhandled_event();
		event.set_breadcrumbs(vec![
			Breadcrumb::manual("second"),
			Breadcrumb::manual("first"),
		]);
		event.set_exceptions(vec![Exception::new("Outer", "o"), Exception::new("Inner", "i")]);

		let value = event.to_value().unwrap();
		assert_eq!(value["breadcrumbs"][0]["metaData"]["message"], serde_json::json!("second"));
		assert_eq!(value["exceptions"][0]["errorClass"], serde_json::json!("Outer"));
		assert_eq!(value["exceptions"][1]["errorClass"], serde_json::json!("Inner"));
	}

	#[test]
	fn from_error_builds_chain() {
		let error = std::io::Error::other("disk full");
		let event = Event::from_error(&error, HandledState::handled(), &Metadata::new(), &config());
		assert_eq!(event.exceptions().len(), 1);
		assert!(event.exceptions()[0].error_class().starts_with("std::io::"));
		assert!(!event.is_unhandled());
	}

	proptest! {
		#[test]
		fn serialization_is_deterministic(
			entries in proptest::collection::vec(("[a-z]{1,6}", "[a-z]{1,6}", any::<i64>()), 0..20),
			context in proptest::option::of("[A-Za-z]{1,12}"),
		) {
			let mut event = unhandled_event();
			for (section, key, value) in &entries {
				event.add_metadata(section.clone(), key.clone(), *value);
			}
			event.set_context(context);

			prop_assert_eq!(event.to_bytes().unwrap(), event.to_bytes().unwrap());
		}

		#[test]
		fn unhandled_is_invariant_under_overrides(overrides in proptest::collection::vec(0u8..3, 0..8)) {
			let mut event = unhandled_event();
			for o in overrides {
				let severity = match o {
					0 => Severity::Error,
					1 => Severity::Warning,
					_ => Severity::Info,
				};
				event.set_severity(severity);
				prop_assert!(event.is_unhandled());
				prop_assert!(event.handled_state().is_unhandled());
			}
		}
	}
}
