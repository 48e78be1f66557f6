// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests of the client pipeline against an in-memory delivery.

use std::fmt;
use std::io::Write;

use chrono::{TimeZone, Utc};
use faultline::{
	BreadcrumbType, Client, ClientBuilder, ConfigLayer, Event, FaultlineError, MemoryDelivery,
	Metadata, NotifyOutcome, Section, Severity, SeverityReason, ThreadSendPolicy,
};
use serde_json::Value;
use tempfile::TempDir;

#[derive(Debug)]
struct CheckoutFailed;

impl fmt::Display for CheckoutFailed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "checkout failed")
	}
}

impl std::error::Error for CheckoutFailed {}

#[derive(Debug)]
struct ExpectedTimeout;

impl fmt::Display for ExpectedTimeout {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "upstream timed out")
	}
}

impl std::error::Error for ExpectedTimeout {}

fn builder(delivery: &MemoryDelivery) -> ClientBuilder {
	Client::builder()
		.api_key("0123456789abcdef")
		.delivery(delivery.clone())
}

fn only_event(delivery: &MemoryDelivery) -> Value {
	let payloads = delivery.payloads_json();
	assert_eq!(payloads.len(), 1, "expected exactly one payload");
	payloads[0]["events"][0].clone()
}

#[test]
fn unhandled_error_with_breadcrumb_and_metadata() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).auto_track_sessions(false).build().unwrap();

	client.leave_breadcrumb_with("Button tapped", BreadcrumbType::User, &Section::new());
	client.add_metadata("custom", "screen", "Login");

	let outcome = client
		.notify_unhandled(
			&CheckoutFailed,
			&Metadata::new(),
			SeverityReason::UnhandledException,
			None,
		)
		.unwrap();
	assert_eq!(outcome, NotifyOutcome::Delivered);

	let event = only_event(&delivery);
	assert_eq!(event["unhandled"], true);
	assert_eq!(event["severity"], "error");
	assert_eq!(event["severityReason"]["type"], "unhandledException");
	assert_eq!(event["breadcrumbs"].as_array().map(Vec::len), Some(1));
	assert_eq!(event["breadcrumbs"][0]["name"], "Button tapped");
	assert_eq!(event["breadcrumbs"][0]["type"], "user");
	assert_eq!(event["metaData"]["custom"]["screen"], "Login");
	assert_eq!(
		event["exceptions"][0]["errorClass"],
		std::any::type_name::<CheckoutFailed>()
	);
	assert!(event.get("session").is_none());
}

#[test]
fn payload_envelope_carries_api_key_and_notifier() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.notify(&CheckoutFailed).unwrap();

	let payload = &delivery.payloads_json()[0];
	assert_eq!(payload["apiKey"], "0123456789abcdef");
	assert_eq!(payload["notifier"]["name"], "Faultline Rust Notifier");
	assert_eq!(payload["events"][0]["severity"], "warning");
	assert_eq!(payload["events"][0]["unhandled"], false);
}

#[test]
fn session_counts_handled_and_unhandled() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();

	client.notify(&CheckoutFailed).unwrap();
	client.notify(&CheckoutFailed).unwrap();
	client
		.notify_unhandled(&CheckoutFailed, &Metadata::new(), SeverityReason::UnhandledPanic, None)
		.unwrap();

	let payloads = delivery.payloads_json();
	assert_eq!(payloads.len(), 3);
	let session = &payloads[2]["events"][0]["session"];
	assert_eq!(session["events"]["handled"], 2);
	assert_eq!(session["events"]["unhandled"], 1);
	assert_eq!(payloads[0]["events"][0]["session"]["events"]["handled"], 1);
	assert_eq!(payloads[0]["events"][0]["session"]["id"], session["id"]);
}

#[test]
fn auto_captured_session_needs_tracking_but_manual_does_not() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).auto_track_sessions(false).build().unwrap();
	assert!(client.current_session().is_none());

	client.notify(&CheckoutFailed).unwrap();
	let session = client.start_session();
	client.notify(&CheckoutFailed).unwrap();

	let payloads = delivery.payloads_json();
	assert!(payloads[0]["events"][0].get("session").is_none());
	assert_eq!(payloads[1]["events"][0]["session"]["id"], session.id());
}

#[test]
fn registered_session_continues_its_counts() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	let started = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

	let session = client
		.register_existing_session(Some(started), Some("from-last-run".into()), 3, 1)
		.unwrap();
	client.notify(&CheckoutFailed).unwrap();

	let event = only_event(&delivery);
	assert_eq!(event["session"]["id"], "from-last-run");
	assert_eq!(event["session"]["startedAt"], "2025-06-01T12:00:00.000Z");
	assert_eq!(event["session"]["events"]["handled"], 4);
	assert_eq!(event["session"]["events"]["unhandled"], 1);
	assert_eq!(session.handled_count(), 4);

	assert!(client.register_existing_session(None, Some("no-start".into()), 0, 0).is_none());
	assert!(client.current_session().is_none());
}

#[test]
fn paused_session_is_not_attached_or_counted() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	let session = client.current_session().unwrap();

	client.pause_session();
	client.notify(&CheckoutFailed).unwrap();
	assert!(only_event(&delivery).get("session").is_none());
	assert_eq!(session.handled_count(), 0);

	assert!(client.resume_session());
	client.notify(&CheckoutFailed).unwrap();
	assert_eq!(session.handled_count(), 1);
}

#[test]
fn ignored_classes_are_suppressed() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery)
		.ignore_classes([std::any::type_name::<ExpectedTimeout>()])
		.build()
		.unwrap();
	let session = client.current_session().unwrap();

	assert_eq!(client.notify(&ExpectedTimeout).unwrap(), NotifyOutcome::Ignored);
	assert_eq!(client.notify(&CheckoutFailed).unwrap(), NotifyOutcome::Delivered);

	assert_eq!(delivery.len(), 1);
	assert_eq!(session.handled_count(), 1);
}

#[test]
fn callback_can_rename_class_into_ignore_list() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).ignore_classes(["Noise"]).build().unwrap();
	client.add_on_error(|event: &mut Event| {
		if let Some(first) = event.exceptions_mut().first_mut() {
			first.set_error_class("Noise");
		}
		true
	});

	assert_eq!(client.notify(&CheckoutFailed).unwrap(), NotifyOutcome::Ignored);
	assert!(delivery.is_empty());
}

#[test]
fn disabled_release_stage_sends_nothing() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery)
		.release_stage("development")
		.enabled_release_stages(["production"])
		.build()
		.unwrap();

	assert_eq!(
		client.notify(&CheckoutFailed).unwrap(),
		NotifyOutcome::ReleaseStageDisabled
	);
	assert!(delivery.is_empty());
}

#[test]
fn callback_returning_false_drops_event() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	let session = client.current_session().unwrap();
	client.add_on_error(|_: &mut Event| false);

	assert_eq!(
		client.notify(&CheckoutFailed).unwrap(),
		NotifyOutcome::RejectedByCallback
	);
	assert!(delivery.is_empty());
	assert_eq!(session.handled_count(), 0);
}

#[test]
fn per_call_callback_runs_after_global_callbacks() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.add_on_error(|event: &mut Event| {
		event.set_context(Some("global".into()));
		true
	});

	client
		.notify_with(&CheckoutFailed, |event| {
			let context = format!("{}+call", event.context().unwrap_or_default());
			event.set_context(Some(context));
			true
		})
		.unwrap();

	assert_eq!(only_event(&delivery)["context"], "global+call");
}

#[test]
fn panicking_callback_keeps_partial_state() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.add_on_error(|event: &mut Event| {
		event.add_metadata("debug", "stage", "before panic");
		panic!("bug in callback");
	});

	assert_eq!(client.notify(&CheckoutFailed).unwrap(), NotifyOutcome::Delivered);
	assert_eq!(only_event(&delivery)["metaData"]["debug"]["stage"], "before panic");
}

#[test]
fn callback_severity_override_keeps_unhandled() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.add_on_error(|event: &mut Event| {
		event.set_severity(Severity::Info);
		true
	});

	client
		.notify_unhandled(
			&CheckoutFailed,
			&Metadata::new(),
			SeverityReason::Signal,
			Some("SIGSEGV".into()),
		)
		.unwrap();

	let event = only_event(&delivery);
	assert_eq!(event["severity"], "info");
	assert_eq!(event["unhandled"], true);
	assert_eq!(event["severityReason"]["type"], "userCallbackSetSeverity");
	assert_eq!(event["severityReason"]["attributes"]["signalType"], "SIGSEGV");
}

#[test]
fn breadcrumbs_are_bounded() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).max_breadcrumbs(3).build().unwrap();
	for i in 0..10 {
		client.leave_breadcrumb(format!("step {i}"));
	}

	client.notify(&CheckoutFailed).unwrap();

	let event = only_event(&delivery);
	let crumbs = event["breadcrumbs"].as_array().unwrap();
	assert_eq!(crumbs.len(), 3);
	assert_eq!(crumbs[0]["metaData"]["message"], "step 7");
	assert_eq!(crumbs[2]["metaData"]["message"], "step 9");
}

#[test]
fn max_breadcrumbs_is_capped() {
	let client = builder(&MemoryDelivery::new()).max_breadcrumbs(500).build().unwrap();
	assert_eq!(client.config().max_breadcrumbs, 100);
}

#[test]
fn client_state_is_copied_into_each_event() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).context("startup").build().unwrap();
	client.set_user(Some("u-1".into()), Some("a@example.com".into()), None);
	client.add_metadata("account", "plan", "pro");

	client.notify(&CheckoutFailed).unwrap();
	client.clear_metadata("account");
	client.set_context(None);
	client.notify(&CheckoutFailed).unwrap();

	let payloads = delivery.payloads_json();
	let first = &payloads[0]["events"][0];
	assert_eq!(first["context"], "startup");
	assert_eq!(first["user"]["id"], "u-1");
	assert_eq!(first["user"]["name"], Value::Null);
	assert_eq!(first["metaData"]["account"]["plan"], "pro");

	let second = &payloads[1]["events"][0];
	assert_eq!(second["context"], Value::Null);
	assert!(second["metaData"].get("account").is_none());
}

#[test]
fn extra_metadata_merges_over_client_metadata() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.add_metadata("request", "path", "/cart");
	client.add_metadata("request", "method", "GET");

	let mut extra = Metadata::new();
	extra.add_metadata("request", "method", "POST");
	client
		.notify_unhandled(&CheckoutFailed, &extra, SeverityReason::UnhandledException, None)
		.unwrap();

	let request = &only_event(&delivery)["metaData"]["request"];
	assert_eq!(request["path"], "/cart");
	assert_eq!(request["method"], "POST");
	assert_eq!(
		client.get_metadata_value("request", "method").and_then(|v| v.as_str().map(str::to_string)),
		Some("GET".to_string())
	);
}

#[test]
fn thread_policy_controls_threads() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery)
		.send_threads(ThreadSendPolicy::UnhandledOnly)
		.build()
		.unwrap();

	client.notify(&CheckoutFailed).unwrap();
	client
		.notify_unhandled(&CheckoutFailed, &Metadata::new(), SeverityReason::UnhandledException, None)
		.unwrap();

	let payloads = delivery.payloads_json();
	assert_eq!(payloads[0]["events"][0]["threads"].as_array().map(Vec::len), Some(0));
	assert_eq!(payloads[1]["events"][0]["threads"].as_array().map(Vec::len), Some(1));
	assert_eq!(payloads[1]["events"][0]["threads"][0]["errorReportingThread"], true);
}

#[test]
fn panic_report_skips_callbacks() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.add_on_error(|_: &mut Event| false);

	let outcome = client
		.notify_panic("index out of bounds", Some("src/main.rs:10:5".into()))
		.unwrap();
	assert_eq!(outcome, NotifyOutcome::Delivered);

	let event = only_event(&delivery);
	assert_eq!(event["severityReason"]["type"], "unhandledPanic");
	assert_eq!(event["exceptions"][0]["message"], "index out of bounds");
	assert_eq!(event["metaData"]["panic"]["location"], "src/main.rs:10:5");
}

#[test]
fn shutdown_rejects_further_reports() {
	let delivery = MemoryDelivery::new();
	let client = builder(&delivery).build().unwrap();
	client.shutdown();

	let result = client.notify(&CheckoutFailed);
	assert!(matches!(result, Err(FaultlineError::ClientShutdown)));
	assert!(delivery.is_empty());
}

#[test]
fn config_file_layer_is_applied() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("config.toml");
	let mut file = std::fs::File::create(&path).unwrap();
	writeln!(file, "api_key = \"from-file\"").unwrap();
	writeln!(file, "release_stage = \"staging\"").unwrap();
	writeln!(file, "max_breadcrumbs = 7").unwrap();

	let layer = ConfigLayer::from_file(&path).unwrap();
	let delivery = MemoryDelivery::new();
	let client = Client::builder()
		.with_config_layer(layer)
		.release_stage("canary")
		.delivery(delivery.clone())
		.build()
		.unwrap();

	assert_eq!(client.config().api_key, "from-file");
	assert_eq!(client.config().release_stage, "canary");
	assert_eq!(client.config().max_breadcrumbs, 7);

	client.notify(&CheckoutFailed).unwrap();
	assert_eq!(only_event(&delivery)["app"]["releaseStage"], "canary");
}
