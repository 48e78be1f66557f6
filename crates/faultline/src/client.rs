// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error reporting client.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use faultline_core::{
	Breadcrumb, BreadcrumbType, Event, EventConfig, Exception, HandledState, Metadata,
	MetadataValue, Notification, Notifier, Section, Session, Severity, SeverityReason, Stackframe,
	User,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::backtrace::capture_stacktrace;
use crate::breadcrumbs::BreadcrumbBuffer;
use crate::callbacks::{panic_message, CallbackId, CallbackState, OnErrorCallback};
use crate::config::{load_config, ClientConfig, ConfigLayer, ThreadSendPolicy, MAX_BREADCRUMBS_LIMIT};
use crate::delivery::{Delivery, DeliveryStatus};
use crate::diagnostics::DiagnosticsCollector;
use crate::error::{FaultlineError, Result};
use crate::panic_hook;
use crate::session::SessionTracker;
use crate::threads::capture_threads;

/// How long the panic path waits for a client lock before going without.
const PANIC_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// What happened to a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
	/// The delivery accepted the payload.
	Delivered,
	/// The delivery did not accept the payload.
	Undelivered,
	/// Matched the ignore list.
	Ignored,
	/// The current release stage does not report.
	ReleaseStageDisabled,
	/// An on-error callback returned false.
	RejectedByCallback,
}

/// Builder for [`Client`].
///
/// Settings made here take precedence over any configuration layer passed
/// to [`with_config_layer`](Self::with_config_layer).
#[derive(Default)]
pub struct ClientBuilder {
	base: ConfigLayer,
	overrides: ConfigLayer,
	delivery: Option<Arc<dyn Delivery>>,
	notifier: Option<Notifier>,
}

impl ClientBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts from the config file and `FAULTLINE_*` environment.
	pub fn from_environment() -> Result<Self> {
		Ok(Self::new().with_config_layer(load_config()?))
	}

	/// Layers `layer` over the configuration gathered so far.
	pub fn with_config_layer(mut self, layer: ConfigLayer) -> Self {
		self.base = std::mem::take(&mut self.base).merge(layer);
		self
	}

	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.overrides.api_key = Some(api_key.into());
		self
	}

	pub fn release_stage(mut self, stage: impl Into<String>) -> Self {
		self.overrides.release_stage = Some(stage.into());
		self
	}

	pub fn enabled_release_stages<I, S>(mut self, stages: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.overrides.enabled_release_stages = Some(stages.into_iter().map(Into::into).collect());
		self
	}

	pub fn ignore_classes<I, S>(mut self, classes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.overrides.ignore_classes = Some(classes.into_iter().map(Into::into).collect());
		self
	}

	/// Module path prefixes whose frames count as project code.
	pub fn project_packages<I, S>(mut self, packages: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.overrides.project_packages = Some(packages.into_iter().map(Into::into).collect());
		self
	}

	pub fn send_threads(mut self, policy: ThreadSendPolicy) -> Self {
		self.overrides.send_threads = Some(policy);
		self
	}

	/// Capped at 100.
	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.overrides.max_breadcrumbs = Some(max);
		self
	}

	pub fn auto_track_sessions(mut self, enabled: bool) -> Self {
		self.overrides.auto_track_sessions = Some(enabled);
		self
	}

	pub fn app_id(mut self, id: impl Into<String>) -> Self {
		self.overrides.app_id = Some(id.into());
		self
	}

	pub fn app_version(mut self, version: impl Into<String>) -> Self {
		self.overrides.app_version = Some(version.into());
		self
	}

	pub fn app_type(mut self, app_type: impl Into<String>) -> Self {
		self.overrides.app_type = Some(app_type.into());
		self
	}

	/// Context used for events that do not set their own.
	pub fn context(mut self, context: impl Into<String>) -> Self {
		self.overrides.context = Some(context.into());
		self
	}

	pub fn delivery(mut self, delivery: impl Delivery + 'static) -> Self {
		self.delivery = Some(Arc::new(delivery));
		self
	}

	pub fn notifier(mut self, notifier: Notifier) -> Self {
		self.notifier = Some(notifier);
		self
	}

	pub fn build(self) -> Result<Client> {
		let config = self.base.merge(self.overrides).resolve();
		if config.api_key.is_empty() {
			return Err(FaultlineError::MissingApiKey);
		}
		let delivery = self.delivery.ok_or(FaultlineError::MissingDelivery)?;

		let inner = Arc::new(ClientInner {
			event_config: config.event_config(),
			breadcrumbs: BreadcrumbBuffer::new(config.max_breadcrumbs.min(MAX_BREADCRUMBS_LIMIT)),
			diagnostics: DiagnosticsCollector::new(&config),
			context: RwLock::new(config.context.clone()),
			notifier: self.notifier.unwrap_or_default(),
			metadata: RwLock::new(Metadata::new()),
			user: RwLock::new(User::default()),
			callbacks: CallbackState::new(),
			sessions: SessionTracker::new(),
			closed: AtomicBool::new(false),
			delivery,
			config,
		});

		if inner.config.auto_track_sessions {
			inner.sessions.start_session(true);
		}

		info!(
			release_stage = %inner.config.release_stage,
			max_breadcrumbs = inner.breadcrumbs.capacity(),
			"Faultline client initialized"
		);

		Ok(Client { inner })
	}
}

/// Whether enrichment may take its time or must avoid blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureMode {
	Normal,
	Panic,
}

/// Per-report inputs to the pipeline.
struct Report<'a> {
	exceptions: Vec<Exception>,
	handled_state: HandledState,
	extra_metadata: Option<&'a Metadata>,
	stacktrace: Vec<Stackframe>,
	mode: CaptureMode,
}

pub(crate) struct ClientInner {
	config: ClientConfig,
	event_config: EventConfig,
	delivery: Arc<dyn Delivery>,
	notifier: Notifier,
	metadata: RwLock<Metadata>,
	user: RwLock<User>,
	context: RwLock<Option<String>>,
	breadcrumbs: BreadcrumbBuffer,
	callbacks: CallbackState,
	sessions: SessionTracker,
	diagnostics: DiagnosticsCollector,
	closed: AtomicBool,
}

impl ClientInner {
	fn check_closed(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			Err(FaultlineError::ClientShutdown)
		} else {
			Ok(())
		}
	}

	fn read_shared<T: Clone + Default>(lock: &RwLock<T>, mode: CaptureMode) -> T {
		match mode {
			CaptureMode::Normal => T::clone(&lock.read()),
			CaptureMode::Panic => lock
				.try_read_for(PANIC_LOCK_TIMEOUT)
				.map(|guard| T::clone(&guard))
				.unwrap_or_default(),
		}
	}

	/// Builds an event from `report`, enriches it and hands it to the
	/// delivery.
	fn process(
		&self,
		report: Report<'_>,
		on_error: Option<&mut dyn FnMut(&mut Event) -> bool>,
	) -> Result<NotifyOutcome> {
		self.check_closed()?;

		if !self.config.should_notify_for_release_stage() {
			debug!(release_stage = %self.config.release_stage, "Release stage does not report, skipping");
			return Ok(NotifyOutcome::ReleaseStageDisabled);
		}

		let Report {
			mut exceptions,
			handled_state,
			extra_metadata,
			stacktrace,
			mode,
		} = report;

		if let Some(first) = exceptions.first_mut() {
			if first.stacktrace().is_empty() && !stacktrace.is_empty() {
				*first = first.clone().with_stacktrace(stacktrace.clone());
			}
		}

		let client_metadata = Self::read_shared(&self.metadata, mode);
		let metadata = match extra_metadata {
			Some(extra) => Metadata::merge(&[&client_metadata, extra]),
			None => client_metadata,
		};

		let mut event = Event::new(exceptions, handled_state, &metadata, &self.event_config);

		let session = self
			.sessions
			.current_session()
			.filter(|session| self.config.auto_track_sessions || !session.is_auto_captured());
		if let Some(session) = &session {
			event.attach_session(session);
		}

		event.set_app(self.diagnostics.app());
		event.set_device(self.diagnostics.device());

		let breadcrumbs = match mode {
			CaptureMode::Normal => self.breadcrumbs.snapshot(),
			CaptureMode::Panic => self.breadcrumbs.try_snapshot(PANIC_LOCK_TIMEOUT).unwrap_or_default(),
		};
		event.set_breadcrumbs(breadcrumbs);

		let user = Self::read_shared(&self.user, mode);
		event.set_user(
			user.id().map(str::to_string),
			user.email().map(str::to_string),
			user.name().map(str::to_string),
		);
		event.set_context(Self::read_shared(&self.context, mode));

		let unhandled = event.is_unhandled();
		event.set_threads(capture_threads(self.config.send_threads, unhandled, stacktrace));

		if mode == CaptureMode::Normal {
			if !self.callbacks.run(&mut event) {
				debug!("Event rejected by on-error callback");
				return Ok(NotifyOutcome::RejectedByCallback);
			}
			if let Some(on_error) = on_error {
				if !run_single_callback(on_error, &mut event) {
					debug!("Event rejected by per-call callback");
					return Ok(NotifyOutcome::RejectedByCallback);
				}
			}
		}

		if event.should_ignore() {
			debug!(
				error_class = event.exceptions().first().map(|e| e.error_class()).unwrap_or_default(),
				"Event matches ignore list, skipping"
			);
			return Ok(NotifyOutcome::Ignored);
		}

		if let Some(session) = &session {
			record_in_session(session, unhandled);
		}

		let error_class = event
			.exceptions()
			.first()
			.map(|e| e.error_class().to_string())
			.unwrap_or_default();
		let error_message = event.exceptions().first().map(|e| e.message().to_string());
		let severity = event.severity();

		let notification = Notification::new(event).with_notifier(self.notifier.clone());
		let status = deliver_guarded(self.delivery.as_ref(), &notification)?;

		if mode == CaptureMode::Normal {
			self.leave_error_breadcrumb(&error_class, error_message, severity, unhandled);
		}

		match status {
			DeliveryStatus::Delivered => {
				debug!(error_class = %error_class, %severity, unhandled, "Event delivered");
				Ok(NotifyOutcome::Delivered)
			}
			DeliveryStatus::Undelivered | DeliveryStatus::Failure => {
				warn!(error_class = %error_class, ?status, "Event was not delivered");
				Ok(NotifyOutcome::Undelivered)
			}
		}
	}

	/// Records a reported error in the trail so later events show it.
	fn leave_error_breadcrumb(
		&self,
		error_class: &str,
		message: Option<String>,
		severity: Severity,
		unhandled: bool,
	) {
		let mut metadata = Section::new();
		metadata.insert("errorClass".to_string(), MetadataValue::from(error_class));
		metadata.insert("message".to_string(), MetadataValue::from(message));
		metadata.insert("severity".to_string(), MetadataValue::from(severity.to_string()));
		metadata.insert("unhandled".to_string(), MetadataValue::from(unhandled));
		self.breadcrumbs
			.push(Breadcrumb::new(error_class, BreadcrumbType::Error, &metadata));
	}

	/// Reports a panic from inside the panic hook.
	///
	/// Callbacks are not run here: a second panic inside a panic hook aborts
	/// the process.
	pub(crate) fn notify_panic(&self, message: &str, location: Option<String>) -> Result<NotifyOutcome> {
		let mut metadata = Metadata::new();
		if let Some(location) = location {
			metadata.add_metadata_map("panic", [("location", location)]);
		}
		let report = Report {
			exceptions: vec![Exception::new("panic", message)],
			handled_state: HandledState::new(SeverityReason::UnhandledPanic, None, None),
			extra_metadata: Some(&metadata),
			stacktrace: capture_stacktrace(&self.config.project_packages),
			mode: CaptureMode::Panic,
		};
		self.process(report, None)
	}
}

fn run_single_callback(callback: &mut dyn FnMut(&mut Event) -> bool, event: &mut Event) -> bool {
	match panic_hook::suppressed(|| panic::catch_unwind(AssertUnwindSafe(|| callback(event)))) {
		Ok(keep) => keep,
		Err(payload) => {
			warn!(panic = %panic_message(payload.as_ref()), "per-call callback panicked, continuing");
			true
		}
	}
}

/// Hands the payload to the delivery. A panicking delivery becomes
/// [`FaultlineError::Delivery`] instead of a reported panic.
fn deliver_guarded(delivery: &dyn Delivery, notification: &Notification) -> Result<DeliveryStatus> {
	panic_hook::suppressed(|| panic::catch_unwind(AssertUnwindSafe(|| delivery.deliver(notification))))
		.unwrap_or_else(|payload| {
			Err(FaultlineError::Delivery(format!(
				"delivery panicked: {}",
				panic_message(payload.as_ref())
			)))
		})
}

fn record_in_session(session: &Arc<Session>, unhandled: bool) {
	let snapshot = if unhandled {
		session.increment_unhandled()
	} else {
		session.increment_handled()
	};
	debug!(
		session_id = %snapshot.id,
		handled = snapshot.handled,
		unhandled = snapshot.unhandled,
		"Session counters updated"
	);
}

/// Captures errors, enriches them and hands them to a [`Delivery`].
///
/// # Example
///
/// ```ignore
/// use faultline::{Client, WriterDelivery};
///
/// let client = Client::builder()
///     .api_key("your-api-key")
///     .app_version(env!("CARGO_PKG_VERSION"))
///     .delivery(WriterDelivery::new(std::io::stderr()))
///     .build()?;
///
/// client.install_panic_hook();
/// client.leave_breadcrumb("loaded settings");
///
/// if let Err(e) = do_something() {
///     client.notify(&e)?;
/// }
///
/// client.shutdown();
/// ```
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}

impl Client {
	pub fn builder() -> ClientBuilder {
		ClientBuilder::new()
	}

	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	/// Reports a handled error with warning severity.
	pub fn notify<E>(&self, error: &E) -> Result<NotifyOutcome>
	where
		E: std::error::Error + ?Sized,
	{
		self.notify_with(error, |_| true)
	}

	/// Like [`notify`](Self::notify), running `on_error` after the client's
	/// callbacks. Returning `false` drops the event.
	pub fn notify_with<E, F>(&self, error: &E, mut on_error: F) -> Result<NotifyOutcome>
	where
		E: std::error::Error + ?Sized,
		F: FnMut(&mut Event) -> bool,
	{
		let report = Report {
			exceptions: Exception::chain(error),
			handled_state: HandledState::handled(),
			extra_metadata: None,
			stacktrace: capture_stacktrace(&self.inner.config.project_packages),
			mode: CaptureMode::Normal,
		};
		self.inner.process(report, Some(&mut on_error))
	}

	/// Reports an error caught by an integration rather than the app.
	///
	/// `metadata` is merged over the client metadata. `attribute` qualifies
	/// the reason, e.g. the signal name for [`SeverityReason::Signal`].
	pub fn notify_unhandled<E>(
		&self,
		error: &E,
		metadata: &Metadata,
		reason: SeverityReason,
		attribute: Option<String>,
	) -> Result<NotifyOutcome>
	where
		E: std::error::Error + ?Sized,
	{
		let report = Report {
			exceptions: Exception::chain(error),
			handled_state: HandledState::new(reason, Some(Severity::Error), attribute),
			extra_metadata: Some(metadata),
			stacktrace: capture_stacktrace(&self.inner.config.project_packages),
			mode: CaptureMode::Normal,
		};
		self.inner.process(report, None)
	}

	/// Reports an event built by the caller, e.g. a log line at error level.
	pub fn notify_exceptions(
		&self,
		exceptions: Vec<Exception>,
		handled_state: HandledState,
	) -> Result<NotifyOutcome> {
		let report = Report {
			exceptions,
			handled_state,
			extra_metadata: None,
			stacktrace: Vec::new(),
			mode: CaptureMode::Normal,
		};
		self.inner.process(report, None)
	}

	/// Reports a panic. Normally reached through the panic hook.
	pub fn notify_panic(&self, message: &str, location: Option<String>) -> Result<NotifyOutcome> {
		self.inner.notify_panic(message, location)
	}

	/// Reports panics before the previously installed hook runs.
	pub fn install_panic_hook(&self) {
		panic_hook::install(Arc::downgrade(&self.inner));
		info!("Panic hook installed");
	}

	pub fn leave_breadcrumb(&self, message: impl Into<String>) {
		self.inner.breadcrumbs.push(Breadcrumb::manual(message));
	}

	pub fn leave_breadcrumb_with(
		&self,
		message: impl Into<String>,
		breadcrumb_type: BreadcrumbType,
		metadata: &Section,
	) {
		self.inner
			.breadcrumbs
			.push(Breadcrumb::new(message, breadcrumb_type, metadata));
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.inner.breadcrumbs.snapshot()
	}

	pub fn clear_breadcrumbs(&self) {
		self.inner.breadcrumbs.clear();
	}

	pub fn add_metadata(&self, section: impl Into<String>, key: impl Into<String>, value: impl Into<MetadataValue>) {
		self.inner.metadata.write().add_metadata(section, key, value);
	}

	pub fn add_metadata_map<I, K, V>(&self, section: impl Into<String>, values: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<MetadataValue>,
	{
		self.inner.metadata.write().add_metadata_map(section, values);
	}

	pub fn clear_metadata(&self, section: &str) {
		self.inner.metadata.write().clear_metadata(section);
	}

	pub fn clear_metadata_key(&self, section: &str, key: &str) {
		self.inner.metadata.write().clear_metadata_key(section, key);
	}

	pub fn get_metadata(&self, section: &str) -> Option<Section> {
		self.inner.metadata.read().get_metadata(section).cloned()
	}

	pub fn get_metadata_value(&self, section: &str, key: &str) -> Option<MetadataValue> {
		self.inner
			.metadata
			.read()
			.get_metadata_value(section, key)
			.cloned()
	}

	pub fn set_user(&self, id: Option<String>, email: Option<String>, name: Option<String>) {
		*self.inner.user.write() = User::new(id, email, name);
	}

	pub fn user(&self) -> User {
		self.inner.user.read().clone()
	}

	pub fn set_context(&self, context: Option<String>) {
		*self.inner.context.write() = context;
	}

	pub fn context(&self) -> Option<String> {
		self.inner.context.read().clone()
	}

	/// Registers a callback run against every event, in registration order.
	pub fn add_on_error<F>(&self, callback: F) -> CallbackId
	where
		F: Fn(&mut Event) -> bool + Send + Sync + 'static,
	{
		let callback: OnErrorCallback = Arc::new(callback);
		self.inner.callbacks.add(callback)
	}

	pub fn remove_on_error(&self, id: CallbackId) -> bool {
		self.inner.callbacks.remove(id)
	}

	/// Starts a session explicitly. Such sessions attach to events even when
	/// automatic tracking is off.
	pub fn start_session(&self) -> Arc<Session> {
		self.inner.sessions.start_session(false)
	}

	pub fn pause_session(&self) {
		self.inner.sessions.pause_session();
	}

	pub fn resume_session(&self) -> bool {
		self.inner.sessions.resume_session()
	}

	pub fn current_session(&self) -> Option<Arc<Session>> {
		self.inner.sessions.current_session()
	}

	/// Continues a session recorded elsewhere, e.g. by a previous process,
	/// with its counters as they were. Without both an id and a start time
	/// the current session is cleared and `None` is returned.
	pub fn register_existing_session(
		&self,
		started_at: Option<DateTime<Utc>>,
		session_id: Option<String>,
		handled: u32,
		unhandled: u32,
	) -> Option<Arc<Session>> {
		self.inner
			.sessions
			.register_existing_session(started_at, session_id, handled, unhandled)
	}

	/// Closes the client. Later reports fail with
	/// [`FaultlineError::ClientShutdown`].
	pub fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.sessions.end_session();
		info!("Faultline client shut down");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// The configured ignore list.
	pub fn ignore_classes(&self) -> &BTreeSet<String> {
		&self.inner.event_config.ignore_classes
	}
}
