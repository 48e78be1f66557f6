// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session tracking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use faultline_core::Session;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Owns the current session and hands out shared references to it.
#[derive(Default)]
pub struct SessionTracker {
	current: RwLock<Option<Arc<Session>>>,
}

impl SessionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new session, replacing any current one.
	pub fn start_session(&self, auto_captured: bool) -> Arc<Session> {
		let session = Arc::new(Session::new(auto_captured));
		info!(session_id = %session.id(), auto_captured, "Session started");
		*self.current.write() = Some(Arc::clone(&session));
		session
	}

	/// Marks the current session paused. Paused sessions are not attached to
	/// events.
	pub fn pause_session(&self) {
		if let Some(session) = self.current.read().as_ref() {
			session.pause();
			debug!(session_id = %session.id(), "Session paused");
		}
	}

	/// Resumes the current session, or starts one if there is none.
	///
	/// Returns true only if a paused session was resumed.
	pub fn resume_session(&self) -> bool {
		let existing = self.current.read().clone();
		match existing {
			Some(session) => {
				let resumed = session.resume();
				debug!(session_id = %session.id(), resumed, "Session resume requested");
				resumed
			}
			None => {
				self.start_session(false);
				false
			}
		}
	}

	/// Restores a session recorded elsewhere, e.g. by a previous process.
	/// Without an id or start time the current session is cleared.
	pub fn register_existing_session(
		&self,
		started_at: Option<DateTime<Utc>>,
		session_id: Option<String>,
		handled: u32,
		unhandled: u32,
	) -> Option<Arc<Session>> {
		let session = match (started_at, session_id) {
			(Some(started_at), Some(id)) => {
				Some(Arc::new(Session::with_counts(id, started_at, handled, unhandled, false)))
			}
			_ => None,
		};
		*self.current.write() = session.clone();
		session
	}

	/// The current session unless it is paused.
	pub fn current_session(&self) -> Option<Arc<Session>> {
		self.current
			.read()
			.as_ref()
			.filter(|session| !session.is_paused())
			.cloned()
	}

	/// Drops the current session.
	pub fn end_session(&self) {
		if let Some(session) = self.current.write().take() {
			info!(
				session_id = %session.id(),
				handled = session.handled_count(),
				unhandled = session.unhandled_count(),
				"Session ended"
			);
		}
	}
}
