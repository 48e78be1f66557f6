// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session records and the read-only link an event keeps to one.
//!
//! The live [`Session`] is owned by the session tracker and its counters keep
//! moving while the app runs. Events never hold it directly: they keep a
//! [`SessionLink`] and read a [`SessionSnapshot`] when they are serialized.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::time::to_iso8601;

const HANDLED_SHIFT: u32 = 32;
const UNHANDLED_MASK: u64 = u32::MAX as u64;

/// A live session.
///
/// Both counters share one atomic word (handled in the high half, unhandled
/// in the low half) so a snapshot always sees a consistent pair.
#[derive(Debug)]
pub struct Session {
	id: String,
	started_at: DateTime<Utc>,
	counts: AtomicU64,
	paused: AtomicBool,
	auto_captured: bool,
}

impl Session {
	/// Starts a new session with a fresh id.
	pub fn new(auto_captured: bool) -> Self {
		Self::with_counts(Uuid::now_v7().to_string(), Utc::now(), 0, 0, auto_captured)
	}

	/// Restores a session captured elsewhere (e.g. a previous process).
	pub fn with_counts(
		id: impl Into<String>,
		started_at: DateTime<Utc>,
		handled: u32,
		unhandled: u32,
		auto_captured: bool,
	) -> Self {
		Self {
			id: id.into(),
			started_at,
			counts: AtomicU64::new(pack(handled, unhandled)),
			paused: AtomicBool::new(false),
			auto_captured,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn started_at(&self) -> &DateTime<Utc> {
		&self.started_at
	}

	pub fn handled_count(&self) -> u32 {
		unpack(self.counts.load(Ordering::SeqCst)).0
	}

	pub fn unhandled_count(&self) -> u32 {
		unpack(self.counts.load(Ordering::SeqCst)).1
	}

	/// Counters saturate at `u32::MAX`.
	pub fn increment_handled(&self) -> SessionSnapshot {
		self.update_counts(|handled, unhandled| (handled.saturating_add(1), unhandled))
	}

	/// Counters saturate at `u32::MAX`.
	pub fn increment_unhandled(&self) -> SessionSnapshot {
		self.update_counts(|handled, unhandled| (handled, unhandled.saturating_add(1)))
	}

	fn update_counts(&self, step: impl Fn(u32, u32) -> (u32, u32)) -> SessionSnapshot {
		let apply = |counts: u64| {
			let (handled, unhandled) = unpack(counts);
			let (handled, unhandled) = step(handled, unhandled);
			pack(handled, unhandled)
		};
		let previous = match self
			.counts
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |counts| Some(apply(counts)))
		{
			Ok(previous) | Err(previous) => previous,
		};
		self.snapshot_from(apply(previous))
	}

	pub fn is_paused(&self) -> bool {
		self.paused.load(Ordering::SeqCst)
	}

	pub fn pause(&self) {
		self.paused.store(true, Ordering::SeqCst);
	}

	/// Clears the paused flag. Returns false if the session was not paused.
	pub fn resume(&self) -> bool {
		self.paused
			.compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
	}

	pub fn is_auto_captured(&self) -> bool {
		self.auto_captured
	}

	/// Point-in-time copy of id, start time and counters.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.snapshot_from(self.counts.load(Ordering::SeqCst))
	}

	fn snapshot_from(&self, counts: u64) -> SessionSnapshot {
		let (handled, unhandled) = unpack(counts);
		SessionSnapshot {
			id: self.id.clone(),
			started_at: self.started_at,
			handled,
			unhandled,
		}
	}
}

fn pack(handled: u32, unhandled: u32) -> u64 {
	(u64::from(handled) << HANDLED_SHIFT) | u64::from(unhandled)
}

fn unpack(counts: u64) -> (u32, u32) {
	((counts >> HANDLED_SHIFT) as u32, (counts & UNHANDLED_MASK) as u32)
}

/// Immutable copy of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
	pub id: String,
	pub started_at: DateTime<Utc>,
	pub handled: u32,
	pub unhandled: u32,
}

impl Serialize for SessionSnapshot {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("Session", 3)?;
		state.serialize_field("id", &self.id)?;
		state.serialize_field("startedAt", &to_iso8601(&self.started_at))?;
		state.serialize_field(
			"events",
			&SessionEvents {
				handled: self.handled,
				unhandled: self.unhandled,
			},
		)?;
		state.end()
	}
}

#[derive(Serialize)]
struct SessionEvents {
	handled: u32,
	unhandled: u32,
}

/// An event's reference to its session.
///
/// Holds a weak pointer to the live session plus the snapshot taken when it
/// was attached. Reads copy the live counters; once the live session is gone
/// the attach-time snapshot is returned instead.
#[derive(Debug, Clone)]
pub struct SessionLink {
	live: Weak<Session>,
	attached: SessionSnapshot,
}

impl SessionLink {
	pub fn new(session: &Arc<Session>) -> Self {
		Self {
			live: Arc::downgrade(session),
			attached: session.snapshot(),
		}
	}

	pub fn id(&self) -> &str {
		&self.attached.id
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		self.live
			.upgrade()
			.map(|session| session.snapshot())
			.unwrap_or_else(|| self.attached.clone())
	}
}

impl From<SessionSnapshot> for SessionLink {
	fn from(snapshot: SessionSnapshot) -> Self {
		Self {
			live: Weak::new(),
			attached: snapshot,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn counters_saturate_without_spilling() {
		let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

		let session = Session::with_counts("full-handled", started, u32::MAX, 0, false);
		let snapshot = session.increment_handled();
		assert_eq!((snapshot.handled, snapshot.unhandled), (u32::MAX, 0));

		let session = Session::with_counts("full-unhandled", started, 0, u32::MAX, false);
		let snapshot = session.increment_unhandled();
		assert_eq!((snapshot.handled, snapshot.unhandled), (0, u32::MAX));
		assert_eq!(session.handled_count(), 0);

		let snapshot = session.increment_handled();
		assert_eq!((snapshot.handled, snapshot.unhandled), (1, u32::MAX));
	}

	#[test]
	fn counters_are_independent() {
		let session = Session::new(false);
		session.increment_handled();
		session.increment_handled();
		let snapshot = session.increment_unhandled();

		assert_eq!(snapshot.handled, 2);
		assert_eq!(snapshot.unhandled, 1);
		assert_eq!(session.handled_count(), 2);
		assert_eq!(session.unhandled_count(), 1);
	}

	#[test]
	fn snapshot_is_a_copy() {
		let session = Session::new(true);
		let snapshot = session.snapshot();
		session.increment_unhandled();
		assert_eq!(snapshot.unhandled, 0);
	}

	#[test]
	fn link_reads_live_then_falls_back() {
		let session = Arc::new(Session::with_counts("abc", Utc::now(), 1, 0, false));
		let link = SessionLink::new(&session);

		session.increment_handled();
		assert_eq!(link.snapshot().handled, 2);

		drop(session);
		assert_eq!(link.snapshot().handled, 1);
		assert_eq!(link.id(), "abc");
	}

	#[test]
	fn pause_and_resume() {
		let session = Session::new(true);
		assert!(!session.resume());
		session.pause();
		assert!(session.is_paused());
		assert!(session.resume());
		assert!(!session.is_paused());
	}

	#[test]
	fn serializes_wire_shape() {
		let started = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
		let snapshot = Session::with_counts("s-1", started, 2, 1, false).snapshot();
		let json = serde_json::to_string(&snapshot).unwrap();
		assert_eq!(
			json,
			r#"{"id":"s-1","startedAt":"2025-03-04T05:06:07.000Z","events":{"handled":2,"unhandled":1}}"#
		);
	}
}
