// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User callbacks run against every event before delivery.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use faultline_core::Event;
use parking_lot::RwLock;
use tracing::warn;

use crate::panic_hook;

/// Inspects or mutates an event. Returning `false` drops it.
pub type OnErrorCallback = Arc<dyn Fn(&mut Event) -> bool + Send + Sync>;

/// Handle returned by [`CallbackState::add`], used to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Ordered set of on-error callbacks.
#[derive(Default)]
pub struct CallbackState {
	next_id: AtomicU64,
	callbacks: RwLock<Vec<(CallbackId, OnErrorCallback)>>,
}

impl CallbackState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&self, callback: OnErrorCallback) -> CallbackId {
		let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.callbacks.write().push((id, callback));
		id
	}

	/// Returns false if no callback had this id.
	pub fn remove(&self, id: CallbackId) -> bool {
		let mut callbacks = self.callbacks.write();
		let before = callbacks.len();
		callbacks.retain(|(existing, _)| *existing != id);
		callbacks.len() != before
	}

	pub fn len(&self) -> usize {
		self.callbacks.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Runs the registered callbacks in insertion order.
	///
	/// The list is copied first so a callback may register or remove others
	/// without deadlocking.
	pub fn run(&self, event: &mut Event) -> bool {
		let callbacks: Vec<OnErrorCallback> = self
			.callbacks
			.read()
			.iter()
			.map(|(_, callback)| Arc::clone(callback))
			.collect();
		run_callbacks(&callbacks, event)
	}
}

/// Runs `callbacks` in order, stopping at the first that returns `false`.
///
/// A panicking callback is logged and skipped, and is not reported as a
/// panic event. Mutations it made before panicking are kept.
pub fn run_callbacks(callbacks: &[OnErrorCallback], event: &mut Event) -> bool {
	for (index, callback) in callbacks.iter().enumerate() {
		match panic_hook::suppressed(|| panic::catch_unwind(AssertUnwindSafe(|| callback(event)))) {
			Ok(true) => {}
			Ok(false) => return false,
			Err(payload) => {
				warn!(
					callback_index = index,
					panic = %panic_message(payload.as_ref()),
					"on-error callback panicked, continuing"
				);
			}
		}
	}
	true
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
