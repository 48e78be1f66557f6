// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thread-safe ring buffer for breadcrumbs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use faultline_core::Breadcrumb;
use parking_lot::RwLock;

/// A bounded, thread-safe trail of breadcrumbs.
///
/// When the buffer is full the oldest breadcrumb is evicted. Readers always
/// get a snapshot, oldest first, so events never observe a half-written trail.
#[derive(Clone)]
pub struct BreadcrumbBuffer {
	inner: Arc<BreadcrumbBufferInner>,
}

struct BreadcrumbBufferInner {
	entries: RwLock<VecDeque<Breadcrumb>>,
	capacity: usize,
}

impl BreadcrumbBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			inner: Arc::new(BreadcrumbBufferInner {
				entries: RwLock::new(VecDeque::with_capacity(capacity)),
				capacity,
			}),
		}
	}

	/// Appends a breadcrumb, evicting the oldest if full.
	pub fn push(&self, breadcrumb: Breadcrumb) {
		if self.inner.capacity == 0 {
			return;
		}
		let mut entries = self.inner.entries.write();
		while entries.len() >= self.inner.capacity {
			entries.pop_front();
		}
		entries.push_back(breadcrumb);
	}

	/// Copy of the trail, oldest first.
	pub fn snapshot(&self) -> Vec<Breadcrumb> {
		self.inner.entries.read().iter().cloned().collect()
	}

	/// Like [`snapshot`](Self::snapshot) but gives up after `timeout`.
	///
	/// Used from the panic hook, where the panicking thread may itself hold
	/// the lock.
	pub fn try_snapshot(&self, timeout: Duration) -> Option<Vec<Breadcrumb>> {
		self.inner
			.entries
			.try_read_for(timeout)
			.map(|entries| entries.iter().cloned().collect())
	}

	pub fn clear(&self) {
		self.inner.entries.write().clear();
	}

	pub fn len(&self) -> usize {
		self.inner.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}
}
