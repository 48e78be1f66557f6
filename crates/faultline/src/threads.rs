// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thread capture.
//!
//! Rust cannot walk the stacks of other threads, so only the reporting
//! thread is recorded.

use std::thread;

use faultline_core::{Stackframe, Thread};

use crate::config::ThreadSendPolicy;

/// Records the current thread if `policy` allows it for this event.
pub fn capture_threads(
	policy: ThreadSendPolicy,
	unhandled: bool,
	stacktrace: Vec<Stackframe>,
) -> Vec<Thread> {
	if !policy.should_send(unhandled) {
		return Vec::new();
	}
	let current = thread::current();
	vec![Thread::new(
		thread_id(&current.id()),
		current.name().map(str::to_string),
		true,
		stacktrace,
	)]
}

/// `ThreadId` has no stable numeric accessor; its Debug form is `ThreadId(N)`.
fn thread_id(id: &thread::ThreadId) -> String {
	let debug = format!("{id:?}");
	let digits: String = debug.chars().filter(char::is_ascii_digit).collect();
	if digits.is_empty() {
		debug
	} else {
		digits
	}
}
