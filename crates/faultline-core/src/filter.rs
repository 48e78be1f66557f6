// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ignore filter applied after enrichment and before serialization.

use crate::event::Event;

/// Returns true if the event should be dropped.
///
/// An event is ignored when its error chain is empty, or when any error in
/// the chain has a class listed in the event's ignore set (exact,
/// case-sensitive match).
///
/// The empty-chain rule means an event built without an originating error is
/// suppressed by default even though no policy named it. Callers that report
/// such events must add an exception during enrichment.
pub fn should_ignore(event: &Event) -> bool {
	let exceptions = event.exceptions();
	if exceptions.is_empty() {
		return true;
	}
	let ignored = event.ignore_classes();
	exceptions
		.iter()
		.any(|exception| ignored.contains(exception.error_class()))
}
