// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration for automatic error reporting.

use std::cell::Cell;
use std::panic::PanicHookInfo;
use std::sync::Weak;

use tracing::{debug, error};

use crate::callbacks::panic_message;
use crate::client::ClientInner;

thread_local! {
	static SUPPRESSED: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` with panic reporting switched off on this thread.
///
/// Wraps code whose panics the client catches itself (user callbacks and
/// delivery). The hook still runs then, but must not report: the panic is
/// already handled, and the panicking frame may hold the delivery lock.
pub(crate) fn suppressed<R>(f: impl FnOnce() -> R) -> R {
	struct Restore(bool);

	impl Drop for Restore {
		fn drop(&mut self) {
			SUPPRESSED.with(|flag| flag.set(self.0));
		}
	}

	let _restore = Restore(SUPPRESSED.with(|flag| flag.replace(true)));
	f()
}

fn is_suppressed() -> bool {
	SUPPRESSED.with(Cell::get)
}

/// Wraps the current panic hook so panics are reported first.
///
/// The hook holds the client weakly; once every [`Client`](crate::Client)
/// handle is dropped it just defers to the previous hook.
pub(crate) fn install(client: Weak<ClientInner>) {
	let previous = std::panic::take_hook();

	std::panic::set_hook(Box::new(move |info| {
		if !is_suppressed() {
			if let Some(client) = client.upgrade() {
				report_panic(&client, info);
			}
		}
		previous(info);
	}));
}

fn report_panic(client: &ClientInner, info: &PanicHookInfo<'_>) {
	let message = panic_message(info.payload());
	let location = info
		.location()
		.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

	match client.notify_panic(&message, location) {
		Ok(outcome) => debug!(?outcome, "Panic reported"),
		Err(e) => error!(error = %e, "Failed to report panic"),
	}
}
