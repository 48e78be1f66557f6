// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reports a few errors to stdout as JSON lines.
//!
//! Run with `RUST_LOG=faultline=debug` to see the pipeline's own logging.

use std::fmt;

use faultline::{
	BreadcrumbType, ClientBuilder, Event, Metadata, Section, Severity, SeverityReason,
	WriterDelivery,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct PaymentDeclined {
	source: std::num::ParseIntError,
}

impl fmt::Display for PaymentDeclined {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "payment declined")
	}
}

impl std::error::Error for PaymentDeclined {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.source)
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let client = ClientBuilder::from_environment()?
		.api_key("demo-api-key")
		.app_version(env!("CARGO_PKG_VERSION"))
		.project_packages(["capture"])
		.delivery(WriterDelivery::new(std::io::stdout()))
		.build()?;

	client.install_panic_hook();
	client.set_user(Some("user_123".into()), Some("user@example.com".into()), None);
	client.add_metadata("account", "plan", "pro");
	client.add_on_error(|event: &mut Event| {
		if event.context().is_none() {
			event.set_context(Some("checkout".into()));
		}
		true
	});

	let mut crumb = Section::new();
	crumb.insert("screen".into(), "Cart".into());
	client.leave_breadcrumb_with("Opened cart", BreadcrumbType::Navigation, &crumb);
	client.leave_breadcrumb("Pressed pay");

	let source = "12x".parse::<u32>().err().ok_or("expected a parse failure")?;
	let error = PaymentDeclined { source };

	let outcome = client.notify_with(&error, |event| {
		event.set_severity(Severity::Error);
		event.set_grouping_hash(Some("payments".into()));
		true
	})?;
	tracing::info!(?outcome, "handled error reported");

	let mut extra = Metadata::new();
	extra.add_metadata("signal", "code", 11);
	let outcome = client.notify_unhandled(&error, &extra, SeverityReason::Signal, Some("SIGSEGV".into()))?;
	tracing::info!(?outcome, "unhandled error reported");

	client.shutdown();
	Ok(())
}
