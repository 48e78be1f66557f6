// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error reporting SDK for Rust applications.
//!
//! This crate wraps the `faultline-core` event model with everything needed
//! to capture errors in a running program: layered configuration, a
//! breadcrumb trail, sessions, enrichment callbacks and a panic hook.
//!
//! # Quick Start
//!
//! ```ignore
//! use faultline::{BreadcrumbType, Client, Section, WriterDelivery};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = faultline::ClientBuilder::from_environment()?
//!         .api_key("your-api-key")
//!         .app_version(env!("CARGO_PKG_VERSION"))
//!         .project_packages(["my_app"])
//!         .delivery(WriterDelivery::new(std::io::stderr()))
//!         .build()?;
//!
//!     client.install_panic_hook();
//!     client.set_user(Some("user_123".into()), None, None);
//!     client.add_metadata("account", "plan", "pro");
//!
//!     client.add_on_error(|event| {
//!         event.set_context(Some("checkout".into()));
//!         true
//!     });
//!
//!     client.leave_breadcrumb("Application started");
//!
//!     if let Err(e) = risky_operation() {
//!         client.notify(&e)?;
//!     }
//!
//!     client.shutdown();
//!     Ok(())
//! }
//!
//! fn risky_operation() -> Result<(), std::io::Error> {
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Panic Hook**: reports panics with a backtrace before the previous hook runs
//! - **Breadcrumbs**: a bounded trail of what happened before an error
//! - **Callbacks**: inspect, modify or drop every event before delivery
//! - **Sessions**: handled/unhandled counts per session
//! - **Delivery**: pluggable; payloads are deterministic JSON
//!
//! # Configuration
//!
//! Settings are read from `$XDG_CONFIG_HOME/faultline/config.toml`, then
//! `FAULTLINE_*` environment variables, then the builder.

mod backtrace;
mod breadcrumbs;
mod callbacks;
mod client;
pub mod config;
mod delivery;
mod diagnostics;
mod error;
mod panic_hook;
mod session;
mod threads;

pub use backtrace::{capture_stacktrace, parse_backtrace_string};
pub use breadcrumbs::BreadcrumbBuffer;
pub use callbacks::{CallbackId, CallbackState, OnErrorCallback};
pub use client::{Client, ClientBuilder, NotifyOutcome};
pub use config::{ClientConfig, ConfigLayer, ThreadSendPolicy};
pub use delivery::{Delivery, DeliveryStatus, MemoryDelivery, WriterDelivery};
pub use error::{ConfigError, FaultlineError, Result};
pub use session::SessionTracker;

// Re-export core types for convenience
pub use faultline_core::{
	Breadcrumb, BreadcrumbType, Event, Exception, HandledState, Metadata, MetadataValue,
	Notification, Notifier, Section, Session, SessionSnapshot, Severity, SeverityReason,
	Stackframe, Streamable, Thread, User,
};
