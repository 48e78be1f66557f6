// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Faultline error reporting client.
//!
//! This crate holds the event model and its wire encoding. It does not capture
//! anything on its own: the `faultline` SDK builds an [`Event`] when an
//! incident happens, lets user callbacks enrich it, asks the ignore filter
//! whether it should be dropped and finally renders it through the canonical
//! serializer into a [`Notification`] payload.
//!
//! # Overview
//!
//! - [`Metadata`]: namespaced key/value store (sections of [`MetadataValue`])
//! - [`Breadcrumb`]: immutable trail entry leading up to the incident
//! - [`HandledState`]: handled/unhandled flag plus severity and its reason
//! - [`User`]: identity triple attached to an event
//! - [`Event`]: the aggregate, mutable only during enrichment
//! - [`Streamable`]: deterministic JSON rendering to any [`std::io::Write`]
//!
//! Serialized output is deterministic: metadata sections and keys are always
//! emitted in ascending lexicographic order and top-level event fields in a
//! fixed order, so two renderings of the same event are byte-identical.

pub mod app;
pub mod breadcrumb;
pub mod error;
pub mod event;
pub mod exception;
pub mod filter;
pub mod metadata;
pub mod notification;
pub mod payload;
pub mod session;
pub mod severity;
pub mod thread;
pub mod time;
pub mod user;

pub use app::{App, Device};
pub use breadcrumb::{Breadcrumb, BreadcrumbType};
pub use error::{EventError, Result};
pub use event::{Event, EventConfig};
pub use exception::{Exception, Stackframe};
pub use filter::should_ignore;
pub use metadata::{Metadata, MetadataValue, Section};
pub use notification::{Notification, Notifier};
pub use payload::Streamable;
pub use session::{Session, SessionLink, SessionSnapshot};
pub use severity::{HandledState, Severity, SeverityReason};
pub use thread::Thread;
pub use user::User;
