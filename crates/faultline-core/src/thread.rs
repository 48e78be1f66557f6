// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thread records captured alongside an event.

use serde::{Deserialize, Serialize};

use crate::exception::{Stackframe, RUST_ERROR_TYPE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
	pub id: String,
	pub name: Option<String>,
	#[serde(rename = "type")]
	pub thread_type: String,
	pub error_reporting_thread: bool,
	pub stacktrace: Vec<Stackframe>,
}

impl Thread {
	pub fn new(
		id: impl Into<String>,
		name: Option<String>,
		error_reporting_thread: bool,
		stacktrace: Vec<Stackframe>,
	) -> Self {
		Self {
			id: id.into(),
			name,
			thread_type: RUST_ERROR_TYPE.to_string(),
			error_reporting_thread,
			stacktrace,
		}
	}
}
