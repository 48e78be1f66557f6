// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User identity attached to an event.

use serde::{Deserialize, Serialize};

/// Identity triple. Every field is optional and absent fields serialize as
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	id: Option<String>,
	email: Option<String>,
	name: Option<String>,
}

impl User {
	pub fn new(id: Option<String>, email: Option<String>, name: Option<String>) -> Self {
		Self { id, email, name }
	}

	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	pub fn email(&self) -> Option<&str> {
		self.email.as_deref()
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}
